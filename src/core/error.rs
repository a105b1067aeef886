//! Purpose: Error taxonomy for decoded foreign results.
//! Exports: `Error`, `ErrorKind`, `to_exit_code`.
//! Role: Single failure type returned by the decoder and the CLI.
//! Invariants: Each error envelope discriminant maps to exactly one `ErrorKind`.
//! Invariants: Contract violations (null handles) are panics and never an `ErrorKind`.
use std::error::Error as StdError;
use std::fmt;

use serde_json::Value;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ErrorKind {
    /// Result text was not valid UTF-8 JSON, or did not fit the requested shape.
    Decode,
    Api,
    MalformedCredentialsFile,
    MissingCredentialsFile,
    TlsVerification,
    /// The foreign side failed to parse JSON it was handed.
    PayloadParse,
    Network,
    Timeout,
    Generic,
    Usage,
    Io,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 11] = [
        ErrorKind::Decode,
        ErrorKind::Api,
        ErrorKind::MalformedCredentialsFile,
        ErrorKind::MissingCredentialsFile,
        ErrorKind::TlsVerification,
        ErrorKind::PayloadParse,
        ErrorKind::Network,
        ErrorKind::Timeout,
        ErrorKind::Generic,
        ErrorKind::Usage,
        ErrorKind::Io,
    ];

    pub fn default_message(self) -> &'static str {
        match self {
            ErrorKind::Decode => "invalid result payload",
            ErrorKind::Api => "api request failed",
            ErrorKind::MalformedCredentialsFile => "malformed credentials file",
            ErrorKind::MissingCredentialsFile => "missing credentials file",
            ErrorKind::TlsVerification => "certificate verification failed",
            ErrorKind::PayloadParse => "json parse error",
            ErrorKind::Network => "network error",
            ErrorKind::Timeout => "request timed out",
            ErrorKind::Generic => "error",
            ErrorKind::Usage => "usage error",
            ErrorKind::Io => "i/o error",
        }
    }
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    code: Option<i64>,
    body: Option<Value>,
    hint: Option<String>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            code: None,
            body: None,
            hint: None,
            source: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn code(&self) -> Option<i64> {
        self.code
    }

    /// Response body attached to `Api` errors.
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_code(mut self, code: i64) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        match &self.message {
            Some(message) => write!(f, ": {message}")?,
            None => write!(f, ": {}", self.kind.default_message())?,
        }
        if let Some(code) = self.code {
            write!(f, " (code: {code})")?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn StdError + 'static))
    }
}

pub fn to_exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Generic => 1,
        ErrorKind::Usage => 2,
        ErrorKind::Decode => 3,
        ErrorKind::Api => 4,
        ErrorKind::MalformedCredentialsFile => 5,
        ErrorKind::MissingCredentialsFile => 6,
        ErrorKind::TlsVerification => 7,
        ErrorKind::PayloadParse => 8,
        ErrorKind::Network => 9,
        ErrorKind::Timeout => 10,
        ErrorKind::Io => 11,
    }
}
