//! Purpose: Typed view of the error envelopes the foreign runtime returns.
//! Exports: `ErrorEnvelope`, `KNOWN_DISCRIMINANTS`, `DISCRIMINANT_KEY`.
//! Role: Turns an untyped JSON object carrying `err_type` into one variant per failure kind.
//! Invariants: Any object with an `err_type` key becomes an envelope; there is no pass-through.
//! Invariants: `message` strings are preserved verbatim.
//! Notes: Unknown discriminants land in `Other` and become `ErrorKind::Generic`.
use serde_json::{Map, Value};

use crate::core::error::{Error, ErrorKind};
use crate::core::verify::VerifyContext;

pub const DISCRIMINANT_KEY: &str = "err_type";

pub const KNOWN_DISCRIMINANTS: [(&str, ErrorKind); 7] = [
    ("APIError", ErrorKind::Api),
    ("MalformedSccCredentialsFile", ErrorKind::MalformedCredentialsFile),
    ("MissingCredentialsFile", ErrorKind::MissingCredentialsFile),
    ("SSLError", ErrorKind::TlsVerification),
    ("JSONError", ErrorKind::PayloadParse),
    ("NetError", ErrorKind::Network),
    ("Timeout", ErrorKind::Timeout),
];

#[derive(Clone, Debug, PartialEq)]
pub enum ErrorEnvelope {
    Api {
        code: Option<i64>,
        message: Option<String>,
        body: Option<Value>,
    },
    MalformedCredentialsFile {
        message: Option<String>,
    },
    MissingCredentialsFile {
        message: Option<String>,
    },
    /// `code` and `data` are kept as received; they are handed to the verify callback.
    Ssl {
        code: Option<Value>,
        message: Option<String>,
        data: Option<Value>,
    },
    PayloadParse {
        message: Option<String>,
    },
    Network {
        message: Option<String>,
    },
    Timeout {
        message: Option<String>,
    },
    Other {
        err_type: String,
        message: Option<String>,
        /// The whole envelope as JSON text.
        raw: String,
    },
}

impl ErrorEnvelope {
    /// Returns `None` when `object` carries no discriminant and is a success payload.
    pub fn from_object(object: &Map<String, Value>) -> Option<Self> {
        let discriminant = object.get(DISCRIMINANT_KEY)?;
        let message = text_field(object, "message");
        let envelope = match discriminant.as_str() {
            Some("APIError") => ErrorEnvelope::Api {
                code: code_field(object),
                message,
                body: raw_field(object, "body"),
            },
            Some("MalformedSccCredentialsFile") => {
                ErrorEnvelope::MalformedCredentialsFile { message }
            }
            Some("MissingCredentialsFile") => ErrorEnvelope::MissingCredentialsFile { message },
            Some("SSLError") => ErrorEnvelope::Ssl {
                code: raw_field(object, "code"),
                message,
                data: raw_field(object, "data"),
            },
            Some("JSONError") => ErrorEnvelope::PayloadParse { message },
            Some("NetError") => ErrorEnvelope::Network { message },
            Some("Timeout") => ErrorEnvelope::Timeout { message },
            _ => ErrorEnvelope::Other {
                err_type: match discriminant {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                },
                message,
                raw: Value::Object(object.clone()).to_string(),
            },
        };
        Some(envelope)
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ErrorEnvelope::Api { .. } => ErrorKind::Api,
            ErrorEnvelope::MalformedCredentialsFile { .. } => ErrorKind::MalformedCredentialsFile,
            ErrorEnvelope::MissingCredentialsFile { .. } => ErrorKind::MissingCredentialsFile,
            ErrorEnvelope::Ssl { .. } => ErrorKind::TlsVerification,
            ErrorEnvelope::PayloadParse { .. } => ErrorKind::PayloadParse,
            ErrorEnvelope::Network { .. } => ErrorKind::Network,
            ErrorEnvelope::Timeout { .. } => ErrorKind::Timeout,
            ErrorEnvelope::Other { .. } => ErrorKind::Generic,
        }
    }

    /// Context handed to the verification callback; only SSL envelopes have one.
    pub fn verify_context(&self) -> Option<VerifyContext> {
        match self {
            ErrorEnvelope::Ssl {
                code,
                message,
                data,
            } => Some(VerifyContext {
                error: code.clone(),
                error_string: message.clone(),
                current_cert: data.clone(),
            }),
            _ => None,
        }
    }

    pub fn into_error(self) -> Error {
        let kind = self.kind();
        match self {
            ErrorEnvelope::Api {
                code,
                message,
                body,
            } => {
                let message = message
                    .or_else(|| body.as_ref().and_then(api_body_message))
                    .unwrap_or_else(|| kind.default_message().to_string());
                let mut err = Error::new(kind).with_message(message);
                if let Some(code) = code {
                    err = err.with_code(code);
                }
                if let Some(body) = body {
                    err = err.with_body(body);
                }
                err
            }
            ErrorEnvelope::Ssl { code, message, .. } => {
                let err = Error::new(kind).with_message(or_default(message, kind));
                match code.as_ref().and_then(integer_code) {
                    Some(code) => err.with_code(code),
                    None => err,
                }
            }
            ErrorEnvelope::MalformedCredentialsFile { message }
            | ErrorEnvelope::MissingCredentialsFile { message }
            | ErrorEnvelope::PayloadParse { message }
            | ErrorEnvelope::Network { message }
            | ErrorEnvelope::Timeout { message } => {
                Error::new(kind).with_message(or_default(message, kind))
            }
            ErrorEnvelope::Other {
                err_type,
                message,
                raw,
            } => Error::new(kind)
                .with_message(message.unwrap_or(raw))
                .with_hint(format!("unrecognized err_type: {err_type}")),
        }
    }
}

fn or_default(message: Option<String>, kind: ErrorKind) -> String {
    message.unwrap_or_else(|| kind.default_message().to_string())
}

fn text_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    match object.get(key)? {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

fn raw_field(object: &Map<String, Value>, key: &str) -> Option<Value> {
    object.get(key).filter(|value| !value.is_null()).cloned()
}

fn code_field(object: &Map<String, Value>) -> Option<i64> {
    integer_code(object.get("code")?)
}

fn integer_code(code: &Value) -> Option<i64> {
    match code {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

// SCC responses put the human-readable text under `localized_error`, falling back to `error`.
fn api_body_message(body: &Value) -> Option<String> {
    ["localized_error", "error"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}
