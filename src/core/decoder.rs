//! Purpose: Decode foreign result handles into success payloads or typed errors.
//! Exports: `ResultDecoder`.
//! Role: Entry point used by bindings around every libsuseconnect call.
//! Invariants: The foreign buffer is released exactly once per decode, before parsing.
//! Invariants: Every error envelope yields exactly one `Error`; none is returned as a value.
//! Invariants: SSL envelopes notify the registered callback once, with `accepted = false`.
//! Notes: The callback lives in the decoder instance, not in process-global state.
#![allow(clippy::result_large_err)]
use std::fmt;
use std::os::raw::c_char;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::core::envelope::ErrorEnvelope;
use crate::core::error::{Error, ErrorKind};
use crate::core::foreign::{ForeignRuntime, release_and_read};
use crate::core::verify::{VerifyCallback, VerifyContext};
use crate::json::parse;

pub struct ResultDecoder<R> {
    runtime: R,
    verify_callback: Option<Arc<dyn VerifyCallback>>,
}

impl<R: ForeignRuntime> ResultDecoder<R> {
    pub fn new(runtime: R) -> Self {
        Self {
            runtime,
            verify_callback: None,
        }
    }

    pub fn with_verify_callback(mut self, callback: impl VerifyCallback + 'static) -> Self {
        self.set_verify_callback(callback);
        self
    }

    /// Replaces the callback slot; the previous callback, if any, is dropped.
    pub fn set_verify_callback(&mut self, callback: impl VerifyCallback + 'static) {
        self.verify_callback = Some(Arc::new(callback));
    }

    pub fn set_shared_verify_callback(&mut self, callback: Arc<dyn VerifyCallback>) {
        self.verify_callback = Some(callback);
    }

    pub fn has_verify_callback(&self) -> bool {
        self.verify_callback.is_some()
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    /// Consumes `handle` and returns the parsed payload, or the error it describes.
    ///
    /// # Safety
    /// `handle` must be a live, NUL-terminated result string allocated by this decoder's
    /// runtime. It is freed before this returns and must not be used again.
    ///
    /// # Panics
    /// Panics if `handle` is null.
    pub unsafe fn decode(&self, handle: *mut c_char) -> Result<Value, Error> {
        let text = unsafe { release_and_read(&self.runtime, handle) }?;
        self.decode_text(&text)
    }

    /// Like [`ResultDecoder::decode`], then deserializes the payload into `T`.
    ///
    /// # Safety
    /// Same contract as [`ResultDecoder::decode`].
    pub unsafe fn decode_as<T: DeserializeOwned>(&self, handle: *mut c_char) -> Result<T, Error> {
        let value = unsafe { self.decode(handle) }?;
        serde_json::from_value(value).map_err(|err| {
            Error::new(ErrorKind::Decode)
                .with_message("result payload has an unexpected shape")
                .with_hint(parse::hint_for_error(&err, "decode_as"))
                .with_source(err)
        })
    }

    /// Classifies result text that has already been copied out of foreign memory.
    pub fn decode_text(&self, text: &str) -> Result<Value, Error> {
        let value: Value = parse::from_str(text).map_err(|err| {
            Error::new(ErrorKind::Decode)
                .with_message("result is not valid json")
                .with_hint(parse::hint_for_error(&err, "foreign result"))
                .with_source(err)
        })?;

        let Some(envelope) = value.as_object().and_then(ErrorEnvelope::from_object) else {
            return Ok(value);
        };

        tracing::debug!(kind = ?envelope.kind(), "foreign call returned an error envelope");
        if let Some(context) = envelope.verify_context() {
            self.notify_verify_failure(&context);
        }
        Err(envelope.into_error())
    }

    fn notify_verify_failure(&self, context: &VerifyContext) {
        let Some(callback) = &self.verify_callback else {
            return;
        };
        tracing::debug!(
            error = ?context.error,
            has_cert = context.current_cert.is_some(),
            "notifying verify callback"
        );
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| callback.notify(false, context)));
        if outcome.is_err() {
            tracing::warn!("verify callback panicked; continuing with tls verification error");
        }
    }
}

impl<R: fmt::Debug> fmt::Debug for ResultDecoder<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultDecoder")
            .field("runtime", &self.runtime)
            .field("verify_callback", &self.verify_callback.is_some())
            .finish()
    }
}
