//! Purpose: Notification hook for TLS certificate verification failures.
//! Exports: `VerifyContext`, `VerifyCallback`.
//! Role: Lets an embedder (e.g. an installer UI) inspect the rejected certificate.
//! Invariants: Callbacks are notifications only; their return value never changes the outcome.
//! Invariants: The foreign runtime has already rejected the certificate, so `accepted` is false.
//! Invariants: Context fields carry the envelope's `code`/`message`/`data` values as received.
use serde::Serialize;
use serde_json::Value;

/// What the foreign runtime reported about a failed certificate check.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct VerifyContext {
    pub error: Option<Value>,
    pub error_string: Option<String>,
    /// Offending certificate as sent by the runtime, usually PEM text.
    pub current_cert: Option<Value>,
}

impl VerifyContext {
    /// Integer view of `error`, when the runtime sent one.
    pub fn error_code(&self) -> Option<i64> {
        self.error.as_ref().and_then(Value::as_i64)
    }

    /// Certificate text, when the runtime sent it as a string.
    pub fn cert_text(&self) -> Option<&str> {
        self.current_cert.as_ref().and_then(Value::as_str)
    }
}

pub trait VerifyCallback: Send + Sync {
    fn notify(&self, accepted: bool, context: &VerifyContext);
}

impl<F, T> VerifyCallback for F
where
    F: Fn(bool, &VerifyContext) -> T + Send + Sync,
{
    fn notify(&self, accepted: bool, context: &VerifyContext) {
        let _ = self(accepted, context);
    }
}

#[cfg(test)]
mod tests {
    use super::{VerifyCallback, VerifyContext};
    use serde_json::json;
    use std::sync::Mutex;

    #[test]
    fn closures_with_any_return_type_are_callbacks() {
        let seen = Mutex::new(Vec::new());
        let returns_bool = |accepted: bool, ctx: &VerifyContext| {
            seen.lock().unwrap().push((accepted, ctx.error_code()));
            true
        };
        returns_bool.notify(
            false,
            &VerifyContext {
                error: Some(json!(19)),
                ..VerifyContext::default()
            },
        );
        assert_eq!(*seen.lock().unwrap(), vec![(false, Some(19))]);
    }

    #[test]
    fn context_serializes_with_stable_field_names() {
        let ctx = VerifyContext {
            error: Some(json!(526)),
            error_string: Some("cert invalid".to_string()),
            current_cert: Some(json!("<cert-bytes>")),
        };
        assert_eq!(ctx.cert_text(), Some("<cert-bytes>"));
        let value = serde_json::to_value(&ctx).expect("json");
        assert_eq!(
            value,
            json!({
                "error": 526,
                "error_string": "cert invalid",
                "current_cert": "<cert-bytes>"
            })
        );
    }

    #[test]
    fn absent_fields_serialize_as_null() {
        let value = serde_json::to_value(VerifyContext::default()).expect("json");
        assert_eq!(
            value,
            json!({"error": null, "error_string": null, "current_cert": null})
        );
    }
}
