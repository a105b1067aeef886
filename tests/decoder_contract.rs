//! Purpose: Contract coverage for decoding foreign result handles through the public API.
//! Exports: Integration tests only.
//! Role: Verify classification, buffer release counts, and verify-callback dispatch.
//! Invariants: Every test checks the buffer was freed exactly once, whatever the outcome.
//! Notes: Buffers come from a malloc runtime wrapped with a release counter.
use std::os::raw::c_char;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use connect_shim::{
    ErrorKind, ForeignRuntime, KNOWN_DISCRIMINANTS, MallocRuntime, ResultDecoder, VerifyContext,
};
use serde_json::json;

// Counts release calls, not addresses: malloc reuses freed addresses.
#[derive(Default)]
struct CountingRuntime {
    inner: MallocRuntime,
    frees: AtomicUsize,
}

impl CountingRuntime {
    fn alloc(&self, text: &str) -> *mut c_char {
        self.inner.alloc_string(text).expect("alloc")
    }

    fn frees(&self) -> usize {
        self.frees.load(Ordering::SeqCst)
    }
}

impl ForeignRuntime for CountingRuntime {
    unsafe fn free_string(&self, ptr: *mut c_char) {
        self.frees.fetch_add(1, Ordering::SeqCst);
        unsafe { self.inner.free_string(ptr) };
    }
}

fn decoder() -> ResultDecoder<CountingRuntime> {
    ResultDecoder::new(CountingRuntime::default())
}

#[test]
fn scenario_success_mapping_is_returned() {
    let decoder = decoder();
    let ptr = decoder.runtime().alloc(r#"{"name":"x"}"#);
    let value = unsafe { decoder.decode(ptr) }.expect("success");
    assert_eq!(value, json!({"name": "x"}));
    assert_eq!(decoder.runtime().frees(), 1);
}

#[test]
fn nested_success_payload_is_untouched() {
    let decoder = decoder();
    let payload = json!({
        "products": [{"identifier": "SLES", "version": "15.5", "arch": "x86_64"}],
        "registered": true,
        "count": 3,
        "extra": null
    });
    let ptr = decoder.runtime().alloc(&payload.to_string());
    assert_eq!(unsafe { decoder.decode(ptr) }.expect("success"), payload);
    assert_eq!(decoder.runtime().frees(), 1);
}

#[test]
fn every_known_discriminant_preserves_message() {
    let decoder = decoder();
    for (err_type, kind) in KNOWN_DISCRIMINANTS {
        let text = json!({"err_type": err_type, "message": format!("failed: {err_type} ü")});
        let before = decoder.runtime().frees();
        let ptr = decoder.runtime().alloc(&text.to_string());
        let err = unsafe { decoder.decode(ptr) }.expect_err(err_type);
        assert_eq!(err.kind(), kind, "{err_type}");
        assert_eq!(err.message(), Some(format!("failed: {err_type} ü").as_str()));
        assert_eq!(decoder.runtime().frees() - before, 1, "{err_type}");
    }
}

#[test]
fn scenario_timeout() {
    let decoder = decoder();
    let ptr = decoder
        .runtime()
        .alloc(r#"{"err_type":"Timeout","message":"deadline exceeded"}"#);
    let err = unsafe { decoder.decode(ptr) }.expect_err("timeout");
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert_eq!(err.message(), Some("deadline exceeded"));
    assert_eq!(err.to_string(), "Timeout: deadline exceeded");
}

#[test]
fn scenario_ssl_error_notifies_registered_callback() {
    let calls: Arc<Mutex<Vec<(bool, VerifyContext)>>> = Arc::default();
    let sink = Arc::clone(&calls);
    let decoder = decoder().with_verify_callback(move |accepted: bool, ctx: &VerifyContext| {
        sink.lock().unwrap().push((accepted, ctx.clone()));
        "ignored return value"
    });

    let ptr = decoder.runtime().alloc(
        r#"{"err_type":"SSLError","message":"cert invalid","code":526,"data":"<cert-bytes>"}"#,
    );
    let err = unsafe { decoder.decode(ptr) }.expect_err("ssl");
    assert_eq!(err.kind(), ErrorKind::TlsVerification);
    assert_eq!(err.message(), Some("cert invalid"));
    assert_eq!(decoder.runtime().frees(), 1);

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert!(!calls[0].0);
    assert_eq!(
        serde_json::to_value(&calls[0].1).unwrap(),
        json!({"error": 526, "error_string": "cert invalid", "current_cert": "<cert-bytes>"})
    );
}

#[test]
fn ssl_error_without_callback_is_still_classified() {
    let decoder = decoder();
    assert!(!decoder.has_verify_callback());
    let ptr = decoder
        .runtime()
        .alloc(r#"{"err_type":"SSLError","message":"unknown ca"}"#);
    let err = unsafe { decoder.decode(ptr) }.expect_err("ssl");
    assert_eq!(err.kind(), ErrorKind::TlsVerification);
    assert_eq!(err.message(), Some("unknown ca"));
}

#[test]
fn ssl_context_carries_envelope_values_unchanged() {
    let contexts: Arc<Mutex<Vec<VerifyContext>>> = Arc::default();
    let sink = Arc::clone(&contexts);
    let decoder = decoder().with_verify_callback(move |_: bool, ctx: &VerifyContext| {
        sink.lock().unwrap().push(ctx.clone());
    });

    let ptr = decoder
        .runtime()
        .alloc(r#"{"err_type":"SSLError","code":5.0,"data":{"pem":"x"}}"#);
    let err = unsafe { decoder.decode(ptr) }.expect_err("ssl");
    assert_eq!(err.kind(), ErrorKind::TlsVerification);
    assert_eq!(err.message(), Some("certificate verification failed"));

    let contexts = contexts.lock().unwrap();
    assert_eq!(contexts.len(), 1);
    assert_eq!(
        serde_json::to_value(&contexts[0]).unwrap(),
        json!({"error": 5.0, "error_string": null, "current_cert": {"pem": "x"}})
    );
}

#[test]
fn success_payload_keeps_key_order() {
    let decoder = decoder();
    let text = r#"{"zeta":1,"alpha":{"y":2,"b":3}}"#;
    let ptr = decoder.runtime().alloc(text);
    let value = unsafe { decoder.decode(ptr) }.expect("success");
    assert_eq!(value.to_string(), text);
}

#[test]
fn scenario_truncated_text_is_decode_error() {
    let decoder = decoder();
    let ptr = decoder.runtime().alloc(r#"{"err_type":"Timeout","mess"#);
    let err = unsafe { decoder.decode(ptr) }.expect_err("decode");
    assert_eq!(err.kind(), ErrorKind::Decode);
    assert!(std::error::Error::source(&err).is_some());
    assert_eq!(decoder.runtime().frees(), 1);
}

#[test]
fn unknown_discriminant_with_message_is_generic() {
    let decoder = decoder();
    let ptr = decoder
        .runtime()
        .alloc(r#"{"err_type":"ZypperError","message":"zypper exited with 8"}"#);
    let err = unsafe { decoder.decode(ptr) }.expect_err("generic");
    assert_eq!(err.kind(), ErrorKind::Generic);
    assert_eq!(err.message(), Some("zypper exited with 8"));
}

#[test]
fn unknown_discriminant_without_message_uses_envelope_text() {
    let decoder = decoder();
    let envelope = r#"{"err_type":"ZypperError","zeta":1,"exit":8,"alpha":[2]}"#;
    let ptr = decoder.runtime().alloc(envelope);
    let err = unsafe { decoder.decode(ptr) }.expect_err("generic");
    assert_eq!(err.kind(), ErrorKind::Generic);
    assert_eq!(err.message(), Some(envelope));
}

#[test]
fn api_error_carries_code_and_body() {
    let decoder = decoder();
    let ptr = decoder.runtime().alloc(
        r#"{"err_type":"APIError","code":422,"message":"No product found","body":{"type":"error"}}"#,
    );
    let err = unsafe { decoder.decode(ptr) }.expect_err("api");
    assert_eq!(err.kind(), ErrorKind::Api);
    assert_eq!(err.code(), Some(422));
    assert_eq!(err.message(), Some("No product found"));
    assert_eq!(err.body(), Some(&json!({"type": "error"})));
}

#[test]
fn decoder_is_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ResultDecoder<MallocRuntime>>();
}
