//! Purpose: Link the native libsuseconnect when the `libsuseconnect` feature is enabled.
//! Role: Cargo build-script; emits link directives and rebuild triggers only.
//! Invariants: Without the feature, nothing is linked and the crate builds standalone.
//! Invariants: Uses only Cargo-provided env vars plus `SUSECONNECT_LIB_DIR`.
use std::env;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-env-changed=SUSECONNECT_LIB_DIR");

    if env::var_os("CARGO_FEATURE_LIBSUSECONNECT").is_none() {
        return;
    }

    if let Some(dir) = env::var_os("SUSECONNECT_LIB_DIR") {
        let dir = PathBuf::from(dir);
        println!("cargo:rustc-link-search=native={}", dir.display());
    }
    println!("cargo:rustc-link-lib=dylib=suseconnect");
}
