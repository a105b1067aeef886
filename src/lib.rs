//! Purpose: Decode results returned across the libsuseconnect C ABI.
//! Exports: `core` (foreign buffers, envelopes, decoder, errors) plus top-level re-exports.
//! Role: Library backing host bindings and the `connect-shim` diagnostic binary.
//! Invariants: Every foreign result buffer is freed exactly once by the decoder.
//! Invariants: Core modules prefer explicit inputs/outputs over hidden state.
pub mod core;
mod json;

pub use crate::core::decoder::ResultDecoder;
pub use crate::core::envelope::{ErrorEnvelope, KNOWN_DISCRIMINANTS};
pub use crate::core::error::{Error, ErrorKind, to_exit_code};
#[cfg(feature = "libsuseconnect")]
pub use crate::core::foreign::SuseConnectRuntime;
pub use crate::core::foreign::{ForeignRuntime, ForeignString, MallocRuntime, release_and_read};
pub use crate::core::verify::{VerifyCallback, VerifyContext};
