// Core modules implementing foreign buffer ownership, envelope classification, and errors.
pub mod decoder;
pub mod envelope;
pub mod error;
pub mod foreign;
pub mod verify;
