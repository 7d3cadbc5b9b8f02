//! Shared utilities for the key manager.
//!
//! Small and deterministic: word packing, signature recovery and the LSP25 relay message.

pub mod bytes;
pub mod crypto;
pub mod relay_envelope;
