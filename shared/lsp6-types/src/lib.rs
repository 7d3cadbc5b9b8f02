//! Shared types for the LSP6 key manager.
//!
//! Everything in here is pure data + encoding: the permission bit table, the ERC725Y data-key
//! scheme used to store controller records, the CompactBytesArray codec and the allow-list
//! records built on top of it. The engine (`lsp6-key-manager`) and the off-chain tooling both
//! depend on this crate so that encoders and verifiers can never drift apart.

pub mod allowed;
pub mod compact;
pub mod interfaces;
pub mod keys;
pub mod permissions;
pub mod store;

pub use allowed::{AllowedCall, CallTypes};
pub use compact::{CodecError, CompactBytes};
pub use keys::DataKeyKind;
pub use permissions::{Permission, Permissions};
pub use store::{Erc725YStore, MemoryStore};
