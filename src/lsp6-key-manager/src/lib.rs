//! LSP6 Key Manager permission-verification engine.
//!
//! The key manager sits in front of an ERC725 account and decides, for every payload it is asked
//! to forward, whether the caller (or the signer of a relayed call) holds the permissions the
//! payload requires. Permissions and allow-lists live in the account's own ERC725Y storage; see
//! [`lsp6_types::keys`] for the key scheme.
//!
//! Layout:
//! - [`decoder`] parses ABI payloads into [`decoder::AccountCall`]s.
//! - [`classifier`] turns calls into [`classifier::Intent`]s and resolves what each one requires.
//! - [`authorizer`] checks requirements against the caller's bits and allow-lists.
//! - [`relay`] holds the LSP25 multi-channel nonces and validity-window checks.
//! - [`reentrancy`] is the per-account reentrancy marker.
//! - [`key_manager`] wires it all together behind the public entry points.
//! - [`account`] is the execution substrate the key manager forwards to.

pub mod account;
pub mod authorizer;
pub mod classifier;
pub mod config;
pub mod decoder;
pub mod errors;
pub mod key_manager;
pub mod registry;
pub mod reentrancy;
pub mod relay;
pub mod utils;

#[cfg(test)]
mod tests;

pub use account::{Account, AccountError, KeyManagerHost, MemoryAccount, OperationType};
pub use config::{ConfigError, KeyManagerConfig};
pub use errors::KeyManagerError;
pub use key_manager::KeyManager;
pub use registry::Registry;
