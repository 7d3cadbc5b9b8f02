//! Off-chain helpers for LSP6 key managers: controller setup payloads and signed LSP25 relay
//! calls.

pub mod encoder;
pub mod types;

mod tests;

pub use encoder::{
    encode_controller_setup, encode_relay_call, encode_set_data_batch, relay_call_digest,
    sign_relay_call, signer_address,
};
pub use types::{ControllerSetup, DataEntries, RelayCallEnvelope};
