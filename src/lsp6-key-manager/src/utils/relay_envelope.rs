//! LSP25 relay-call message and digest.
//!
//! The signer authorises one payload for one key manager on one chain:
//!
//! ```text
//! message = abi.encodePacked(uint256 25, uint256 chainId, uint256 nonce,
//!                            uint256 validityTimestamps, uint256 msgValue, bytes payload)
//! digest  = keccak256(0x19 ++ 0x00 ++ keyManager ++ message)
//! ```
//!
//! The digest follows EIP-191 version 0 ("data with intended validator"), so a signature for
//! one key manager cannot be replayed against another.

use alloy_primitives::{keccak256, Address, B256, U256};

pub const LSP25_VERSION: u64 = 25;

/// The packed message covered by a relay signature.
pub fn relay_call_message(
    chain_id: u64,
    nonce: U256,
    validity_timestamps: U256,
    msg_value: U256,
    payload: &[u8],
) -> Vec<u8> {
    let mut buf = Vec::with_capacity(32 * 5 + payload.len());
    buf.extend_from_slice(&U256::from(LSP25_VERSION).to_be_bytes::<32>());
    buf.extend_from_slice(&U256::from(chain_id).to_be_bytes::<32>());
    buf.extend_from_slice(&nonce.to_be_bytes::<32>());
    buf.extend_from_slice(&validity_timestamps.to_be_bytes::<32>());
    buf.extend_from_slice(&msg_value.to_be_bytes::<32>());
    buf.extend_from_slice(payload);
    buf
}

/// EIP-191 v0 digest of the relay message with `key_manager` as intended validator.
pub fn relay_call_digest(
    key_manager: Address,
    chain_id: u64,
    nonce: U256,
    validity_timestamps: U256,
    msg_value: U256,
    payload: &[u8],
) -> B256 {
    let message = relay_call_message(chain_id, nonce, validity_timestamps, msg_value, payload);
    let mut buf = Vec::with_capacity(2 + 20 + message.len());
    buf.extend_from_slice(&[0x19, 0x00]);
    buf.extend_from_slice(key_manager.as_slice());
    buf.extend_from_slice(&message);
    keccak256(buf)
}
