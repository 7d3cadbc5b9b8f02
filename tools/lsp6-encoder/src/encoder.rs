use alloy_primitives::{Address, FixedBytes, U256};
use alloy_sol_types::SolCall;
use k256::ecdsa::SigningKey;
use lsp6_types::{
    allowed::{encode_allowed_calls, encode_allowed_data_keys},
    interfaces::{ILSP6KeyManager, IERC725Y},
    keys::{
        allowed_calls_key, allowed_data_keys_key, permissions_array_index_key, permissions_key,
        ADDRESS_PERMISSIONS_ARRAY,
    },
    CodecError,
};
use sha3::{Digest, Keccak256};

use crate::types::{ControllerSetup, DataEntries, RelayCallEnvelope};

/// LSP25 version word at the head of every relay message.
pub const LSP25_VERSION: u64 = 25;

/// Data keys and values that register `setup` on an account whose `AddressPermissions[]`
/// currently holds `current_length` entries.
///
/// The array length is only written when the controller's slot lies past the current end.
pub fn encode_controller_setup(
    setup: &ControllerSetup,
    current_length: u128,
) -> Result<DataEntries, CodecError> {
    let mut entries = DataEntries::default();

    if setup.index >= current_length {
        let length = setup.index.saturating_add(1);
        entries.push(ADDRESS_PERMISSIONS_ARRAY, length.to_be_bytes().to_vec());
    }
    entries.push(
        permissions_array_index_key(setup.index),
        setup.controller.to_vec(),
    );
    entries.push(
        permissions_key(setup.controller),
        setup.permissions.to_word().to_vec(),
    );
    if !setup.allowed_calls.is_empty() {
        entries.push(
            allowed_calls_key(setup.controller),
            encode_allowed_calls(&setup.allowed_calls),
        );
    }
    if !setup.allowed_data_keys.is_empty() {
        entries.push(
            allowed_data_keys_key(setup.controller),
            encode_allowed_data_keys(&setup.allowed_data_keys)?,
        );
    }
    Ok(entries)
}

/// ABI-encode `setDataBatch(keys, values)` for the account.
pub fn encode_set_data_batch(entries: &DataEntries) -> Vec<u8> {
    IERC725Y::setDataBatchCall {
        dataKeys: entries.data_keys.clone(),
        dataValues: entries.data_values.clone(),
    }
    .abi_encode()
}

fn keccak256_bytes(bytes: &[u8]) -> FixedBytes<32> {
    let mut h = Keccak256::new();
    h.update(bytes);
    let out = h.finalize();
    let mut b = [0u8; 32];
    b.copy_from_slice(out.as_slice());
    FixedBytes(b)
}

/// EIP-191 v0 digest of the relay call (must match the key manager's recovery digest).
pub fn relay_call_digest(envelope: &RelayCallEnvelope) -> FixedBytes<32> {
    let mut buf = Vec::with_capacity(2 + 20 + 32 * 5 + envelope.payload.len());
    buf.extend_from_slice(b"\x19\x00");
    buf.extend_from_slice(envelope.key_manager.as_slice());
    buf.extend_from_slice(&U256::from(LSP25_VERSION).to_be_bytes::<32>());
    buf.extend_from_slice(&U256::from(envelope.chain_id).to_be_bytes::<32>());
    buf.extend_from_slice(&envelope.nonce.to_be_bytes::<32>());
    buf.extend_from_slice(&envelope.validity_timestamps.to_be_bytes::<32>());
    buf.extend_from_slice(&envelope.msg_value.to_be_bytes::<32>());
    buf.extend_from_slice(&envelope.payload);
    keccak256_bytes(&buf)
}

/// Sign the relay digest and write the 65-byte signature into `envelope.signature`.
pub fn sign_relay_call(
    envelope: &mut RelayCallEnvelope,
    signing_key: &SigningKey,
) -> Result<(), k256::ecdsa::Error> {
    let digest = relay_call_digest(envelope);
    let (signature, recovery_id) = signing_key.sign_prehash_recoverable(digest.as_slice())?;

    let mut sig_bytes = Vec::with_capacity(65);
    sig_bytes.extend_from_slice(&signature.to_bytes());
    sig_bytes.push(27 + recovery_id.to_byte());
    envelope.signature = sig_bytes;
    Ok(())
}

/// ABI-encode `executeRelayCall(signature, nonce, validityTimestamps, payload)` for a relayer.
pub fn encode_relay_call(envelope: &RelayCallEnvelope) -> Vec<u8> {
    ILSP6KeyManager::executeRelayCallCall {
        signature: envelope.signature.clone().into(),
        nonce: envelope.nonce,
        validityTimestamps: envelope.validity_timestamps,
        payload: envelope.payload.clone().into(),
    }
    .abi_encode()
}

/// Address controlled by `signing_key`.
pub fn signer_address(signing_key: &SigningKey) -> Address {
    let point = signing_key.verifying_key().to_encoded_point(false);
    let hash = keccak256_bytes(&point.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}
