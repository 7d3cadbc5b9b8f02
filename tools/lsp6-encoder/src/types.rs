use alloy_primitives::{Address, Bytes, B256, U256};
use lsp6_types::{AllowedCall, Permissions};

/// Everything stored for one controller of an account.
#[derive(Clone, Debug)]
pub struct ControllerSetup {
    pub controller: Address,
    pub permissions: Permissions,
    /// Empty means no `AllowedCalls` record is written.
    pub allowed_calls: Vec<AllowedCall>,
    /// Data-key prefixes (1 to 32 bytes each). Empty means no record is written.
    pub allowed_data_keys: Vec<Vec<u8>>,
    /// Slot in `AddressPermissions[]`.
    pub index: u128,
}

/// Parallel key/value lists, ready for `setDataBatch`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DataEntries {
    pub data_keys: Vec<B256>,
    pub data_values: Vec<Bytes>,
}

impl DataEntries {
    pub fn push(&mut self, key: B256, value: impl Into<Bytes>) {
        self.data_keys.push(key);
        self.data_values.push(value.into());
    }

    pub fn len(&self) -> usize {
        self.data_keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data_keys.is_empty()
    }
}

/// LSP25 relay call as signed off-chain and submitted by a relayer.
#[derive(Clone, Debug)]
pub struct RelayCallEnvelope {
    /// Key manager the signature is bound to (EIP-191 intended validator).
    pub key_manager: Address,
    pub chain_id: u64,
    /// `channel << 128 | sequence`
    pub nonce: U256,
    /// `start << 128 | end`; zero for no window.
    pub validity_timestamps: U256,
    /// Value the relayer must forward with the call.
    pub msg_value: U256,
    /// Account payload (`setData`, `execute`, ...).
    pub payload: Vec<u8>,

    /// r||s||v, filled in by `sign_relay_call`.
    pub signature: Vec<u8>,
}
