//! End-to-end scenarios against an in-memory account.

mod reentrancy;

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::SolCall;
use k256::ecdsa::SigningKey;
use lsp6_types::{
    interfaces::{IERC725X, IERC725Y},
    AllowedCall, Permissions,
};

use crate::{
    account::{MemoryAccount, OperationType},
    config::KeyManagerConfig,
    key_manager::KeyManager,
    registry::Registry,
    utils::{crypto::public_key_to_address, relay_envelope::relay_call_digest},
};

pub(crate) const KEY_MANAGER: Address = Address::new([0x4b; 20]);
pub(crate) const ACCOUNT: Address = Address::new([0xac; 20]);
pub(crate) const OWNER: Address = Address::new([0x0e; 20]);
pub(crate) const CHAIN_ID: u64 = 4201;
pub(crate) const NOW: u64 = 1_700_000_000;

pub(crate) fn key_manager() -> KeyManager<MemoryAccount> {
    let account = MemoryAccount::new(ACCOUNT, KEY_MANAGER);
    account.set_block_timestamp(NOW);
    KeyManager::new(KeyManagerConfig::new(KEY_MANAGER, CHAIN_ID), account)
}

pub(crate) fn grant(km: &KeyManager<MemoryAccount>, controller: Address, permissions: Permissions) {
    Registry::new(km.account()).set_permissions(controller, permissions);
}

pub(crate) fn allow_calls(
    km: &KeyManager<MemoryAccount>,
    controller: Address,
    calls: &[AllowedCall],
) {
    Registry::new(km.account()).set_allowed_calls(controller, calls);
}

pub(crate) fn allow_data_keys(
    km: &KeyManager<MemoryAccount>,
    controller: Address,
    patterns: &[&[u8]],
) {
    Registry::new(km.account())
        .set_allowed_data_keys(controller, patterns)
        .unwrap();
}

pub(crate) fn set_data(key: B256, value: impl Into<Bytes>) -> Vec<u8> {
    IERC725Y::setDataCall {
        dataKey: key,
        dataValue: value.into(),
    }
    .abi_encode()
}

pub(crate) fn set_data_batch(entries: &[(B256, Bytes)]) -> Vec<u8> {
    IERC725Y::setDataBatchCall {
        dataKeys: entries.iter().map(|(k, _)| *k).collect(),
        dataValues: entries.iter().map(|(_, v)| v.clone()).collect(),
    }
    .abi_encode()
}

pub(crate) fn execute(
    operation: OperationType,
    target: Address,
    value: u64,
    data: impl Into<Bytes>,
) -> Vec<u8> {
    IERC725X::executeCall {
        operationType: operation.to_u256(),
        target,
        value: U256::from(value),
        data: data.into(),
    }
    .abi_encode()
}

pub(crate) fn execute_batch(calls: &[(OperationType, Address, u64, Bytes)]) -> Vec<u8> {
    IERC725X::executeBatchCall {
        operationsType: calls.iter().map(|c| c.0.to_u256()).collect(),
        targets: calls.iter().map(|c| c.1).collect(),
        values: calls.iter().map(|c| U256::from(c.2)).collect(),
        datas: calls.iter().map(|c| c.3.clone()).collect(),
    }
    .abi_encode()
}

/// A relay signer with a deterministic key.
pub(crate) struct Signer {
    key: SigningKey,
}

impl Signer {
    pub(crate) fn new(seed: u8) -> Self {
        Self {
            key: SigningKey::from_slice(&[seed; 32]).unwrap(),
        }
    }

    pub(crate) fn address(&self) -> Address {
        public_key_to_address(self.key.verifying_key())
    }

    pub(crate) fn sign_digest(&self, digest: B256) -> Vec<u8> {
        let (signature, recovery_id) = self.key.sign_prehash_recoverable(digest.as_slice()).unwrap();
        let mut out = signature.to_bytes().to_vec();
        out.push(recovery_id.to_byte() + 27);
        out
    }

    pub(crate) fn sign_relay(
        &self,
        nonce: U256,
        validity_timestamps: U256,
        msg_value: U256,
        payload: &[u8],
    ) -> Vec<u8> {
        self.sign_digest(relay_call_digest(
            KEY_MANAGER,
            CHAIN_ID,
            nonce,
            validity_timestamps,
            msg_value,
            payload,
        ))
    }
}
