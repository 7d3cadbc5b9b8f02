//! The key manager: public entry points over one account.
//!
//! Every entry point runs inside a frame. If it fails, every storage write, ownership change,
//! outgoing call and nonce increment made inside the frame is rolled back, as a reverted
//! transaction would be.

use core::cell::RefCell;

use alloy_primitives::{Address, Bytes, FixedBytes, B256, U256};
use lsp6_types::{
    interfaces::{
        ERC1271_FAILURE_VALUE, ERC1271_MAGIC_VALUE, INTERFACE_ID_ERC1271, INTERFACE_ID_ERC165,
        INTERFACE_ID_LSP25, INTERFACE_ID_LSP6,
    },
    Permission,
};
use tracing::{debug, info};

use crate::{
    account::{Account, AccountError, KeyManagerHost},
    authorizer::{require_permission, Authorizer},
    config::KeyManagerConfig,
    decoder::{decode_account_call, is_set_data_payload},
    errors::KeyManagerError,
    reentrancy::ReentrancyGuard,
    registry::Registry,
    relay::{verify_relay_call, NonceStore, RelayCall},
    utils::crypto::recover_signer,
};

/// LSP6 key manager controlling `account`.
#[derive(Debug)]
pub struct KeyManager<A: Account> {
    config: KeyManagerConfig,
    account: A,
    nonces: RefCell<NonceStore>,
    guard: ReentrancyGuard,
}

impl<A: Account> KeyManager<A> {
    pub fn new(config: KeyManagerConfig, account: A) -> Self {
        info!(
            key_manager = %config.address,
            account = %account.address(),
            chain_id = config.chain_id,
            "key manager created"
        );
        Self {
            config,
            account,
            nonces: RefCell::new(NonceStore::new()),
            guard: ReentrancyGuard::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.config.address
    }

    pub fn config(&self) -> &KeyManagerConfig {
        &self.config
    }

    /// Address of the controlled account (`target()`).
    pub fn target(&self) -> Address {
        self.account.address()
    }

    pub fn account(&self) -> &A {
        &self.account
    }

    /// Run `payload` on the account on behalf of `caller`.
    pub fn execute(
        &self,
        caller: Address,
        msg_value: U256,
        payload: &[u8],
    ) -> Result<Bytes, KeyManagerError> {
        self.frame(|| self.execute_payload(caller, msg_value, payload, false))
    }

    /// Run several payloads in order; `values[i]` is forwarded with `payloads[i]` and the values
    /// must add up to `msg_value`.
    pub fn execute_batch(
        &self,
        caller: Address,
        msg_value: U256,
        values: &[U256],
        payloads: &[Bytes],
    ) -> Result<Vec<Bytes>, KeyManagerError> {
        if values.len() != payloads.len() {
            return Err(KeyManagerError::BatchExecuteParamsLengthMismatch);
        }
        self.frame(|| {
            let mut budget = ValueBudget::new(msg_value);
            let mut results = Vec::with_capacity(payloads.len());
            for (index, (value, payload)) in values.iter().zip(payloads).enumerate() {
                budget.spend(*value)?;
                let result = self
                    .execute_payload(caller, *value, payload, false)
                    .map_err(|err| err.at_batch_index(index))?;
                results.push(result);
            }
            budget.finish()?;
            Ok(results)
        })
    }

    /// Run `payload` on behalf of whoever signed it.
    pub fn execute_relay_call(
        &self,
        msg_value: U256,
        signature: &[u8],
        nonce: U256,
        validity_timestamps: U256,
        payload: &[u8],
    ) -> Result<Bytes, KeyManagerError> {
        self.frame(|| {
            self.relay_payload(&RelayCall {
                signature,
                nonce,
                validity_timestamps,
                msg_value,
                payload,
            })
        })
    }

    pub fn execute_relay_call_batch(
        &self,
        msg_value: U256,
        signatures: &[Bytes],
        nonces: &[U256],
        validity_timestamps: &[U256],
        values: &[U256],
        payloads: &[Bytes],
    ) -> Result<Vec<Bytes>, KeyManagerError> {
        let len = signatures.len();
        if nonces.len() != len
            || validity_timestamps.len() != len
            || values.len() != len
            || payloads.len() != len
        {
            return Err(KeyManagerError::BatchExecuteRelayCallParamsLengthMismatch);
        }
        self.frame(|| {
            let mut budget = ValueBudget::new(msg_value);
            let mut results = Vec::with_capacity(len);
            for index in 0..len {
                budget.spend(values[index])?;
                let result = self
                    .relay_payload(&RelayCall {
                        signature: &signatures[index],
                        nonce: nonces[index],
                        validity_timestamps: validity_timestamps[index],
                        msg_value: values[index],
                        payload: &payloads[index],
                    })
                    .map_err(|err| err.at_batch_index(index))?;
                results.push(result);
            }
            budget.finish()?;
            Ok(results)
        })
    }

    /// Nonce the next relay call of `signer` on `channel` must use.
    pub fn get_nonce(&self, signer: Address, channel: u128) -> U256 {
        self.nonces.borrow().get_nonce(signer, channel)
    }

    /// ERC-1271: the magic value iff the signer of `hash` holds SIGN. Never fails.
    pub fn is_valid_signature(&self, hash: B256, signature: &[u8]) -> FixedBytes<4> {
        let Ok(signer) = recover_signer(hash, signature) else {
            return ERC1271_FAILURE_VALUE;
        };
        if Registry::new(&self.account)
            .get_permissions(signer)
            .has(Permission::Sign)
        {
            ERC1271_MAGIC_VALUE
        } else {
            ERC1271_FAILURE_VALUE
        }
    }

    pub fn supports_interface(&self, interface_id: FixedBytes<4>) -> bool {
        [
            INTERFACE_ID_ERC165,
            INTERFACE_ID_ERC1271,
            INTERFACE_ID_LSP6,
            INTERFACE_ID_LSP25,
        ]
        .contains(&interface_id)
    }

    /// Decide whether `caller` may run `payload`, without running it.
    pub fn authorize(
        &self,
        caller: Address,
        msg_value: U256,
        payload: &[u8],
    ) -> Result<(), KeyManagerError> {
        let permissions = Registry::new(&self.account).get_permissions(caller);
        if permissions.is_empty() {
            return Err(KeyManagerError::NoPermissionsSet { from: caller });
        }
        let call = decode_account_call(payload)?;
        Authorizer::new(&self.account).authorize_call(caller, permissions, &call, msg_value)
    }

    #[cfg(test)]
    pub(crate) fn guard_is_entered(&self) -> bool {
        self.guard.is_entered()
    }

    fn relay_payload(&self, call: &RelayCall<'_>) -> Result<Bytes, KeyManagerError> {
        let now = self.account.block_timestamp();
        let signer = {
            let mut nonces = self.nonces.borrow_mut();
            verify_relay_call(&self.config, &mut nonces, now, call)?
        };
        self.execute_payload(signer, call.msg_value, call.payload, true)
    }

    fn execute_payload(
        &self,
        from: Address,
        msg_value: U256,
        payload: &[u8],
        relayed: bool,
    ) -> Result<Bytes, KeyManagerError> {
        if payload.len() < 4 {
            return Err(KeyManagerError::InvalidPayload {
                payload: Bytes::copy_from_slice(payload),
            });
        }

        let scope = self.guard.enter(!is_set_data_payload(payload));
        let permissions = Registry::new(&self.account).get_permissions(from);
        if scope.is_reentrant() {
            require_permission(from, permissions, Permission::Reentrancy)?;
        }
        if permissions.is_empty() {
            return Err(KeyManagerError::NoPermissionsSet { from });
        }
        if relayed {
            require_permission(from, permissions, Permission::ExecuteRelayCall)?;
        }

        let call = decode_account_call(payload)?;
        Authorizer::new(&self.account).authorize_call(from, permissions, &call, msg_value)?;
        debug!(%from, relayed, reentrant = scope.is_reentrant(), "payload authorized");

        let result = self
            .account
            .forward(self, msg_value, payload)
            .map_err(|err| match err {
                AccountError::KeyManager(inner) => *inner,
                other => KeyManagerError::Account(other),
            });
        drop(scope);
        result
    }

    fn frame<T>(
        &self,
        body: impl FnOnce() -> Result<T, KeyManagerError>,
    ) -> Result<T, KeyManagerError> {
        let account_checkpoint = self.account.checkpoint();
        let nonce_checkpoint = self.nonces.borrow().checkpoint();
        let result = body();
        if let Err(err) = &result {
            debug!(%err, "reverting frame");
            self.account.revert_to(account_checkpoint);
            self.nonces.borrow_mut().revert_to(nonce_checkpoint);
        }
        result
    }
}

impl<A: Account> KeyManagerHost for KeyManager<A> {
    fn address(&self) -> Address {
        self.config.address
    }

    fn execute(
        &self,
        caller: Address,
        msg_value: U256,
        payload: &[u8],
    ) -> Result<Bytes, KeyManagerError> {
        KeyManager::execute(self, caller, msg_value, payload)
    }

    fn execute_relay_call(
        &self,
        msg_value: U256,
        signature: &[u8],
        nonce: U256,
        validity_timestamps: U256,
        payload: &[u8],
    ) -> Result<Bytes, KeyManagerError> {
        KeyManager::execute_relay_call(self, msg_value, signature, nonce, validity_timestamps, payload)
    }
}

/// Running total of batch values against `msg.value`.
struct ValueBudget {
    msg_value: U256,
    total: U256,
}

impl ValueBudget {
    fn new(msg_value: U256) -> Self {
        Self {
            msg_value,
            total: U256::ZERO,
        }
    }

    fn spend(&mut self, value: U256) -> Result<(), KeyManagerError> {
        self.total = self.total.saturating_add(value);
        if self.total > self.msg_value {
            return Err(KeyManagerError::BatchInsufficientValueSent {
                total: self.total,
                msg_value: self.msg_value,
            });
        }
        Ok(())
    }

    fn finish(self) -> Result<(), KeyManagerError> {
        if self.total < self.msg_value {
            return Err(KeyManagerError::BatchExcessiveValueSent {
                total: self.total,
                msg_value: self.msg_value,
            });
        }
        Ok(())
    }
}
