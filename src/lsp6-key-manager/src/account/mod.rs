//! The account the key manager controls.
//!
//! The key manager never executes anything itself: once a payload is authorised it is handed to
//! the account, which performs the storage write or outgoing call. Outgoing calls can reach
//! contracts that call back into the key manager, so the account receives a [`KeyManagerHost`]
//! handle it can pass on to call targets.

use alloy_primitives::{Address, Bytes, FixedBytes, U256};
use alloy_sol_types::SolError;
use lsp6_types::Erc725YStore;

use crate::errors::{abi, KeyManagerError};

mod memory;

pub use memory::{CallContext, CallHandler, CallRecord, MemoryAccount};

/// ERC725X operation types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OperationType {
    Call = 0,
    Create = 1,
    Create2 = 2,
    StaticCall = 3,
    DelegateCall = 4,
}

impl TryFrom<U256> for OperationType {
    type Error = KeyManagerError;

    fn try_from(value: U256) -> Result<Self, Self::Error> {
        let operation = match u8::try_from(value) {
            Ok(0) => OperationType::Call,
            Ok(1) => OperationType::Create,
            Ok(2) => OperationType::Create2,
            Ok(3) => OperationType::StaticCall,
            Ok(4) => OperationType::DelegateCall,
            _ => return Err(KeyManagerError::UnknownOperationType { operation: value }),
        };
        Ok(operation)
    }
}

impl OperationType {
    pub fn to_u256(self) -> U256 {
        U256::from(self as u8)
    }
}

/// Failures raised by the account while executing an authorised payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccountError {
    /// The call target reverted with `data`.
    #[error("call to {target} reverted")]
    Reverted { target: Address, data: Bytes },
    /// A call target re-entered the key manager and was refused.
    #[error(transparent)]
    KeyManager(Box<KeyManagerError>),
    #[error("{0:?} cannot carry value")]
    MsgValueDisallowed(OperationType),
    #[error("contract creation requires the zero address as target")]
    CreateRequiresEmptyTarget,
    #[error("contract creation requires bytecode")]
    NoContractBytecodeProvided,
    #[error("{caller} is not the pending owner")]
    NotPendingOwner { caller: Address },
}

impl From<KeyManagerError> for AccountError {
    fn from(err: KeyManagerError) -> Self {
        AccountError::KeyManager(Box::new(err))
    }
}

impl AccountError {
    pub fn abi_encode(&self) -> Vec<u8> {
        match self {
            AccountError::Reverted { data, .. } => data.to_vec(),
            AccountError::KeyManager(err) => err.abi_encode(),
            AccountError::MsgValueDisallowed(OperationType::DelegateCall) => {
                abi::ERC725X_MsgValueDisallowedInDelegateCall {}.abi_encode()
            }
            AccountError::MsgValueDisallowed(_) => {
                abi::ERC725X_MsgValueDisallowedInStaticCall {}.abi_encode()
            }
            AccountError::CreateRequiresEmptyTarget => {
                abi::ERC725X_CreateOperationsRequireEmptyRecipientAddress {}.abi_encode()
            }
            AccountError::NoContractBytecodeProvided => {
                abi::ERC725X_NoContractBytecodeProvided {}.abi_encode()
            }
            AccountError::NotPendingOwner { caller } => {
                abi::LSP14CallerNotPendingOwner { caller: *caller }.abi_encode()
            }
        }
    }
}

/// Re-entry points of the key manager, handed to call targets.
pub trait KeyManagerHost {
    /// The key manager's own address; the account sees it as `msg.sender`.
    fn address(&self) -> Address;

    /// Key manager `execute(payload)` called by `caller`.
    fn execute(&self, caller: Address, msg_value: U256, payload: &[u8])
        -> Result<Bytes, KeyManagerError>;

    /// Key manager `executeRelayCall(...)`; the relayer's address plays no part.
    fn execute_relay_call(
        &self,
        msg_value: U256,
        signature: &[u8],
        nonce: U256,
        validity_timestamps: U256,
        payload: &[u8],
    ) -> Result<Bytes, KeyManagerError>;
}

/// Execution substrate the key manager forwards authorised payloads to.
///
/// Storage is the account's ERC725Y store; every mutation made through it (and through
/// [`Account::forward`]) must be undoable back to a [`Account::checkpoint`].
pub trait Account: Erc725YStore {
    fn address(&self) -> Address;

    /// Logical time used for relay validity windows.
    fn block_timestamp(&self) -> u64;

    /// ERC165 `supportsInterface` on `target`; `false` for EOAs and failing calls.
    fn supports_interface(&self, target: Address, interface_id: FixedBytes<4>) -> bool;

    /// Opaque marker for [`Account::revert_to`].
    fn checkpoint(&self) -> usize;

    /// Undo every effect recorded after `checkpoint`.
    fn revert_to(&self, checkpoint: usize);

    /// Execute `payload` as if the key manager called the account with `msg_value`.
    fn forward(
        &self,
        host: &dyn KeyManagerHost,
        msg_value: U256,
        payload: &[u8],
    ) -> Result<Bytes, AccountError>;
}
