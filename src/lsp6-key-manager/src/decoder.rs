//! Parse ABI payloads addressed to the account.

use alloy_primitives::{Address, Bytes, FixedBytes, B256, U256};
use alloy_sol_types::SolCall;
use lsp6_types::interfaces::{IERC725X, IERC725Y, ILSP14Ownable2Step};

use crate::{account::OperationType, errors::KeyManagerError};

const SET_DATA: [u8; 4] = IERC725Y::setDataCall::SELECTOR;
const SET_DATA_BATCH: [u8; 4] = IERC725Y::setDataBatchCall::SELECTOR;
const EXECUTE: [u8; 4] = IERC725X::executeCall::SELECTOR;
const EXECUTE_BATCH: [u8; 4] = IERC725X::executeBatchCall::SELECTOR;
const TRANSFER_OWNERSHIP: [u8; 4] = ILSP14Ownable2Step::transferOwnershipCall::SELECTOR;
const ACCEPT_OWNERSHIP: [u8; 4] = ILSP14Ownable2Step::acceptOwnershipCall::SELECTOR;
const RENOUNCE_OWNERSHIP: [u8; 4] = ILSP14Ownable2Step::renounceOwnershipCall::SELECTOR;

/// One ERC725X operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecuteCall {
    pub operation: OperationType,
    pub target: Address,
    pub value: U256,
    pub data: Bytes,
}

impl ExecuteCall {
    /// First four bytes of the call data, zero padded. Empty data gives `0x00000000`.
    pub fn selector(&self) -> FixedBytes<4> {
        padded_selector(&self.data)
    }
}

pub fn padded_selector(data: &[u8]) -> FixedBytes<4> {
    let mut selector = [0u8; 4];
    let n = data.len().min(4);
    selector[..n].copy_from_slice(&data[..n]);
    FixedBytes(selector)
}

/// Account functions reachable through the key manager.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccountCall {
    SetData { key: B256, value: Bytes },
    SetDataBatch { keys: Vec<B256>, values: Vec<Bytes> },
    Execute(ExecuteCall),
    ExecuteBatch(Vec<ExecuteCall>),
    TransferOwnership { new_owner: Address },
    AcceptOwnership,
    RenounceOwnership,
}

impl AccountCall {
    pub fn is_set_data(&self) -> bool {
        matches!(
            self,
            AccountCall::SetData { .. } | AccountCall::SetDataBatch { .. }
        )
    }

    pub fn is_batch(&self) -> bool {
        matches!(
            self,
            AccountCall::SetDataBatch { .. } | AccountCall::ExecuteBatch(_)
        )
    }
}

pub fn selector_of(payload: &[u8]) -> Option<[u8; 4]> {
    payload.get(..4)?.try_into().ok()
}

/// `setData` / `setDataBatch` payloads leave the reentrancy marker untouched.
pub fn is_set_data_payload(payload: &[u8]) -> bool {
    matches!(selector_of(payload), Some(SET_DATA | SET_DATA_BATCH))
}

/// Decode a payload into the account call it encodes.
pub fn decode_account_call(payload: &[u8]) -> Result<AccountCall, KeyManagerError> {
    let invalid = || KeyManagerError::InvalidPayload {
        payload: Bytes::copy_from_slice(payload),
    };
    let selector = selector_of(payload).ok_or_else(invalid)?;

    let call = match selector {
        SET_DATA => {
            let call = IERC725Y::setDataCall::abi_decode(payload, true).map_err(|_| invalid())?;
            AccountCall::SetData {
                key: call.dataKey,
                value: call.dataValue,
            }
        }
        SET_DATA_BATCH => {
            let call =
                IERC725Y::setDataBatchCall::abi_decode(payload, true).map_err(|_| invalid())?;
            if call.dataKeys.len() != call.dataValues.len() {
                return Err(KeyManagerError::DataKeysValuesLengthMismatch);
            }
            if call.dataKeys.is_empty() {
                return Err(KeyManagerError::DataKeysValuesEmptyArray);
            }
            AccountCall::SetDataBatch {
                keys: call.dataKeys,
                values: call.dataValues,
            }
        }
        EXECUTE => {
            let call = IERC725X::executeCall::abi_decode(payload, true).map_err(|_| invalid())?;
            AccountCall::Execute(ExecuteCall {
                operation: OperationType::try_from(call.operationType)?,
                target: call.target,
                value: call.value,
                data: call.data,
            })
        }
        EXECUTE_BATCH => {
            let call =
                IERC725X::executeBatchCall::abi_decode(payload, true).map_err(|_| invalid())?;
            let len = call.operationsType.len();
            if call.targets.len() != len || call.values.len() != len || call.datas.len() != len {
                return Err(KeyManagerError::ExecuteParametersLengthMismatch);
            }
            if len == 0 {
                return Err(KeyManagerError::ExecuteParametersEmptyArray);
            }
            let mut calls = Vec::with_capacity(len);
            for (((operation, target), value), data) in call
                .operationsType
                .into_iter()
                .zip(call.targets)
                .zip(call.values)
                .zip(call.datas)
            {
                calls.push(ExecuteCall {
                    operation: OperationType::try_from(operation)?,
                    target,
                    value,
                    data,
                });
            }
            AccountCall::ExecuteBatch(calls)
        }
        TRANSFER_OWNERSHIP => {
            let call = ILSP14Ownable2Step::transferOwnershipCall::abi_decode(payload, true)
                .map_err(|_| invalid())?;
            AccountCall::TransferOwnership {
                new_owner: call.newOwner,
            }
        }
        ACCEPT_OWNERSHIP => AccountCall::AcceptOwnership,
        RENOUNCE_OWNERSHIP => AccountCall::RenounceOwnership,
        other => {
            return Err(KeyManagerError::InvalidERC725Function {
                selector: FixedBytes(other),
            })
        }
    };
    Ok(call)
}
