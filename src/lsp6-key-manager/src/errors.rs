use alloy_primitives::{Address, Bytes, FixedBytes, B256, U256};
use alloy_sol_types::SolError;
use lsp6_types::Permission;

use crate::account::AccountError;

/// Solidity custom errors, bit-compatible with the deployed key manager and account contracts.
pub mod abi {
    use alloy_sol_types::sol;

    sol! {
        error NotAuthorised(address from, string permission);
        error NotAllowedCall(address from, address to, bytes4 selector);
        error NotAllowedERC725YDataKey(address from, bytes32 dataKey);
        error NoPermissionsSet(address from);
        error NoCallsAllowed(address from);
        error NoERC725YDataKeysAllowed(address from);
        error InvalidEncodedAllowedCalls(bytes allowedCallsValue);
        error InvalidEncodedAllowedERC725YDataKeys(bytes value, string context);
        error InvalidWhitelistedCall(address from);
        error NotRecognisedPermissionKey(bytes32 dataKey);
        error InvalidDataValuesForDataKeys(bytes32 dataKey, bytes dataValue);
        error InvalidPayload(bytes payload);
        error InvalidERC725Function(bytes4 invalidFunction);
        error CannotSendValueToSetData();
        error BatchExecuteParamsLengthMismatch();
        error BatchExecuteRelayCallParamsLengthMismatch();
        error LSP6BatchInsufficientValueSent(uint256 totalValues, uint256 msgValue);
        error LSP6BatchExcessiveValueSent(uint256 totalValues, uint256 msgValue);

        error InvalidRelayNonce(address signer, uint256 invalidNonce, bytes signature);
        error InvalidRelaySignature();
        error RelayCallBeforeStartTime();
        error RelayCallExpired();

        error ERC725X_UnknownOperationType(uint256 operationTypeProvided);
        error ERC725X_ExecuteParametersLengthMismatch();
        error ERC725X_ExecuteParametersEmptyArray();
        error ERC725X_MsgValueDisallowedInStaticCall();
        error ERC725X_MsgValueDisallowedInDelegateCall();
        error ERC725X_CreateOperationsRequireEmptyRecipientAddress();
        error ERC725X_NoContractBytecodeProvided();
        error ERC725Y_DataKeysValuesLengthMismatch();
        error ERC725Y_DataKeysValuesEmptyArray();

        error LSP14CallerNotPendingOwner(address caller);
    }
}

/// Every way the key manager can refuse a payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyManagerError {
    #[error("{from} is not authorised: missing permission {permission}")]
    NotAuthorised { from: Address, permission: Permission },

    #[error("{from} is not allowed to call {to} with selector {selector}")]
    NotAllowedCall {
        from: Address,
        to: Address,
        selector: FixedBytes<4>,
    },

    #[error("{from} is not allowed to set data key {key}")]
    NotAllowedERC725YDataKey { from: Address, key: B256 },

    #[error("{from} has no permissions set")]
    NoPermissionsSet { from: Address },

    #[error("{from} has no AllowedCalls")]
    NoCallsAllowed { from: Address },

    #[error("{from} has no AllowedERC725YDataKeys")]
    NoERC725YDataKeysAllowed { from: Address },

    #[error("invalid AllowedCalls value 0x{}", hex::encode(.value))]
    InvalidEncodedAllowedCalls { value: Bytes },

    #[error("invalid AllowedERC725YDataKeys value 0x{} ({context})", hex::encode(.value))]
    InvalidEncodedAllowedERC725YDataKeys { value: Bytes, context: &'static str },

    #[error("{from} has an AllowedCalls entry with zero address, standard and selector")]
    InvalidWhitelistedCall { from: Address },

    #[error("unrecognised AddressPermissions key {key}")]
    NotRecognisedPermissionKey { key: B256 },

    #[error("invalid value 0x{} for data key {key}", hex::encode(.value))]
    InvalidDataValuesForDataKeys { key: B256, value: Bytes },

    #[error("invalid payload 0x{}", hex::encode(.payload))]
    InvalidPayload { payload: Bytes },

    #[error("function {selector} cannot be called through the key manager")]
    InvalidERC725Function { selector: FixedBytes<4> },

    #[error("setData payloads cannot carry value")]
    CannotSendValueToSetData,

    #[error("unknown operation type {operation}")]
    UnknownOperationType { operation: U256 },

    #[error("executeBatch parameters have different lengths")]
    ExecuteParametersLengthMismatch,

    #[error("executeBatch parameters are empty")]
    ExecuteParametersEmptyArray,

    #[error("setDataBatch keys and values have different lengths")]
    DataKeysValuesLengthMismatch,

    #[error("setDataBatch keys and values are empty")]
    DataKeysValuesEmptyArray,

    #[error("batch values and payloads have different lengths")]
    BatchExecuteParamsLengthMismatch,

    #[error("relay batch parameters have different lengths")]
    BatchExecuteRelayCallParamsLengthMismatch,

    #[error("batch values total {total} exceed msg.value {msg_value}")]
    BatchInsufficientValueSent { total: U256, msg_value: U256 },

    #[error("batch values total {total} is less than msg.value {msg_value}")]
    BatchExcessiveValueSent { total: U256, msg_value: U256 },

    #[error("invalid relay nonce {nonce} for signer {signer}")]
    InvalidRelayNonce {
        signer: Address,
        nonce: U256,
        signature: Bytes,
    },

    #[error("relay signature could not be recovered")]
    InvalidRelaySignature,

    #[error("relay call is not valid yet")]
    RelayCallNotYetValid,

    #[error("relay call has expired")]
    RelayCallExpired,

    /// A batch item failed; `index` is its 0-based position.
    #[error("batch item {index} failed: {source}")]
    Batch {
        index: usize,
        #[source]
        source: Box<KeyManagerError>,
    },

    #[error(transparent)]
    Account(#[from] AccountError),
}

impl KeyManagerError {
    pub(crate) fn at_batch_index(self, index: usize) -> Self {
        KeyManagerError::Batch {
            index,
            source: Box::new(self),
        }
    }

    /// The innermost error once batch positions are peeled off.
    pub fn root_cause(&self) -> &KeyManagerError {
        let mut err = self;
        while let KeyManagerError::Batch { source, .. } = err {
            err = source.as_ref();
        }
        err
    }

    /// Batch positions from the outermost batch inwards.
    pub fn batch_path(&self) -> Vec<usize> {
        let mut path = Vec::new();
        let mut err = self;
        while let KeyManagerError::Batch { index, source } = err {
            path.push(*index);
            err = source.as_ref();
        }
        path
    }

    /// Revert data as the contracts would return it. Batch positions are not part of the ABI, so
    /// batch errors encode as the failing item's error.
    pub fn abi_encode(&self) -> Vec<u8> {
        use KeyManagerError::*;

        match self {
            NotAuthorised { from, permission } => abi::NotAuthorised {
                from: *from,
                permission: permission.name().to_string(),
            }
            .abi_encode(),
            NotAllowedCall { from, to, selector } => abi::NotAllowedCall {
                from: *from,
                to: *to,
                selector: *selector,
            }
            .abi_encode(),
            NotAllowedERC725YDataKey { from, key } => abi::NotAllowedERC725YDataKey {
                from: *from,
                dataKey: *key,
            }
            .abi_encode(),
            NoPermissionsSet { from } => abi::NoPermissionsSet { from: *from }.abi_encode(),
            NoCallsAllowed { from } => abi::NoCallsAllowed { from: *from }.abi_encode(),
            NoERC725YDataKeysAllowed { from } => {
                abi::NoERC725YDataKeysAllowed { from: *from }.abi_encode()
            }
            InvalidEncodedAllowedCalls { value } => abi::InvalidEncodedAllowedCalls {
                allowedCallsValue: value.clone(),
            }
            .abi_encode(),
            InvalidEncodedAllowedERC725YDataKeys { value, context } => {
                abi::InvalidEncodedAllowedERC725YDataKeys {
                    value: value.clone(),
                    context: (*context).to_string(),
                }
                .abi_encode()
            }
            InvalidWhitelistedCall { from } => {
                abi::InvalidWhitelistedCall { from: *from }.abi_encode()
            }
            NotRecognisedPermissionKey { key } => {
                abi::NotRecognisedPermissionKey { dataKey: *key }.abi_encode()
            }
            InvalidDataValuesForDataKeys { key, value } => abi::InvalidDataValuesForDataKeys {
                dataKey: *key,
                dataValue: value.clone(),
            }
            .abi_encode(),
            InvalidPayload { payload } => abi::InvalidPayload {
                payload: payload.clone(),
            }
            .abi_encode(),
            InvalidERC725Function { selector } => abi::InvalidERC725Function {
                invalidFunction: *selector,
            }
            .abi_encode(),
            CannotSendValueToSetData => abi::CannotSendValueToSetData {}.abi_encode(),
            UnknownOperationType { operation } => abi::ERC725X_UnknownOperationType {
                operationTypeProvided: *operation,
            }
            .abi_encode(),
            ExecuteParametersLengthMismatch => {
                abi::ERC725X_ExecuteParametersLengthMismatch {}.abi_encode()
            }
            ExecuteParametersEmptyArray => abi::ERC725X_ExecuteParametersEmptyArray {}.abi_encode(),
            DataKeysValuesLengthMismatch => {
                abi::ERC725Y_DataKeysValuesLengthMismatch {}.abi_encode()
            }
            DataKeysValuesEmptyArray => abi::ERC725Y_DataKeysValuesEmptyArray {}.abi_encode(),
            BatchExecuteParamsLengthMismatch => {
                abi::BatchExecuteParamsLengthMismatch {}.abi_encode()
            }
            BatchExecuteRelayCallParamsLengthMismatch => {
                abi::BatchExecuteRelayCallParamsLengthMismatch {}.abi_encode()
            }
            BatchInsufficientValueSent { total, msg_value } => {
                abi::LSP6BatchInsufficientValueSent {
                    totalValues: *total,
                    msgValue: *msg_value,
                }
                .abi_encode()
            }
            BatchExcessiveValueSent { total, msg_value } => abi::LSP6BatchExcessiveValueSent {
                totalValues: *total,
                msgValue: *msg_value,
            }
            .abi_encode(),
            InvalidRelayNonce {
                signer,
                nonce,
                signature,
            } => abi::InvalidRelayNonce {
                signer: *signer,
                invalidNonce: *nonce,
                signature: signature.clone(),
            }
            .abi_encode(),
            InvalidRelaySignature => abi::InvalidRelaySignature {}.abi_encode(),
            RelayCallNotYetValid => abi::RelayCallBeforeStartTime {}.abi_encode(),
            RelayCallExpired => abi::RelayCallExpired {}.abi_encode(),
            Batch { source, .. } => source.abi_encode(),
            Account(err) => err.abi_encode(),
        }
    }
}
