//! Call-intent classification.
//!
//! A decoded [`AccountCall`] is split into [`Intent`]s (one per storage write or ERC725X
//! operation), and each intent resolves to the [`Requirement`] the authorizer must check.
//! Requirements for admin keys depend on what is stored *now* (ADD vs EDIT/CHANGE), so they are
//! only resolved at authorization time.

use alloy_primitives::{Address, Bytes, FixedBytes, B256, U256};
use lsp6_types::{
    allowed::{decode_allowed_calls, decode_allowed_data_keys},
    keys::ADDRESS_PERMISSIONS_ARRAY,
    CallTypes, DataKeyKind, Erc725YStore, Permission, Permissions,
};

use crate::{
    account::OperationType,
    decoder::{padded_selector, AccountCall, ExecuteCall},
    errors::KeyManagerError,
    registry::read_u128,
};

/// Context string reported when an `AllowedERC725YDataKeys` value being written is malformed.
pub const VALIDATE_DATA_KEYS_CONTEXT: &str = "couldn't VALIDATE the data value";

/// One unit of authority a payload exercises.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Intent {
    SetData { key: B256, value: Bytes },
    /// CALL with value and no data.
    ValueTransfer { target: Address, value: U256 },
    /// CALL with data, or with neither data nor value.
    Call { target: Address, value: U256, data: Bytes },
    StaticCall { target: Address, data: Bytes },
    DelegateCall { target: Address, data: Bytes },
    Create { value: U256 },
    Create2 { value: U256 },
    ChangeOwner,
}

/// What the caller must hold for one intent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Requirement {
    /// Plain permission bits, no allow-list.
    Permissions(Permissions),
    /// SETDATA, restricted by `AllowedERC725YDataKeys` unless SUPER_SETDATA is held.
    DataKey { key: B256 },
    /// Call categories, restricted by `AllowedCalls` unless every SUPER bit is held.
    Call(CallRequirement),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallRequirement {
    /// Plain category bits; each one is also satisfied by its SUPER counterpart.
    pub categories: Permissions,
    /// Call-type bits an `AllowedCalls` record must carry to match.
    pub call_types: CallTypes,
    pub target: Address,
    pub selector: FixedBytes<4>,
}

/// Split `call` into the intents it exercises, in payload order.
pub fn classify(call: &AccountCall, msg_value: U256) -> Result<Vec<Intent>, KeyManagerError> {
    if call.is_set_data() && !msg_value.is_zero() {
        return Err(KeyManagerError::CannotSendValueToSetData);
    }

    let intents = match call {
        AccountCall::SetData { key, value } => vec![Intent::SetData {
            key: *key,
            value: value.clone(),
        }],
        AccountCall::SetDataBatch { keys, values } => keys
            .iter()
            .zip(values)
            .map(|(key, value)| Intent::SetData {
                key: *key,
                value: value.clone(),
            })
            .collect(),
        AccountCall::Execute(execute) => vec![Intent::from_execute(execute)],
        AccountCall::ExecuteBatch(calls) => calls.iter().map(Intent::from_execute).collect(),
        AccountCall::TransferOwnership { .. }
        | AccountCall::AcceptOwnership
        | AccountCall::RenounceOwnership => vec![Intent::ChangeOwner],
    };
    Ok(intents)
}

impl Intent {
    pub fn from_execute(call: &ExecuteCall) -> Self {
        let target = call.target;
        match call.operation {
            OperationType::Call if call.data.is_empty() && !call.value.is_zero() => {
                Intent::ValueTransfer {
                    target,
                    value: call.value,
                }
            }
            OperationType::Call => Intent::Call {
                target,
                value: call.value,
                data: call.data.clone(),
            },
            OperationType::StaticCall => Intent::StaticCall {
                target,
                data: call.data.clone(),
            },
            OperationType::DelegateCall => Intent::DelegateCall {
                target,
                data: call.data.clone(),
            },
            OperationType::Create => Intent::Create { value: call.value },
            OperationType::Create2 => Intent::Create2 { value: call.value },
        }
    }

    /// Resolve the requirement against the store's current content.
    pub fn requirement<S: Erc725YStore + ?Sized>(
        &self,
        store: &S,
    ) -> Result<Requirement, KeyManagerError> {
        let requirement = match self {
            Intent::SetData { key, value } => return data_key_requirement(store, key, value),
            Intent::ValueTransfer { target, .. } => Requirement::Call(CallRequirement {
                categories: Permission::TransferValue.into(),
                call_types: CallTypes::VALUE,
                target: *target,
                selector: FixedBytes::ZERO,
            }),
            Intent::Call {
                target,
                value,
                data,
            } => {
                let (categories, call_types) = if value.is_zero() {
                    (Permission::Call.into(), CallTypes::CALL)
                } else {
                    (
                        Permission::TransferValue | Permission::Call,
                        CallTypes::VALUE | CallTypes::CALL,
                    )
                };
                Requirement::Call(CallRequirement {
                    categories,
                    call_types,
                    target: *target,
                    selector: padded_selector(data),
                })
            }
            Intent::StaticCall { target, data } => Requirement::Call(CallRequirement {
                categories: Permission::StaticCall.into(),
                call_types: CallTypes::STATICCALL,
                target: *target,
                selector: padded_selector(data),
            }),
            Intent::DelegateCall { target, data } => Requirement::Call(CallRequirement {
                categories: Permission::DelegateCall.into(),
                call_types: CallTypes::DELEGATECALL,
                target: *target,
                selector: padded_selector(data),
            }),
            Intent::Create { value } | Intent::Create2 { value } => {
                let mut required = Permissions::from(Permission::Deploy);
                if !value.is_zero() {
                    required = required | Permission::SuperTransferValue;
                }
                Requirement::Permissions(required)
            }
            Intent::ChangeOwner => Requirement::Permissions(Permission::ChangeOwner.into()),
        };
        Ok(requirement)
    }
}

/// Requirement for writing `value` under `key`.
pub fn data_key_requirement<S: Erc725YStore + ?Sized>(
    store: &S,
    key: &B256,
    value: &Bytes,
) -> Result<Requirement, KeyManagerError> {
    let invalid_value = || KeyManagerError::InvalidDataValuesForDataKeys {
        key: *key,
        value: value.clone(),
    };
    let add_or = |edit: Permission, add: Permission| {
        let permission = if store.get_data(key).is_empty() {
            add
        } else {
            edit
        };
        Requirement::Permissions(permission.into())
    };

    let requirement = match DataKeyKind::of(key) {
        DataKeyKind::PermissionsArrayLength => {
            if !value.is_empty() && value.len() != 16 {
                return Err(invalid_value());
            }
            let current = read_u128(&store.get_data(&ADDRESS_PERMISSIONS_ARRAY));
            let permission = if read_u128(value) > current {
                Permission::AddController
            } else {
                Permission::EditPermissions
            };
            Requirement::Permissions(permission.into())
        }
        DataKeyKind::PermissionsArrayIndex(_) => {
            if !value.is_empty() && value.len() != 20 {
                return Err(invalid_value());
            }
            add_or(Permission::EditPermissions, Permission::AddController)
        }
        DataKeyKind::Permissions(_) => {
            if !value.is_empty() && value.len() != 32 {
                return Err(invalid_value());
            }
            add_or(Permission::EditPermissions, Permission::AddController)
        }
        DataKeyKind::AllowedCalls(_) => {
            if !value.is_empty() && decode_allowed_calls(value).is_err() {
                return Err(KeyManagerError::InvalidEncodedAllowedCalls {
                    value: value.clone(),
                });
            }
            add_or(Permission::EditPermissions, Permission::AddController)
        }
        DataKeyKind::AllowedDataKeys(_) => {
            if !value.is_empty() && decode_allowed_data_keys(value).is_err() {
                return Err(KeyManagerError::InvalidEncodedAllowedERC725YDataKeys {
                    value: value.clone(),
                    context: VALIDATE_DATA_KEYS_CONTEXT,
                });
            }
            add_or(Permission::EditPermissions, Permission::AddController)
        }
        DataKeyKind::UnrecognisedPermissionKey => {
            return Err(KeyManagerError::NotRecognisedPermissionKey { key: *key })
        }
        DataKeyKind::UniversalReceiverDelegate => add_or(
            Permission::ChangeUniversalReceiverDelegate,
            Permission::AddUniversalReceiverDelegate,
        ),
        DataKeyKind::Extension => {
            add_or(Permission::ChangeExtensions, Permission::AddExtensions)
        }
        DataKeyKind::Other => Requirement::DataKey { key: *key },
    };
    Ok(requirement)
}
