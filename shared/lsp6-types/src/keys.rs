//! ERC725Y data keys read and written by the key manager.
//!
//! Per-controller records use the LSP2 `MappingWithGrouping` layout:
//! `bytes10 group ++ bytes2(0) ++ bytes20 controller`.

use alloy_primitives::{b256, fixed_bytes, Address, FixedBytes, B256};

/// `keccak256('AddressPermissions[]')`: length key of the controller array.
pub const ADDRESS_PERMISSIONS_ARRAY: B256 =
    b256!("df30dba06db6a30e65354d9a64c609861f089545ca58c6b4dbe31a5f338cb0e3");

/// First half of [`ADDRESS_PERMISSIONS_ARRAY`]; index keys are `prefix ++ uint128(index)`.
pub const ADDRESS_PERMISSIONS_ARRAY_PREFIX: FixedBytes<16> =
    fixed_bytes!("df30dba06db6a30e65354d9a64c60986");

/// Shared prefix of every `AddressPermissions:*:<address>` key.
pub const ADDRESS_PERMISSIONS_PREFIX: FixedBytes<6> = fixed_bytes!("4b80742de2bf");

/// `AddressPermissions:Permissions:<address>`
pub const PERMISSIONS_PREFIX: FixedBytes<12> = fixed_bytes!("4b80742de2bf82acb3630000");

/// `AddressPermissions:AllowedCalls:<address>`
pub const ALLOWED_CALLS_PREFIX: FixedBytes<12> = fixed_bytes!("4b80742de2bf393a64c70000");

/// `AddressPermissions:AllowedERC725YDataKeys:<address>`
pub const ALLOWED_DATA_KEYS_PREFIX: FixedBytes<12> = fixed_bytes!("4b80742de2bf866c29110000");

/// `keccak256('LSP1UniversalReceiverDelegate')`
pub const LSP1_UNIVERSAL_RECEIVER_DELEGATE: B256 =
    b256!("0cfc51aec37c55a4d0b1a65c6255c4bf2fbdf6277f3cc0730c45b828b6db8b47");

/// `LSP1UniversalReceiverDelegate:<bytes32>` mapped delegates.
pub const LSP1_UNIVERSAL_RECEIVER_DELEGATE_PREFIX: FixedBytes<12> =
    fixed_bytes!("0cfc51aec37c55a4d0b10000");

/// `LSP17Extension:<bytes4>`
pub const LSP17_EXTENSION_PREFIX: FixedBytes<12> = fixed_bytes!("cee78b4094da860110960000");

fn mapping_with_grouping(prefix: &FixedBytes<12>, controller: Address) -> B256 {
    let mut key = [0u8; 32];
    key[..12].copy_from_slice(prefix.as_slice());
    key[12..].copy_from_slice(controller.as_slice());
    B256::from(key)
}

pub fn permissions_key(controller: Address) -> B256 {
    mapping_with_grouping(&PERMISSIONS_PREFIX, controller)
}

pub fn allowed_calls_key(controller: Address) -> B256 {
    mapping_with_grouping(&ALLOWED_CALLS_PREFIX, controller)
}

pub fn allowed_data_keys_key(controller: Address) -> B256 {
    mapping_with_grouping(&ALLOWED_DATA_KEYS_PREFIX, controller)
}

/// `AddressPermissions[index]`
pub fn permissions_array_index_key(index: u128) -> B256 {
    let mut key = [0u8; 32];
    key[..16].copy_from_slice(ADDRESS_PERMISSIONS_ARRAY_PREFIX.as_slice());
    key[16..].copy_from_slice(&index.to_be_bytes());
    B256::from(key)
}

/// What a data key addresses, as far as the key manager is concerned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataKeyKind {
    /// `AddressPermissions[]`
    PermissionsArrayLength,
    /// `AddressPermissions[index]`
    PermissionsArrayIndex(u128),
    Permissions(Address),
    AllowedCalls(Address),
    AllowedDataKeys(Address),
    /// Starts with `AddressPermissions:` but is not one of the known records.
    UnrecognisedPermissionKey,
    UniversalReceiverDelegate,
    Extension,
    /// Any other key; writable with SETDATA.
    Other,
}

impl DataKeyKind {
    pub fn of(key: &B256) -> Self {
        let bytes = key.as_slice();

        if *key == ADDRESS_PERMISSIONS_ARRAY {
            return DataKeyKind::PermissionsArrayLength;
        }
        if &bytes[..16] == ADDRESS_PERMISSIONS_ARRAY_PREFIX.as_slice() {
            let mut index = [0u8; 16];
            index.copy_from_slice(&bytes[16..]);
            return DataKeyKind::PermissionsArrayIndex(u128::from_be_bytes(index));
        }
        if &bytes[..6] == ADDRESS_PERMISSIONS_PREFIX.as_slice() {
            let controller = Address::from_slice(&bytes[12..]);
            let group = &bytes[..12];
            return if group == PERMISSIONS_PREFIX.as_slice() {
                DataKeyKind::Permissions(controller)
            } else if group == ALLOWED_CALLS_PREFIX.as_slice() {
                DataKeyKind::AllowedCalls(controller)
            } else if group == ALLOWED_DATA_KEYS_PREFIX.as_slice() {
                DataKeyKind::AllowedDataKeys(controller)
            } else {
                DataKeyKind::UnrecognisedPermissionKey
            };
        }
        if *key == LSP1_UNIVERSAL_RECEIVER_DELEGATE
            || &bytes[..12] == LSP1_UNIVERSAL_RECEIVER_DELEGATE_PREFIX.as_slice()
        {
            return DataKeyKind::UniversalReceiverDelegate;
        }
        if &bytes[..12] == LSP17_EXTENSION_PREFIX.as_slice() {
            return DataKeyKind::Extension;
        }
        DataKeyKind::Other
    }
}
