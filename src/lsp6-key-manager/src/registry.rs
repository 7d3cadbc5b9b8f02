//! Typed view of the permission records stored in an account's ERC725Y store.
//!
//! Purpose: one place that knows how controller permissions, allow-lists and the
//! `AddressPermissions[]` enumeration are laid out, so the authorizer only ever deals in
//! [`Permissions`] and raw allow-list bytes.

use alloy_primitives::{Address, Bytes};
use lsp6_types::{
    allowed::{encode_allowed_calls, encode_allowed_data_keys},
    keys::{
        allowed_calls_key, allowed_data_keys_key, permissions_array_index_key, permissions_key,
        ADDRESS_PERMISSIONS_ARRAY,
    },
    AllowedCall, CodecError, Erc725YStore, Permissions,
};
use tracing::debug;

/// Borrowed handle over a store holding LSP6 records.
pub struct Registry<'a, S: Erc725YStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: Erc725YStore + ?Sized> Registry<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Stored bitmask of `controller`; missing or malformed records read as no permissions.
    pub fn get_permissions(&self, controller: Address) -> Permissions {
        Permissions::from_word(&self.store.get_data(&permissions_key(controller)))
    }

    /// Raw `AllowedCalls` value. Decoding (and its errors) is left to the authorizer.
    pub fn get_allowed_calls(&self, controller: Address) -> Bytes {
        self.store.get_data(&allowed_calls_key(controller))
    }

    /// Raw `AllowedERC725YDataKeys` value.
    pub fn get_allowed_data_keys(&self, controller: Address) -> Bytes {
        self.store.get_data(&allowed_data_keys_key(controller))
    }

    /// Write the permissions of `controller`, keeping `AddressPermissions[]` in sync.
    ///
    /// A first grant appends the controller to the array. Clearing the permissions removes it by
    /// moving the last element into its slot.
    pub fn set_permissions(&self, controller: Address, permissions: Permissions) {
        let had_permissions = !self.get_permissions(controller).is_empty();

        if permissions.is_empty() {
            self.store
                .set_data(permissions_key(controller), Bytes::new());
            if had_permissions {
                self.remove_controller(controller);
            }
        } else {
            self.store.set_data(
                permissions_key(controller),
                Bytes::copy_from_slice(permissions.to_word().as_slice()),
            );
            if !had_permissions {
                self.push_controller(controller);
            }
        }
        debug!(%controller, %permissions, "permissions updated");
    }

    pub fn set_allowed_calls(&self, controller: Address, calls: &[AllowedCall]) {
        self.store.set_data(
            allowed_calls_key(controller),
            Bytes::from(encode_allowed_calls(calls)),
        );
    }

    pub fn set_allowed_data_keys<T: AsRef<[u8]>>(
        &self,
        controller: Address,
        patterns: &[T],
    ) -> Result<(), CodecError> {
        let value = encode_allowed_data_keys(patterns)?;
        self.store
            .set_data(allowed_data_keys_key(controller), Bytes::from(value));
        Ok(())
    }

    /// Length stored under `AddressPermissions[]`.
    pub fn controller_count(&self) -> u128 {
        read_u128(&self.store.get_data(&ADDRESS_PERMISSIONS_ARRAY))
    }

    /// Controllers in array order. Empty or malformed slots are skipped.
    pub fn controllers(&self) -> Vec<Address> {
        (0..self.controller_count())
            .filter_map(|index| {
                let value = self.store.get_data(&permissions_array_index_key(index));
                (value.len() == 20).then(|| Address::from_slice(&value))
            })
            .collect()
    }

    fn push_controller(&self, controller: Address) {
        let length = self.controller_count();
        self.store.set_data(
            permissions_array_index_key(length),
            Bytes::copy_from_slice(controller.as_slice()),
        );
        self.write_length(length + 1);
    }

    fn remove_controller(&self, controller: Address) {
        let length = self.controller_count();
        let Some(index) = (0..length).find(|index| {
            self.store.get_data(&permissions_array_index_key(*index))[..] == controller[..]
        }) else {
            return;
        };

        let last = length - 1;
        if index != last {
            let moved = self.store.get_data(&permissions_array_index_key(last));
            self.store.set_data(permissions_array_index_key(index), moved);
        }
        self.store
            .set_data(permissions_array_index_key(last), Bytes::new());
        self.write_length(last);
    }

    fn write_length(&self, length: u128) {
        self.store.set_data(
            ADDRESS_PERMISSIONS_ARRAY,
            Bytes::copy_from_slice(&length.to_be_bytes()),
        );
    }
}

/// Reads a `uint128` array length. Anything longer than 16 bytes keeps its low 16 bytes, as
/// Solidity would after the cast.
pub(crate) fn read_u128(value: &[u8]) -> u128 {
    let tail = &value[value.len().saturating_sub(16)..];
    let mut word = [0u8; 16];
    word[16 - tail.len()..].copy_from_slice(tail);
    u128::from_be_bytes(word)
}
