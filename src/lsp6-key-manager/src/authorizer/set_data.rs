use alloy_primitives::{Address, B256};
use lsp6_types::{
    allowed::{data_key_matches, decode_allowed_data_keys},
    Permission, Permissions,
};
use tracing::{trace, warn};

use super::require_permission;
use crate::{account::Account, errors::KeyManagerError, registry::Registry};

/// Context string reported when the stored `AllowedERC725YDataKeys` cannot be decoded.
pub const DECODE_DATA_KEYS_CONTEXT: &str = "couldn't DECODE from storage";

/// SETDATA (or SUPER_SETDATA) for a plain data key, then the caller's key allow-list.
pub fn verify_allowed_data_key<A: Account + ?Sized>(
    account: &A,
    from: Address,
    permissions: Permissions,
    key: &B256,
) -> Result<(), KeyManagerError> {
    if permissions.has(Permission::SuperSetData) {
        return Ok(());
    }
    require_permission(from, permissions, Permission::SetData)?;

    let raw = Registry::new(account).get_allowed_data_keys(from);
    if raw.is_empty() {
        warn!(%from, "no AllowedERC725YDataKeys");
        return Err(KeyManagerError::NoERC725YDataKeysAllowed { from });
    }
    let patterns = decode_allowed_data_keys(&raw).map_err(|_| {
        KeyManagerError::InvalidEncodedAllowedERC725YDataKeys {
            value: raw.clone(),
            context: DECODE_DATA_KEYS_CONTEXT,
        }
    })?;

    if patterns.iter().any(|pattern| {
        trace!(pattern = %hex::encode(pattern), "checking data key pattern");
        data_key_matches(pattern, key)
    }) {
        return Ok(());
    }

    warn!(%from, %key, "data key not allowed");
    Err(KeyManagerError::NotAllowedERC725YDataKey { from, key: *key })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{b256, Bytes};
    use lsp6_types::{keys::allowed_data_keys_key, Erc725YStore};

    use crate::account::MemoryAccount;

    const FROM: Address = Address::new([0x22; 20]);

    fn account() -> MemoryAccount {
        MemoryAccount::new(Address::repeat_byte(0xac), Address::ZERO)
    }

    #[test]
    fn dynamic_prefixes_and_exact_keys() {
        let account = account();
        let exact = b256!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
        Registry::new(&account)
            .set_allowed_data_keys(FROM, &[exact.as_slice(), &[0xbe, 0xef][..]])
            .unwrap();
        let permissions = Permissions::from(Permission::SetData);

        assert_eq!(verify_allowed_data_key(&account, FROM, permissions, &exact), Ok(()));
        let mut prefixed = [0x11u8; 32];
        prefixed[..2].copy_from_slice(&[0xbe, 0xef]);
        assert_eq!(
            verify_allowed_data_key(&account, FROM, permissions, &B256::from(prefixed)),
            Ok(())
        );

        let other = B256::repeat_byte(0xab);
        assert_eq!(
            verify_allowed_data_key(&account, FROM, permissions, &other),
            Err(KeyManagerError::NotAllowedERC725YDataKey {
                from: FROM,
                key: other
            })
        );
    }

    #[test]
    fn missing_and_broken_lists() {
        let account = account();
        let permissions = Permissions::from(Permission::SetData);
        let key = B256::repeat_byte(0x01);

        assert_eq!(
            verify_allowed_data_key(&account, FROM, permissions, &key),
            Err(KeyManagerError::NoERC725YDataKeysAllowed { from: FROM })
        );

        let broken = Bytes::from_static(&[0x00, 0x21, 0xaa]);
        account.set_data(allowed_data_keys_key(FROM), broken.clone());
        assert_eq!(
            verify_allowed_data_key(&account, FROM, permissions, &key),
            Err(KeyManagerError::InvalidEncodedAllowedERC725YDataKeys {
                value: broken,
                context: DECODE_DATA_KEYS_CONTEXT
            })
        );

        assert_eq!(
            verify_allowed_data_key(&account, FROM, Permission::SuperSetData.into(), &key),
            Ok(())
        );
    }

    #[test]
    fn setdata_bit_is_required() {
        assert_eq!(
            verify_allowed_data_key(&account(), FROM, Permission::Call.into(), &B256::ZERO),
            Err(KeyManagerError::NotAuthorised {
                from: FROM,
                permission: Permission::SetData
            })
        );
    }
}
