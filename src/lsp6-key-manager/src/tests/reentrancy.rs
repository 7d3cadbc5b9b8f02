use alloy_primitives::{Address, Bytes, B256, U256};
use lsp6_types::{Erc725YStore, Permission};

use super::*;
use crate::{
    account::{AccountError, OperationType},
    errors::KeyManagerError,
};

const CONTROLLER: Address = Address::new([0xc3; 20]);
/// Contract called by the account that calls back into the key manager.
const CALLBACK: Address = Address::new([0xcb; 20]);
const SLOT: B256 = B256::new([0x51; 32]);

fn call_callback() -> Vec<u8> {
    execute(OperationType::Call, CALLBACK, 0, vec![0xca, 0x11, 0xba, 0xc0])
}

/// `CALLBACK` writes `SLOT` through the key manager whenever it is called.
fn install_writing_callback(km: &KeyManager<MemoryAccount>) {
    km.account().on_call(CALLBACK, |ctx| {
        ctx.host
            .execute(CALLBACK, U256::ZERO, &set_data(SLOT, vec![0xee]))?;
        Ok(Bytes::new())
    });
}

fn setup(callback_permissions: lsp6_types::Permissions) -> KeyManager<MemoryAccount> {
    let km = key_manager();
    grant(&km, CONTROLLER, Permission::SuperCall.into());
    grant(&km, CALLBACK, callback_permissions);
    allow_data_keys(&km, CALLBACK, &[SLOT.as_slice()]);
    install_writing_callback(&km);
    km
}

#[test]
fn test_reentry_without_permission_bubbles_up() {
    let km = setup(Permission::SetData.into());

    assert_eq!(
        km.execute(CONTROLLER, U256::ZERO, &call_callback()),
        Err(KeyManagerError::NotAuthorised {
            from: CALLBACK,
            permission: Permission::Reentrancy
        })
    );
    assert!(km.account().get_data(&SLOT).is_empty());
    assert!(km.account().calls().is_empty());
}

#[test]
fn test_reentry_is_checked_before_anything_else() {
    let km = key_manager();
    grant(&km, CONTROLLER, Permission::SuperCall.into());
    install_writing_callback(&km);

    // CALLBACK holds nothing at all
    assert_eq!(
        km.execute(CONTROLLER, U256::ZERO, &call_callback()),
        Err(KeyManagerError::NotAuthorised {
            from: CALLBACK,
            permission: Permission::Reentrancy
        })
    );
}

#[test]
fn test_reentry_with_permission() {
    let km = setup(Permission::SetData | Permission::Reentrancy);

    km.execute(CONTROLLER, U256::ZERO, &call_callback()).unwrap();
    assert_eq!(km.account().get_data(&SLOT).to_vec(), vec![0xee]);
    assert!(!km.guard_is_entered());
}

#[test]
fn test_guard_is_released_after_a_failure() {
    let km = setup(Permission::SetData.into());
    km.execute(CONTROLLER, U256::ZERO, &call_callback())
        .unwrap_err();
    assert!(!km.guard_is_entered());

    // the same write outside of a call is not reentrant
    km.execute(CALLBACK, U256::ZERO, &set_data(SLOT, vec![0x01]))
        .unwrap();
    assert_eq!(km.account().get_data(&SLOT).to_vec(), vec![0x01]);
}

#[test]
fn test_reverting_callback_undoes_its_inner_write() {
    let km = key_manager();
    grant(&km, CONTROLLER, Permission::SuperCall.into());
    grant(&km, CALLBACK, Permission::SetData | Permission::Reentrancy);
    allow_data_keys(&km, CALLBACK, &[SLOT.as_slice()]);
    km.account().on_call(CALLBACK, |ctx| {
        ctx.host
            .execute(CALLBACK, U256::ZERO, &set_data(SLOT, vec![0xee]))?;
        Err(AccountError::Reverted {
            target: ctx.target,
            data: Bytes::new(),
        })
    });

    assert!(km.execute(CONTROLLER, U256::ZERO, &call_callback()).is_err());
    assert!(km.account().get_data(&SLOT).is_empty());
}

#[test]
fn test_set_data_does_not_take_the_lock() {
    let km = key_manager();
    grant(&km, CONTROLLER, Permission::SuperSetData.into());

    km.execute(CONTROLLER, U256::ZERO, &set_data(SLOT, vec![0x01]))
        .unwrap();
    km.execute(CONTROLLER, U256::ZERO, &set_data(SLOT, vec![0x02]))
        .unwrap();
    assert!(!km.guard_is_entered());
}

#[test]
fn test_relayed_reentry_needs_reentrancy_too() {
    let km = key_manager();
    let signer = Signer::new(0x31);
    grant(&km, CONTROLLER, Permission::SuperCall.into());
    grant(
        &km,
        signer.address(),
        Permission::SuperSetData | Permission::ExecuteRelayCall,
    );

    let payload = set_data(SLOT, vec![0x0f]);
    let signature = signer.sign_relay(U256::ZERO, U256::ZERO, U256::ZERO, &payload);
    km.account().on_call(CALLBACK, move |ctx| {
        ctx.host
            .execute_relay_call(U256::ZERO, &signature, U256::ZERO, U256::ZERO, &payload)?;
        Ok(Bytes::new())
    });

    assert_eq!(
        km.execute(CONTROLLER, U256::ZERO, &call_callback()),
        Err(KeyManagerError::NotAuthorised {
            from: signer.address(),
            permission: Permission::Reentrancy
        })
    );
    assert_eq!(km.get_nonce(signer.address(), 0), U256::ZERO);
}
