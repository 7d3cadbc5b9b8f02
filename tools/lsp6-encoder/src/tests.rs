#[cfg(test)]
mod tests {
    use crate::encoder::{
        encode_controller_setup, encode_relay_call, encode_set_data_batch, relay_call_digest,
        sign_relay_call, signer_address,
    };
    use crate::types::{ControllerSetup, RelayCallEnvelope};
    use alloy_primitives::{address, b256, Address, Bytes, U256};
    use alloy_sol_types::SolCall;
    use k256::ecdsa::SigningKey;
    use lsp6_key_manager::{
        utils::crypto::recover_signer, KeyManager, KeyManagerConfig, MemoryAccount, Registry,
    };
    use lsp6_types::{
        interfaces::ILSP6KeyManager,
        keys::{permissions_key, ADDRESS_PERMISSIONS_ARRAY},
        AllowedCall, CallTypes, Erc725YStore, Permission, Permissions,
    };

    const KEY_MANAGER: Address = address!("5fbdb2315678afecb367f032d93f642f64180aa3");

    fn envelope(payload: Vec<u8>) -> RelayCallEnvelope {
        RelayCallEnvelope {
            key_manager: KEY_MANAGER,
            chain_id: 4201,
            nonce: U256::ZERO,
            validity_timestamps: U256::ZERO,
            msg_value: U256::ZERO,
            payload,
            signature: Vec::new(),
        }
    }

    fn setup(index: u128) -> ControllerSetup {
        ControllerSetup {
            controller: Address::repeat_byte(0x5e),
            permissions: Permission::Call | Permission::SetData,
            allowed_calls: vec![AllowedCall::any(CallTypes::CALL)],
            allowed_data_keys: vec![vec![0xbe, 0xef]],
            index,
        }
    }

    #[test]
    fn test_relay_call_digest_vector() {
        let digest = relay_call_digest(&envelope(vec![0xde, 0xad, 0xbe, 0xef]));
        assert_eq!(
            digest,
            b256!("6e6a0380c58e5262ffa249b7ae27b9ee28d001853ed1e92eef0227034095afab")
        );
    }

    #[test]
    fn test_signature_recovers_signer() {
        let key = SigningKey::from_slice(&[0x42; 32]).unwrap();
        let mut env = envelope(vec![0x01, 0x02, 0x03, 0x04]);
        sign_relay_call(&mut env, &key).unwrap();

        assert_eq!(env.signature.len(), 65);
        assert!(env.signature[64] == 27 || env.signature[64] == 28);
        let recovered = recover_signer(relay_call_digest(&env), &env.signature).unwrap();
        assert_eq!(recovered, signer_address(&key));
    }

    #[test]
    fn test_encode_relay_call() {
        let mut env = envelope(vec![0x01, 0x02, 0x03, 0x04]);
        env.signature = vec![0u8; 65];
        env.nonce = U256::from(7);

        let encoded = encode_relay_call(&env);
        let decoded = ILSP6KeyManager::executeRelayCallCall::abi_decode(&encoded, true).unwrap();
        assert_eq!(decoded.nonce, U256::from(7));
        assert_eq!(decoded.payload.to_vec(), vec![0x01, 0x02, 0x03, 0x04]);
        assert_eq!(decoded.signature.len(), 65);
    }

    #[test]
    fn test_encode_controller_setup() {
        let entries = encode_controller_setup(&setup(1), 1).unwrap();
        // length, index, permissions, allowed calls, allowed data keys
        assert_eq!(entries.len(), 5);
        assert_eq!(entries.data_keys[0], ADDRESS_PERMISSIONS_ARRAY);
        assert_eq!(entries.data_values[0].len(), 16);
        assert_eq!(entries.data_values[0][15], 2);

        // slot already inside the array: length untouched
        let entries = encode_controller_setup(&setup(0), 3).unwrap();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries.data_keys[1], permissions_key(Address::repeat_byte(0x5e)));
    }

    #[test]
    fn test_invalid_data_key_prefix() {
        let mut bad = setup(0);
        bad.allowed_data_keys = vec![vec![0u8; 33]];
        assert!(encode_controller_setup(&bad, 0).is_err());
    }

    #[test]
    fn test_setup_is_accepted_by_the_key_manager() {
        let account = MemoryAccount::new(Address::repeat_byte(0xac), KEY_MANAGER);
        let km = KeyManager::new(KeyManagerConfig::new(KEY_MANAGER, 4201), account);
        let admin = Address::repeat_byte(0xad);
        Registry::new(km.account()).set_permissions(admin, Permission::AddController.into());

        let entries = encode_controller_setup(&setup(1), 1).unwrap();
        km.execute(admin, U256::ZERO, &encode_set_data_batch(&entries))
            .unwrap();

        let registry = Registry::new(km.account());
        assert_eq!(registry.controllers(), vec![admin, Address::repeat_byte(0x5e)]);
        assert_eq!(
            registry.get_permissions(Address::repeat_byte(0x5e)),
            Permission::Call | Permission::SetData
        );
    }

    #[test]
    fn test_signed_relay_call_runs() {
        let key = SigningKey::from_slice(&[0x43; 32]).unwrap();
        let signer = signer_address(&key);
        let account = MemoryAccount::new(Address::repeat_byte(0xac), KEY_MANAGER);
        let km = KeyManager::new(KeyManagerConfig::new(KEY_MANAGER, 4201), account);
        Registry::new(km.account()).set_permissions(
            signer,
            Permissions::from(Permission::SuperSetData) | Permission::ExecuteRelayCall,
        );

        let data_key = alloy_primitives::B256::repeat_byte(0x10);
        let payload = lsp6_types::interfaces::IERC725Y::setDataCall {
            dataKey: data_key,
            dataValue: Bytes::from_static(&[0x01]),
        }
        .abi_encode();
        let mut env = envelope(payload);
        sign_relay_call(&mut env, &key).unwrap();

        km.execute_relay_call(
            env.msg_value,
            &env.signature,
            env.nonce,
            env.validity_timestamps,
            &env.payload,
        )
        .unwrap();
        assert_eq!(km.account().get_data(&data_key).to_vec(), vec![0x01]);
    }
}
