//! LSP25 relay calls: multi-channel nonces, validity windows and signer recovery.
//!
//! A relayed call is authorised by a signature instead of by `msg.sender`. The signer picks a
//! channel (high 128 bits of the nonce) and must use exactly the next sequence number of that
//! channel (low 128 bits). Channels are independent lanes, so one stuck call never blocks
//! another channel of the same signer.

use std::collections::BTreeMap;

use alloy_primitives::{Address, Bytes, U256};
use tracing::{debug, warn};

use crate::{
    config::KeyManagerConfig,
    errors::KeyManagerError,
    utils::{
        bytes::{join_u128_pair, split_u128_pair},
        crypto::recover_signer,
        relay_envelope::relay_call_digest,
    },
};

/// Per-(signer, channel) sequence numbers, with a journal for rollback.
#[derive(Debug, Default)]
pub struct NonceStore {
    sequences: BTreeMap<(Address, u128), u128>,
    journal: Vec<((Address, u128), u128)>,
}

impl NonceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// `channel << 128 | next sequence`: the nonce the next relay call on `channel` must carry.
    pub fn get_nonce(&self, signer: Address, channel: u128) -> U256 {
        join_u128_pair(channel, self.sequence(signer, channel))
    }

    pub fn is_valid_nonce(&self, signer: Address, nonce: U256) -> bool {
        let (channel, sequence) = split_u128_pair(nonce);
        self.sequence(signer, channel) == sequence
    }

    /// Check `nonce` and advance its channel. Returns `false` (and changes nothing) if the nonce
    /// is not the next one for its channel.
    pub fn use_nonce(&mut self, signer: Address, nonce: U256) -> bool {
        let (channel, sequence) = split_u128_pair(nonce);
        let current = self.sequence(signer, channel);
        if current != sequence {
            return false;
        }
        self.journal.push(((signer, channel), current));
        self.sequences
            .insert((signer, channel), current.saturating_add(1));
        true
    }

    pub fn checkpoint(&self) -> usize {
        self.journal.len()
    }

    /// Restore every sequence advanced after `checkpoint`.
    pub fn revert_to(&mut self, checkpoint: usize) {
        while self.journal.len() > checkpoint {
            if let Some((slot, previous)) = self.journal.pop() {
                self.sequences.insert(slot, previous);
            }
        }
    }

    fn sequence(&self, signer: Address, channel: u128) -> u128 {
        self.sequences
            .get(&(signer, channel))
            .copied()
            .unwrap_or_default()
    }
}

/// Reject `now` outside the `start << 128 | end` window. `0` means always valid, an `end` of `0`
/// means no expiry.
pub fn check_validity_timestamps(validity_timestamps: U256, now: u64) -> Result<(), KeyManagerError> {
    if validity_timestamps.is_zero() {
        return Ok(());
    }
    let (start, end) = split_u128_pair(validity_timestamps);
    let now = u128::from(now);
    if now < start {
        return Err(KeyManagerError::RelayCallNotYetValid);
    }
    if end != 0 && now > end {
        return Err(KeyManagerError::RelayCallExpired);
    }
    Ok(())
}

/// One signed relay call as submitted by a relayer.
#[derive(Clone, Copy, Debug)]
pub struct RelayCall<'a> {
    pub signature: &'a [u8],
    pub nonce: U256,
    pub validity_timestamps: U256,
    pub msg_value: U256,
    pub payload: &'a [u8],
}

/// Recover the signer of `call`, consume its nonce and check its validity window.
///
/// The nonce is advanced before the payload runs, so a reentrant call cannot reuse it.
pub fn verify_relay_call(
    config: &KeyManagerConfig,
    nonces: &mut NonceStore,
    now: u64,
    call: &RelayCall<'_>,
) -> Result<Address, KeyManagerError> {
    if call.payload.len() < 4 {
        return Err(KeyManagerError::InvalidPayload {
            payload: Bytes::copy_from_slice(call.payload),
        });
    }

    let digest = relay_call_digest(
        config.address,
        config.chain_id,
        call.nonce,
        call.validity_timestamps,
        call.msg_value,
        call.payload,
    );
    let signer = recover_signer(digest, call.signature).map_err(|err| {
        warn!(%err, "relay signature rejected");
        KeyManagerError::InvalidRelaySignature
    })?;

    if !nonces.use_nonce(signer, call.nonce) {
        warn!(%signer, nonce = %call.nonce, "invalid relay nonce");
        return Err(KeyManagerError::InvalidRelayNonce {
            signer,
            nonce: call.nonce,
            signature: Bytes::copy_from_slice(call.signature),
        });
    }

    check_validity_timestamps(call.validity_timestamps, now)?;

    debug!(%signer, nonce = %call.nonce, "relay call verified");
    Ok(signer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SIGNER: Address = Address::new([0x5a; 20]);

    #[test]
    fn nonces_advance_per_channel() {
        let mut nonces = NonceStore::new();
        let channel_one = join_u128_pair(1, 0);

        assert!(nonces.use_nonce(SIGNER, U256::ZERO));
        assert!(!nonces.use_nonce(SIGNER, U256::ZERO));
        assert!(nonces.use_nonce(SIGNER, channel_one));

        assert_eq!(nonces.get_nonce(SIGNER, 0), U256::from(1));
        assert_eq!(nonces.get_nonce(SIGNER, 1), join_u128_pair(1, 1));
        assert_eq!(nonces.get_nonce(SIGNER, 2), join_u128_pair(2, 0));
        assert_eq!(nonces.get_nonce(Address::ZERO, 0), U256::ZERO);
    }

    #[test]
    fn out_of_order_nonces_are_refused() {
        let mut nonces = NonceStore::new();
        assert!(!nonces.is_valid_nonce(SIGNER, U256::from(1)));
        assert!(!nonces.use_nonce(SIGNER, U256::from(1)));
        assert_eq!(nonces.get_nonce(SIGNER, 0), U256::ZERO);
    }

    #[test]
    fn rollback_restores_sequences() {
        let mut nonces = NonceStore::new();
        assert!(nonces.use_nonce(SIGNER, U256::ZERO));
        let checkpoint = nonces.checkpoint();
        assert!(nonces.use_nonce(SIGNER, U256::from(1)));
        assert!(nonces.use_nonce(SIGNER, join_u128_pair(9, 0)));

        nonces.revert_to(checkpoint);

        assert_eq!(nonces.get_nonce(SIGNER, 0), U256::from(1));
        assert_eq!(nonces.get_nonce(SIGNER, 9), join_u128_pair(9, 0));
    }

    #[test]
    fn validity_windows() {
        assert_eq!(check_validity_timestamps(U256::ZERO, 0), Ok(()));

        let window = join_u128_pair(100, 200);
        assert_eq!(
            check_validity_timestamps(window, 99),
            Err(KeyManagerError::RelayCallNotYetValid)
        );
        assert_eq!(check_validity_timestamps(window, 100), Ok(()));
        assert_eq!(check_validity_timestamps(window, 200), Ok(()));
        assert_eq!(
            check_validity_timestamps(window, 201),
            Err(KeyManagerError::RelayCallExpired)
        );

        let open_ended = join_u128_pair(100, 0);
        assert_eq!(check_validity_timestamps(open_ended, u64::MAX), Ok(()));
    }

    #[test]
    fn short_payloads_are_rejected_before_recovery() {
        let config = KeyManagerConfig::new(Address::repeat_byte(0x4b), 1);
        let call = RelayCall {
            signature: &[0u8; 65],
            nonce: U256::ZERO,
            validity_timestamps: U256::ZERO,
            msg_value: U256::ZERO,
            payload: &[0x01],
        };
        assert!(matches!(
            verify_relay_call(&config, &mut NonceStore::new(), 0, &call),
            Err(KeyManagerError::InvalidPayload { .. })
        ));
    }

    #[test]
    fn garbage_signatures_are_rejected() {
        let config = KeyManagerConfig::new(Address::repeat_byte(0x4b), 1);
        let call = RelayCall {
            signature: &[0u8; 65],
            nonce: U256::ZERO,
            validity_timestamps: U256::ZERO,
            msg_value: U256::ZERO,
            payload: &[0x44, 0xc0, 0x28, 0xfe],
        };
        assert_eq!(
            verify_relay_call(&config, &mut NonceStore::new(), 0, &call),
            Err(KeyManagerError::InvalidRelaySignature)
        );
    }

    proptest! {
        #[test]
        fn each_channel_counts_its_own_calls(channels in prop::collection::vec(0u128..4, 0..40)) {
            let mut nonces = NonceStore::new();
            let mut expected = [0u128; 4];
            for channel in &channels {
                let nonce = nonces.get_nonce(SIGNER, *channel);
                prop_assert!(nonces.use_nonce(SIGNER, nonce));
                expected[*channel as usize] += 1;
            }
            for (channel, count) in expected.iter().enumerate() {
                prop_assert_eq!(
                    nonces.get_nonce(SIGNER, channel as u128),
                    join_u128_pair(channel as u128, *count)
                );
            }

            nonces.revert_to(0);
            for channel in 0..4u128 {
                prop_assert_eq!(nonces.get_nonce(SIGNER, channel), join_u128_pair(channel, 0));
            }
        }
    }
}
