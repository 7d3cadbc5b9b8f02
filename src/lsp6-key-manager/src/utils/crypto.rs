//! Signer recovery for relay calls and ERC-1271 checks.

use alloy_primitives::{keccak256, Address, B256};
use k256::{
    ecdsa::{RecoveryId, Signature, VerifyingKey},
    elliptic_curve::sec1::ToEncodedPoint,
    PublicKey,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("signature must be 65 bytes, got {0}")]
    InvalidLength(usize),
    #[error("unsupported recovery byte {0}")]
    InvalidRecoveryId(u8),
    #[error("malformed r/s values")]
    Malformed,
    /// `s` in the upper half of the curve order.
    #[error("non-canonical signature (high s)")]
    HighS,
    #[error("public key recovery failed")]
    Unrecoverable,
}

/// Recover the address that signed `digest` with a 65-byte `r ++ s ++ v` signature.
///
/// Notes:
/// - v may be 27/28 or the raw recovery id 0/1.
/// - High-s signatures are rejected, as `ECDSA.recover` does.
pub fn recover_signer(digest: B256, signature: &[u8]) -> Result<Address, SignatureError> {
    if signature.len() != 65 {
        return Err(SignatureError::InvalidLength(signature.len()));
    }
    let v = signature[64];
    let recovery_id = match v {
        27 | 28 => RecoveryId::from_byte(v - 27),
        0 | 1 => RecoveryId::from_byte(v),
        _ => None,
    }
    .ok_or(SignatureError::InvalidRecoveryId(v))?;

    let signature =
        Signature::from_slice(&signature[..64]).map_err(|_| SignatureError::Malformed)?;
    if signature.normalize_s().is_some() {
        return Err(SignatureError::HighS);
    }

    let key = VerifyingKey::recover_from_prehash(digest.as_slice(), &signature, recovery_id)
        .map_err(|_| SignatureError::Unrecoverable)?;
    Ok(public_key_to_address(&key))
}

/// Ethereum address of a secp256k1 key: last 20 bytes of keccak(uncompressed point).
pub fn public_key_to_address(key: &VerifyingKey) -> Address {
    let point = PublicKey::from(key).to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::SigningKey;

    fn signing_key() -> SigningKey {
        SigningKey::from_slice(&[0x42; 32]).unwrap()
    }

    fn sign(key: &SigningKey, digest: B256) -> Vec<u8> {
        let (signature, recovery_id) = key.sign_prehash_recoverable(digest.as_slice()).unwrap();
        let mut out = signature.to_bytes().to_vec();
        out.push(recovery_id.to_byte() + 27);
        out
    }

    #[test]
    fn recovers_the_signer() {
        let key = signing_key();
        let digest = keccak256(b"lsp6");
        let signature = sign(&key, digest);

        assert_eq!(
            recover_signer(digest, &signature),
            Ok(public_key_to_address(key.verifying_key()))
        );
    }

    #[test]
    fn raw_recovery_ids_are_accepted() {
        let key = signing_key();
        let digest = keccak256(b"lsp6");
        let mut signature = sign(&key, digest);
        signature[64] -= 27;

        assert_eq!(
            recover_signer(digest, &signature),
            Ok(public_key_to_address(key.verifying_key()))
        );
    }

    #[test]
    fn rejects_bad_shapes() {
        let digest = keccak256(b"lsp6");
        assert_eq!(
            recover_signer(digest, &[0u8; 64]),
            Err(SignatureError::InvalidLength(64))
        );

        let mut signature = sign(&signing_key(), digest);
        signature[64] = 29;
        assert_eq!(
            recover_signer(digest, &signature),
            Err(SignatureError::InvalidRecoveryId(29))
        );

        assert_eq!(
            recover_signer(digest, &[0u8; 65]),
            Err(SignatureError::Malformed)
        );
    }

    #[test]
    fn other_digest_recovers_someone_else() {
        let key = signing_key();
        let signature = sign(&key, keccak256(b"lsp6"));
        let recovered = recover_signer(keccak256(b"lsp7"), &signature);
        assert_ne!(recovered, Ok(public_key_to_address(key.verifying_key())));
    }
}
