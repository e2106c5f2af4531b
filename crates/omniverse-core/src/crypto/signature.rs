use k256::ecdsa::{RecoveryId, Signature as K256Signature, VerifyingKey};
use serde::{Deserialize, Serialize};
use serde_big_array::BigArray;
use std::fmt;

use crate::crypto::hash::Hash;
use crate::crypto::keys::{PublicKey, SecretKey};
use crate::error::SignatureError;
use crate::serialize::{decode_hex, encode_hex};

/// Recovery marker offset (Ethereum style: 27/28 instead of 0/1)
const RECOVERY_OFFSET: u8 = 0x1b;

/// Recoverable ECDSA signature: r (32) || s (32) || v (1), v in {0x1b, 0x1c}
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sig(#[serde(with = "BigArray")] pub [u8; 65]);

impl Sig {
    pub fn as_bytes(&self) -> &[u8; 65] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }

    pub fn from_slice(slice: &[u8]) -> Result<Self, SignatureError> {
        if slice.len() != 65 {
            return Err(SignatureError::Malformed(format!(
                "expected 65 bytes, got {}",
                slice.len()
            )));
        }
        let mut bytes = [0u8; 65];
        bytes.copy_from_slice(slice);
        Ok(Sig(bytes))
    }

    pub fn from_hex(s: &str) -> Result<Self, SignatureError> {
        let bytes = decode_hex(s).map_err(|e| SignatureError::Malformed(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    pub fn to_hex(&self) -> String {
        encode_hex(&self.0)
    }

    pub fn recovery_marker(&self) -> u8 {
        self.0[64]
    }

    fn recovery_id(&self) -> Result<RecoveryId, SignatureError> {
        let marker = self.recovery_marker();
        marker
            .checked_sub(RECOVERY_OFFSET)
            .and_then(RecoveryId::from_byte)
            .filter(|id| id.to_byte() <= 1)
            .ok_or(SignatureError::InvalidRecoveryMarker(marker))
    }
}

impl Default for Sig {
    fn default() -> Self {
        Sig([0u8; 65])
    }
}

impl fmt::Debug for Sig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sig({}...)", &self.to_hex()[..18])
    }
}

impl fmt::Display for Sig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Sign a 32-byte digest. Nonces follow RFC 6979, so the same key and
/// digest always produce the same signature.
pub fn sign(secret_key: &SecretKey, digest: &Hash) -> Result<Sig, SignatureError> {
    let (signature, recovery_id) = secret_key
        .signing_key()
        .sign_prehash_recoverable(digest.as_bytes())
        .map_err(|e| SignatureError::SigningFailed(e.to_string()))?;

    let mut bytes = [0u8; 65];
    bytes[..64].copy_from_slice(&signature.to_bytes());
    bytes[64] = RECOVERY_OFFSET + recovery_id.to_byte();
    Ok(Sig(bytes))
}

/// Recover the signer of a digest
pub fn recover(digest: &Hash, signature: &Sig) -> Result<PublicKey, SignatureError> {
    let recovery_id = signature.recovery_id()?;
    let rs = K256Signature::from_slice(&signature.0[..64])
        .map_err(|e| SignatureError::Malformed(e.to_string()))?;
    let key = VerifyingKey::recover_from_prehash(digest.as_bytes(), &rs, recovery_id)
        .map_err(|_| SignatureError::RecoveryFailed)?;
    Ok(PublicKey::from_verifying_key(&key))
}

/// Verify that `signature` over `digest` was produced by `public_key`.
///
/// A malformed signature and a valid signature from another key are
/// reported as different errors.
pub fn verify(public_key: &PublicKey, digest: &Hash, signature: &Sig) -> Result<(), SignatureError> {
    let recovered = recover(digest, signature)?;
    if recovered != *public_key {
        return Err(SignatureError::SignerMismatch {
            expected: public_key.to_hex(),
            recovered: recovered.to_hex(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hash::keccak256;
    use crate::crypto::keys::KeyPair;

    #[test]
    fn test_sign_and_verify() {
        let kp = KeyPair::generate();
        let digest = keccak256(b"hello world");
        let sig = sign(&kp.secret, &digest).unwrap();
        assert!(verify(&kp.public, &digest, &sig).is_ok());
    }

    #[test]
    fn test_recovery_marker_normalized() {
        let kp = KeyPair::generate();
        for i in 0..16u8 {
            let sig = sign(&kp.secret, &keccak256(&[i])).unwrap();
            assert!(matches!(sig.recovery_marker(), 0x1b | 0x1c));
        }
    }

    #[test]
    fn test_signing_is_deterministic() {
        let kp = KeyPair::generate();
        let digest = keccak256(b"same digest");
        let sig1 = sign(&kp.secret, &digest).unwrap();
        let sig2 = sign(&kp.secret, &digest).unwrap();
        assert_eq!(sig1, sig2);
    }

    #[test]
    fn test_verify_wrong_digest() {
        let kp = KeyPair::generate();
        let sig = sign(&kp.secret, &keccak256(b"hello world")).unwrap();
        assert!(verify(&kp.public, &keccak256(b"wrong message"), &sig).is_err());
    }

    #[test]
    fn test_verify_wrong_key_is_mismatch() {
        let kp1 = KeyPair::generate();
        let kp2 = KeyPair::generate();
        let digest = keccak256(b"hello world");
        let sig = sign(&kp1.secret, &digest).unwrap();
        assert!(matches!(
            verify(&kp2.public, &digest, &sig),
            Err(SignatureError::SignerMismatch { .. })
        ));
    }

    #[test]
    fn test_raw_recovery_id_is_rejected() {
        let kp = KeyPair::generate();
        let digest = keccak256(b"raw v");
        let mut sig = sign(&kp.secret, &digest).unwrap();
        sig.0[64] -= RECOVERY_OFFSET;
        assert!(matches!(
            verify(&kp.public, &digest, &sig),
            Err(SignatureError::InvalidRecoveryMarker(_))
        ));
    }

    #[test]
    fn test_zero_signature_is_malformed() {
        let kp = KeyPair::generate();
        let mut sig = Sig::default();
        sig.0[64] = 0x1b;
        assert!(matches!(
            verify(&kp.public, &keccak256(b"x"), &sig),
            Err(SignatureError::Malformed(_))
        ));
    }

    #[test]
    fn test_every_flipped_byte_fails() {
        let kp = KeyPair::generate();
        let digest = keccak256(b"flip me");
        let sig = sign(&kp.secret, &digest).unwrap();

        for i in 0..65 {
            let mut tampered = sig;
            tampered.0[i] ^= 0x01;
            assert!(verify(&kp.public, &digest, &tampered).is_err(), "sig byte {}", i);
        }
        for i in 0..32 {
            let mut tampered = digest;
            tampered.0[i] ^= 0x01;
            assert!(verify(&kp.public, &tampered, &sig).is_err(), "digest byte {}", i);
        }
    }

    #[test]
    fn test_sig_hex_roundtrip() {
        let kp = KeyPair::generate();
        let sig = sign(&kp.secret, &keccak256(b"test")).unwrap();
        let recovered = Sig::from_hex(&sig.to_hex()).unwrap();
        assert_eq!(sig, recovered);
    }
}
