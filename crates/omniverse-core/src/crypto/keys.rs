use k256::{
    ecdsa::{SigningKey, VerifyingKey},
    elliptic_curve::sec1::ToEncodedPoint,
    PublicKey as K256PublicKey,
};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use serde_big_array::BigArray;
use std::fmt;

use crate::crypto::hash::keccak256;
use crate::error::{EncodingError, SignatureError};
use crate::serialize::{decode_hex, encode_hex};

/// Omniverse account key: the uncompressed secp256k1 point without the
/// leading `0x04` format byte (x || y, 64 bytes)
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PublicKey(#[serde(with = "BigArray")] pub [u8; 64]);

impl PublicKey {
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }

    /// Build from 64 raw bytes, checking that they form a curve point
    pub fn from_slice(slice: &[u8]) -> Result<Self, EncodingError> {
        if slice.len() != 64 {
            return Err(EncodingError::InvalidPublicKeyLength(slice.len()));
        }
        let mut bytes = [0u8; 64];
        bytes.copy_from_slice(slice);
        let key = PublicKey(bytes);
        key.to_verifying_key()?;
        Ok(key)
    }

    /// Parse `0x`-prefixed (or bare) hex
    pub fn from_hex(s: &str) -> Result<Self, EncodingError> {
        let bytes = decode_hex(s)?;
        Self::from_slice(&bytes)
    }

    /// `0x`-prefixed hex, the representation ledgers index accounts by
    pub fn to_hex(&self) -> String {
        encode_hex(&self.0)
    }

    pub fn to_verifying_key(&self) -> Result<VerifyingKey, EncodingError> {
        let mut sec1 = [0u8; 65];
        sec1[0] = 0x04;
        sec1[1..].copy_from_slice(&self.0);
        VerifyingKey::from_sec1_bytes(&sec1).map_err(|_| EncodingError::InvalidPublicKey)
    }

    pub(crate) fn from_verifying_key(key: &VerifyingKey) -> Self {
        let point = K256PublicKey::from(key).to_encoded_point(false);
        let encoded = point.as_bytes();
        debug_assert_eq!(encoded[0], 0x04);
        let mut bytes = [0u8; 64];
        bytes.copy_from_slice(&encoded[1..]);
        PublicKey(bytes)
    }

    /// 33-byte compressed SEC1 form, used as the Substrate ECDSA account key
    pub fn to_compressed(&self) -> Result<[u8; 33], EncodingError> {
        let key = self.to_verifying_key()?;
        let point = K256PublicKey::from(&key).to_encoded_point(true);
        let mut bytes = [0u8; 33];
        bytes.copy_from_slice(point.as_bytes());
        Ok(bytes)
    }

    /// EVM account address: last 20 bytes of keccak over the 64-byte key
    pub fn evm_address(&self) -> [u8; 20] {
        let hash = keccak256(&self.0);
        let mut address = [0u8; 20];
        address.copy_from_slice(&hash.as_bytes()[12..]);
        address
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// secp256k1 secret key (32 bytes)
/// Not serializable to prevent accidental exposure
#[derive(Clone)]
pub struct SecretKey(SigningKey);

impl SecretKey {
    /// Generate a new random secret key
    pub fn generate() -> Self {
        SecretKey(SigningKey::random(&mut OsRng))
    }

    /// Create from raw bytes; zero and out-of-range scalars are rejected
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SignatureError> {
        SigningKey::from_slice(bytes)
            .map(SecretKey)
            .map_err(|_| SignatureError::InvalidSecretKey)
    }

    /// Create from hex string, with or without `0x`
    pub fn from_hex(s: &str) -> Result<Self, SignatureError> {
        let bytes = decode_hex(s).map_err(|_| SignatureError::InvalidSecretKey)?;
        if bytes.len() != 32 {
            return Err(SignatureError::InvalidSecretKey);
        }
        Self::from_bytes(&bytes)
    }

    /// Get the corresponding public key
    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_verifying_key(self.0.verifying_key())
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.0
    }

    /// Export raw bytes (use with caution)
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes().into()
    }

    /// Export as `0x`-prefixed hex (use with caution)
    pub fn to_hex(&self) -> String {
        encode_hex(&self.to_bytes())
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey([REDACTED])")
    }
}

/// A keypair containing both secret and public keys
#[derive(Clone)]
pub struct KeyPair {
    pub secret: SecretKey,
    pub public: PublicKey,
}

impl KeyPair {
    /// Generate a new random keypair
    pub fn generate() -> Self {
        let secret = SecretKey::generate();
        let public = secret.public_key();
        KeyPair { secret, public }
    }

    pub fn from_secret(secret: SecretKey) -> Self {
        let public = secret.public_key();
        KeyPair { secret, public }
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE: &str = "0x0000000000000000000000000000000000000000000000000000000000000001";

    #[test]
    fn test_generator_point_for_secret_one() {
        let secret = SecretKey::from_hex(ONE).unwrap();
        assert_eq!(
            secret.public_key().to_hex(),
            "0x79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798\
             483ada7726a3c4655da4fbfc0e1108a8fd17b448a68554199c47d08ffb10d4b8"
        );
    }

    #[test]
    fn test_evm_address_for_secret_one() {
        let public = SecretKey::from_hex(ONE).unwrap().public_key();
        assert_eq!(
            hex::encode(public.evm_address()),
            "7e5f4552091a69125d5dfcb7b8c2659029395bdf"
        );
    }

    #[test]
    fn test_compressed_key_prefix() {
        let public = SecretKey::from_hex(ONE).unwrap().public_key();
        let compressed = public.to_compressed().unwrap();
        // Gy is even
        assert_eq!(compressed[0], 0x02);
        assert_eq!(&compressed[1..], &public.as_bytes()[..32]);
    }

    #[test]
    fn test_public_key_hex_roundtrip() {
        let kp = KeyPair::generate();
        let recovered = PublicKey::from_hex(&kp.public.to_hex()).unwrap();
        assert_eq!(kp.public, recovered);
    }

    #[test]
    fn test_public_key_wrong_length() {
        let err = PublicKey::from_slice(&[1u8; 65]).unwrap_err();
        assert_eq!(err, EncodingError::InvalidPublicKeyLength(65));
    }

    #[test]
    fn test_public_key_off_curve() {
        assert_eq!(
            PublicKey::from_slice(&[0u8; 64]).unwrap_err(),
            EncodingError::InvalidPublicKey
        );
    }

    #[test]
    fn test_secret_key_rejects_zero_and_bad_length() {
        assert!(SecretKey::from_bytes(&[0u8; 32]).is_err());
        assert!(SecretKey::from_hex("0x0102").is_err());
    }

    #[test]
    fn test_secret_key_hex_roundtrip() {
        let kp = KeyPair::generate();
        let restored = SecretKey::from_hex(&kp.secret.to_hex()).unwrap();
        assert_eq!(restored.public_key(), kp.public);
    }
}
