use thiserror::Error;

/// Failures while turning a logical transaction into canonical bytes.
#[derive(Debug, Error, PartialEq)]
pub enum EncodingError {
    #[error("Hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),

    #[error("Invalid public key length: expected 64 bytes, got {0}")]
    InvalidPublicKeyLength(usize),

    #[error("Public key is not a point on secp256k1")]
    InvalidPublicKey,

    #[error("Invalid contract address length: expected 20 or 32 bytes, got {0}")]
    InvalidAddressLength(usize),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Opcode {opcode} is not defined for the {scheme} scheme")]
    UnknownOpcode { scheme: &'static str, opcode: u8 },

    #[error("{kind} is not supported by the {scheme} scheme")]
    UnsupportedOperation { scheme: &'static str, kind: &'static str },

    #[error("Payload truncated: needed {needed} more bytes")]
    Truncated { needed: usize },

    #[error("Payload has {0} trailing bytes")]
    TrailingBytes(usize),

    #[error("Invalid compact length prefix")]
    InvalidCompact,
}

/// Failures while producing or checking a recoverable signature.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Invalid secret key")]
    InvalidSecretKey,

    #[error("Malformed signature: {0}")]
    Malformed(String),

    #[error("Invalid recovery marker 0x{0:02x}, expected 0x1b or 0x1c")]
    InvalidRecoveryMarker(u8),

    #[error("Public key recovery failed")]
    RecoveryFailed,

    #[error("Signer mismatch: expected {expected}, recovered {recovered}")]
    SignerMismatch { expected: String, recovered: String },

    #[error("Signing failed: {0}")]
    SigningFailed(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmmError {
    #[error("Arithmetic overflow while quoting")]
    Overflow,
}

#[derive(Debug, Error, PartialEq)]
pub enum CoreError {
    #[error("Encoding error: {0}")]
    Encoding(#[from] EncodingError),

    #[error("Signature error: {0}")]
    Signature(#[from] SignatureError),

    #[error("AMM error: {0}")]
    Amm(#[from] AmmError),
}

impl From<hex::FromHexError> for CoreError {
    fn from(e: hex::FromHexError) -> Self {
        CoreError::Encoding(EncodingError::HexDecode(e))
    }
}
