use std::fmt;

use crate::crypto::{keccak256, sign, verify, Hash, PublicKey, SecretKey, Sig};
use crate::encoding::canonical_bytes;
use crate::error::{CoreError, EncodingError};
use crate::serialize::{decode_hex, encode_hex};
use crate::types::payload::{Fungible, OpcodeTable};

/// The on-chain entity a transaction targets
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Initiator {
    /// Textual token identifier, encoded as its UTF-8 bytes
    Token(String),
    /// Raw 20- or 32-byte contract address
    Contract(Vec<u8>),
}

impl Initiator {
    pub fn token(id: impl Into<String>) -> Self {
        Initiator::Token(id.into())
    }

    /// Parse a `0x`-prefixed contract address of 20 or 32 bytes
    pub fn contract_from_hex(s: &str) -> Result<Self, EncodingError> {
        let bytes = decode_hex(s)?;
        match bytes.len() {
            20 | 32 => Ok(Initiator::Contract(bytes)),
            n => Err(EncodingError::InvalidAddressLength(n)),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Initiator::Token(id) => id.as_bytes(),
            Initiator::Contract(address) => address,
        }
    }

    /// Representation placed in wire calls: the token id or the hex address
    pub fn to_wire(&self) -> String {
        match self {
            Initiator::Token(id) => id.clone(),
            Initiator::Contract(address) => encode_hex(address),
        }
    }
}

impl fmt::Display for Initiator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}

/// Transaction fields covered by the signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedEnvelope {
    pub nonce: u128,
    pub chain_id: u32,
    pub initiator: Initiator,
    pub from: PublicKey,
    pub payload: Fungible,
}

impl UnsignedEnvelope {
    pub fn new(
        nonce: u128,
        chain_id: u32,
        initiator: Initiator,
        from: PublicKey,
        payload: Fungible,
    ) -> Self {
        UnsignedEnvelope {
            nonce,
            chain_id,
            initiator,
            from,
            payload,
        }
    }

    /// Canonical bytes under the given backend numbering
    pub fn signing_bytes(&self, table: &OpcodeTable) -> Result<Vec<u8>, EncodingError> {
        Ok(canonical_bytes(
            self.nonce,
            self.chain_id,
            self.initiator.as_bytes(),
            &self.from,
            table.opcode(self.payload.kind)?,
            &self.payload.ex_data,
            self.payload.amount,
        ))
    }

    pub fn signing_hash(&self, table: &OpcodeTable) -> Result<Hash, EncodingError> {
        Ok(keccak256(&self.signing_bytes(table)?))
    }

    /// Sign and seal. The sender key must match `from`.
    pub fn sign(
        self,
        secret_key: &SecretKey,
        table: &OpcodeTable,
    ) -> Result<TransactionEnvelope, CoreError> {
        let hash = self.signing_hash(table)?;
        let signature = sign(secret_key, &hash)?;
        verify(&self.from, &hash, &signature)?;
        Ok(TransactionEnvelope {
            data: self,
            hash,
            signature,
        })
    }
}

/// A signed envelope. Immutable: re-signing with a new nonce means building
/// a new [`UnsignedEnvelope`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionEnvelope {
    data: UnsignedEnvelope,
    hash: Hash,
    signature: Sig,
}

impl TransactionEnvelope {
    /// Reassemble an envelope received from elsewhere; the signature is
    /// checked against the recomputed hash before it is accepted.
    pub fn from_parts(
        data: UnsignedEnvelope,
        signature: Sig,
        table: &OpcodeTable,
    ) -> Result<Self, CoreError> {
        let hash = data.signing_hash(table)?;
        verify(&data.from, &hash, &signature)?;
        Ok(TransactionEnvelope {
            data,
            hash,
            signature,
        })
    }

    pub fn nonce(&self) -> u128 {
        self.data.nonce
    }

    pub fn chain_id(&self) -> u32 {
        self.data.chain_id
    }

    pub fn initiator(&self) -> &Initiator {
        &self.data.initiator
    }

    pub fn from(&self) -> &PublicKey {
        &self.data.from
    }

    pub fn payload(&self) -> &Fungible {
        &self.data.payload
    }

    pub fn data(&self) -> &UnsignedEnvelope {
        &self.data
    }

    /// Keccak digest that was signed
    pub fn hash(&self) -> &Hash {
        &self.hash
    }

    pub fn signature(&self) -> &Sig {
        &self.signature
    }

    /// SCALE payload blob, as carried in the `payload` wire field
    pub fn payload_blob(&self, table: &OpcodeTable) -> Result<Vec<u8>, EncodingError> {
        self.data.payload.encode(table)
    }
}
