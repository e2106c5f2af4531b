//! Omniverse Core - envelope encoding, hashing, signing and AMM quoting
//!
//! This crate holds the backend-agnostic part of the omniverse transaction
//! protocol: every ledger recomputes the same keccak digest from the same
//! canonical bytes, so nothing here performs I/O.

pub mod context;
pub mod crypto;
pub mod encoding;
pub mod error;
pub mod serialize;
pub mod types;

pub use context::SigningContext;
pub use crypto::{keccak256, recover, sign, verify, Hash, KeyPair, PublicKey, SecretKey, Sig};
pub use encoding::{canonical_bytes, canonical_bytes_from_blob};
pub use error::{AmmError, CoreError, EncodingError, SignatureError};
pub use serialize::{decode_hex, encode_hex, parse_amount};
pub use types::*;
