//! Canonical envelope encoding.
//!
//! Every backend recomputes the signed digest from these bytes, so the
//! layout is fixed:
//!
//! | field      | size     | encoding                         |
//! |------------|----------|----------------------------------|
//! | nonce      | 16       | big-endian                       |
//! | chain id   | 4        | big-endian                       |
//! | initiator  | variable | UTF-8 token id or raw address    |
//! | from       | 64       | uncompressed key, no format byte |
//! | opcode     | 1        | backend-specific numbering       |
//! | ex_data    | variable | raw, no length prefix            |
//! | amount     | 16       | big-endian                       |

use crate::crypto::PublicKey;
use crate::error::EncodingError;
use crate::types::payload::{Fungible, OpcodeTable};

pub const NONCE_LEN: usize = 16;
pub const CHAIN_ID_LEN: usize = 4;
pub const AMOUNT_LEN: usize = 16;

pub fn canonical_bytes(
    nonce: u128,
    chain_id: u32,
    initiator: &[u8],
    from: &PublicKey,
    opcode: u8,
    ex_data: &[u8],
    amount: u128,
) -> Vec<u8> {
    let mut out = Vec::with_capacity(
        NONCE_LEN + CHAIN_ID_LEN + initiator.len() + 64 + 1 + ex_data.len() + AMOUNT_LEN,
    );
    out.extend_from_slice(&nonce.to_be_bytes());
    out.extend_from_slice(&chain_id.to_be_bytes());
    out.extend_from_slice(initiator);
    out.extend_from_slice(from.as_bytes());
    out.push(opcode);
    out.extend_from_slice(ex_data);
    out.extend_from_slice(&amount.to_be_bytes());
    out
}

/// Canonical bytes for a caller that only holds the SCALE payload blob.
/// The blob is decoded first, then the raw fields are laid out as usual.
pub fn canonical_bytes_from_blob(
    nonce: u128,
    chain_id: u32,
    initiator: &[u8],
    from: &PublicKey,
    payload_blob: &[u8],
    table: &OpcodeTable,
) -> Result<Vec<u8>, EncodingError> {
    let payload = Fungible::decode(payload_blob, table)?;
    Ok(canonical_bytes(
        nonce,
        chain_id,
        initiator,
        from,
        table.opcode(payload.kind)?,
        &payload.ex_data,
        payload.amount,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;
    use crate::types::payload::PayloadKind;

    const PALLET: OpcodeTable = OpcodeTable::new("pallet", Some(0), Some(1), Some(2));

    #[test]
    fn test_field_offsets() {
        let kp = KeyPair::generate();
        let bytes = canonical_bytes(1, 1, b"TKN1", &kp.public, 0, &[0u8; 32], 500);

        assert_eq!(&bytes[..16], &1u128.to_be_bytes());
        assert_eq!(&bytes[16..20], &[0, 0, 0, 1]);
        assert_eq!(&bytes[20..24], b"TKN1");
        assert_eq!(&bytes[24..88], kp.public.as_bytes());
        assert_eq!(bytes[88], 0);
        assert_eq!(&bytes[89..121], &[0u8; 32]);
        assert_eq!(&bytes[121..], &500u128.to_be_bytes());
    }

    #[test]
    fn test_blob_path_matches_structured_path() {
        let kp = KeyPair::generate();
        let payload = Fungible::new(PayloadKind::Mint, vec![9u8; 64], 12_345);
        let blob = payload.encode(&PALLET).unwrap();

        let from_blob =
            canonical_bytes_from_blob(4, 2, b"TKN2", &kp.public, &blob, &PALLET).unwrap();
        let direct = canonical_bytes(4, 2, b"TKN2", &kp.public, 1, &payload.ex_data, 12_345);
        assert_eq!(from_blob, direct);
    }

    #[test]
    fn test_blob_path_rejects_bad_blob() {
        let kp = KeyPair::generate();
        assert!(canonical_bytes_from_blob(0, 0, b"T", &kp.public, &[0x09], &PALLET).is_err());
    }
}
