use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::EncodingError;

/// Fungible operation carried by an envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PayloadKind {
    Transfer,
    Mint,
    Burn,
}

impl PayloadKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadKind::Transfer => "Transfer",
            PayloadKind::Mint => "Mint",
            PayloadKind::Burn => "Burn",
        }
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opcode numbering for one backend.
///
/// Backends disagree on the byte each operation maps to, so every adapter
/// owns its table and the encoder is always handed one explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeTable {
    pub name: &'static str,
    transfer: Option<u8>,
    mint: Option<u8>,
    burn: Option<u8>,
}

impl OpcodeTable {
    pub const fn new(
        name: &'static str,
        transfer: Option<u8>,
        mint: Option<u8>,
        burn: Option<u8>,
    ) -> Self {
        OpcodeTable {
            name,
            transfer,
            mint,
            burn,
        }
    }

    /// Byte used on the wire for `kind`
    pub fn opcode(&self, kind: PayloadKind) -> Result<u8, EncodingError> {
        let entry = match kind {
            PayloadKind::Transfer => self.transfer,
            PayloadKind::Mint => self.mint,
            PayloadKind::Burn => self.burn,
        };
        entry.ok_or(EncodingError::UnsupportedOperation {
            scheme: self.name,
            kind: kind.as_str(),
        })
    }

    /// Operation denoted by a wire byte
    pub fn kind(&self, opcode: u8) -> Result<PayloadKind, EncodingError> {
        [PayloadKind::Transfer, PayloadKind::Mint, PayloadKind::Burn]
            .into_iter()
            .find(|kind| self.opcode(*kind).ok() == Some(opcode))
            .ok_or(EncodingError::UnknownOpcode {
                scheme: self.name,
                opcode,
            })
    }
}

/// Fungible payload: `{ op: u8, ex_data: Vec<u8>, amount: u128 }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fungible {
    pub kind: PayloadKind,
    /// Operation data, typically the 32- or 64-byte recipient
    pub ex_data: Vec<u8>,
    pub amount: u128,
}

impl Fungible {
    pub fn new(kind: PayloadKind, ex_data: Vec<u8>, amount: u128) -> Self {
        Fungible {
            kind,
            ex_data,
            amount,
        }
    }

    /// SCALE encoding: op byte, compact length + ex_data, amount little-endian
    pub fn encode(&self, table: &OpcodeTable) -> Result<Vec<u8>, EncodingError> {
        let mut out = Vec::with_capacity(1 + 5 + self.ex_data.len() + 16);
        out.push(table.opcode(self.kind)?);
        encode_compact(self.ex_data.len() as u64, &mut out);
        out.extend_from_slice(&self.ex_data);
        out.extend_from_slice(&self.amount.to_le_bytes());
        Ok(out)
    }

    /// Inverse of [`Fungible::encode`]; the whole input must be consumed
    pub fn decode(bytes: &[u8], table: &OpcodeTable) -> Result<Self, EncodingError> {
        let mut reader = Reader { bytes, pos: 0 };

        let opcode = reader.take(1)?[0];
        let kind = table.kind(opcode)?;
        let len = decode_compact(&mut reader)?;
        let len = usize::try_from(len).map_err(|_| EncodingError::InvalidCompact)?;
        let ex_data = reader.take(len)?.to_vec();
        let mut amount = [0u8; 16];
        amount.copy_from_slice(reader.take(16)?);

        let rest = reader.remaining();
        if rest > 0 {
            return Err(EncodingError::TrailingBytes(rest));
        }

        Ok(Fungible {
            kind,
            ex_data,
            amount: u128::from_le_bytes(amount),
        })
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], EncodingError> {
        let available = self.remaining();
        if n > available {
            return Err(EncodingError::Truncated {
                needed: n - available,
            });
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }
}

fn encode_compact(value: u64, out: &mut Vec<u8>) {
    match value {
        0..=0x3f => out.push((value as u8) << 2),
        0x40..=0x3fff => out.extend_from_slice(&(((value as u16) << 2) | 0b01).to_le_bytes()),
        0x4000..=0x3fff_ffff => {
            out.extend_from_slice(&(((value as u32) << 2) | 0b10).to_le_bytes())
        }
        _ => {
            let bytes = value.to_le_bytes();
            let len = 8 - (value.leading_zeros() / 8) as usize;
            out.push((((len - 4) as u8) << 2) | 0b11);
            out.extend_from_slice(&bytes[..len]);
        }
    }
}

// Non-canonical forms are rejected so that decode-then-encode is the identity.
fn decode_compact(reader: &mut Reader<'_>) -> Result<u64, EncodingError> {
    let first = reader.take(1)?[0];
    match first & 0b11 {
        0b00 => Ok(u64::from(first >> 2)),
        0b01 => {
            let raw = reader.take(1)?;
            let value = u64::from(u16::from_le_bytes([first, raw[0]]) >> 2);
            if value <= 0x3f {
                return Err(EncodingError::InvalidCompact);
            }
            Ok(value)
        }
        0b10 => {
            let raw = reader.take(3)?;
            let value = u64::from(u32::from_le_bytes([first, raw[0], raw[1], raw[2]]) >> 2);
            if value <= 0x3fff {
                return Err(EncodingError::InvalidCompact);
            }
            Ok(value)
        }
        _ => {
            let len = usize::from(first >> 2) + 4;
            if len > 8 {
                return Err(EncodingError::InvalidCompact);
            }
            let raw = reader.take(len)?;
            if raw[len - 1] == 0 {
                return Err(EncodingError::InvalidCompact);
            }
            let mut buf = [0u8; 8];
            buf[..len].copy_from_slice(raw);
            let value = u64::from_le_bytes(buf);
            if value <= 0x3fff_ffff {
                return Err(EncodingError::InvalidCompact);
            }
            Ok(value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PALLET: OpcodeTable = OpcodeTable::new("pallet", Some(0), Some(1), Some(2));
    const FACTORY: OpcodeTable = OpcodeTable::new("factory", Some(1), Some(3), None);

    fn compact(value: u64) -> Vec<u8> {
        let mut out = Vec::new();
        encode_compact(value, &mut out);
        out
    }

    #[test]
    fn test_compact_known_vectors() {
        assert_eq!(compact(0), vec![0x00]);
        assert_eq!(compact(1), vec![0x04]);
        assert_eq!(compact(32), vec![0x80]);
        assert_eq!(compact(63), vec![0xfc]);
        assert_eq!(compact(64), vec![0x01, 0x01]);
        assert_eq!(compact(16383), vec![0xfd, 0xff]);
        assert_eq!(compact(16384), vec![0x02, 0x00, 0x01, 0x00]);
        assert_eq!(compact(1 << 30), vec![0x03, 0x00, 0x00, 0x00, 0x40]);
    }

    #[test]
    fn test_compact_decode_matches_encode() {
        for value in [0u64, 5, 63, 64, 300, 16383, 16384, 1 << 29, 1 << 30, u32::MAX as u64, u64::MAX] {
            let bytes = compact(value);
            let mut reader = Reader { bytes: &bytes, pos: 0 };
            assert_eq!(decode_compact(&mut reader).unwrap(), value);
            assert_eq!(reader.remaining(), 0);
        }
    }

    #[test]
    fn test_compact_rejects_non_canonical() {
        // 1 encoded in two-byte mode
        let bytes = [0x05, 0x00];
        let mut reader = Reader { bytes: &bytes, pos: 0 };
        assert_eq!(decode_compact(&mut reader), Err(EncodingError::InvalidCompact));
    }

    #[test]
    fn test_fungible_layout() {
        let payload = Fungible::new(PayloadKind::Transfer, vec![0xaa; 32], 500);
        let bytes = payload.encode(&PALLET).unwrap();
        assert_eq!(bytes.len(), 1 + 1 + 32 + 16);
        assert_eq!(bytes[0], 0);
        assert_eq!(bytes[1], 32 << 2);
        assert_eq!(&bytes[34..36], &[0xf4, 0x01]);
    }

    #[test]
    fn test_fungible_roundtrip_both_directions() {
        let payload = Fungible::new(PayloadKind::Mint, vec![7u8; 64], u128::MAX);
        let bytes = payload.encode(&PALLET).unwrap();
        let decoded = Fungible::decode(&bytes, &PALLET).unwrap();
        assert_eq!(decoded, payload);
        assert_eq!(decoded.encode(&PALLET).unwrap(), bytes);
    }

    #[test]
    fn test_decode_rejects_truncated_and_trailing() {
        let bytes = Fungible::new(PayloadKind::Burn, vec![], 9)
            .encode(&PALLET)
            .unwrap();
        assert!(matches!(
            Fungible::decode(&bytes[..bytes.len() - 1], &PALLET),
            Err(EncodingError::Truncated { needed: 1 })
        ));
        let mut extra = bytes.clone();
        extra.push(0);
        assert_eq!(
            Fungible::decode(&extra, &PALLET),
            Err(EncodingError::TrailingBytes(1))
        );
    }

    #[test]
    fn test_schemes_are_not_conflated() {
        assert_eq!(PALLET.opcode(PayloadKind::Transfer).unwrap(), 0);
        assert_eq!(FACTORY.opcode(PayloadKind::Transfer).unwrap(), 1);
        assert_eq!(FACTORY.opcode(PayloadKind::Mint).unwrap(), 3);
        // byte 1 means Mint on one backend and Transfer on the other
        assert_eq!(PALLET.kind(1).unwrap(), PayloadKind::Mint);
        assert_eq!(FACTORY.kind(1).unwrap(), PayloadKind::Transfer);
        assert!(FACTORY.opcode(PayloadKind::Burn).is_err());
        assert!(matches!(
            FACTORY.kind(0),
            Err(EncodingError::UnknownOpcode { opcode: 0, .. })
        ));
    }
}
