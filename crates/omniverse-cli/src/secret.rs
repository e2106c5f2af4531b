//! Key material file
//!
//! `{ "sks": ["<hex>", ...], "index": n, "mpc": "<hex public key>" }`, read
//! once per run into an immutable [`SigningContext`].

use std::path::Path;

use omniverse_core::{encode_hex, PublicKey, SecretKey, SigningContext};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::CliError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretFile {
    pub sks: Vec<String>,
    #[serde(default)]
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mpc: Option<String>,
}

/// Addresses derived from one secret key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    pub index: usize,
    pub active: bool,
    pub omniverse: String,
    pub compressed: String,
    pub evm_address: String,
}

impl SecretFile {
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("cannot read key file {}: {}", path.display(), e))
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), CliError> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn active_secret(&self) -> Result<SecretKey, CliError> {
        let sk = self.sks.get(self.index).ok_or_else(|| {
            CliError::Validation(format!(
                "active key index {} out of range, {} keys",
                self.index,
                self.sks.len()
            ))
        })?;
        Ok(SecretKey::from_hex(sk)?)
    }

    pub fn mpc_key(&self) -> Result<Option<PublicKey>, CliError> {
        self.mpc
            .as_deref()
            .map(PublicKey::from_hex)
            .transpose()
            .map_err(CliError::from)
    }

    pub fn signing_context(&self, chain_id: u32) -> Result<SigningContext, CliError> {
        Ok(SigningContext::new(self.active_secret()?, chain_id, self.mpc_key()?))
    }

    /// Make key `index` the active one; the index must name an existing key
    pub fn switch(&mut self, index: usize) -> Result<(), CliError> {
        if index >= self.sks.len() {
            return Err(CliError::Validation(format!(
                "index {} out of range, {} keys",
                index,
                self.sks.len()
            )));
        }
        self.index = index;
        info!("Active key switched to {}", index);
        Ok(())
    }

    /// Append a key; returns its index
    pub fn push_key(&mut self, secret: &SecretKey) -> usize {
        self.sks.push(secret.to_hex());
        self.sks.len() - 1
    }

    pub fn accounts(&self) -> Result<Vec<AccountInfo>, CliError> {
        self.sks
            .iter()
            .enumerate()
            .map(|(index, sk)| -> Result<AccountInfo, CliError> {
                let public = SecretKey::from_hex(sk)?.public_key();
                Ok(AccountInfo {
                    index,
                    active: index == self.index,
                    omniverse: public.to_hex(),
                    compressed: encode_hex(&public.to_compressed()?),
                    evm_address: encode_hex(&public.evm_address()),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SK_ONE: &str = "0x0000000000000000000000000000000000000000000000000000000000000001";

    fn two_keys() -> SecretFile {
        SecretFile {
            sks: vec![SK_ONE.to_string(), SecretKey::generate().to_hex()],
            index: 0,
            mpc: None,
        }
    }

    #[test]
    fn test_switch_validates_index() {
        let mut secret = two_keys();
        assert!(secret.switch(1).is_ok());
        assert_eq!(secret.index, 1);
        assert!(matches!(secret.switch(2), Err(CliError::Validation(_))));
        assert_eq!(secret.index, 1);
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".secret");

        let mut secret = two_keys();
        secret.mpc = Some(SecretKey::generate().public_key().to_hex());
        secret.switch(1).unwrap();
        secret.save(&path).unwrap();

        let loaded = SecretFile::load(&path).unwrap();
        assert_eq!(loaded, secret);
        assert!(loaded.mpc_key().unwrap().is_some());
        let ctx = loaded.signing_context(9).unwrap();
        assert_eq!(ctx.chain_id(), 9);
    }

    #[test]
    fn test_account_info_for_generator_key() {
        let accounts = two_keys().accounts().unwrap();
        assert_eq!(accounts.len(), 2);
        assert!(accounts[0].active);
        assert_eq!(accounts[0].evm_address, "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf");
        assert!(accounts[0].compressed.starts_with("0x02") || accounts[0].compressed.starts_with("0x03"));
        assert!(accounts[0].omniverse.starts_with("0x79be667e"));
    }

    #[test]
    fn test_bad_key_material() {
        let secret = SecretFile {
            sks: vec!["0x1234".to_string()],
            index: 0,
            mpc: Some("0xdead".to_string()),
        };
        assert!(secret.active_secret().is_err());
        assert!(secret.mpc_key().is_err());
        assert!(SecretFile::default().active_secret().is_err());
    }
}
