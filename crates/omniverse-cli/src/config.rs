use std::collections::BTreeMap;
use std::path::Path;

use omniverse_chain::Backend;
use serde::{Deserialize, Serialize};

use crate::error::CliError;

/// One ledger the tool can talk to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    pub backend: Backend,

    /// Node gateway URL
    pub node_address: String,

    /// Chain id signed into every envelope
    pub omniverse_chain_id: u32,

    /// Empty when the chain has no faucet
    #[serde(default)]
    pub faucet_service_url: String,

    /// Omniverse contract, ink and evm backends only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<String>,

    /// Default cooling-down period for `initialize`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooling_down: Option<u64>,
}

/// Network configuration file, keyed by chain name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub chains: BTreeMap<String, ChainConfig>,
}

impl NetworkConfig {
    /// Load config from file
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: NetworkConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<(), CliError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn chain(&self, name: &str) -> Result<&ChainConfig, CliError> {
        self.chains.get(name).ok_or_else(|| {
            let known: Vec<&str> = self.chains.keys().map(String::as_str).collect();
            CliError::Config(format!(
                "unknown chain {}, configured chains: {}",
                name,
                known.join(", ")
            ))
        })
    }
}

/// Sample configuration with one chain per backend
pub fn generate_sample_config() -> NetworkConfig {
    let mut chains = BTreeMap::new();
    chains.insert(
        "local".to_string(),
        ChainConfig {
            backend: Backend::Substrate,
            node_address: "http://127.0.0.1:9944".to_string(),
            omniverse_chain_id: 1,
            faucet_service_url: "http://127.0.0.1:7788".to_string(),
            contract_address: None,
            cooling_down: None,
        },
    );
    chains.insert(
        "ink-local".to_string(),
        ChainConfig {
            backend: Backend::Ink,
            node_address: "http://127.0.0.1:9944".to_string(),
            omniverse_chain_id: 2,
            faucet_service_url: String::new(),
            contract_address: Some(format!("0x{}", "00".repeat(32))),
            cooling_down: Some(10),
        },
    );
    chains.insert(
        "evm-local".to_string(),
        ChainConfig {
            backend: Backend::Evm,
            node_address: "http://127.0.0.1:8545".to_string(),
            omniverse_chain_id: 3,
            faucet_service_url: String::new(),
            contract_address: Some(format!("0x{}", "00".repeat(20))),
            cooling_down: None,
        },
    );
    NetworkConfig { chains }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_config_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config").join("default.json");

        let config = generate_sample_config();
        config.save(&path).unwrap();
        let loaded = NetworkConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.chain("local").unwrap().backend, Backend::Substrate);
    }

    #[test]
    fn test_unknown_chain() {
        let config = generate_sample_config();
        assert!(matches!(config.chain("mainnet"), Err(CliError::Config(_))));
    }

    #[test]
    fn test_optional_fields_default() {
        let config: NetworkConfig = serde_json::from_str(
            r#"{ "chains": { "dev": {
                "backend": "substrate",
                "node_address": "http://127.0.0.1:9944",
                "omniverse_chain_id": 7 } } }"#,
        )
        .unwrap();
        let dev = config.chain("dev").unwrap();
        assert!(dev.faucet_service_url.is_empty());
        assert_eq!(dev.contract_address, None);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = NetworkConfig::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }
}
