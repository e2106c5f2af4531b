use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Ledger-side rejection, decoded into module + method + reason when the
/// ledger reports a structured error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DispatchError {
    Module {
        module: String,
        method: String,
        #[serde(default)]
        docs: String,
    },
    Other(String),
}

impl DispatchError {
    pub fn module(module: &str, method: &str, docs: &str) -> Self {
        DispatchError::Module {
            module: module.to_string(),
            method: method.to_string(),
            docs: docs.to_string(),
        }
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::Module {
                module,
                method,
                docs,
            } => write!(f, "{}.{}: {}", module, method, docs),
            DispatchError::Other(reason) => f.write_str(reason),
        }
    }
}

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Transaction rejected: {0}")]
    Inclusion(DispatchError),

    #[error("Insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: u128, need: u128 },

    #[error("Trading pair not found: {0}")]
    PoolNotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{operation} is not supported by the {backend} backend")]
    UnsupportedOperation {
        backend: &'static str,
        operation: &'static str,
    },

    #[error("Unexpected ledger response: {0}")]
    UnexpectedResponse(String),

    #[error("Core error: {0}")]
    Core(#[from] omniverse_core::CoreError),
}

impl From<omniverse_core::EncodingError> for ChainError {
    fn from(e: omniverse_core::EncodingError) -> Self {
        ChainError::Core(e.into())
    }
}

impl From<omniverse_core::AmmError> for ChainError {
    fn from(e: omniverse_core::AmmError) -> Self {
        ChainError::Core(e.into())
    }
}

impl From<reqwest::Error> for ChainError {
    fn from(e: reqwest::Error) -> Self {
        ChainError::Network(e.to_string())
    }
}
