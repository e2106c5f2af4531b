use omniverse_chain::ChainError;
use omniverse_core::{CoreError, EncodingError, SignatureError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<EncodingError> for CliError {
    fn from(e: EncodingError) -> Self {
        CliError::Core(e.into())
    }
}

impl From<SignatureError> for CliError {
    fn from(e: SignatureError) -> Self {
        CliError::Core(e.into())
    }
}

impl From<reqwest::Error> for CliError {
    fn from(e: reqwest::Error) -> Self {
        CliError::Network(e.to_string())
    }
}
