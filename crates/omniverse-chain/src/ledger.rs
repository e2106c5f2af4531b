use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::error::{ChainError, DispatchError};

/// A storage query or extrinsic/contract call addressed to one module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerCall {
    pub module: String,
    pub method: String,
    pub args: Vec<Value>,
}

impl LedgerCall {
    pub fn new(module: impl Into<String>, method: impl Into<String>, args: Vec<Value>) -> Self {
        LedgerCall {
            module: module.into(),
            method: method.into(),
            args,
        }
    }
}

/// Outcome of a submitted call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InclusionResult {
    InBlock {
        #[serde(default)]
        block_hash: Option<String>,
    },
    Finalized {
        #[serde(default)]
        block_hash: Option<String>,
    },
    Rejected { error: DispatchError },
}

impl InclusionResult {
    pub fn is_included(&self) -> bool {
        !matches!(self, InclusionResult::Rejected { .. })
    }

    /// Turn a ledger rejection into an error, keep inclusion as a value
    pub fn into_result(self) -> Result<InclusionResult, ChainError> {
        match self {
            InclusionResult::Rejected { error } => Err(ChainError::Inclusion(error)),
            included => Ok(included),
        }
    }
}

/// Transport to a ledger node.
///
/// Implementations perform exactly one round trip per call and never retry.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Read a storage item or run a read-only contract query; `Value::Null`
    /// means the item is absent
    async fn query(&self, call: LedgerCall) -> Result<Value, ChainError>;

    /// Submit a call and wait for it to be included or rejected
    async fn submit(&self, call: LedgerCall) -> Result<InclusionResult, ChainError>;
}

#[async_trait]
impl<T: LedgerClient + ?Sized> LedgerClient for Arc<T> {
    async fn query(&self, call: LedgerCall) -> Result<Value, ChainError> {
        (**self).query(call).await
    }

    async fn submit(&self, call: LedgerCall) -> Result<InclusionResult, ChainError> {
        (**self).submit(call).await
    }
}

/// Read an unsigned integer that a node may render as a JSON number, a
/// decimal string or a `0x` hex string.
///
/// JSON numbers are only exact up to `u64::MAX`; serde_json reads anything
/// larger as a float. Balances and nonces past that range must arrive as
/// strings, and such a number is rejected rather than rounded.
pub fn value_to_u128(value: &Value) -> Result<u128, ChainError> {
    match value {
        Value::Number(n) => n.as_u64().map(u128::from).ok_or_else(|| {
            ChainError::UnexpectedResponse(format!(
                "{} is not a u64 number; values above u64::MAX must be decimal or 0x hex strings",
                n
            ))
        }),
        Value::String(s) => {
            let parsed = match s.strip_prefix("0x") {
                Some(digits) => u128::from_str_radix(digits, 16),
                None => s.parse::<u128>(),
            };
            parsed.map_err(|e| ChainError::UnexpectedResponse(format!("{}: {}", s, e)))
        }
        Value::Null => Ok(0),
        other => Err(ChainError::UnexpectedResponse(format!(
            "expected integer, got {}",
            other
        ))),
    }
}

/// Render a u128 for a call argument without losing precision
pub fn u128_arg(value: u128) -> Value {
    Value::String(value.to_string())
}

/// Asset ids are stored on-chain as bytes and come back hex encoded
pub fn value_to_asset_id(value: &Value) -> Result<String, ChainError> {
    let s = value
        .as_str()
        .ok_or_else(|| ChainError::UnexpectedResponse(format!("expected asset id, got {}", value)))?;
    match s.strip_prefix("0x") {
        Some(digits) => {
            let bytes = hex::decode(digits)
                .map_err(|e| ChainError::UnexpectedResponse(format!("{}: {}", s, e)))?;
            String::from_utf8(bytes)
                .map_err(|e| ChainError::UnexpectedResponse(format!("{}: {}", s, e)))
        }
        None => Ok(s.to_string()),
    }
}
