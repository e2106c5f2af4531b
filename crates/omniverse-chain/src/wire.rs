//! Field access shared by the backends' `txData` decoders

use omniverse_core::{CoreError, PublicKey, Sig};
use serde_json::Value;

use crate::error::ChainError;
use crate::ledger::value_to_u128;

pub(crate) fn field<'v>(value: &'v Value, name: &str) -> Result<&'v Value, ChainError> {
    value
        .get(name)
        .ok_or_else(|| ChainError::Validation(format!("txData missing {}", name)))
}

pub(crate) fn text<'v>(value: &'v Value, name: &str) -> Result<&'v str, ChainError> {
    field(value, name)?
        .as_str()
        .ok_or_else(|| ChainError::Validation(format!("txData {} must be a string", name)))
}

/// Fields every backend carries under the same name
pub(crate) struct Header {
    pub nonce: u128,
    pub chain_id: u32,
    pub from: PublicKey,
    pub signature: Sig,
}

pub(crate) fn header(value: &Value) -> Result<Header, ChainError> {
    let nonce = value_to_u128(field(value, "nonce")?)?;
    let chain_id = u32::try_from(value_to_u128(field(value, "chainId")?)?)
        .map_err(|_| ChainError::Validation("chainId out of range".to_string()))?;
    let from = PublicKey::from_hex(text(value, "from")?)?;
    let signature = Sig::from_hex(text(value, "signature")?).map_err(CoreError::from)?;
    Ok(Header {
        nonce,
        chain_id,
        from,
        signature,
    })
}
