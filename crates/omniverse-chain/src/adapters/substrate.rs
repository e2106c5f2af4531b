//! Substrate runtime with the omniverse protocol, asset and swap pallets

use async_trait::async_trait;
use omniverse_core::{
    decode_hex, encode_hex, Fungible, Initiator, LiquidityPool, OpcodeTable, PublicKey,
    TransactionEnvelope, UnsignedEnvelope,
};
use serde_json::{json, Value};
use tracing::debug;

use crate::adapter::{
    AddLiquidityRequest, Backend, ChainAdapter, SwapAdapter, SwapDirection, SwapRequest,
};
use crate::error::ChainError;
use crate::ledger::{u128_arg, value_to_asset_id, value_to_u128, InclusionResult, LedgerCall, LedgerClient};
use crate::wire;

/// Pallet numbering: Transfer = 0, Mint = 1, Burn = 2
pub const OPCODES: OpcodeTable = OpcodeTable::new("substrate-pallet", Some(0), Some(1), Some(2));

pub const PROTOCOL_PALLET: &str = "omniverseProtocol";
pub const SWAP_PALLET: &str = "omniverseSwap";
pub const ASSETS_PALLET: &str = "assets";
pub const UNIQUES_PALLET: &str = "uniques";

/// `txData` argument of `sendTransaction` and `deposit`
pub fn envelope_to_wire(envelope: &TransactionEnvelope) -> Result<Value, ChainError> {
    Ok(json!({
        "nonce": u128_arg(envelope.nonce()),
        "chainId": envelope.chain_id(),
        "initiatorAddress": envelope.initiator().to_wire(),
        "from": envelope.from().to_hex(),
        "payload": encode_hex(&envelope.payload_blob(&OPCODES)?),
        "signature": envelope.signature().to_hex(),
    }))
}

/// Rebuild and verify an envelope from its `txData` form, the way the
/// pallet does before accepting it
pub fn envelope_from_wire(value: &Value) -> Result<TransactionEnvelope, ChainError> {
    let header = wire::header(value)?;
    let initiator = Initiator::token(wire::text(value, "initiatorAddress")?);
    let payload = Fungible::decode(&decode_hex(wire::text(value, "payload")?)?, &OPCODES)?;

    let data = UnsignedEnvelope::new(header.nonce, header.chain_id, initiator, header.from, payload);
    Ok(TransactionEnvelope::from_parts(data, header.signature, &OPCODES)?)
}

pub struct SubstrateAdapter<C: LedgerClient> {
    client: C,
    pallet: String,
}

impl<C: LedgerClient> SubstrateAdapter<C> {
    /// `pallet` is the asset pallet envelopes go through (`assets` or `uniques`)
    pub fn new(client: C, pallet: impl Into<String>) -> Self {
        SubstrateAdapter {
            client,
            pallet: pallet.into(),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Register a new token id under the active pallet
    pub async fn create_token(
        &self,
        owner: &PublicKey,
        asset_id: &str,
    ) -> Result<InclusionResult, ChainError> {
        let call = LedgerCall::new(
            self.pallet.as_str(),
            "createToken",
            vec![json!(owner.to_hex()), json!(asset_id), Value::Null, Value::Null],
        );
        self.client.submit(call).await
    }

    /// Owner of one item of a `uniques` collection
    pub async fn owner_of(&self, asset_id: &str, item_id: &str) -> Result<String, ChainError> {
        let collection = self
            .client
            .query(LedgerCall::new(UNIQUES_PALLET, "tokenId2CollectionId", vec![json!(asset_id)]))
            .await?;
        if collection.is_null() {
            return Err(ChainError::Validation(format!("Collection {} not exist", asset_id)));
        }

        let item = self
            .client
            .query(LedgerCall::new(UNIQUES_PALLET, "asset", vec![collection, json!(item_id)]))
            .await?;
        item.get("owner")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ChainError::Validation(format!("Item {} not exist", item_id)))
    }
}

#[async_trait]
impl<C: LedgerClient> ChainAdapter for SubstrateAdapter<C> {
    fn backend(&self) -> Backend {
        Backend::Substrate
    }

    fn opcodes(&self) -> &OpcodeTable {
        &OPCODES
    }

    fn namespace(&self) -> &str {
        &self.pallet
    }

    fn initiator(&self, asset_id: &str) -> Result<Initiator, ChainError> {
        if asset_id.is_empty() {
            return Err(ChainError::Validation("token id must not be empty".to_string()));
        }
        Ok(Initiator::token(asset_id))
    }

    async fn get_nonce(
        &self,
        account: &PublicKey,
        namespace: &str,
        asset_id: &str,
    ) -> Result<u128, ChainError> {
        let call = LedgerCall::new(
            PROTOCOL_PALLET,
            "transactionCount",
            vec![json!(account.to_hex()), json!(namespace), json!(asset_id)],
        );
        value_to_u128(&self.client.query(call).await?)
    }

    async fn get_balance(
        &self,
        namespace: &str,
        asset_id: &str,
        account: &PublicKey,
    ) -> Result<u128, ChainError> {
        let call = LedgerCall::new(namespace, "tokens", vec![json!(asset_id), json!(account.to_hex())]);
        value_to_u128(&self.client.query(call).await?)
    }

    async fn get_pool_reserves(
        &self,
        trading_pair_id: &str,
    ) -> Result<Option<LiquidityPool>, ChainError> {
        let call = LedgerCall::new(SWAP_PALLET, "tradingPairs", vec![json!(trading_pair_id)]);
        let pair = self.client.query(call).await?;
        match pair {
            Value::Null => Ok(None),
            Value::Array(ref reserves) if reserves.len() == 2 => Ok(Some(LiquidityPool::new(
                value_to_u128(&reserves[0])?,
                value_to_u128(&reserves[1])?,
            ))),
            other => Err(ChainError::UnexpectedResponse(format!("tradingPairs: {}", other))),
        }
    }

    async fn get_token_mapping(
        &self,
        trading_pair_id: &str,
    ) -> Result<Option<(String, String)>, ChainError> {
        let call = LedgerCall::new(SWAP_PALLET, "tokenId", vec![json!(trading_pair_id)]);
        let ids = self.client.query(call).await?;
        match ids {
            Value::Null => Ok(None),
            Value::Array(ref ids) if ids.len() == 2 => Ok(Some((
                value_to_asset_id(&ids[0])?,
                value_to_asset_id(&ids[1])?,
            ))),
            other => Err(ChainError::UnexpectedResponse(format!("tokenId: {}", other))),
        }
    }

    async fn submit_envelope(
        &self,
        envelope: &TransactionEnvelope,
    ) -> Result<InclusionResult, ChainError> {
        let asset_id = envelope.initiator().to_wire();
        debug!(
            "Submitting {} envelope for {} with nonce {}",
            envelope.payload().kind,
            asset_id,
            envelope.nonce()
        );
        let call = LedgerCall::new(
            self.pallet.as_str(),
            "sendTransaction",
            vec![json!(asset_id), envelope_to_wire(envelope)?],
        );
        self.client.submit(call).await
    }
}

#[async_trait]
impl<C: LedgerClient> SwapAdapter for SubstrateAdapter<C> {
    async fn mpc_account(&self) -> Result<PublicKey, ChainError> {
        let mpc = self.client.query(LedgerCall::new(SWAP_PALLET, "mpc", vec![])).await?;
        let hex = mpc
            .as_str()
            .ok_or_else(|| ChainError::UnexpectedResponse(format!("mpc: {}", mpc)))?;
        Ok(PublicKey::from_hex(hex)?)
    }

    async fn swap_balance(&self, asset_id: &str, account: &PublicKey) -> Result<u128, ChainError> {
        let call = LedgerCall::new(SWAP_PALLET, "balance", vec![json!(account.to_hex()), json!(asset_id)]);
        value_to_u128(&self.client.query(call).await?)
    }

    async fn deposit(
        &self,
        asset_id: &str,
        envelope: &TransactionEnvelope,
    ) -> Result<InclusionResult, ChainError> {
        let call = LedgerCall::new(
            SWAP_PALLET,
            "deposit",
            vec![json!(asset_id), envelope_to_wire(envelope)?],
        );
        self.client.submit(call).await
    }

    async fn withdraw(
        &self,
        account: &PublicKey,
        asset_id: &str,
        amount: u128,
    ) -> Result<InclusionResult, ChainError> {
        let call = LedgerCall::new(
            SWAP_PALLET,
            "withdraw",
            vec![json!(account.to_hex()), json!(asset_id), u128_arg(amount)],
        );
        self.client.submit(call).await
    }

    async fn add_liquidity(
        &self,
        request: &AddLiquidityRequest,
    ) -> Result<InclusionResult, ChainError> {
        let call = LedgerCall::new(
            SWAP_PALLET,
            "addLiquidity",
            vec![
                json!(request.trading_pair_id),
                json!(request.account.to_hex()),
                u128_arg(request.desired_x),
                u128_arg(request.desired_y),
                u128_arg(request.min_x),
                u128_arg(request.min_y),
                json!(request.x_asset),
                json!(request.y_asset),
            ],
        );
        self.client.submit(call).await
    }

    async fn swap(&self, request: &SwapRequest) -> Result<InclusionResult, ChainError> {
        let method = match request.direction {
            SwapDirection::XToY => "swapX2y",
            SwapDirection::YToX => "swapY2x",
        };
        let call = LedgerCall::new(
            SWAP_PALLET,
            method,
            vec![
                json!(request.trading_pair_id),
                json!(request.account.to_hex()),
                u128_arg(request.amount_in),
                u128_arg(request.min_out),
            ],
        );
        self.client.submit(call).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use omniverse_core::{KeyPair, PayloadKind, SigningContext};

    fn signed(kp: &KeyPair) -> TransactionEnvelope {
        SigningContext::new(kp.secret.clone(), 2, None)
            .sign_envelope(
                0,
                Initiator::token("TKN1"),
                Fungible::new(PayloadKind::Burn, vec![], 25),
                &OPCODES,
            )
            .unwrap()
    }

    #[test]
    fn test_wire_roundtrip_reverifies() {
        let kp = KeyPair::generate();
        let envelope = signed(&kp);
        let wire = envelope_to_wire(&envelope).unwrap();
        assert_eq!(wire["initiatorAddress"], "TKN1");
        assert_eq!(wire["nonce"], "0");

        let decoded = envelope_from_wire(&wire).unwrap();
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn test_wire_tampered_amount_rejected() {
        let kp = KeyPair::generate();
        let envelope = signed(&kp);
        let mut wire = envelope_to_wire(&envelope).unwrap();
        let forged = Fungible::new(PayloadKind::Burn, vec![], 26).encode(&OPCODES).unwrap();
        wire["payload"] = json!(encode_hex(&forged));
        assert!(matches!(envelope_from_wire(&wire), Err(ChainError::Core(_))));
    }

    #[test]
    fn test_wire_missing_field() {
        let err = envelope_from_wire(&json!({ "nonce": "1" })).unwrap_err();
        assert!(matches!(err, ChainError::Validation(_)));
    }
}
