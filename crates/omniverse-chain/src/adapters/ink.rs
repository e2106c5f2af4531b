//! ink! omniverse token contract

use async_trait::async_trait;
use omniverse_core::{
    decode_hex, encode_hex, Fungible, Initiator, LiquidityPool, OpcodeTable, PublicKey,
    TransactionEnvelope, UnsignedEnvelope,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::adapter::{Backend, ChainAdapter};
use crate::error::ChainError;
use crate::ledger::{u128_arg, value_to_u128, InclusionResult, LedgerCall, LedgerClient};
use crate::wire;

/// Contract numbering: Transfer = 0, Mint = 1, Burn = 2
pub const OPCODES: OpcodeTable = OpcodeTable::new("ink-contract", Some(0), Some(1), Some(2));

/// A peer omniverse contract on another chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub chain_id: u32,
    pub contract_address: String,
}

impl Member {
    /// Parse the `<chain id>|<contract address>` form
    pub fn parse(s: &str) -> Result<Self, ChainError> {
        let (chain_id, address) = s
            .split_once('|')
            .ok_or_else(|| ChainError::Validation(format!("member {} must be <chain id>|<address>", s)))?;
        let chain_id = chain_id
            .trim()
            .parse::<u32>()
            .map_err(|e| ChainError::Validation(format!("member chain id {}: {}", chain_id, e)))?;
        Ok(Member {
            chain_id,
            contract_address: address.trim().to_string(),
        })
    }
}

/// `txData` argument of `sendOmniverseTransaction`
pub fn envelope_to_wire(envelope: &TransactionEnvelope) -> Result<Value, ChainError> {
    Ok(json!({
        "nonce": u128_arg(envelope.nonce()),
        "chainId": envelope.chain_id(),
        "initiateSC": envelope.initiator().to_wire(),
        "from": envelope.from().to_hex(),
        "payload": encode_hex(&envelope.payload_blob(&OPCODES)?),
        "signature": envelope.signature().to_hex(),
    }))
}

pub fn envelope_from_wire(value: &Value) -> Result<TransactionEnvelope, ChainError> {
    let header = wire::header(value)?;
    let initiator = Initiator::contract_from_hex(wire::text(value, "initiateSC")?)?;
    let payload = Fungible::decode(&decode_hex(wire::text(value, "payload")?)?, &OPCODES)?;

    let data = UnsignedEnvelope::new(header.nonce, header.chain_id, initiator, header.from, payload);
    Ok(TransactionEnvelope::from_parts(data, header.signature, &OPCODES)?)
}

pub struct InkAdapter<C: LedgerClient> {
    client: C,
    contract: Initiator,
}

impl<C: LedgerClient> InkAdapter<C> {
    /// `contract_address` is the 32-byte contract account id in hex
    pub fn new(client: C, contract_address: &str) -> Result<Self, ChainError> {
        let contract = Initiator::contract_from_hex(contract_address)?;
        Ok(InkAdapter { client, contract })
    }

    fn call(&self, method: &str, args: Vec<Value>) -> LedgerCall {
        LedgerCall::new(self.contract.to_wire(), method, args)
    }

    /// Set the cooling-down period, then the member contracts on other chains
    pub async fn initialize(
        &self,
        cooling_down: u64,
        members: &[Member],
    ) -> Result<InclusionResult, ChainError> {
        self.client
            .submit(self.call("setCoolingDown", vec![json!(cooling_down)]))
            .await?
            .into_result()?;
        info!("Cooling down set to {}", cooling_down);

        self.client
            .submit(self.call("setMembers", vec![json!(members)]))
            .await
    }
}

#[async_trait]
impl<C: LedgerClient> ChainAdapter for InkAdapter<C> {
    fn backend(&self) -> Backend {
        Backend::Ink
    }

    fn opcodes(&self) -> &OpcodeTable {
        &OPCODES
    }

    fn namespace(&self) -> &str {
        "contract"
    }

    fn initiator(&self, _asset_id: &str) -> Result<Initiator, ChainError> {
        Ok(self.contract.clone())
    }

    // The contract keeps one counter per account; namespace and asset are
    // implied by the contract itself.
    async fn get_nonce(
        &self,
        account: &PublicKey,
        _namespace: &str,
        _asset_id: &str,
    ) -> Result<u128, ChainError> {
        let count = self
            .client
            .query(self.call("getTransactionCount", vec![json!(account.to_hex())]))
            .await?;
        value_to_u128(&count)
    }

    async fn get_balance(
        &self,
        _namespace: &str,
        _asset_id: &str,
        account: &PublicKey,
    ) -> Result<u128, ChainError> {
        let balance = self
            .client
            .query(self.call("balanceOf", vec![json!(account.to_hex())]))
            .await?;
        value_to_u128(&balance)
    }

    async fn get_pool_reserves(
        &self,
        _trading_pair_id: &str,
    ) -> Result<Option<LiquidityPool>, ChainError> {
        Err(ChainError::UnsupportedOperation {
            backend: "ink",
            operation: "pool reserves",
        })
    }

    async fn get_token_mapping(
        &self,
        _trading_pair_id: &str,
    ) -> Result<Option<(String, String)>, ChainError> {
        Err(ChainError::UnsupportedOperation {
            backend: "ink",
            operation: "token mapping",
        })
    }

    async fn submit_envelope(
        &self,
        envelope: &TransactionEnvelope,
    ) -> Result<InclusionResult, ChainError> {
        debug!("Submitting envelope to contract {} with nonce {}", self.contract, envelope.nonce());
        self.client
            .submit(self.call("sendOmniverseTransaction", vec![envelope_to_wire(envelope)?]))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_wire_roundtrip() {
        use omniverse_core::{KeyPair, PayloadKind, SigningContext};

        let kp = KeyPair::generate();
        let contract = Initiator::contract_from_hex(&format!("0x{}", "ab".repeat(32))).unwrap();
        let envelope = SigningContext::new(kp.secret.clone(), 3, None)
            .sign_envelope(
                7,
                contract,
                Fungible::new(PayloadKind::Transfer, kp.public.to_vec(), 9),
                &OPCODES,
            )
            .unwrap();

        let wire = envelope_to_wire(&envelope).unwrap();
        assert_eq!(envelope_from_wire(&wire).unwrap(), envelope);
    }

    #[test]
    fn test_member_parse() {
        let member = Member::parse("2|0x1234").unwrap();
        assert_eq!(member.chain_id, 2);
        assert_eq!(member.contract_address, "0x1234");
        assert!(Member::parse("0x1234").is_err());
        assert!(Member::parse("x|0x1234").is_err());
    }
}
