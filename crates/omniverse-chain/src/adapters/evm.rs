//! EVM omniverse factory contract

use async_trait::async_trait;
use omniverse_core::{
    decode_hex, encode_hex, Fungible, Initiator, LiquidityPool, OpcodeTable, PublicKey,
    TransactionEnvelope, UnsignedEnvelope,
};
use serde_json::{json, Value};
use tracing::debug;

use crate::adapter::{Backend, ChainAdapter};
use crate::error::ChainError;
use crate::ledger::{u128_arg, value_to_u128, InclusionResult, LedgerCall, LedgerClient};
use crate::wire;

/// Factory numbering: Transfer = 1, Mint = 3. The factory defines no burn.
pub const OPCODES: OpcodeTable = OpcodeTable::new("evm-factory", Some(1), Some(3), None);

pub struct EvmAdapter<C: LedgerClient> {
    client: C,
    contract: Initiator,
}

impl<C: LedgerClient> EvmAdapter<C> {
    /// `contract_address` is the 20-byte factory address in hex
    pub fn new(client: C, contract_address: &str) -> Result<Self, ChainError> {
        let contract = Initiator::contract_from_hex(contract_address)?;
        Ok(EvmAdapter { client, contract })
    }

    fn call(&self, method: &str, args: Vec<Value>) -> LedgerCall {
        LedgerCall::new(self.contract.to_wire(), method, args)
    }
}

/// ABI-style tuple: the contract takes the payload as separate fields, not
/// as a SCALE blob
pub fn envelope_to_wire(envelope: &TransactionEnvelope) -> Result<Value, ChainError> {
    let payload = envelope.payload();
    Ok(json!({
        "nonce": u128_arg(envelope.nonce()),
        "chainId": envelope.chain_id(),
        "initiateSC": envelope.initiator().to_wire(),
        "from": envelope.from().to_hex(),
        "payload": {
            "op": OPCODES.opcode(payload.kind)?,
            "exData": encode_hex(&payload.ex_data),
            "amount": u128_arg(payload.amount),
        },
        "signature": envelope.signature().to_hex(),
    }))
}

pub fn envelope_from_wire(value: &Value) -> Result<TransactionEnvelope, ChainError> {
    let header = wire::header(value)?;
    let initiator = Initiator::contract_from_hex(wire::text(value, "initiateSC")?)?;
    let payload = wire::field(value, "payload")?;
    let op = u8::try_from(value_to_u128(wire::field(payload, "op")?)?)
        .map_err(|_| ChainError::Validation("op out of range".to_string()))?;
    let payload = Fungible::new(
        OPCODES.kind(op)?,
        decode_hex(wire::text(payload, "exData")?)?,
        value_to_u128(wire::field(payload, "amount")?)?,
    );

    let data = UnsignedEnvelope::new(header.nonce, header.chain_id, initiator, header.from, payload);
    Ok(TransactionEnvelope::from_parts(data, header.signature, &OPCODES)?)
}

#[async_trait]
impl<C: LedgerClient> ChainAdapter for EvmAdapter<C> {
    fn backend(&self) -> Backend {
        Backend::Evm
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
            .query(self.call("omniverseBalanceOf", vec![json!(account.to_hex())]))
            .await?;
        value_to_u128(&balance)
    }

    async fn get_pool_reserves(
        &self,
        _trading_pair_id: &str,
    ) -> Result<Option<LiquidityPool>, ChainError> {
        Err(ChainError::UnsupportedOperation {
            backend: "evm",
            operation: "pool reserves",
        })
    }

    async fn get_token_mapping(
        &self,
        _trading_pair_id: &str,
    ) -> Result<Option<(String, String)>, ChainError> {
        Err(ChainError::UnsupportedOperation {
            backend: "evm",
            operation: "token mapping",
        })
    }

    async fn submit_envelope(
        &self,
        envelope: &TransactionEnvelope,
    ) -> Result<InclusionResult, ChainError> {
        debug!("Submitting envelope to factory {} with nonce {}", self.contract, envelope.nonce());
        self.client
            .submit(self.call("sendOmniverseTransaction", vec![envelope_to_wire(envelope)?]))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use omniverse_core::{Fungible, KeyPair, PayloadKind, SigningContext};

    #[test]
    fn test_factory_wire_uses_factory_opcodes() {
        let kp = KeyPair::generate();
        let contract = Initiator::contract_from_hex("0x5fbdb2315678afecb367f032d93f642f64180aa3").unwrap();
        let envelope = SigningContext::new(kp.secret.clone(), 1, None)
            .sign_envelope(
                3,
                contract,
                Fungible::new(PayloadKind::Mint, kp.public.to_vec(), 1_000),
                &OPCODES,
            )
            .unwrap();

        let wire = envelope_to_wire(&envelope).unwrap();
        assert_eq!(wire["payload"]["op"], 3);
        assert_eq!(wire["payload"]["amount"], "1000");
        assert_eq!(wire["initiateSC"], "0x5fbdb2315678afecb367f032d93f642f64180aa3");
        assert_eq!(envelope_from_wire(&wire).unwrap(), envelope);
    }

    #[test]
    fn test_factory_rejects_burn_before_signing() {
        let kp = KeyPair::generate();
        let contract = Initiator::contract_from_hex("0x5fbdb2315678afecb367f032d93f642f64180aa3").unwrap();
        let result = SigningContext::new(kp.secret.clone(), 1, None).sign_envelope(
            0,
            contract,
            Fungible::new(PayloadKind::Burn, vec![], 1),
            &OPCODES,
        );
        assert!(result.is_err());
    }
}
