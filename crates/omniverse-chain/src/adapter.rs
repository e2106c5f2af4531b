use async_trait::async_trait;
use omniverse_core::{Initiator, LiquidityPool, OpcodeTable, PublicKey, TransactionEnvelope};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ChainError;
use crate::ledger::InclusionResult;

/// Ledger flavor an adapter speaks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Substrate runtime with the omniverse asset pallets
    Substrate,
    /// ink! omniverse contract on a Substrate chain
    Ink,
    /// EVM omniverse factory contract
    Evm,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Substrate => "substrate",
            Backend::Ink => "ink",
            Backend::Evm => "evm",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capabilities every backend offers to the envelope workflows.
///
/// Each implementation owns its opcode numbering and the translation of a
/// [`TransactionEnvelope`] into its wire shape.
#[async_trait]
pub trait ChainAdapter: Send + Sync {
    fn backend(&self) -> Backend;

    /// Opcode numbering used both for the payload blob and the signed bytes
    fn opcodes(&self) -> &OpcodeTable;

    /// Namespace nonces and balances are tracked under by default
    fn namespace(&self) -> &str;

    /// Entity an envelope for `asset_id` targets on this backend
    fn initiator(&self, asset_id: &str) -> Result<Initiator, ChainError>;

    async fn get_nonce(
        &self,
        account: &PublicKey,
        namespace: &str,
        asset_id: &str,
    ) -> Result<u128, ChainError>;

    async fn get_balance(
        &self,
        namespace: &str,
        asset_id: &str,
        account: &PublicKey,
    ) -> Result<u128, ChainError>;

    /// `None` when the trading pair does not exist
    async fn get_pool_reserves(
        &self,
        trading_pair_id: &str,
    ) -> Result<Option<LiquidityPool>, ChainError>;

    /// `(token X id, token Y id)`, `None` when the trading pair does not exist
    async fn get_token_mapping(
        &self,
        trading_pair_id: &str,
    ) -> Result<Option<(String, String)>, ChainError>;

    async fn submit_envelope(
        &self,
        envelope: &TransactionEnvelope,
    ) -> Result<InclusionResult, ChainError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwapDirection {
    XToY,
    YToX,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapRequest {
    pub trading_pair_id: String,
    pub account: PublicKey,
    pub direction: SwapDirection,
    pub amount_in: u128,
    /// Quoted output; the ledger rejects the swap below it
    pub min_out: u128,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddLiquidityRequest {
    pub trading_pair_id: String,
    pub account: PublicKey,
    pub desired_x: u128,
    pub desired_y: u128,
    pub min_x: u128,
    pub min_y: u128,
    pub x_asset: String,
    pub y_asset: String,
}

/// The swap module: deposits of omniverse tokens, liquidity and swaps
#[async_trait]
pub trait SwapAdapter: ChainAdapter {
    /// Counterparty key deposits are transferred to
    async fn mpc_account(&self) -> Result<PublicKey, ChainError>;

    async fn swap_balance(&self, asset_id: &str, account: &PublicKey) -> Result<u128, ChainError>;

    /// Submit a signed transfer-to-MPC envelope as a swap deposit
    async fn deposit(
        &self,
        asset_id: &str,
        envelope: &TransactionEnvelope,
    ) -> Result<InclusionResult, ChainError>;

    async fn withdraw(
        &self,
        account: &PublicKey,
        asset_id: &str,
        amount: u128,
    ) -> Result<InclusionResult, ChainError>;

    async fn add_liquidity(
        &self,
        request: &AddLiquidityRequest,
    ) -> Result<InclusionResult, ChainError>;

    async fn swap(&self, request: &SwapRequest) -> Result<InclusionResult, ChainError>;
}
