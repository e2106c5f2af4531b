//! In-memory ledger
//!
//! Implements [`LedgerClient`] over plain maps with the same call surface
//! the adapters use against a node: the Substrate protocol, asset, uniques
//! and swap pallets, plus omniverse contracts addressed by their `0x`
//! address. Every submitted envelope is rebuilt from its wire form and
//! signature-checked before it is applied.

use std::collections::HashMap;

use async_trait::async_trait;
use omniverse_core::{quote_add_liquidity, LiquidityPool, PayloadKind, PublicKey, TransactionEnvelope};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::debug;

use crate::adapters::substrate::{ASSETS_PALLET, PROTOCOL_PALLET, SWAP_PALLET, UNIQUES_PALLET};
use crate::adapters::{evm, ink, substrate};
use crate::error::{ChainError, DispatchError};
use crate::ledger::{u128_arg, value_to_u128, InclusionResult, LedgerCall, LedgerClient};

type Balances = HashMap<PublicKey, u128>;

#[derive(Default)]
struct Token {
    owner: Option<PublicKey>,
    balances: Balances,
}

struct Pair {
    x_asset: String,
    y_asset: String,
    pool: LiquidityPool,
}

#[derive(Default)]
struct Contract {
    owner: Option<PublicKey>,
    nonces: HashMap<PublicKey, u128>,
    balances: Balances,
    cooling_down: Option<u64>,
    members: Vec<Value>,
}

#[derive(Default)]
struct State {
    block: u64,
    offline: bool,
    nonces: HashMap<(PublicKey, String, String), u128>,
    tokens: HashMap<(String, String), Token>,
    collections: HashMap<String, u64>,
    items: HashMap<(u64, String), PublicKey>,
    mpc: Option<PublicKey>,
    swap_balances: HashMap<(PublicKey, String), u128>,
    pairs: HashMap<String, Pair>,
    contracts: HashMap<String, Contract>,
    submissions: Vec<LedgerCall>,
}

#[derive(Default)]
pub struct MemoryLedger {
    state: Mutex<State>,
}

fn arg<'c>(call: &'c LedgerCall, index: usize) -> Result<&'c Value, ChainError> {
    call.args.get(index).ok_or_else(|| {
        ChainError::Validation(format!("{}.{} missing argument {}", call.module, call.method, index))
    })
}

fn arg_str<'c>(call: &'c LedgerCall, index: usize) -> Result<&'c str, ChainError> {
    arg(call, index)?.as_str().ok_or_else(|| {
        ChainError::Validation(format!("{}.{} argument {} must be a string", call.module, call.method, index))
    })
}

fn arg_key(call: &LedgerCall, index: usize) -> Result<PublicKey, ChainError> {
    Ok(PublicKey::from_hex(arg_str(call, index)?)?)
}

fn arg_u128(call: &LedgerCall, index: usize) -> Result<u128, ChainError> {
    value_to_u128(arg(call, index)?)
}

fn bad_call(e: ChainError) -> DispatchError {
    DispatchError::Other(e.to_string())
}

fn debit(balances: &mut Balances, module: &str, account: &PublicKey, amount: u128) -> Result<(), DispatchError> {
    let balance = balances.entry(*account).or_default();
    if *balance < amount {
        return Err(DispatchError::module(module, "BalanceNotEnough", "Balance not enough"));
    }
    *balance -= amount;
    Ok(())
}

fn credit(balances: &mut Balances, module: &str, account: &PublicKey, amount: u128) -> Result<(), DispatchError> {
    let balance = balances.entry(*account).or_default();
    *balance = balance
        .checked_add(amount)
        .ok_or_else(|| DispatchError::module(module, "BalanceOverflow", "Balance overflow"))?;
    Ok(())
}

fn recipient(module: &str, envelope: &TransactionEnvelope) -> Result<PublicKey, DispatchError> {
    PublicKey::from_slice(&envelope.payload().ex_data)
        .map_err(|_| DispatchError::module(module, "InvalidRecipient", "exData is not a public key"))
}

/// Move funds for one verified envelope
fn apply_fungible(
    balances: &mut Balances,
    owner: Option<&PublicKey>,
    module: &str,
    envelope: &TransactionEnvelope,
) -> Result<(), DispatchError> {
    let payload = envelope.payload();
    match payload.kind {
        PayloadKind::Transfer => {
            let to = recipient(module, envelope)?;
            debit(balances, module, envelope.from(), payload.amount)?;
            credit(balances, module, &to, payload.amount)
        }
        PayloadKind::Mint => {
            if owner.is_some_and(|owner| owner != envelope.from()) {
                return Err(DispatchError::module(module, "SignerNotOwner", "Only the owner can mint"));
            }
            let to = recipient(module, envelope)?;
            credit(balances, module, &to, payload.amount)
        }
        PayloadKind::Burn => debit(balances, module, envelope.from(), payload.amount),
    }
}

fn check_nonce(module: &str, expected: u128, envelope: &TransactionEnvelope) -> Result<(), DispatchError> {
    if envelope.nonce() != expected {
        return Err(DispatchError::module(
            module,
            "TransactionNonceNotMatch",
            &format!("expected nonce {}, got {}", expected, envelope.nonce()),
        ));
    }
    Ok(())
}

impl State {
    fn query(&self, call: &LedgerCall) -> Result<Value, ChainError> {
        if call.module.starts_with("0x") {
            return self.query_contract(call);
        }

        match (call.module.as_str(), call.method.as_str()) {
            (PROTOCOL_PALLET, "transactionCount") => {
                let key = (arg_key(call, 0)?, arg_str(call, 1)?.to_string(), arg_str(call, 2)?.to_string());
                Ok(u128_arg(self.nonces.get(&key).copied().unwrap_or(0)))
            }
            (SWAP_PALLET, "tradingPairs") => Ok(self
                .pairs
                .get(arg_str(call, 0)?)
                .map(|pair| json!([u128_arg(pair.pool.reserve_x), u128_arg(pair.pool.reserve_y)]))
                .unwrap_or(Value::Null)),
            (SWAP_PALLET, "tokenId") => Ok(self
                .pairs
                .get(arg_str(call, 0)?)
                .map(|pair| {
                    json!([
                        format!("0x{}", hex::encode(&pair.x_asset)),
                        format!("0x{}", hex::encode(&pair.y_asset)),
                    ])
                })
                .unwrap_or(Value::Null)),
            (SWAP_PALLET, "mpc") => Ok(self.mpc.map(|mpc| json!(mpc.to_hex())).unwrap_or(Value::Null)),
            (SWAP_PALLET, "balance") => {
                let key = (arg_key(call, 0)?, arg_str(call, 1)?.to_string());
                Ok(u128_arg(self.swap_balances.get(&key).copied().unwrap_or(0)))
            }
            (UNIQUES_PALLET, "tokenId2CollectionId") => Ok(self
                .collections
                .get(arg_str(call, 0)?)
                .map(|id| json!(id))
                .unwrap_or(Value::Null)),
            (UNIQUES_PALLET, "asset") => {
                let collection = value_to_u128(arg(call, 0)?)? as u64;
                let item = (collection, arg_str(call, 1)?.to_string());
                Ok(self
                    .items
                    .get(&item)
                    .map(|owner| json!({ "owner": owner.to_hex() }))
                    .unwrap_or(Value::Null))
            }
            (namespace, "tokens") => {
                let token = (namespace.to_string(), arg_str(call, 0)?.to_string());
                let account = arg_key(call, 1)?;
                Ok(u128_arg(
                    self.tokens
                        .get(&token)
                        .and_then(|token| token.balances.get(&account))
                        .copied()
                        .unwrap_or(0),
                ))
            }
            (module, method) => Err(ChainError::Validation(format!("unknown query {}.{}", module, method))),
        }
    }

    fn query_contract(&self, call: &LedgerCall) -> Result<Value, ChainError> {
        let contract = self.contracts.get(&call.module);
        let account = arg_key(call, 0)?;
        match call.method.as_str() {
            "getTransactionCount" => Ok(u128_arg(
                contract.and_then(|c| c.nonces.get(&account)).copied().unwrap_or(0),
            )),
            "balanceOf" | "omniverseBalanceOf" => Ok(u128_arg(
                contract.and_then(|c| c.balances.get(&account)).copied().unwrap_or(0),
            )),
            method => Err(ChainError::Validation(format!("unknown contract query {}", method))),
        }
    }

    fn submit(&mut self, call: &LedgerCall) -> Result<(), DispatchError> {
        if call.module.starts_with("0x") {
            return self.submit_contract(call);
        }

        match (call.module.as_str(), call.method.as_str()) {
            (SWAP_PALLET, "deposit") => self.deposit(call),
            (SWAP_PALLET, "withdraw") => self.withdraw(call),
            (SWAP_PALLET, "addLiquidity") => self.add_liquidity(call),
            (SWAP_PALLET, "swapX2y") => self.swap(call, true),
            (SWAP_PALLET, "swapY2x") => self.swap(call, false),
            (namespace, "sendTransaction") => {
                let asset = arg_str(call, 0).map_err(bad_call)?;
                let envelope = substrate::envelope_from_wire(arg(call, 1).map_err(bad_call)?)
                    .map_err(|e| DispatchError::module(namespace, "InvalidTransaction", &e.to_string()))?;
                self.apply_pallet(namespace, asset, &envelope)
            }
            (namespace, "createToken") => {
                let owner = arg_key(call, 0).map_err(bad_call)?;
                let asset = arg_str(call, 1).map_err(bad_call)?.to_string();
                let token = self.tokens.entry((namespace.to_string(), asset.clone())).or_default();
                if token.owner.is_some() {
                    return Err(DispatchError::module(namespace, "TokenAlreadyExist", "Token already exists"));
                }
                token.owner = Some(owner);
                if namespace == UNIQUES_PALLET {
                    let next_id = self.collections.len() as u64;
                    self.collections.entry(asset).or_insert(next_id);
                }
                Ok(())
            }
            (module, method) => Err(DispatchError::Other(format!("unknown call {}.{}", module, method))),
        }
    }

    /// Verify the envelope targets `asset` with the expected nonce, then
    /// apply it in `namespace`
    fn apply_pallet(
        &mut self,
        namespace: &str,
        asset: &str,
        envelope: &TransactionEnvelope,
    ) -> Result<(), DispatchError> {
        if envelope.initiator().to_wire() != asset {
            return Err(DispatchError::module(namespace, "InitiatorNotMatch", "Token id does not match"));
        }
        let nonce_key = (*envelope.from(), namespace.to_string(), asset.to_string());
        let expected = self.nonces.get(&nonce_key).copied().unwrap_or(0);
        check_nonce(namespace, expected, envelope)?;

        let token = self.tokens.entry((namespace.to_string(), asset.to_string())).or_default();
        let owner = token.owner;
        apply_fungible(&mut token.balances, owner.as_ref(), namespace, envelope)?;
        self.nonces.insert(nonce_key, expected + 1);
        Ok(())
    }

    fn deposit(&mut self, call: &LedgerCall) -> Result<(), DispatchError> {
        let asset = arg_str(call, 0).map_err(bad_call)?;
        let envelope = substrate::envelope_from_wire(arg(call, 1).map_err(bad_call)?)
            .map_err(|e| DispatchError::module(SWAP_PALLET, "InvalidTransaction", &e.to_string()))?;

        let to_mpc = envelope.payload().kind == PayloadKind::Transfer
            && self.mpc.is_some_and(|mpc| mpc.as_bytes()[..] == envelope.payload().ex_data[..]);
        if !to_mpc {
            return Err(DispatchError::module(SWAP_PALLET, "NotDepositToMpc", "Deposit must transfer to the MPC account"));
        }

        self.apply_pallet(ASSETS_PALLET, asset, &envelope)?;
        let key = (*envelope.from(), asset.to_string());
        let balance = self.swap_balances.entry(key).or_default();
        *balance = balance
            .checked_add(envelope.payload().amount)
            .ok_or_else(|| DispatchError::module(SWAP_PALLET, "BalanceOverflow", "Balance overflow"))?;
        Ok(())
    }

    fn withdraw(&mut self, call: &LedgerCall) -> Result<(), DispatchError> {
        let account = arg_key(call, 0).map_err(bad_call)?;
        let asset = arg_str(call, 1).map_err(bad_call)?.to_string();
        let amount = arg_u128(call, 2).map_err(bad_call)?;

        self.debit_swap(&account, &asset, amount)?;
        let token = self.tokens.entry((ASSETS_PALLET.to_string(), asset)).or_default();
        credit(&mut token.balances, ASSETS_PALLET, &account, amount)
    }

    fn debit_swap(&mut self, account: &PublicKey, asset: &str, amount: u128) -> Result<(), DispatchError> {
        let balance = self.swap_balances.entry((*account, asset.to_string())).or_default();
        if *balance < amount {
            return Err(DispatchError::module(SWAP_PALLET, "BalanceNotEnough", "Swap balance not enough"));
        }
        *balance -= amount;
        Ok(())
    }

    fn credit_swap(&mut self, account: &PublicKey, asset: &str, amount: u128) -> Result<(), DispatchError> {
        let balance = self.swap_balances.entry((*account, asset.to_string())).or_default();
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| DispatchError::module(SWAP_PALLET, "BalanceOverflow", "Balance overflow"))?;
        Ok(())
    }

    fn add_liquidity(&mut self, call: &LedgerCall) -> Result<(), DispatchError> {
        let pair_id = arg_str(call, 0).map_err(bad_call)?.to_string();
        let account = arg_key(call, 1).map_err(bad_call)?;
        let desired_x = arg_u128(call, 2).map_err(bad_call)?;
        let desired_y = arg_u128(call, 3).map_err(bad_call)?;
        let min_x = arg_u128(call, 4).map_err(bad_call)?;
        let min_y = arg_u128(call, 5).map_err(bad_call)?;
        let x_asset = arg_str(call, 6).map_err(bad_call)?.to_string();
        let y_asset = arg_str(call, 7).map_err(bad_call)?.to_string();

        let existing = self.pairs.get(&pair_id).map(|pair| pair.pool);
        let (used_x, used_y) = quote_add_liquidity(desired_x, desired_y, existing)
            .map_err(|e| DispatchError::module(SWAP_PALLET, "Overflow", &e.to_string()))?;
        if used_x < min_x || used_y < min_y {
            return Err(DispatchError::module(SWAP_PALLET, "InsufficientAmount", "Below minimum amounts"));
        }

        self.debit_swap(&account, &x_asset, used_x)?;
        self.debit_swap(&account, &y_asset, used_y)?;
        let pair = self.pairs.entry(pair_id).or_insert_with(|| Pair {
            x_asset,
            y_asset,
            pool: LiquidityPool::new(0, 0),
        });
        pair.pool.reserve_x += used_x;
        pair.pool.reserve_y += used_y;
        Ok(())
    }

    fn swap(&mut self, call: &LedgerCall, x_to_y: bool) -> Result<(), DispatchError> {
        let pair_id = arg_str(call, 0).map_err(bad_call)?;
        let account = arg_key(call, 1).map_err(bad_call)?;
        let sold = arg_u128(call, 2).map_err(bad_call)?;
        let min_out = arg_u128(call, 3).map_err(bad_call)?;

        let pair = self
            .pairs
            .get(pair_id)
            .ok_or_else(|| DispatchError::module(SWAP_PALLET, "PairNotExist", "Trading pair not found"))?;
        let (bought, sold_asset, bought_asset) = if x_to_y {
            (pair.pool.quote_x_to_y(sold), pair.x_asset.clone(), pair.y_asset.clone())
        } else {
            (pair.pool.quote_y_to_x(sold), pair.y_asset.clone(), pair.x_asset.clone())
        };
        let bought = bought.map_err(|e| DispatchError::module(SWAP_PALLET, "Overflow", &e.to_string()))?;
        if bought < min_out {
            return Err(DispatchError::module(SWAP_PALLET, "ExceedSlippage", "Output below minimum"));
        }

        self.debit_swap(&account, &sold_asset, sold)?;
        self.credit_swap(&account, &bought_asset, bought)?;
        if let Some(pair) = self.pairs.get_mut(pair_id) {
            if x_to_y {
                pair.pool.reserve_x += sold;
                pair.pool.reserve_y -= bought;
            } else {
                pair.pool.reserve_y += sold;
                pair.pool.reserve_x -= bought;
            }
        }
        Ok(())
    }

    fn submit_contract(&mut self, call: &LedgerCall) -> Result<(), DispatchError> {
        let module = call.module.clone();
        match call.method.as_str() {
            "sendOmniverseTransaction" => {
                let tx_data = arg(call, 0).map_err(bad_call)?;
                // ink! carries the payload as a SCALE blob, the factory as fields
                let envelope = if tx_data.get("payload").is_some_and(Value::is_string) {
                    ink::envelope_from_wire(tx_data)
                } else {
                    evm::envelope_from_wire(tx_data)
                }
                .map_err(|e| DispatchError::module(&module, "InvalidTransaction", &e.to_string()))?;
                if envelope.initiator().to_wire() != module {
                    return Err(DispatchError::module(&module, "InitiatorNotMatch", "Contract does not match"));
                }

                let contract = self.contracts.entry(module.clone()).or_default();
                let expected = contract.nonces.get(envelope.from()).copied().unwrap_or(0);
                check_nonce(&module, expected, &envelope)?;
                let owner = contract.owner;
                apply_fungible(&mut contract.balances, owner.as_ref(), &module, &envelope)?;
                contract.nonces.insert(*envelope.from(), expected + 1);
                Ok(())
            }
            "setCoolingDown" => {
                let cooling_down = arg_u128(call, 0).map_err(bad_call)?;
                self.contracts.entry(module).or_default().cooling_down = Some(cooling_down as u64);
                Ok(())
            }
            "setMembers" => {
                let members = arg(call, 0)
                    .map_err(bad_call)?
                    .as_array()
                    .cloned()
                    .ok_or_else(|| DispatchError::Other("members must be a list".to_string()))?;
                self.contracts.entry(module).or_default().members = members;
                Ok(())
            }
            method => Err(DispatchError::Other(format!("unknown contract call {}", method))),
        }
    }
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap pallet configured with an MPC account
    pub fn with_mpc(mpc: PublicKey) -> Self {
        MemoryLedger {
            state: Mutex::new(State {
                mpc: Some(mpc),
                ..State::default()
            }),
        }
    }

    /// While offline every call fails with a network error
    pub async fn set_offline(&self, offline: bool) {
        self.state.lock().await.offline = offline;
    }

    pub async fn set_nonce(&self, account: &PublicKey, namespace: &str, asset_id: &str, nonce: u128) {
        self.state
            .lock()
            .await
            .nonces
            .insert((*account, namespace.to_string(), asset_id.to_string()), nonce);
    }

    pub async fn set_owner(&self, namespace: &str, asset_id: &str, owner: &PublicKey) {
        let mut state = self.state.lock().await;
        let token = state.tokens.entry((namespace.to_string(), asset_id.to_string())).or_default();
        token.owner = Some(*owner);
    }

    pub async fn set_balance(&self, namespace: &str, asset_id: &str, account: &PublicKey, amount: u128) {
        let mut state = self.state.lock().await;
        let token = state.tokens.entry((namespace.to_string(), asset_id.to_string())).or_default();
        token.balances.insert(*account, amount);
    }

    pub async fn balance(&self, namespace: &str, asset_id: &str, account: &PublicKey) -> u128 {
        let state = self.state.lock().await;
        state
            .tokens
            .get(&(namespace.to_string(), asset_id.to_string()))
            .and_then(|token| token.balances.get(account))
            .copied()
            .unwrap_or(0)
    }

    pub async fn set_swap_balance(&self, account: &PublicKey, asset_id: &str, amount: u128) {
        self.state
            .lock()
            .await
            .swap_balances
            .insert((*account, asset_id.to_string()), amount);
    }

    pub async fn swap_balance(&self, account: &PublicKey, asset_id: &str) -> u128 {
        let state = self.state.lock().await;
        state
            .swap_balances
            .get(&(*account, asset_id.to_string()))
            .copied()
            .unwrap_or(0)
    }

    pub async fn create_pair(&self, pair_id: &str, x_asset: &str, y_asset: &str, pool: LiquidityPool) {
        self.state.lock().await.pairs.insert(
            pair_id.to_string(),
            Pair {
                x_asset: x_asset.to_string(),
                y_asset: y_asset.to_string(),
                pool,
            },
        );
    }

    pub async fn reserves(&self, pair_id: &str) -> Option<LiquidityPool> {
        self.state.lock().await.pairs.get(pair_id).map(|pair| pair.pool)
    }

    /// Give `owner` item `item_id` of an existing `uniques` collection
    pub async fn insert_item(&self, asset_id: &str, item_id: &str, owner: &PublicKey) -> bool {
        let mut state = self.state.lock().await;
        match state.collections.get(asset_id).copied() {
            Some(collection) => {
                state.items.insert((collection, item_id.to_string()), *owner);
                true
            }
            None => false,
        }
    }

    pub async fn set_contract_owner(&self, contract: &str, owner: &PublicKey) {
        self.state.lock().await.contracts.entry(contract.to_string()).or_default().owner = Some(*owner);
    }

    pub async fn set_contract_balance(&self, contract: &str, account: &PublicKey, amount: u128) {
        self.state
            .lock()
            .await
            .contracts
            .entry(contract.to_string())
            .or_default()
            .balances
            .insert(*account, amount);
    }

    pub async fn contract_balance(&self, contract: &str, account: &PublicKey) -> u128 {
        let state = self.state.lock().await;
        state
            .contracts
            .get(contract)
            .and_then(|c| c.balances.get(account))
            .copied()
            .unwrap_or(0)
    }

    pub async fn contract_settings(&self, contract: &str) -> Option<(Option<u64>, Vec<Value>)> {
        let state = self.state.lock().await;
        state
            .contracts
            .get(contract)
            .map(|c| (c.cooling_down, c.members.clone()))
    }

    /// Every call passed to `submit`, accepted or not
    pub async fn submissions(&self) -> Vec<LedgerCall> {
        self.state.lock().await.submissions.clone()
    }
}

#[async_trait]
impl LedgerClient for MemoryLedger {
    async fn query(&self, call: LedgerCall) -> Result<Value, ChainError> {
        let state = self.state.lock().await;
        if state.offline {
            return Err(ChainError::Network("ledger offline".to_string()));
        }
        state.query(&call)
    }

    async fn submit(&self, call: LedgerCall) -> Result<InclusionResult, ChainError> {
        let mut state = self.state.lock().await;
        if state.offline {
            return Err(ChainError::Network("ledger offline".to_string()));
        }
        state.submissions.push(call.clone());

        match state.submit(&call) {
            Ok(()) => {
                state.block += 1;
                debug!("{}.{} included in block {}", call.module, call.method, state.block);
                Ok(InclusionResult::InBlock {
                    block_hash: Some(format!("0x{:064x}", state.block)),
                })
            }
            Err(error) => {
                debug!("{}.{} rejected: {}", call.module, call.method, error);
                Ok(InclusionResult::Rejected { error })
            }
        }
    }
}
