//! Envelope workflows: nonce query, encode, hash, sign, submit
//!
//! Every workflow runs its local pre-flight checks (balances, pool
//! existence) before it submits anything, and surfaces ledger rejections as
//! [`ChainError::Inclusion`] without retrying.

use omniverse_core::{
    quote_add_liquidity, Fungible, PayloadKind, PublicKey, SigningContext, TransactionEnvelope,
};
use tracing::{debug, info, warn};

use crate::adapter::{AddLiquidityRequest, ChainAdapter, SwapAdapter, SwapDirection, SwapRequest};
use crate::error::ChainError;
use crate::ledger::InclusionResult;
use crate::nonce::{NonceReservations, NonceSequencer, Reservation};

/// What a successful workflow observed on the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    /// The signed envelope, for workflows that submit one
    pub envelope: Option<TransactionEnvelope>,
    pub inclusion: InclusionResult,
}

pub struct OmniverseClient<'a, A: ?Sized> {
    adapter: &'a A,
    ctx: &'a SigningContext,
    reservations: Option<&'a NonceReservations>,
}

impl<'a, A: ChainAdapter + ?Sized> OmniverseClient<'a, A> {
    pub fn new(adapter: &'a A, ctx: &'a SigningContext) -> Self {
        OmniverseClient {
            adapter,
            ctx,
            reservations: None,
        }
    }

    /// Hand out nonces from a local reservation ledger instead of re-reading
    /// the ledger count for every envelope
    pub fn with_reservations(mut self, reservations: &'a NonceReservations) -> Self {
        self.reservations = Some(reservations);
        self
    }

    pub fn adapter(&self) -> &A {
        self.adapter
    }

    pub fn context(&self) -> &SigningContext {
        self.ctx
    }

    async fn next_nonce(&self, asset_id: &str) -> Result<(u128, Option<Reservation>), ChainError> {
        let account = self.ctx.public_key();
        let namespace = self.adapter.namespace();
        match self.reservations {
            Some(reservations) => {
                let reservation = reservations
                    .reserve(self.adapter, account, namespace, asset_id)
                    .await?;
                Ok((reservation.nonce, Some(reservation)))
            }
            None => {
                let nonce = NonceSequencer::new(self.adapter)
                    .next_nonce(account, namespace, asset_id)
                    .await?;
                Ok((nonce, None))
            }
        }
    }

    async fn sign(
        &self,
        asset_id: &str,
        payload: Fungible,
    ) -> Result<(TransactionEnvelope, Option<Reservation>), ChainError> {
        let initiator = self.adapter.initiator(asset_id)?;
        let (nonce, reservation) = self.next_nonce(asset_id).await?;
        match self
            .ctx
            .sign_envelope(nonce, initiator, payload, self.adapter.opcodes())
        {
            Ok(envelope) => {
                debug!("Signed envelope {} with nonce {}", envelope.hash(), nonce);
                Ok((envelope, reservation))
            }
            Err(e) => {
                self.release(reservation).await;
                Err(e.into())
            }
        }
    }

    async fn release(&self, reservation: Option<Reservation>) {
        if let (Some(reservations), Some(reservation)) = (self.reservations, reservation) {
            reservations.release(&reservation).await;
        }
    }

    /// Confirm the reservation on inclusion; roll it back when the envelope
    /// never made it on-chain
    async fn settle(
        &self,
        envelope: TransactionEnvelope,
        reservation: Option<Reservation>,
        submitted: Result<InclusionResult, ChainError>,
    ) -> Result<Receipt, ChainError> {
        match submitted.and_then(InclusionResult::into_result) {
            Ok(inclusion) => {
                info!("Envelope {} included: {:?}", envelope.hash(), inclusion);
                if let (Some(reservations), Some(reservation)) = (self.reservations, reservation.as_ref()) {
                    reservations.confirm(reservation).await;
                }
                Ok(Receipt {
                    envelope: Some(envelope),
                    inclusion,
                })
            }
            Err(e) => {
                warn!("Envelope {} not included: {}", envelope.hash(), e);
                self.release(reservation).await;
                Err(e)
            }
        }
    }

    /// Sign and submit a transfer, mint or burn.
    ///
    /// Transfers and mints carry the recipient key as exData; burns carry
    /// nothing and ignore `to`.
    pub async fn send(
        &self,
        kind: PayloadKind,
        asset_id: &str,
        to: Option<&PublicKey>,
        amount: u128,
    ) -> Result<Receipt, ChainError> {
        let ex_data = match (kind, to) {
            (PayloadKind::Burn, _) => Vec::new(),
            (_, Some(to)) => to.to_vec(),
            (_, None) => {
                return Err(ChainError::Validation(format!("{} needs a recipient", kind)));
            }
        };
        // Reject unsupported operations before touching the ledger
        self.adapter.opcodes().opcode(kind)?;

        let (envelope, reservation) = self.sign(asset_id, Fungible::new(kind, ex_data, amount)).await?;
        let submitted = self.adapter.submit_envelope(&envelope).await;
        self.settle(envelope, reservation, submitted).await
    }

    pub async fn transfer(&self, asset_id: &str, to: &PublicKey, amount: u128) -> Result<Receipt, ChainError> {
        self.send(PayloadKind::Transfer, asset_id, Some(to), amount).await
    }

    pub async fn mint(&self, asset_id: &str, to: &PublicKey, amount: u128) -> Result<Receipt, ChainError> {
        self.send(PayloadKind::Mint, asset_id, Some(to), amount).await
    }

    pub async fn burn(&self, asset_id: &str, amount: u128) -> Result<Receipt, ChainError> {
        self.send(PayloadKind::Burn, asset_id, None, amount).await
    }

    /// Omniverse token balance of `account` in the adapter's namespace
    pub async fn omni_balance(&self, asset_id: &str, account: &PublicKey) -> Result<u128, ChainError> {
        self.adapter
            .get_balance(self.adapter.namespace(), asset_id, account)
            .await
    }
}

impl<'a, A: SwapAdapter + ?Sized> OmniverseClient<'a, A> {
    async fn mpc(&self) -> Result<PublicKey, ChainError> {
        match self.ctx.mpc() {
            Some(mpc) => Ok(*mpc),
            None => self.adapter.mpc_account().await,
        }
    }

    pub async fn swap_balance(&self, asset_id: &str) -> Result<u128, ChainError> {
        self.adapter.swap_balance(asset_id, self.ctx.public_key()).await
    }

    /// Move omniverse tokens into the swap module by transferring them to
    /// the MPC account
    pub async fn deposit(&self, asset_id: &str, amount: u128) -> Result<Receipt, ChainError> {
        let have = self.omni_balance(asset_id, self.ctx.public_key()).await?;
        if have < amount {
            return Err(ChainError::InsufficientBalance { have, need: amount });
        }

        let mpc = self.mpc().await?;
        let payload = Fungible::new(PayloadKind::Transfer, mpc.to_vec(), amount);
        let (envelope, reservation) = self.sign(asset_id, payload).await?;
        let submitted = self.adapter.deposit(asset_id, &envelope).await;
        self.settle(envelope, reservation, submitted).await
    }

    pub async fn withdraw(&self, asset_id: &str, amount: u128) -> Result<Receipt, ChainError> {
        let have = self.swap_balance(asset_id).await?;
        if have < amount {
            return Err(ChainError::InsufficientBalance { have, need: amount });
        }

        let inclusion = self
            .adapter
            .withdraw(self.ctx.public_key(), asset_id, amount)
            .await?
            .into_result()?;
        Ok(Receipt {
            envelope: None,
            inclusion,
        })
    }

    /// Add liquidity to `trading_pair_id`, creating the pair when it does
    /// not exist yet.
    ///
    /// For an existing pair the asset ids come from the ledger's mapping and
    /// the minimums are the ratio-preserving amounts; for a new pair the
    /// desired amounts are used in full.
    pub async fn add_liquidity(
        &self,
        trading_pair_id: &str,
        x_asset: &str,
        desired_x: u128,
        y_asset: &str,
        desired_y: u128,
    ) -> Result<Receipt, ChainError> {
        let pool = self.adapter.get_pool_reserves(trading_pair_id).await?;
        let (x_asset, y_asset) = match pool {
            Some(_) => self
                .adapter
                .get_token_mapping(trading_pair_id)
                .await?
                .ok_or_else(|| ChainError::PoolNotFound(trading_pair_id.to_string()))?,
            None => (x_asset.to_string(), y_asset.to_string()),
        };
        let (min_x, min_y) = quote_add_liquidity(desired_x, desired_y, pool)?;
        debug!(
            "Adding liquidity to {}: desired ({}, {}), minimum ({}, {})",
            trading_pair_id, desired_x, desired_y, min_x, min_y
        );

        let request = AddLiquidityRequest {
            trading_pair_id: trading_pair_id.to_string(),
            account: *self.ctx.public_key(),
            desired_x,
            desired_y,
            min_x,
            min_y,
            x_asset,
            y_asset,
        };
        let inclusion = self.adapter.add_liquidity(&request).await?.into_result()?;
        Ok(Receipt {
            envelope: None,
            inclusion,
        })
    }

    pub async fn swap_x_to_y(&self, trading_pair_id: &str, amount_in: u128) -> Result<Receipt, ChainError> {
        self.swap(trading_pair_id, SwapDirection::XToY, amount_in).await
    }

    pub async fn swap_y_to_x(&self, trading_pair_id: &str, amount_in: u128) -> Result<Receipt, ChainError> {
        self.swap(trading_pair_id, SwapDirection::YToX, amount_in).await
    }

    /// Swap against the pool with the current quote as the minimum output
    pub async fn swap(
        &self,
        trading_pair_id: &str,
        direction: SwapDirection,
        amount_in: u128,
    ) -> Result<Receipt, ChainError> {
        let not_found = || ChainError::PoolNotFound(trading_pair_id.to_string());
        let pool = self
            .adapter
            .get_pool_reserves(trading_pair_id)
            .await?
            .ok_or_else(not_found)?;
        let (x_asset, y_asset) = self
            .adapter
            .get_token_mapping(trading_pair_id)
            .await?
            .ok_or_else(not_found)?;

        let (sold_asset, min_out) = match direction {
            SwapDirection::XToY => (x_asset, pool.quote_x_to_y(amount_in)?),
            SwapDirection::YToX => (y_asset, pool.quote_y_to_x(amount_in)?),
        };
        let have = self.swap_balance(&sold_asset).await?;
        if have < amount_in {
            return Err(ChainError::InsufficientBalance { have, need: amount_in });
        }
        debug!("Swapping {} {} on {}, expecting {}", amount_in, sold_asset, trading_pair_id, min_out);

        let request = SwapRequest {
            trading_pair_id: trading_pair_id.to_string(),
            account: *self.ctx.public_key(),
            direction,
            amount_in,
            min_out,
        };
        let inclusion = self.adapter.swap(&request).await?.into_result()?;
        Ok(Receipt {
            envelope: None,
            inclusion,
        })
    }

    /// Sign one transfer-to-MPC envelope per asset without submitting.
    ///
    /// Each envelope takes the ledger nonce of its own asset. When both name
    /// the same asset the second one uses the next nonce locally, which only
    /// holds if the first is included before the second. Reservations taken
    /// here are released before returning: the envelopes leave this client
    /// unsubmitted, so later calls derive nonces from the ledger again.
    pub async fn generate_tx_data(
        &self,
        x_asset: &str,
        x_amount: u128,
        y_asset: &str,
        y_amount: u128,
    ) -> Result<(TransactionEnvelope, TransactionEnvelope), ChainError> {
        let mut held = Vec::new();
        let signed = self
            .sign_tx_data(x_asset, x_amount, y_asset, y_amount, &mut held)
            .await;
        for reservation in held.into_iter().rev() {
            self.release(Some(reservation)).await;
        }
        signed
    }

    async fn sign_tx_data(
        &self,
        x_asset: &str,
        x_amount: u128,
        y_asset: &str,
        y_amount: u128,
        held: &mut Vec<Reservation>,
    ) -> Result<(TransactionEnvelope, TransactionEnvelope), ChainError> {
        let mpc = self.mpc().await?;
        let table = self.adapter.opcodes();

        let (x_nonce, x_reservation) = self.next_nonce(x_asset).await?;
        held.extend(x_reservation);
        let y_nonce = if x_asset == y_asset && self.reservations.is_none() {
            x_nonce
                .checked_add(1)
                .ok_or_else(|| ChainError::Validation("nonce space exhausted".to_string()))?
        } else {
            let (nonce, reservation) = self.next_nonce(y_asset).await?;
            held.extend(reservation);
            nonce
        };

        let x = self.ctx.sign_envelope(
            x_nonce,
            self.adapter.initiator(x_asset)?,
            Fungible::new(PayloadKind::Transfer, mpc.to_vec(), x_amount),
            table,
        )?;
        let y = self.ctx.sign_envelope(
            y_nonce,
            self.adapter.initiator(y_asset)?,
            Fungible::new(PayloadKind::Transfer, mpc.to_vec(), y_amount),
            table,
        )?;
        Ok((x, y))
    }
}
