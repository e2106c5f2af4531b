use serde::{Deserialize, Serialize};

use crate::error::AmmError;

/// Reserve snapshot of a two-asset constant-product pool.
///
/// Quotes never mutate the snapshot; reserves change only on the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityPool {
    pub reserve_x: u128,
    pub reserve_y: u128,
}

impl LiquidityPool {
    pub fn new(reserve_x: u128, reserve_y: u128) -> Self {
        LiquidityPool {
            reserve_x,
            reserve_y,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.reserve_x == 0 || self.reserve_y == 0
    }

    pub fn quote_x_to_y(&self, amount_in: u128) -> Result<u128, AmmError> {
        quote_swap(amount_in, self.reserve_x, self.reserve_y)
    }

    pub fn quote_y_to_x(&self, amount_in: u128) -> Result<u128, AmmError> {
        quote_swap(amount_in, self.reserve_y, self.reserve_x)
    }
}

/// Fee-less constant product output:
/// `floor(amount_in * reserve_out / (amount_in + reserve_in))`
pub fn quote_swap(amount_in: u128, reserve_in: u128, reserve_out: u128) -> Result<u128, AmmError> {
    let denominator = amount_in.checked_add(reserve_in).ok_or(AmmError::Overflow)?;
    if denominator == 0 {
        return Ok(0);
    }
    let numerator = amount_in.checked_mul(reserve_out).ok_or(AmmError::Overflow)?;
    Ok(numerator / denominator)
}

pub fn quote_swap_x_to_y(amount_in: u128, reserve_x: u128, reserve_y: u128) -> Result<u128, AmmError> {
    quote_swap(amount_in, reserve_x, reserve_y)
}

pub fn quote_swap_y_to_x(amount_in: u128, reserve_x: u128, reserve_y: u128) -> Result<u128, AmmError> {
    quote_swap(amount_in, reserve_y, reserve_x)
}

/// Amounts to deposit so the pool ratio is preserved.
///
/// `None` or a snapshot with an empty side means there is no ratio to honor,
/// and the desired amounts are used as-is.
pub fn quote_add_liquidity(
    desired_x: u128,
    desired_y: u128,
    pool: Option<LiquidityPool>,
) -> Result<(u128, u128), AmmError> {
    let pool = match pool {
        Some(pool) if !pool.is_empty() => pool,
        _ => return Ok((desired_x, desired_y)),
    };

    let optimal_y = desired_x
        .checked_mul(pool.reserve_y)
        .ok_or(AmmError::Overflow)?
        / pool.reserve_x;
    if optimal_y <= desired_y {
        return Ok((desired_x, optimal_y));
    }

    let optimal_x = desired_y
        .checked_mul(pool.reserve_x)
        .ok_or(AmmError::Overflow)?
        / pool.reserve_y;
    Ok((optimal_x, desired_y))
}
