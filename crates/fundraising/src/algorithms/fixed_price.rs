//! Fixed-price matching.
//!
//! A fixed-price bid is matched the moment it is admitted: it buys
//! `floor(coin / price)` selling units, capped at the remaining supply, pays
//! `ceil(units * price)` and gets the rest of its coin back immediately.

use crate::domain::decimal::Dec;
use crate::domain::errors::FundraisingError;

/// Result of matching one fixed-price bid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedPriceFill {
    /// Selling coin allocated to the bid.
    pub selling_amount: u128,
    /// Paying coin kept as proceeds.
    pub paying_amount: u128,
    /// Paying coin returned to the bidder.
    pub refund: u128,
}

/// Match `coin` paying units at `price` against `remaining` supply.
pub fn fill(coin: u128, price: Dec, remaining: u128) -> Result<FixedPriceFill, FundraisingError> {
    let overflow = || FundraisingError::InvariantViolation("fixed-price fill overflow".into());

    let demand = price.quo_floor(coin).ok_or_else(overflow)?;
    let selling_amount = demand.min(remaining);
    let paying_amount = price.mul_ceil(selling_amount).ok_or_else(overflow)?.min(coin);

    Ok(FixedPriceFill {
        selling_amount,
        paying_amount,
        refund: coin - paying_amount,
    })
}
