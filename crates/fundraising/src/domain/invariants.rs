//! Domain invariants checked after every state transition.
//!
//! Each check returns `InvariantViolation` so the caller can abandon the
//! whole operation without committing anything.

use super::entities::{Allocation, Auction};
use super::errors::FundraisingError;

/// INVARIANT-1: Selling coin conservation.
/// `remaining + allocated == original selling amount`.
pub fn invariant_selling_conservation(
    auction: &Auction,
    allocations: &[Allocation],
) -> Result<(), FundraisingError> {
    let allocated = allocations
        .iter()
        .try_fold(0u128, |acc, a| acc.checked_add(a.selling_amount));
    let total = allocated.and_then(|a| a.checked_add(auction.remaining_selling_coin.amount));

    if total != Some(auction.selling_coin.amount) {
        return Err(FundraisingError::InvariantViolation(format!(
            "auction {}: remaining {} + allocated {:?} != selling {}",
            auction.id, auction.remaining_selling_coin.amount, allocated, auction.selling_coin.amount
        )));
    }
    Ok(())
}

/// INVARIANT-2: Remaining supply never increases.
pub fn invariant_remaining_monotonic(before: &Auction, after: &Auction) -> Result<(), FundraisingError> {
    if after.remaining_selling_coin.amount > before.remaining_selling_coin.amount {
        return Err(FundraisingError::InvariantViolation(format!(
            "auction {}: remaining selling coin grew from {} to {}",
            after.id, before.remaining_selling_coin.amount, after.remaining_selling_coin.amount
        )));
    }
    Ok(())
}

/// INVARIANT-3: Paying coin conservation at clearing.
/// Every committed unit is either kept as proceeds or refunded.
pub fn invariant_paying_conservation(
    committed: u128,
    paid: u128,
    refunded: u128,
) -> Result<(), FundraisingError> {
    if paid.checked_add(refunded) != Some(committed) {
        return Err(FundraisingError::InvariantViolation(format!(
            "paid {paid} + refunded {refunded} != committed {committed}"
        )));
    }
    Ok(())
}

/// INVARIANT-4: Escrow coverage.
/// What the auction owes out of a reserve never exceeds what it holds.
pub fn invariant_escrow_covered(owed: u128, held: u128) -> Result<(), FundraisingError> {
    if owed > held {
        return Err(FundraisingError::InvariantViolation(format!(
            "escrow holds {held} but {owed} is owed"
        )));
    }
    Ok(())
}
