//! Batch clearing.
//!
//! Bids are walked from the highest price down (earliest sequence first on
//! ties). Each bid demands `floor(coin / price)` selling units and takes what
//! is left of the supply. The clearing price is the price of the last bid
//! that received anything, or the floor when supply was never exhausted.
//! Every eligible bid pays `ceil(units * clearing_price)`.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use crate::domain::decimal::Dec;
use crate::domain::entities::Bid;
use crate::domain::errors::FundraisingError;
use crate::domain::value_objects::Sequence;

/// Settlement of one bid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BidOutcome {
    pub sequence: Sequence,
    pub eligible: bool,
    pub selling_amount: u128,
    pub paying_amount: u128,
    pub refund: u128,
}

/// Result of clearing a batch auction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClearingResult {
    pub clearing_price: Dec,
    /// One outcome per input bid, ascending by sequence.
    pub outcomes: Vec<BidOutcome>,
    pub total_sold: u128,
    pub total_paid: u128,
    pub total_refunded: u128,
}

impl ClearingResult {
    pub fn eligible(&self) -> impl Iterator<Item = &BidOutcome> {
        self.outcomes.iter().filter(|o| o.eligible)
    }
}

/// Clear `bids` against `supply` selling units with price floor `floor`.
pub fn clear(bids: &[Bid], supply: u128, floor: Dec) -> Result<ClearingResult, FundraisingError> {
    let overflow = || FundraisingError::InvariantViolation("batch clearing overflow".into());

    let mut order: Vec<&Bid> = bids.iter().collect();
    order.sort_by_key(|b| (Reverse(b.price), b.sequence));

    let mut left = supply;
    let mut last_filled_price: Option<Dec> = None;
    let mut filled: BTreeMap<Sequence, u128> = BTreeMap::new();

    for bid in order {
        if left == 0 {
            break;
        }
        let demand = bid.price.quo_floor(bid.coin.amount).ok_or_else(overflow)?;
        if demand == 0 {
            continue;
        }
        let take = demand.min(left);
        left -= take;
        last_filled_price = Some(bid.price);
        filled.insert(bid.sequence, take);
    }

    let clearing_price = match last_filled_price {
        Some(price) if left == 0 => price,
        _ => floor,
    };

    let mut outcomes = Vec::with_capacity(bids.len());
    let (mut total_sold, mut total_paid, mut total_refunded) = (0u128, 0u128, 0u128);

    for bid in bids {
        let committed = bid.coin.amount;
        let outcome = match filled.get(&bid.sequence) {
            Some(&selling_amount) => {
                let paying_amount = clearing_price
                    .mul_ceil(selling_amount)
                    .ok_or_else(overflow)?
                    .min(committed);
                BidOutcome {
                    sequence: bid.sequence,
                    eligible: true,
                    selling_amount,
                    paying_amount,
                    refund: committed - paying_amount,
                }
            }
            None => BidOutcome {
                sequence: bid.sequence,
                eligible: false,
                selling_amount: 0,
                paying_amount: 0,
                refund: committed,
            },
        };
        total_sold += outcome.selling_amount;
        total_paid += outcome.paying_amount;
        total_refunded += outcome.refund;
        outcomes.push(outcome);
    }
    outcomes.sort_by_key(|o| o.sequence);

    Ok(ClearingResult {
        clearing_price,
        outcomes,
        total_sold,
        total_paid,
        total_refunded,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{Address, Coin};
    use proptest::prelude::*;

    fn dec(s: &str) -> Dec {
        s.parse().unwrap()
    }

    fn bid(sequence: Sequence, price: &str, coin: u128) -> Bid {
        Bid {
            auction_id: 1,
            sequence,
            bidder: Address::from_low_u64_be(sequence),
            price: dec(price),
            coin: Coin::new("denom2", coin),
            eligible: false,
            placed_at: 0,
        }
    }

    #[test]
    fn test_partial_last_bid_sets_clearing_price() {
        let bids = vec![
            bid(1, "2", 40_000_000),
            bid(2, "1.5", 30_000_000),
            bid(3, "1", 60_000_000),
        ];
        // first two demand 20M each, third demands 60M but only 10M is left
        let result = clear(&bids, 50_000_000, dec("0.5")).unwrap();

        assert_eq!(result.clearing_price, dec("1"));
        assert!(result.outcomes.iter().all(|o| o.eligible));
        assert_eq!(result.outcomes[0].selling_amount, 20_000_000);
        assert_eq!(result.outcomes[1].selling_amount, 20_000_000);
        assert_eq!(result.outcomes[2].selling_amount, 10_000_000);

        // everyone settles at 1
        assert_eq!(result.outcomes[0].paying_amount, 20_000_000);
        assert_eq!(result.outcomes[0].refund, 20_000_000);
        assert_eq!(result.outcomes[1].refund, 10_000_000);
        assert_eq!(result.outcomes[2].refund, 50_000_000);
        assert_eq!(result.total_sold, 50_000_000);
    }

    #[test]
    fn test_bids_after_exhaustion_are_ineligible() {
        let bids = vec![bid(1, "2", 100), bid(2, "1", 100)];
        let result = clear(&bids, 50, dec("1")).unwrap();

        assert_eq!(result.clearing_price, dec("2"));
        assert!(result.outcomes[0].eligible);
        assert!(!result.outcomes[1].eligible);
        assert_eq!(result.outcomes[1].refund, 100);
    }

    #[test]
    fn test_undersubscribed_clears_at_floor() {
        let bids = vec![bid(1, "3", 30), bid(2, "2", 20)];
        let result = clear(&bids, 1_000, dec("1")).unwrap();

        assert_eq!(result.clearing_price, dec("1"));
        assert_eq!(result.total_sold, 20);
        assert_eq!(result.outcomes[0].paying_amount, 10);
        assert_eq!(result.outcomes[1].paying_amount, 10);
    }

    #[test]
    fn test_ties_break_by_sequence() {
        let bids = vec![bid(2, "1", 10), bid(1, "1", 10)];
        let result = clear(&bids, 15, dec("1")).unwrap();

        assert_eq!(result.outcomes[0].sequence, 1);
        assert_eq!(result.outcomes[0].selling_amount, 10);
        assert_eq!(result.outcomes[1].sequence, 2);
        assert_eq!(result.outcomes[1].selling_amount, 5);
    }

    #[test]
    fn test_no_bids() {
        let result = clear(&[], 100, dec("1")).unwrap();
        assert_eq!(result.clearing_price, dec("1"));
        assert!(result.outcomes.is_empty());
        assert_eq!(result.total_sold, 0);
    }

    #[test]
    fn test_many_bids_clear_in_price_order() {
        // 10k bids at prices 1..=100, each demanding one unit
        let bids: Vec<Bid> = (1..=10_000u64)
            .map(|seq| {
                let price = u128::from(seq % 100 + 1);
                let mut b = bid(seq, "1", price);
                b.price = Dec::from_int(price).unwrap();
                b
            })
            .collect();
        let result = clear(&bids, 500, Dec::ONE).unwrap();

        assert_eq!(result.total_sold, 500);
        assert_eq!(result.eligible().count(), 500);
        assert_eq!(result.clearing_price, Dec::from_int(96).unwrap());
        assert!(result.eligible().all(|o| o.selling_amount == 1));
    }

    proptest! {
        #[test]
        fn prop_clearing_conserves_coins(
            raw in prop::collection::vec((1u128..5, 1u128..1_000_000), 0..20),
            supply in 1u128..2_000_000,
        ) {
            let bids: Vec<Bid> = raw
                .iter()
                .enumerate()
                .map(|(i, (price, coin))| {
                    let mut b = bid(i as u64 + 1, "1", *coin);
                    b.price = Dec::from_int(*price).unwrap();
                    b
                })
                .collect();
            let result = clear(&bids, supply, Dec::ONE).unwrap();

            let committed: u128 = bids.iter().map(|b| b.coin.amount).sum();
            prop_assert_eq!(result.total_paid + result.total_refunded, committed);
            prop_assert!(result.total_sold <= supply);
            for o in &result.outcomes {
                if o.eligible {
                    prop_assert!(o.selling_amount > 0);
                }
            }
        }
    }
}
