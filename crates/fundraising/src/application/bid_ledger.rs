//! Bid Ledger: bids and their secondary indices, allocations and the
//! per-auction allow-list.

use super::keys;
use super::overlay::StoreTx;
use crate::domain::decimal::Dec;
use crate::domain::entities::{AllowedBidder, Allocation, Bid};
use crate::domain::errors::FundraisingError;
use crate::domain::value_objects::{Address, AuctionId, Coin, Sequence, Timestamp};

pub struct BidLedger<'t, 's> {
    tx: &'t mut StoreTx<'s>,
}

impl<'t, 's> BidLedger<'t, 's> {
    pub fn new(tx: &'t mut StoreTx<'s>) -> Self {
        Self { tx }
    }

    /// Store a new bid under the next sequence of `auction_id` (first is 1).
    pub fn append(
        &mut self,
        auction_id: AuctionId,
        bidder: Address,
        price: Dec,
        coin: Coin,
        eligible: bool,
        placed_at: Timestamp,
    ) -> Result<Bid, FundraisingError> {
        let last: Sequence = self
            .tx
            .get_value(&keys::last_sequence(auction_id))?
            .unwrap_or(0);
        let sequence = last.checked_add(1).ok_or_else(|| {
            FundraisingError::InvariantViolation(format!(
                "auction {auction_id}: bid sequence exhausted"
            ))
        })?;

        let bid = Bid {
            auction_id,
            sequence,
            bidder,
            price,
            coin,
            eligible,
            placed_at,
        };
        self.tx.put_value(keys::last_sequence(auction_id), &sequence)?;
        self.tx.put_value(keys::bid(auction_id, sequence), &bid)?;
        self.tx.put(
            keys::bid_by_bidder(&bidder, auction_id, sequence),
            keys::INDEX_MARKER.to_vec(),
        );
        self.tx.put(
            keys::bid_by_eligibility(auction_id, eligible, sequence),
            keys::INDEX_MARKER.to_vec(),
        );
        Ok(bid)
    }

    pub fn get(&self, auction_id: AuctionId, sequence: Sequence) -> Result<Bid, FundraisingError> {
        self.tx
            .get_value(&keys::bid(auction_id, sequence))?
            .ok_or_else(|| FundraisingError::bid_not_found(auction_id, sequence))
    }

    /// Bids of one auction, ascending by sequence.
    pub fn by_auction(&self, auction_id: AuctionId) -> Result<Vec<Bid>, FundraisingError> {
        self.tx.scan_values(&keys::bid_prefix(auction_id))
    }

    /// Bids of one bidder across all auctions, ascending by (auction, sequence).
    pub fn by_bidder(&self, bidder: &Address) -> Result<Vec<Bid>, FundraisingError> {
        self.load_indexed(&keys::bid_by_bidder_prefix(bidder))
    }

    /// Every stored bid, ascending by (auction, sequence).
    pub fn all(&self) -> Result<Vec<Bid>, FundraisingError> {
        self.tx.scan_values(&keys::all_bids_prefix())
    }

    /// Bids of one auction narrowed by bidder and/or eligibility, ascending
    /// by sequence. Both predicates apply when both are given.
    pub fn by_auction_filtered(
        &self,
        auction_id: AuctionId,
        bidder: Option<&Address>,
        eligible: Option<bool>,
    ) -> Result<Vec<Bid>, FundraisingError> {
        let bids = match (bidder, eligible) {
            (Some(bidder), _) => {
                self.load_indexed(&keys::bid_by_bidder_auction_prefix(bidder, auction_id))?
            }
            (None, Some(eligible)) => {
                self.load_indexed(&keys::bid_by_eligibility_prefix(auction_id, eligible))?
            }
            (None, None) => return self.by_auction(auction_id),
        };
        Ok(bids
            .into_iter()
            .filter(|b| eligible.map_or(true, |e| b.eligible == e))
            .collect())
    }

    /// Set the eligibility flag, moving the bid between eligibility indices.
    pub fn mark_eligible(
        &mut self,
        auction_id: AuctionId,
        sequence: Sequence,
        eligible: bool,
    ) -> Result<(), FundraisingError> {
        let mut bid = self.get(auction_id, sequence)?;
        if bid.eligible == eligible {
            return Ok(());
        }
        self.tx
            .delete(keys::bid_by_eligibility(auction_id, bid.eligible, sequence));
        self.tx.put(
            keys::bid_by_eligibility(auction_id, eligible, sequence),
            keys::INDEX_MARKER.to_vec(),
        );
        bid.eligible = eligible;
        self.tx.put_value(keys::bid(auction_id, sequence), &bid)
    }

    /// Paying coin `bidder` has committed to `auction_id` so far.
    pub fn committed_by(&self, auction_id: AuctionId, bidder: &Address) -> Result<u128, FundraisingError> {
        self.by_auction_filtered(auction_id, Some(bidder), None)?
            .iter()
            .try_fold(0u128, |acc, b| acc.checked_add(b.coin.amount))
            .ok_or_else(|| FundraisingError::InvariantViolation("committed amount overflow".into()))
    }

    pub fn put_allocation(&mut self, allocation: &Allocation) -> Result<(), FundraisingError> {
        self.tx.put_value(
            keys::allocation(allocation.auction_id, allocation.sequence),
            allocation,
        )
    }

    /// Allocations of one auction, ascending by sequence.
    pub fn allocations(&self, auction_id: AuctionId) -> Result<Vec<Allocation>, FundraisingError> {
        self.tx.scan_values(&keys::allocation_prefix(auction_id))
    }

    pub fn set_allowed_bidder(
        &mut self,
        auction_id: AuctionId,
        entry: &AllowedBidder,
    ) -> Result<(), FundraisingError> {
        self.tx
            .put_value(keys::allowed_bidder(auction_id, &entry.bidder), entry)
    }

    pub fn allowed_bidder(
        &self,
        auction_id: AuctionId,
        bidder: &Address,
    ) -> Result<Option<AllowedBidder>, FundraisingError> {
        self.tx.get_value(&keys::allowed_bidder(auction_id, bidder))
    }

    /// Allow-list of one auction, ascending by bidder address.
    pub fn allowed_bidders(&self, auction_id: AuctionId) -> Result<Vec<AllowedBidder>, FundraisingError> {
        self.tx.scan_values(&keys::allowed_bidder_prefix(auction_id))
    }

    fn load_indexed(&self, prefix: &[u8]) -> Result<Vec<Bid>, FundraisingError> {
        self.tx
            .prefix_keys(prefix)?
            .iter()
            .map(|key| {
                let (auction_id, sequence) = keys::trailing_bid_id(key)?;
                self.get(auction_id, sequence)
            })
            .collect()
    }
}
