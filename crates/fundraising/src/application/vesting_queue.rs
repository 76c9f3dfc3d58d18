//! Stored vesting queue, one entry per schedule, keyed by release time.

use super::keys;
use super::overlay::StoreTx;
use crate::domain::entities::{Auction, VestingQueueEntry};
use crate::domain::errors::FundraisingError;
use crate::domain::value_objects::AuctionId;

pub struct VestingQueue<'t, 's> {
    tx: &'t mut StoreTx<'s>,
}

impl<'t, 's> VestingQueue<'t, 's> {
    pub fn new(tx: &'t mut StoreTx<'s>) -> Self {
        Self { tx }
    }

    /// Queue one unreleased entry per vesting schedule of `auction`.
    pub fn enqueue(&mut self, auction: &Auction) -> Result<usize, FundraisingError> {
        for schedule in &auction.vesting_schedules {
            let entry = VestingQueueEntry {
                auction_id: auction.id,
                auctioneer: auction.auctioneer,
                release_time: schedule.release_time,
                weight: schedule.weight,
                released: false,
            };
            self.tx
                .put_value(keys::vesting_queue(auction.id, entry.release_time), &entry)?;
        }
        Ok(auction.vesting_schedules.len())
    }

    /// Entries of one auction, ascending by release time.
    pub fn entries(&self, auction_id: AuctionId) -> Result<Vec<VestingQueueEntry>, FundraisingError> {
        self.tx.scan_values(&keys::vesting_queue_prefix(auction_id))
    }

    pub fn mark_released(&mut self, entry: &VestingQueueEntry) -> Result<(), FundraisingError> {
        let key = keys::vesting_queue(entry.auction_id, entry.release_time);
        let mut stored: VestingQueueEntry = self.tx.get_value(&key)?.ok_or_else(|| {
            FundraisingError::NotFound(format!(
                "vesting entry {}/{}",
                entry.auction_id, entry.release_time
            ))
        })?;
        stored.released = true;
        self.tx.put_value(key, &stored)
    }
}
