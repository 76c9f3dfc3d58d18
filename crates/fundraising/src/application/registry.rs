//! Auction Registry: creation, lookup, listing and status transitions.

use tracing::debug;

use super::keys;
use super::overlay::StoreTx;
use crate::domain::entities::{Auction, AuctionSpec};
use crate::domain::errors::FundraisingError;
use crate::domain::value_objects::{Address, AuctionId, AuctionStatus, Timestamp};
use crate::ports::inbound::AuctionFilter;

pub struct AuctionRegistry<'t, 's> {
    tx: &'t mut StoreTx<'s>,
}

impl<'t, 's> AuctionRegistry<'t, 's> {
    pub fn new(tx: &'t mut StoreTx<'s>) -> Self {
        Self { tx }
    }

    /// Validate `spec` and store it as a new Standby auction.
    pub fn create(
        &mut self,
        auctioneer: Address,
        spec: AuctionSpec,
        now: Timestamp,
        max_vesting_schedules: usize,
    ) -> Result<Auction, FundraisingError> {
        spec.validate(now, max_vesting_schedules)?;

        let last: AuctionId = self.tx.get_value(&keys::last_auction_id())?.unwrap_or(0);
        let id = last.checked_add(1).ok_or_else(|| {
            FundraisingError::InvariantViolation("auction id space exhausted".into())
        })?;

        let auction = Auction::from_spec(id, auctioneer, spec, now);
        self.tx.put_value(keys::last_auction_id(), &id)?;
        self.save(&auction)?;
        self.tx.put(
            keys::auction_by_type(auction.auction_type(), id),
            keys::INDEX_MARKER.to_vec(),
        );
        self.tx.put(
            keys::auction_by_status(auction.status, id),
            keys::INDEX_MARKER.to_vec(),
        );
        Ok(auction)
    }

    pub fn get(&self, id: AuctionId) -> Result<Auction, FundraisingError> {
        self.tx
            .get_value(&keys::auction(id))?
            .ok_or_else(|| FundraisingError::auction_not_found(id))
    }

    /// Overwrite the stored record. Status changes go through `update_status`.
    pub fn save(&mut self, auction: &Auction) -> Result<(), FundraisingError> {
        self.tx.put_value(keys::auction(auction.id), auction)
    }

    /// Ids currently in `status`, ascending.
    pub fn ids_with_status(&self, status: AuctionStatus) -> Result<Vec<AuctionId>, FundraisingError> {
        self.tx
            .prefix_keys(&keys::auction_by_status_prefix(status))?
            .iter()
            .map(|k| keys::trailing_u64(k))
            .collect()
    }

    /// Auctions matching `filter`, loaded one at a time, ascending by id.
    pub fn list(
        &self,
        filter: AuctionFilter,
    ) -> Result<Box<dyn Iterator<Item = Result<Auction, FundraisingError>> + '_>, FundraisingError> {
        let ids: Vec<AuctionId> = match (filter.status, filter.auction_type) {
            (Some(status), _) => self.ids_with_status(status)?,
            (None, Some(auction_type)) => self
                .tx
                .prefix_keys(&keys::auction_by_type_prefix(auction_type))?
                .iter()
                .map(|k| keys::trailing_u64(k))
                .collect::<Result<_, _>>()?,
            (None, None) => self
                .tx
                .prefix_keys(&keys::auction_prefix())?
                .iter()
                .map(|k| keys::trailing_u64(k))
                .collect::<Result<_, _>>()?,
        };

        Ok(Box::new(
            ids.into_iter()
                .map(move |id| self.get(id))
                .filter(move |loaded| match loaded {
                    Ok(auction) => filter.matches(auction),
                    Err(_) => true,
                }),
        ))
    }

    /// Move auction `id` to `next` if the transition table allows it.
    pub fn update_status(
        &mut self,
        id: AuctionId,
        next: AuctionStatus,
    ) -> Result<Auction, FundraisingError> {
        let mut auction = self.get(id)?;
        let from = auction.status;
        if !from.can_transition_to(next) {
            return Err(FundraisingError::IllegalTransition {
                auction_id: id,
                from,
                to: next,
            });
        }

        self.tx.delete(keys::auction_by_status(from, id));
        self.tx
            .put(keys::auction_by_status(next, id), keys::INDEX_MARKER.to_vec());
        auction.status = next;
        self.save(&auction)?;

        debug!(auction_id = id, from = %from, to = %next, "Auction status updated");
        Ok(auction)
    }
}
