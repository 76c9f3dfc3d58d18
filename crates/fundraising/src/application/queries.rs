//! Query requests as they arrive from query services, with string filters.

use serde::{Deserialize, Serialize};

use crate::domain::entities::{Auction, Bid};
use crate::domain::errors::FundraisingError;
use crate::domain::value_objects::{Address, AuctionId, AuctionStatus, AuctionType};
use crate::ports::inbound::{AuctionFilter, BidFilter, FundraisingQueryApi};

/// `Auctions` request. Empty strings count as absent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionsRequest {
    #[serde(default)]
    pub auction_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl AuctionsRequest {
    pub fn to_filter(&self) -> Result<AuctionFilter, FundraisingError> {
        Ok(AuctionFilter {
            auction_type: non_empty(&self.auction_type)
                .map(|s| s.parse::<AuctionType>().map_err(FundraisingError::InvalidRequest))
                .transpose()?,
            status: non_empty(&self.status)
                .map(|s| s.parse::<AuctionStatus>().map_err(FundraisingError::InvalidRequest))
                .transpose()?,
        })
    }
}

/// `Bids` request. `eligible` accepts `"true"` or `"false"`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidsRequest {
    #[serde(default)]
    pub auction_id: Option<AuctionId>,
    #[serde(default)]
    pub bidder: Option<String>,
    #[serde(default)]
    pub eligible: Option<String>,
}

impl BidsRequest {
    pub fn to_filter(&self) -> Result<BidFilter, FundraisingError> {
        let eligible = non_empty(&self.eligible)
            .map(|s| match s.to_ascii_lowercase().as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(FundraisingError::InvalidRequest(format!(
                    "invalid eligible filter: {s}"
                ))),
            })
            .transpose()?;

        Ok(BidFilter {
            auction_id: self.auction_id,
            bidder: non_empty(&self.bidder).map(parse_address).transpose()?,
            eligible,
        })
    }
}

/// Parse a 20-byte hex address, with or without `0x`.
pub fn parse_address(s: &str) -> Result<Address, FundraisingError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(digits)
        .map_err(|e| FundraisingError::InvalidRequest(format!("invalid address {s}: {e}")))?;
    if bytes.len() != Address::len_bytes() {
        return Err(FundraisingError::InvalidRequest(format!(
            "invalid address {s}: expected {} bytes, got {}",
            Address::len_bytes(),
            bytes.len()
        )));
    }
    Ok(Address::from_slice(&bytes))
}

pub fn query_auctions<Q: FundraisingQueryApi + ?Sized>(
    api: &Q,
    request: &AuctionsRequest,
) -> Result<Vec<Auction>, FundraisingError> {
    api.auctions(request.to_filter()?)
}

pub fn query_bids<Q: FundraisingQueryApi + ?Sized>(
    api: &Q,
    request: &BidsRequest,
) -> Result<Vec<Bid>, FundraisingError> {
    api.bids(request.to_filter()?)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
