//! Module parameters for the fundraising core.
//!
//! Parameters are passed into the service at construction; nothing here is
//! process-global, so independent scenarios can run side by side.

use serde::{Deserialize, Serialize};
use std::env;

use crate::domain::errors::FundraisingError;
use crate::domain::value_objects::Coin;

/// What an enabled allow-list does with a bidder that has no entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissingAllowancePolicy {
    /// Bidder is capped at `default_max_bid_amount` (unlimited if unset).
    #[default]
    Unlimited,
    /// Bidder may not bid at all.
    Disallowed,
}

/// Fundraising module parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundraisingParams {
    /// Enforce per-bidder caps and allow `AddAllowedBidders`.
    pub enable_allowed_bidder_limits: bool,
    /// Treatment of bidders without an allow-list entry.
    pub missing_allowance_policy: MissingAllowancePolicy,
    /// Cap for bidders without an entry under `Unlimited`.
    pub default_max_bid_amount: Option<u128>,
    /// Fee escrowed into the fee collector on auction creation.
    pub auction_creation_fee: Option<Coin>,
    /// Upper bound on vesting schedules per auction.
    pub max_vesting_schedules: usize,
}

impl Default for FundraisingParams {
    fn default() -> Self {
        Self {
            enable_allowed_bidder_limits: false,
            missing_allowance_policy: MissingAllowancePolicy::Unlimited,
            default_max_bid_amount: None,
            auction_creation_fee: None,
            max_vesting_schedules: 100,
        }
    }
}

impl FundraisingParams {
    /// Defaults overridden by environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `FUNDRAISING_ENABLE_ALLOWED_BIDDER_LIMITS`: `true`/`false`
    /// - `FUNDRAISING_MISSING_ALLOWANCE_POLICY`: `unlimited`/`disallowed`
    /// - `FUNDRAISING_DEFAULT_MAX_BID_AMOUNT`: integer amount
    /// - `FUNDRAISING_AUCTION_CREATION_FEE`: `<amount><denom>`, e.g. `100stake`
    /// - `FUNDRAISING_MAX_VESTING_SCHEDULES`: integer
    pub fn from_env() -> Result<Self, FundraisingError> {
        let mut params = Self::default();

        if let Ok(v) = env::var("FUNDRAISING_ENABLE_ALLOWED_BIDDER_LIMITS") {
            params.enable_allowed_bidder_limits = v
                .parse()
                .map_err(|_| invalid("FUNDRAISING_ENABLE_ALLOWED_BIDDER_LIMITS", &v))?;
        }
        if let Ok(v) = env::var("FUNDRAISING_MISSING_ALLOWANCE_POLICY") {
            params.missing_allowance_policy = match v.to_ascii_lowercase().as_str() {
                "unlimited" => MissingAllowancePolicy::Unlimited,
                "disallowed" => MissingAllowancePolicy::Disallowed,
                _ => return Err(invalid("FUNDRAISING_MISSING_ALLOWANCE_POLICY", &v)),
            };
        }
        if let Ok(v) = env::var("FUNDRAISING_DEFAULT_MAX_BID_AMOUNT") {
            params.default_max_bid_amount = Some(
                v.parse()
                    .map_err(|_| invalid("FUNDRAISING_DEFAULT_MAX_BID_AMOUNT", &v))?,
            );
        }
        if let Ok(v) = env::var("FUNDRAISING_AUCTION_CREATION_FEE") {
            params.auction_creation_fee = Some(
                parse_coin(&v).ok_or_else(|| invalid("FUNDRAISING_AUCTION_CREATION_FEE", &v))?,
            );
        }
        if let Ok(v) = env::var("FUNDRAISING_MAX_VESTING_SCHEDULES") {
            params.max_vesting_schedules = v
                .parse()
                .map_err(|_| invalid("FUNDRAISING_MAX_VESTING_SCHEDULES", &v))?;
        }

        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), FundraisingError> {
        if self.max_vesting_schedules == 0 {
            return Err(FundraisingError::InvalidRequest(
                "max_vesting_schedules must be positive".into(),
            ));
        }
        if let Some(fee) = &self.auction_creation_fee {
            if fee.is_zero() || fee.denom.is_empty() {
                return Err(FundraisingError::InvalidRequest(format!(
                    "invalid auction creation fee: {fee}"
                )));
            }
        }
        Ok(())
    }
}

fn invalid(var: &str, value: &str) -> FundraisingError {
    FundraisingError::InvalidRequest(format!("{var}={value}"))
}

/// Parse `<amount><denom>`.
pub fn parse_coin(s: &str) -> Option<Coin> {
    let split = s.find(|c: char| !c.is_ascii_digit())?;
    let (amount, denom) = s.split_at(split);
    Some(Coin::new(denom, amount.parse().ok()?))
}
