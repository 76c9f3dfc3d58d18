//! Pricing and clearing algorithms.
//!
//! Contains:
//! - Fixed-price fill (matched at admission)
//! - Batch clearing (single clearing price at end time)

pub mod batch;
pub mod fixed_price;

pub use batch::{clear, BidOutcome, ClearingResult};
pub use fixed_price::{fill, FixedPriceFill};
