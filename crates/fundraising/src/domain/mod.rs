//! Domain module for the fundraising core.
//!
//! Contains value objects, entities, errors, invariants and the vesting engine.

pub mod decimal;
pub mod entities;
pub mod errors;
pub mod invariants;
pub mod value_objects;
pub mod vesting;

pub use decimal::*;
pub use entities::*;
pub use errors::*;
pub use value_objects::*;
