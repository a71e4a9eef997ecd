#![deny(warnings)]

//! Economic models: production derivation, pricing and prestige math.
//!
//! This crate provides pure helpers for:
//! - Deriving click value and idle rate from upgrade levels
//! - Pricing the next level of an upgrade under stacked discounts
//! - Prestige gain and carry-over computations

use thiserror::Error;

pub mod derive;
pub mod pricing;
pub mod prestige;

pub use derive::{derive, with_derived, Derived};
pub use pricing::{prestige_upgrade_cost, reduction_factor, upgrade_cost, MIN_PRICE_FACTOR};
pub use prestige::{
    carryover_levels, compute_gain, quick_start_currency, remaining_for_first_point,
    second_wind_level,
};

/// Errors produced by economic helpers.
#[derive(Debug, Error, PartialEq)]
pub enum EconError {
    /// Id not present in the regular upgrade catalog.
    #[error("unknown upgrade: {0}")]
    UnknownUpgrade(String),
    /// Id not present in the prestige upgrade catalog.
    #[error("unknown prestige upgrade: {0}")]
    UnknownPrestigeUpgrade(String),
}
