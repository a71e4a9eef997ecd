//! Engine tuning parameters.

use crate::ValidationError;
use serde::{Deserialize, Serialize};

/// Tuning parameters shared by the scheduler, reducers and reconciler.
///
/// Every field has a default, so a config file only needs the values it
/// overrides.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Period of the accrual loop.
    pub tick_period_ms: u64,
    /// Minimum spacing of tick-driven saves in the foreground loop.
    pub foreground_save_interval_ms: i64,
    /// Lifetime of the background aggregator's lease between renewals.
    pub lease_ttl_ms: i64,
    /// Divisor of the prestige gain formula.
    pub prestige_divisor: f64,
    /// Fraction of the idle rate granted for time spent offline.
    pub offline_rate: f64,
    /// Tick gains below this are not applied.
    pub min_gain_epsilon: f64,
    /// Upper bound on levels bought by one buy-max command.
    pub purchase_max_cap: u32,
    /// Seed for golden-command rolls; drawn from the clock when absent.
    pub rng_seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: 1_000,
            foreground_save_interval_ms: 5_000,
            lease_ttl_ms: 5_000,
            prestige_divisor: 800_000.0,
            offline_rate: 0.5,
            min_gain_epsilon: 0.01,
            purchase_max_cap: 5_000,
            rng_seed: None,
        }
    }
}

impl GameConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.tick_period_ms == 0 {
            return Err(ValidationError::InvalidConfig("tick_period_ms must be > 0"));
        }
        if self.lease_ttl_ms <= 0 {
            return Err(ValidationError::InvalidConfig("lease_ttl_ms must be > 0"));
        }
        if !(self.prestige_divisor.is_finite() && self.prestige_divisor > 0.0) {
            return Err(ValidationError::InvalidConfig(
                "prestige_divisor must be finite and > 0",
            ));
        }
        if !(0.0..=1.0).contains(&self.offline_rate) {
            return Err(ValidationError::InvalidConfig(
                "offline_rate must be within [0,1]",
            ));
        }
        if !(self.min_gain_epsilon.is_finite() && self.min_gain_epsilon >= 0.0) {
            return Err(ValidationError::InvalidConfig(
                "min_gain_epsilon must be finite and >= 0",
            ));
        }
        Ok(())
    }
}
