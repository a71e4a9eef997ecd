#![deny(warnings)]

//! Core domain models and invariants for the idle clicker.
//!
//! This crate defines the serializable save document shared by every
//! process, the static upgrade catalogs, and validation helpers that guard
//! the basic invariants of a save.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

pub mod catalog;
pub mod clock;
pub mod config;

pub use catalog::{
    prestige_upgrade, upgrade, EffectScale, Milestone, PrestigeCategory, PrestigeEffect,
    PrestigeRole, PrestigeUpgradeDefinition, UpgradeCategory, UpgradeDefinition, UpgradeRole,
    PRESTIGE_UPGRADES, UPGRADES,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::GameConfig;

/// Prestige progress. Everything except `total_earned` survives a prestige.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrestigeState {
    /// Number of prestiges performed on this save.
    pub level: u32,
    /// Currency earned since the last prestige; feeds the gain formula.
    pub total_earned: f64,
    /// Currency earned over the whole life of the save. Never reset.
    pub lifetime_earned: f64,
    /// Unspent prestige points.
    pub prestige_points: u64,
    /// Prestige-tree levels keyed by prestige upgrade id. Never reset.
    pub upgrades: BTreeMap<String, u32>,
}

impl PrestigeState {
    /// Level of a prestige upgrade, 0 when never bought.
    pub fn level_of(&self, id: &str) -> u32 {
        self.upgrades.get(id).copied().unwrap_or(0)
    }
}

impl Default for PrestigeState {
    fn default() -> Self {
        INITIAL_STATE.prestige
    }
}

/// Player-facing boolean flags.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Show a notification when a golden command fires.
    pub lucky_toasts_enabled: bool,
    /// Unlocked by the `bulkBuyerPro` prestige upgrade.
    pub bulk_buy_enabled: bool,
    /// Unlocked by the `fasterTick` prestige upgrade.
    pub offline_progress_enabled: bool,
    pub auto_click_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        INITIAL_STATE.settings
    }
}

/// Unlock record for one achievement.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AchievementRecord {
    pub unlocked: bool,
    /// Wall-clock milliseconds of the unlock.
    pub unlocked_at: Option<i64>,
}

/// The persisted save document.
///
/// `click_value` and `idle_rate` are derived from the upgrade maps and are
/// recomputed after every transition; they are stored only so readers of
/// the document see current rates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameState {
    /// Spendable currency (>= 0).
    pub currency: f64,
    /// Currency granted per manual click (derived).
    pub click_value: f64,
    /// Currency generated per second (derived).
    pub idle_rate: f64,
    /// Wall-clock milliseconds of the last write-worthy change.
    pub last_update: i64,
    /// Upgrade levels keyed by upgrade id.
    pub upgrades: BTreeMap<String, u32>,
    /// Current milestone multiplier keyed by upgrade id.
    pub milestone_bonuses: BTreeMap<String, f64>,
    pub prestige: PrestigeState,
    pub settings: Settings,
    pub achievements: BTreeMap<String, AchievementRecord>,
}

/// State of a brand-new save.
pub const INITIAL_STATE: GameState = GameState {
    currency: 0.0,
    click_value: 1.0,
    idle_rate: 0.0,
    last_update: 0,
    upgrades: BTreeMap::new(),
    milestone_bonuses: BTreeMap::new(),
    prestige: PrestigeState {
        level: 0,
        total_earned: 0.0,
        lifetime_earned: 0.0,
        prestige_points: 0,
        upgrades: BTreeMap::new(),
    },
    settings: Settings {
        lucky_toasts_enabled: true,
        bulk_buy_enabled: false,
        offline_progress_enabled: false,
        auto_click_enabled: false,
    },
    achievements: BTreeMap::new(),
};

impl Default for GameState {
    fn default() -> Self {
        INITIAL_STATE
    }
}

impl GameState {
    /// Fresh save stamped at `now_ms`.
    pub fn initial(now_ms: i64) -> Self {
        GameState {
            last_update: now_ms,
            ..INITIAL_STATE
        }
    }

    /// Level of a regular upgrade, 0 when never bought.
    pub fn level(&self, id: &str) -> u32 {
        self.upgrades.get(id).copied().unwrap_or(0)
    }

    /// Stored milestone multiplier for an upgrade, 1 when none applies.
    pub fn milestone_bonus(&self, id: &str) -> f64 {
        self.milestone_bonuses.get(id).copied().unwrap_or(1.0)
    }

    pub fn is_unlocked(&self, achievement_id: &str) -> bool {
        self.achievements
            .get(achievement_id)
            .map(|a| a.unlocked)
            .unwrap_or(false)
    }

    /// Credit earned currency to the wallet and both earning totals.
    pub fn credit(&mut self, amount: f64) {
        self.currency += amount;
        self.prestige.total_earned += amount;
        self.prestige.lifetime_earned += amount;
    }
}

/// Validation errors for save invariants.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Numeric field must be finite.
    #[error("non-finite value in field `{0}`")]
    NonFinite(&'static str),
    /// Currency and earning totals must be non-negative.
    #[error("negative value in field `{0}`")]
    Negative(&'static str),
    /// Milestone multipliers are never below 1.
    #[error("milestone bonus for {0} is below 1")]
    MilestoneBelowOne(String),
    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    /// `lastUpdate` lies further ahead of the local clock than the allowed skew.
    #[error("lastUpdate {last_update} is ahead of the clock ({now})")]
    FutureStamp { last_update: i64, now: i64 },
}

/// How far a stored `lastUpdate` may run ahead of the local clock.
pub const MAX_CLOCK_SKEW_MS: i64 = 24 * 60 * 60 * 1000;

fn check_amount(value: f64, field: &'static str) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFinite(field));
    }
    if value < 0.0 {
        return Err(ValidationError::Negative(field));
    }
    Ok(())
}

/// Validate a save document loaded from storage.
///
/// Unknown upgrade ids are tolerated; the calculators skip them.
pub fn validate_state(state: &GameState) -> Result<(), ValidationError> {
    check_amount(state.currency, "currency")?;
    check_amount(state.prestige.total_earned, "prestige.totalEarned")?;
    check_amount(state.prestige.lifetime_earned, "prestige.lifetimeEarned")?;
    if state.last_update < 0 {
        return Err(ValidationError::Negative("lastUpdate"));
    }
    for (id, bonus) in &state.milestone_bonuses {
        if !bonus.is_finite() {
            return Err(ValidationError::NonFinite("milestoneBonuses"));
        }
        if *bonus < 1.0 {
            return Err(ValidationError::MilestoneBelowOne(id.clone()));
        }
    }
    Ok(())
}

/// Reject a stamp written by a clock running far ahead of `now_ms`. Such a
/// document would win every guarded write until the clock caught up.
pub fn validate_stamp(last_update: i64, now_ms: i64) -> Result<(), ValidationError> {
    if last_update > now_ms.saturating_add(MAX_CLOCK_SKEW_MS) {
        return Err(ValidationError::FutureStamp {
            last_update,
            now: now_ms,
        });
    }
    Ok(())
}
