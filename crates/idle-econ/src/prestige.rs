//! Prestige gain and carry-over math.

use idle_core::{GameState, PrestigeRole, PRESTIGE_UPGRADES, UPGRADES};
use std::collections::BTreeMap;

/// Prestige points earned for `total_earned` currency:
/// `floor(sqrt(total_earned / divisor))`.
///
/// Monotonic non-decreasing in `total_earned`; 0 for non-positive or
/// non-finite inputs.
pub fn compute_gain(total_earned: f64, divisor: f64) -> u64 {
    if !(total_earned.is_finite() && divisor.is_finite()) || total_earned <= 0.0 || divisor <= 0.0
    {
        return 0;
    }
    (total_earned / divisor).sqrt().floor() as u64
}

/// Currency still needed before the first prestige point.
pub fn remaining_for_first_point(total_earned: f64, divisor: f64) -> f64 {
    (divisor - total_earned).max(0.0)
}

fn role_levels(state: &GameState, role: PrestigeRole) -> impl Iterator<Item = (f64, u32)> + '_ {
    PRESTIGE_UPGRADES
        .iter()
        .filter(move |d| d.role == role)
        .map(move |d| {
            let level = state.prestige.level_of(d.id);
            (d.effect_at(level), level)
        })
        .filter(|(_, level)| *level > 0)
}

/// Starting currency after a prestige: 50 per `quickStart` level.
pub fn quick_start_currency(state: &GameState) -> f64 {
    role_levels(state, PrestigeRole::QuickStart)
        .map(|(effect, _)| effect)
        .sum()
}

/// Starting level of every regular upgrade after a prestige.
pub fn second_wind_level(state: &GameState) -> u32 {
    role_levels(state, PrestigeRole::SecondWind)
        .map(|(_, level)| level)
        .fold(0u32, u32::saturating_add)
}

/// Upgrade levels and milestone bonuses for a run that starts every
/// catalog upgrade at `start_level`. Both maps are empty for level 0.
pub fn carryover_levels(start_level: u32) -> (BTreeMap<String, u32>, BTreeMap<String, f64>) {
    let mut levels = BTreeMap::new();
    let mut bonuses = BTreeMap::new();
    if start_level == 0 {
        return (levels, bonuses);
    }
    for def in UPGRADES {
        levels.insert(def.id.to_string(), start_level);
        let bonus = def.milestone_bonus(start_level);
        if bonus > 1.0 {
            bonuses.insert(def.id.to_string(), bonus);
        }
    }
    (levels, bonuses)
}
