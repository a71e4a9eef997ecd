//! Production rates derived from upgrade levels.

use idle_core::{
    prestige_upgrade, upgrade, GameState, PrestigeRole, UpgradeCategory, UpgradeRole,
};
use tracing::trace;

/// Bonus per prestige level applied to all output.
pub const PRESTIGE_LEVEL_BONUS: f64 = 0.1;

/// Rates computed from a state snapshot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Derived {
    pub click_value: f64,
    pub idle_rate: f64,
}

/// Compute click value and idle rate for `state`.
///
/// Pure and deterministic: maps are iterated in key order, so two calls on
/// the same snapshot produce bit-identical results.
///
/// Regular upgrades are routed by category. Efficiency upgrades multiply a
/// shared factor by `1 + effect`, except the global multiplier (direct
/// multiplier, floored at 1) and the cost-reduction, lucky and auto-click
/// roles, which do not touch production here. Auto-click income is added
/// only after the final click value is known.
pub fn derive(state: &GameState) -> Derived {
    let mut click = 1.0;
    let mut idle = 0.0;
    let mut efficiency = 1.0;
    let mut auto_click_level = 0u32;

    for (id, &level) in &state.upgrades {
        let Some(def) = upgrade(id) else {
            continue;
        };
        let effect = def.effect(level, state.milestone_bonus(id));
        match (def.category, def.role) {
            (UpgradeCategory::Active, _) => click += effect,
            (UpgradeCategory::Idle, _) => idle += effect,
            (UpgradeCategory::Efficiency, UpgradeRole::AutoClick) => auto_click_level = level,
            (
                UpgradeCategory::Efficiency,
                UpgradeRole::CostReduction | UpgradeRole::LuckyCommands,
            ) => {}
            (UpgradeCategory::Efficiency, UpgradeRole::GlobalMultiplier) => {
                efficiency *= effect.max(1.0)
            }
            (UpgradeCategory::Efficiency, UpgradeRole::Standard) => efficiency *= 1.0 + effect,
        }
    }

    let mut prestige_factor = 1.0;
    let mut prestige_click = 0.0;
    let mut prestige_idle = 0.0;
    let mut tick_speed = 1.0;
    for (id, &level) in &state.prestige.upgrades {
        let Some(def) = prestige_upgrade(id) else {
            continue;
        };
        if level == 0 {
            continue;
        }
        let effect = def.effect_at(level);
        match def.role {
            PrestigeRole::ProductionMultiplier => prestige_factor *= effect,
            PrestigeRole::ClickBonus => prestige_click += effect,
            PrestigeRole::IdleBonus => prestige_idle += effect,
            PrestigeRole::TickSpeed => tick_speed *= effect,
            PrestigeRole::CostReduction
            | PrestigeRole::QuickStart
            | PrestigeRole::SecondWind
            | PrestigeRole::BulkBuy => {}
        }
    }

    let level_factor = 1.0 + f64::from(state.prestige.level) * PRESTIGE_LEVEL_BONUS;
    let click_value =
        ((click + prestige_click) * (efficiency * prestige_factor * level_factor)).max(1.0);

    // Must follow the click value clamp.
    let auto_click_rate = if auto_click_level > 0 {
        click_value * f64::from(auto_click_level)
    } else {
        0.0
    };
    let idle_rate =
        (idle + prestige_idle) * efficiency * prestige_factor * level_factor * tick_speed
            + auto_click_rate;

    trace!(click_value, idle_rate, efficiency, prestige_factor, "derived rates");
    Derived {
        click_value,
        idle_rate,
    }
}

/// Return `state` with its derived fields recomputed.
pub fn with_derived(mut state: GameState) -> GameState {
    let d = derive(&state);
    state.click_value = d.click_value;
    state.idle_rate = d.idle_rate;
    state
}
