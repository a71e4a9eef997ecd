//! Upgrade pricing under stacked discounts.

use crate::EconError;
use idle_core::{
    prestige_upgrade, upgrade, GameState, PrestigeRole, PrestigeUpgradeDefinition,
    UpgradeDefinition, UpgradeRole, PRESTIGE_UPGRADES, UPGRADES,
};

/// Lower bound of each individual discount factor.
pub const MIN_PRICE_FACTOR: f64 = 0.01;

/// Combined multiplicative discount on regular upgrade prices.
///
/// Each source contributes `max(0.01, 1 - effect)`: prestige cost
/// reduction (`frugalShopper`, 0.02 per level) and the cost-reduction
/// efficiency upgrade (`raycastProMode`). The product is always > 0.
pub fn reduction_factor(state: &GameState) -> f64 {
    let mut factor = 1.0;
    for def in PRESTIGE_UPGRADES
        .iter()
        .filter(|d| d.role == PrestigeRole::CostReduction)
    {
        let level = state.prestige.level_of(def.id);
        if level > 0 {
            factor *= (1.0 - def.effect_at(level)).max(MIN_PRICE_FACTOR);
        }
    }
    for def in UPGRADES
        .iter()
        .filter(|u| u.role == UpgradeRole::CostReduction)
    {
        let level = state.level(def.id);
        if level > 0 {
            let effect = def.effect(level, state.milestone_bonus(def.id));
            factor *= (1.0 - effect).max(MIN_PRICE_FACTOR);
        }
    }
    factor
}

/// Price of the next level of `def`, rounded up to a whole unit.
pub fn upgrade_cost(def: &UpgradeDefinition, state: &GameState) -> f64 {
    let raw = def.base_cost_at(state.level(def.id)) * reduction_factor(state);
    raw.ceil().max(1.0)
}

/// Price of the next level of the regular upgrade `id`.
pub fn upgrade_cost_by_id(id: &str, state: &GameState) -> Result<f64, EconError> {
    let def = upgrade(id).ok_or_else(|| EconError::UnknownUpgrade(id.to_string()))?;
    Ok(upgrade_cost(def, state))
}

/// Prestige-point price of the next level of `def`.
pub fn prestige_upgrade_cost(def: &PrestigeUpgradeDefinition, state: &GameState) -> u64 {
    def.cost_at(state.prestige.level_of(def.id))
}

/// Prestige-point price of the next level of the prestige upgrade `id`.
pub fn prestige_upgrade_cost_by_id(id: &str, state: &GameState) -> Result<u64, EconError> {
    let def =
        prestige_upgrade(id).ok_or_else(|| EconError::UnknownPrestigeUpgrade(id.to_string()))?;
    Ok(prestige_upgrade_cost(def, state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn no_discount_by_default() {
        assert_eq!(reduction_factor(&GameState::default()), 1.0);
    }

    #[test]
    fn base_price_grows_geometrically() {
        let mut s = GameState::default();
        assert_eq!(upgrade_cost_by_id("homeRowNovice", &s).unwrap(), 10.0);
        s.upgrades.insert("homeRowNovice".into(), 1);
        assert_eq!(upgrade_cost_by_id("homeRowNovice", &s).unwrap(), 12.0); // ceil(11.5)
        s.upgrades.insert("homeRowNovice".into(), 2);
        assert_eq!(upgrade_cost_by_id("homeRowNovice", &s).unwrap(), 14.0); // ceil(13.225)
    }

    #[test]
    fn frugal_shopper_discounts_two_percent_per_level() {
        let mut s = GameState::default();
        s.prestige.upgrades.insert("frugalShopper".into(), 5);
        assert!((reduction_factor(&s) - 0.9).abs() < 1e-12);
        s.upgrades.insert("scriptRunner".into(), 0);
        assert_eq!(upgrade_cost_by_id("scriptRunner", &s).unwrap(), 14.0); // ceil(13.5)
    }

    #[test]
    fn discounts_stack_and_floor() {
        let mut s = GameState::default();
        s.prestige.upgrades.insert("frugalShopper".into(), 25); // 1 - 0.5
        s.upgrades.insert("raycastProMode".into(), 50); // effect 2.0, floored
        assert!((reduction_factor(&s) - 0.5 * MIN_PRICE_FACTOR).abs() < 1e-12);
        assert!(upgrade_cost_by_id("homeRowNovice", &s).unwrap() >= 1.0);
    }

    #[test]
    fn unknown_ids_are_errors() {
        let s = GameState::default();
        assert_eq!(
            upgrade_cost_by_id("nope", &s),
            Err(EconError::UnknownUpgrade("nope".into()))
        );
        assert!(prestige_upgrade_cost_by_id("nope", &s).is_err());
    }

    proptest! {
        #[test]
        fn cost_monotonic_in_level(level in 0u32..150) {
            let mut s = GameState::default();
            s.upgrades.insert("extensionDeveloper".into(), level);
            let c1 = upgrade_cost_by_id("extensionDeveloper", &s).unwrap();
            s.upgrades.insert("extensionDeveloper".into(), level + 1);
            let c2 = upgrade_cost_by_id("extensionDeveloper", &s).unwrap();
            prop_assert!(c2 >= c1);
        }

        #[test]
        fn factor_stays_positive(frugal in 0u32..100, pro in 0u32..100) {
            let mut s = GameState::default();
            s.prestige.upgrades.insert("frugalShopper".into(), frugal);
            s.upgrades.insert("raycastProMode".into(), pro);
            let f = reduction_factor(&s);
            prop_assert!(f > 0.0 && f <= 1.0);
        }
    }
}
