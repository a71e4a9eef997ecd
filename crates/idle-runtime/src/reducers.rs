//! Pure state transitions.
//!
//! Each reducer takes the current state by reference and returns a new,
//! re-derived state. None of them touch storage, clocks or randomness;
//! callers pass `now_ms` and any random roll in.

use crate::GameError;
use idle_core::{
    prestige_upgrade, upgrade, GameState, PrestigeRole, PrestigeState, Settings, UpgradeRole,
    INITIAL_STATE, PRESTIGE_UPGRADES, UPGRADES,
};
use idle_econ::{
    carryover_levels, compute_gain, derive, prestige_upgrade_cost, quick_start_currency,
    remaining_for_first_point, second_wind_level, upgrade_cost, with_derived,
};

/// Bounds of the click combo multiplier.
pub const MIN_COMBO: f64 = 1.0;
pub const MAX_COMBO: f64 = 3.0;

/// Payout multiplier of a golden command.
pub const GOLDEN_MULTIPLIER: f64 = 10.0;

/// Chance of a golden command per click at `level` of the lucky upgrade.
/// 1% at level 1, plus 0.01% for each further level.
pub fn lucky_chance(level: u32) -> f64 {
    if level == 0 {
        return 0.0;
    }
    0.01 + f64::from(level - 1) * 0.0001
}

/// Level of the lucky-commands upgrade line.
pub fn lucky_level(state: &GameState) -> u32 {
    UPGRADES
        .iter()
        .filter(|u| u.role == UpgradeRole::LuckyCommands)
        .map(|u| state.level(u.id))
        .max()
        .unwrap_or(0)
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClickResult {
    pub state: GameState,
    pub points: f64,
    pub golden: bool,
}

/// Credit one click. `lucky_roll` is a uniform draw in `[0, 1)`, only
/// consulted when the lucky upgrade is owned.
pub fn apply_click(
    state: &GameState,
    combo: f64,
    lucky_roll: Option<f64>,
    now_ms: i64,
) -> ClickResult {
    let combo = if combo.is_nan() {
        MIN_COMBO
    } else {
        combo.clamp(MIN_COMBO, MAX_COMBO)
    };
    let mut points = derive(state).click_value * combo;
    let chance = lucky_chance(lucky_level(state));
    let golden = matches!(lucky_roll, Some(roll) if roll < chance);
    if golden {
        points *= GOLDEN_MULTIPLIER;
    }
    let mut next = state.clone();
    next.credit(points);
    next.last_update = now_ms;
    ClickResult {
        state: with_derived(next),
        points,
        golden,
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PurchaseReceipt {
    pub name: &'static str,
    pub cost: f64,
    pub new_level: u32,
    /// New milestone multiplier when this level raised it.
    pub milestone: Option<f64>,
}

/// Buy one level of a regular upgrade.
pub fn apply_purchase(
    state: &GameState,
    id: &str,
    now_ms: i64,
) -> Result<(GameState, PurchaseReceipt), GameError> {
    let def = upgrade(id).ok_or_else(|| GameError::UnknownUpgrade(id.to_string()))?;
    let cost = upgrade_cost(def, state);
    if state.currency < cost {
        return Err(GameError::InsufficientFunds {
            cost,
            shortfall: cost - state.currency,
        });
    }

    let level = state.level(def.id);
    let new_level = level.saturating_add(1);
    let prev_bonus = def.milestone_bonus(level);
    let bonus = def.milestone_bonus(new_level);

    let mut next = state.clone();
    next.currency = (next.currency - cost).max(0.0);
    next.upgrades.insert(def.id.to_string(), new_level);
    if bonus != prev_bonus {
        next.milestone_bonuses.insert(def.id.to_string(), bonus);
    }
    next.last_update = now_ms;

    let receipt = PurchaseReceipt {
        name: def.name,
        cost,
        new_level,
        milestone: (bonus > prev_bonus).then_some(bonus),
    };
    Ok((with_derived(next), receipt))
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BulkReceipt {
    pub bought: u32,
    pub spent: f64,
    /// (level, multiplier) for every milestone crossed.
    pub milestones: Vec<(u32, f64)>,
}

/// Buy levels of one upgrade until the next is unaffordable or `cap` is
/// reached. The result equals `bought` sequential [`apply_purchase`] calls.
pub fn apply_purchase_max(
    state: &GameState,
    id: &str,
    cap: u32,
    now_ms: i64,
) -> Result<(GameState, BulkReceipt), GameError> {
    if upgrade(id).is_none() {
        return Err(GameError::UnknownUpgrade(id.to_string()));
    }
    let mut current = state.clone();
    let mut receipt = BulkReceipt::default();
    for _ in 0..cap {
        match apply_purchase(&current, id, now_ms) {
            Ok((next, r)) => {
                current = next;
                receipt.bought += 1;
                receipt.spent += r.cost;
                if let Some(bonus) = r.milestone {
                    receipt.milestones.push((r.new_level, bonus));
                }
            }
            Err(GameError::InsufficientFunds { .. }) => break,
            Err(e) => return Err(e),
        }
    }
    Ok((current, receipt))
}

#[derive(Clone, Debug, PartialEq)]
pub struct PrestigePurchaseReceipt {
    pub name: &'static str,
    pub cost: u64,
    pub new_level: u32,
    pub max_level: u32,
}

/// Buy one level of a prestige upgrade with prestige points.
pub fn apply_prestige_purchase(
    state: &GameState,
    id: &str,
    now_ms: i64,
) -> Result<(GameState, PrestigePurchaseReceipt), GameError> {
    let def = prestige_upgrade(id).ok_or_else(|| GameError::UnknownUpgrade(id.to_string()))?;
    if state.prestige.level < def.unlock_level {
        return Err(GameError::PrestigeUpgradeLocked {
            name: def.name,
            unlock_level: def.unlock_level,
        });
    }
    let level = state.prestige.level_of(def.id);
    if level >= def.max_level {
        return Err(GameError::UpgradeAlreadyMaxed {
            name: def.name,
            max_level: def.max_level,
        });
    }
    let cost = prestige_upgrade_cost(def, state);
    if state.prestige.prestige_points < cost {
        return Err(GameError::InsufficientPrestigePoints {
            cost,
            shortfall: cost - state.prestige.prestige_points,
        });
    }

    let mut next = state.clone();
    next.prestige.prestige_points -= cost;
    next.prestige.upgrades.insert(def.id.to_string(), level + 1);
    match def.role {
        PrestigeRole::BulkBuy => next.settings.bulk_buy_enabled = true,
        PrestigeRole::TickSpeed => next.settings.offline_progress_enabled = true,
        _ => {}
    }
    next.last_update = now_ms;

    let receipt = PrestigePurchaseReceipt {
        name: def.name,
        cost,
        new_level: level + 1,
        max_level: def.max_level,
    };
    Ok((with_derived(next), receipt))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PrestigeReceipt {
    pub gained: u64,
    pub new_level: u32,
}

/// Baseline settings plus the flags granted by owned prestige upgrades.
fn unlocked_settings(prestige: &PrestigeState) -> Settings {
    let mut settings = Settings::default();
    for def in PRESTIGE_UPGRADES {
        if prestige.level_of(def.id) == 0 {
            continue;
        }
        match def.role {
            PrestigeRole::BulkBuy => settings.bulk_buy_enabled = true,
            PrestigeRole::TickSpeed => settings.offline_progress_enabled = true,
            _ => {}
        }
    }
    settings
}

/// Reset the run in exchange for prestige points.
///
/// Survivors: prestige level (+1), prestige points (+gain), lifetime
/// earnings, the prestige tree and achievements. Currency starts at the
/// quick-start bonus and every regular upgrade at the second-wind level;
/// everything else returns to the initial state, except the settings flags
/// unlocked by owned prestige upgrades.
pub fn apply_prestige(
    state: &GameState,
    divisor: f64,
    now_ms: i64,
) -> Result<(GameState, PrestigeReceipt), GameError> {
    let gained = compute_gain(state.prestige.total_earned, divisor);
    if gained == 0 {
        return Err(GameError::NotEnoughToPrestige {
            remaining: remaining_for_first_point(state.prestige.total_earned, divisor),
        });
    }

    let (upgrades, milestone_bonuses) = carryover_levels(second_wind_level(state));
    let new_level = state.prestige.level.saturating_add(1);
    let mut next = GameState {
        currency: quick_start_currency(state),
        last_update: now_ms,
        upgrades,
        milestone_bonuses,
        prestige: PrestigeState {
            level: new_level,
            total_earned: 0.0,
            lifetime_earned: state.prestige.lifetime_earned,
            prestige_points: state.prestige.prestige_points.saturating_add(gained),
            upgrades: state.prestige.upgrades.clone(),
        },
        achievements: state.achievements.clone(),
        ..INITIAL_STATE
    };
    next.settings = unlocked_settings(&next.prestige);
    Ok((with_derived(next), PrestigeReceipt { gained, new_level }))
}

/// Outcome of one accrual step.
#[derive(Clone, Debug, PartialEq)]
pub enum Accrual {
    /// Nothing credited: no time passed or the gain was below epsilon.
    Suppressed,
    Gained { state: GameState, amount: f64 },
}

/// Credit `idle_rate * elapsed` seconds of income. Gains below `epsilon`
/// leave the state untouched.
pub fn apply_tick(state: &GameState, elapsed_ms: i64, now_ms: i64, epsilon: f64) -> Accrual {
    if elapsed_ms <= 0 {
        return Accrual::Suppressed;
    }
    let amount = derive(state).idle_rate * (elapsed_ms as f64 / 1000.0);
    if !(amount.is_finite() && amount >= epsilon) {
        return Accrual::Suppressed;
    }
    let mut next = state.clone();
    next.credit(amount);
    next.last_update = now_ms;
    Accrual::Gained {
        state: with_derived(next),
        amount,
    }
}

/// Grant `rate` of the idle income for the time since `last_update` and
/// stamp `now_ms`. Returns the new state and the amount granted.
///
/// A document that was never stamped (`last_update <= 0`) grants nothing.
pub fn apply_offline_accrual(state: &GameState, now_ms: i64, rate: f64) -> (GameState, f64) {
    let elapsed_ms = if state.last_update > 0 {
        now_ms.saturating_sub(state.last_update)
    } else {
        0
    };
    let mut next = state.clone();
    let mut granted = 0.0;
    if elapsed_ms > 0 {
        let amount = derive(state).idle_rate * (elapsed_ms as f64 / 1000.0) * rate;
        if amount.is_finite() && amount > 0.0 {
            next.credit(amount);
            granted = amount;
        }
    }
    next.last_update = now_ms;
    (with_derived(next), granted)
}

/// Flip the golden-command notification flag.
pub fn apply_toggle_lucky_toasts(state: &GameState, now_ms: i64) -> GameState {
    let mut next = state.clone();
    next.settings.lucky_toasts_enabled = !next.settings.lucky_toasts_enabled;
    next.last_update = now_ms;
    next
}

/// A wiped save stamped at `now_ms`.
pub fn apply_reset(now_ms: i64) -> GameState {
    with_derived(GameState::initial(now_ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use idle_core::AchievementRecord;
    use proptest::prelude::*;

    fn funded(currency: f64) -> GameState {
        GameState {
            currency,
            ..GameState::default()
        }
    }

    #[test]
    fn home_row_novice_scenario() {
        let (s, r) = apply_purchase(&funded(10.0), "homeRowNovice", 1).unwrap();
        assert_eq!(s.currency, 0.0);
        assert_eq!(s.level("homeRowNovice"), 1);
        assert_eq!(r.cost, 10.0);
        assert_eq!(s.click_value, 1.5);
        assert_eq!(s.last_update, 1);
    }

    #[test]
    fn insufficient_funds_reports_shortfall() {
        let s = funded(4.0);
        let err = apply_purchase(&s, "homeRowNovice", 1).unwrap_err();
        assert_eq!(
            err,
            GameError::InsufficientFunds {
                cost: 10.0,
                shortfall: 6.0
            }
        );
        assert!(matches!(
            apply_purchase(&s, "bogus", 1),
            Err(GameError::UnknownUpgrade(_))
        ));
    }

    #[test]
    fn milestone_recorded_when_crossed() {
        let mut s = funded(1e9);
        s.upgrades.insert("scriptRunner".into(), 9);
        let (s, r) = apply_purchase(&s, "scriptRunner", 0).unwrap();
        assert_eq!(r.milestone, Some(2.0));
        assert_eq!(s.milestone_bonus("scriptRunner"), 2.0);
        let (_, r) = apply_purchase(&s, "scriptRunner", 0).unwrap();
        assert_eq!(r.milestone, None);
    }

    #[test]
    fn purchase_max_stops_at_first_unaffordable() {
        // 10 + 12 + 14 = 36; the fourth level costs 16.
        let (s, r) = apply_purchase_max(&funded(40.0), "homeRowNovice", 5_000, 0).unwrap();
        assert_eq!(r.bought, 3);
        assert_eq!(r.spent, 36.0);
        assert_eq!(s.currency, 4.0);
        let (s, r) = apply_purchase_max(&funded(5.0), "homeRowNovice", 5_000, 0).unwrap();
        assert_eq!(r.bought, 0);
        assert_eq!(s, funded(5.0));
    }

    #[test]
    fn purchase_max_respects_cap() {
        let (_, r) = apply_purchase_max(&funded(1e12), "homeRowNovice", 7, 0).unwrap();
        assert_eq!(r.bought, 7);
    }

    #[test]
    fn lucky_click_pays_ten_times() {
        let mut s = GameState::default();
        s.upgrades.insert("luckyCommands".into(), 1);
        let hit = apply_click(&s, 1.0, Some(0.005), 0);
        assert!(hit.golden);
        assert_eq!(hit.points, 10.0);
        let miss = apply_click(&s, 1.0, Some(0.5), 0);
        assert!(!miss.golden);
        assert_eq!(miss.points, 1.0);
        let unowned = apply_click(&GameState::default(), 1.0, Some(0.0), 0);
        assert!(!unowned.golden);
    }

    #[test]
    fn click_combo_is_clamped() {
        let s = GameState::default();
        assert_eq!(apply_click(&s, 5.0, None, 0).points, 3.0);
        assert_eq!(apply_click(&s, 0.2, None, 0).points, 1.0);
        assert_eq!(apply_click(&s, f64::NAN, None, 0).points, 1.0);
        let r = apply_click(&s, 2.0, None, 9);
        assert_eq!(r.state.currency, 2.0);
        assert_eq!(r.state.prestige.lifetime_earned, 2.0);
        assert_eq!(r.state.last_update, 9);
    }

    #[test]
    fn prestige_conserves_listed_fields() {
        let mut s = funded(5_000.0);
        s.settings.lucky_toasts_enabled = false;
        s.settings.auto_click_enabled = true;
        s.prestige.total_earned = 2_500.0;
        s.prestige.lifetime_earned = 9_999.0;
        s.prestige.prestige_points = 3;
        s.prestige.upgrades.insert("quickStart".into(), 2);
        s.upgrades.insert("homeRowNovice".into(), 12);
        s.milestone_bonuses.insert("homeRowNovice".into(), 2.0);
        s.achievements.insert(
            "firstSteps".into(),
            AchievementRecord {
                unlocked: true,
                unlocked_at: Some(4),
            },
        );
        let before = s.clone();

        let (after, r) = apply_prestige(&s, 100.0, 77).unwrap();
        assert_eq!(r.gained, 5);
        assert_eq!(after.prestige.level, 1);
        assert_eq!(after.prestige.prestige_points, 8);
        assert_eq!(after.prestige.total_earned, 0.0);
        assert_eq!(after.currency, 100.0);
        assert!(after.upgrades.is_empty());
        assert!(after.milestone_bonuses.is_empty());
        assert_eq!(after.last_update, 77);
        assert_eq!(
            serde_json::to_string(&after.prestige.upgrades).unwrap(),
            serde_json::to_string(&before.prestige.upgrades).unwrap()
        );
        assert_eq!(
            serde_json::to_string(&after.achievements).unwrap(),
            serde_json::to_string(&before.achievements).unwrap()
        );
        assert_eq!(
            after.prestige.lifetime_earned.to_bits(),
            before.prestige.lifetime_earned.to_bits()
        );
        assert_eq!(after.settings, INITIAL_STATE.settings);
    }

    #[test]
    fn prestige_keeps_only_purchased_setting_flags() {
        let mut s = GameState::default();
        s.prestige.total_earned = 800_000.0;
        s.prestige.upgrades.insert("bulkBuyerPro".into(), 1);
        s.settings.bulk_buy_enabled = true;
        s.settings.lucky_toasts_enabled = false;
        let (after, _) = apply_prestige(&s, 800_000.0, 0).unwrap();
        assert!(after.settings.bulk_buy_enabled);
        assert!(!after.settings.offline_progress_enabled);
        assert!(after.settings.lucky_toasts_enabled);
    }

    #[test]
    fn prestige_applies_second_wind() {
        let mut s = GameState::default();
        s.prestige.total_earned = 800_000.0;
        s.prestige.upgrades.insert("secondWind".into(), 3);
        let (after, _) = apply_prestige(&s, 800_000.0, 0).unwrap();
        assert_eq!(after.level("homeRowNovice"), 3);
        assert_eq!(after.level("aiOptimizer"), 3);
        assert_eq!(after.currency, 0.0);
        assert!(after.click_value > 1.0);
    }

    #[test]
    fn prestige_requires_a_point() {
        let mut s = GameState::default();
        s.prestige.total_earned = 300_000.0;
        assert_eq!(
            apply_prestige(&s, 800_000.0, 0),
            Err(GameError::NotEnoughToPrestige {
                remaining: 500_000.0
            })
        );
    }

    #[test]
    fn prestige_purchase_rules() {
        let mut s = GameState::default();
        s.prestige.prestige_points = 20;
        let (s, r) = apply_prestige_purchase(&s, "empoweredLegacy", 0).unwrap();
        assert_eq!(r.cost, 1);
        assert_eq!(s.prestige.prestige_points, 19);
        assert_eq!(
            apply_prestige_purchase(&s, "bulkBuyerPro", 0),
            Err(GameError::PrestigeUpgradeLocked {
                name: "Bulk Buyer Pro",
                unlock_level: 1
            })
        );

        let mut s = s;
        s.prestige.level = 3;
        let (s, _) = apply_prestige_purchase(&s, "fasterTick", 0).unwrap();
        assert!(s.settings.offline_progress_enabled);
        assert!(matches!(
            apply_prestige_purchase(&s, "fasterTick", 0),
            Err(GameError::UpgradeAlreadyMaxed { max_level: 1, .. })
        ));
        let (s, _) = apply_prestige_purchase(&s, "bulkBuyerPro", 0).unwrap();
        assert!(s.settings.bulk_buy_enabled);
        assert_eq!(
            apply_prestige_purchase(&s, "infinityEngine", 0),
            Err(GameError::PrestigeUpgradeLocked {
                name: "Infinity Engine",
                unlock_level: 5
            })
        );

        let mut poor = GameState::default();
        poor.prestige.prestige_points = 1;
        assert_eq!(
            apply_prestige_purchase(&poor, "frugalShopper", 0),
            Err(GameError::InsufficientPrestigePoints {
                cost: 2,
                shortfall: 1
            })
        );
    }

    fn idle_ten() -> GameState {
        // idleApprentice at level 10 yields exactly 10/s.
        let mut s = GameState::default();
        s.prestige.upgrades.insert("idleApprentice".into(), 10);
        with_derived(s)
    }

    #[test]
    fn offline_accrual_exact() {
        let now = 10_000_000;
        let s = GameState {
            last_update: now - 3_600_000,
            ..idle_ten()
        };
        assert_eq!(s.idle_rate, 10.0);
        let (s, granted) = apply_offline_accrual(&s, now, 0.5);
        assert_eq!(granted, 18_000.0);
        assert_eq!(s.currency, 18_000.0);
        assert_eq!(s.last_update, now);
        let (s, granted) = apply_offline_accrual(&s, now, 0.5);
        assert_eq!(granted, 0.0);
        assert_eq!(s.currency, 18_000.0);
    }

    #[test]
    fn offline_accrual_ignores_missing_or_extreme_stamps() {
        let now = 1_700_000_000_000;
        let unstamped = GameState {
            last_update: 0,
            ..idle_ten()
        };
        let (s, granted) = apply_offline_accrual(&unstamped, now, 0.5);
        assert_eq!(granted, 0.0);
        assert_eq!(s.currency, 0.0);
        assert_eq!(s.last_update, now);

        let ancient = GameState {
            last_update: i64::MIN,
            ..idle_ten()
        };
        assert_eq!(apply_offline_accrual(&ancient, now, 0.5).1, 0.0);

        let future = GameState {
            last_update: now + 60_000,
            ..idle_ten()
        };
        let (s, granted) = apply_offline_accrual(&future, now, 0.5);
        assert_eq!(granted, 0.0);
        assert_eq!(s.last_update, now);
    }

    #[test]
    fn tick_accrues_and_debounces() {
        let s = idle_ten();
        match apply_tick(&s, 1_500, 42, 0.01) {
            Accrual::Gained { state, amount } => {
                assert_eq!(amount, 15.0);
                assert_eq!(state.currency, 15.0);
                assert_eq!(state.prestige.total_earned, 15.0);
                assert_eq!(state.last_update, 42);
            }
            Accrual::Suppressed => panic!("expected gain"),
        }
        assert_eq!(apply_tick(&s, 0, 42, 0.01), Accrual::Suppressed);
        assert_eq!(apply_tick(&s, -5, 42, 0.01), Accrual::Suppressed);
        assert_eq!(
            apply_tick(&GameState::default(), 60_000, 42, 0.01),
            Accrual::Suppressed
        );
    }

    #[test]
    fn toggle_and_reset() {
        let s = apply_toggle_lucky_toasts(&GameState::default(), 3);
        assert!(!s.settings.lucky_toasts_enabled);
        assert!(apply_toggle_lucky_toasts(&s, 4).settings.lucky_toasts_enabled);
        let r = apply_reset(99);
        assert_eq!(r, GameState::initial(99));
    }

    proptest! {
        #[test]
        fn purchase_changes_only_target(currency in 0.0f64..1e7,
                                        home in 0u32..60, script in 0u32..60) {
            let mut s = funded(currency);
            s.upgrades.insert("homeRowNovice".into(), home);
            s.upgrades.insert("scriptRunner".into(), script);
            let price = upgrade_cost(upgrade("scriptRunner").unwrap(), &s);
            match apply_purchase(&s, "scriptRunner", 0) {
                Ok((next, r)) => {
                    prop_assert_eq!(r.cost, price);
                    prop_assert!(next.currency < s.currency);
                    prop_assert_eq!(next.currency, (s.currency - price).max(0.0));
                    prop_assert_eq!(next.level("scriptRunner"), script + 1);
                    prop_assert_eq!(next.level("homeRowNovice"), home);
                }
                Err(GameError::InsufficientFunds { .. }) => prop_assert!(s.currency < price),
                Err(e) => prop_assert!(false, "unexpected {e}"),
            }
        }

        #[test]
        fn purchase_max_equals_sequential(currency in 0.0f64..5e6, start in 0u32..40,
                                          frugal in 0u32..10) {
            let mut s = funded(currency);
            s.upgrades.insert("extensionDeveloper".into(), start);
            s.prestige.upgrades.insert("frugalShopper".into(), frugal);
            let (bulk, r) = apply_purchase_max(&s, "extensionDeveloper", 5_000, 7).unwrap();

            let mut seq = s.clone();
            for _ in 0..r.bought {
                seq = apply_purchase(&seq, "extensionDeveloper", 7).unwrap().0;
            }
            prop_assert_eq!(seq.currency.to_bits(), bulk.currency.to_bits());
            prop_assert_eq!(seq.level("extensionDeveloper"), bulk.level("extensionDeveloper"));
            prop_assert!(apply_purchase(&bulk, "extensionDeveloper", 7).is_err());
        }
    }
}
