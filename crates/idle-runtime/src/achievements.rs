//! Achievement rules.
//!
//! Evaluation is idempotent: a rule only fires while its achievement is
//! still locked, and an unlocked record is never cleared.

use crate::session::SessionCounters;
use idle_core::{AchievementRecord, GameState};
use idle_econ::derive;
use tracing::info;

/// Condition under which an achievement unlocks.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AchievementRule {
    LifetimeEarned(f64),
    AnyUpgradeOwned,
    UpgradeLevel(&'static str, u32),
    DistinctUpgrades(usize),
    IdleRate(f64),
    ClicksInWindow(usize),
    LuckyTriggers(u32),
    InsufficientFunds(u32),
    PrestigeLevel(u32),
}

impl AchievementRule {
    pub fn holds(&self, state: &GameState, session: &SessionCounters, now_ms: i64) -> bool {
        match *self {
            AchievementRule::LifetimeEarned(min) => state.prestige.lifetime_earned >= min,
            AchievementRule::AnyUpgradeOwned => state.upgrades.values().any(|&l| l > 0),
            AchievementRule::UpgradeLevel(id, min) => state.level(id) >= min,
            AchievementRule::DistinctUpgrades(min) => {
                state.upgrades.values().filter(|&&l| l > 0).count() >= min
            }
            AchievementRule::IdleRate(min) => derive(state).idle_rate >= min,
            AchievementRule::ClicksInWindow(min) => session.clicks_in_window(now_ms) >= min,
            AchievementRule::LuckyTriggers(min) => session.lucky_triggers() >= min,
            AchievementRule::InsufficientFunds(min) => session.insufficient_funds() >= min,
            AchievementRule::PrestigeLevel(min) => state.prestige.level >= min,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AchievementDefinition {
    pub id: &'static str,
    pub name: &'static str,
    pub rule: AchievementRule,
}

const fn def(id: &'static str, name: &'static str, rule: AchievementRule) -> AchievementDefinition {
    AchievementDefinition { id, name, rule }
}

pub const ACHIEVEMENTS: &[AchievementDefinition] = &[
    def("firstSteps", "First Steps", AchievementRule::LifetimeEarned(1.0)),
    def("thousandaire", "Thousandaire", AchievementRule::LifetimeEarned(1_000.0)),
    def("millionaire", "Millionaire", AchievementRule::LifetimeEarned(1_000_000.0)),
    def("billionaire", "Billionaire", AchievementRule::LifetimeEarned(1e9)),
    def("firstUpgrade", "Shopping Spree", AchievementRule::AnyUpgradeOwned),
    def(
        "homeRowHero",
        "Home Row Hero",
        AchievementRule::UpgradeLevel("homeRowNovice", 10),
    ),
    def("collector", "Collector", AchievementRule::DistinctUpgrades(5)),
    def("idleAwakening", "Idle Awakening", AchievementRule::IdleRate(1.0)),
    def("idleTycoon", "Idle Tycoon", AchievementRule::IdleRate(1_000.0)),
    def("rapidFire", "Rapid Fire", AchievementRule::ClicksInWindow(30)),
    def("clickFrenzy", "Click Frenzy", AchievementRule::ClicksInWindow(100)),
    def("feelingLucky", "Feeling Lucky", AchievementRule::LuckyTriggers(1)),
    def("fortunesFavorite", "Fortune's Favorite", AchievementRule::LuckyTriggers(10)),
    def("windowShopper", "Window Shopper", AchievementRule::InsufficientFunds(10)),
    def("reborn", "Reborn", AchievementRule::PrestigeLevel(1)),
    def("ascended", "Ascended", AchievementRule::PrestigeLevel(10)),
];

/// Unlock every locked achievement whose rule holds, stamping `now_ms`.
/// Returns the new state and the definitions unlocked by this call.
pub fn apply_achievements(
    mut state: GameState,
    session: &SessionCounters,
    now_ms: i64,
) -> (GameState, Vec<&'static AchievementDefinition>) {
    let mut unlocked = Vec::new();
    for a in ACHIEVEMENTS {
        if state.is_unlocked(a.id) || !a.rule.holds(&state, session, now_ms) {
            continue;
        }
        state.achievements.insert(
            a.id.to_string(),
            AchievementRecord {
                unlocked: true,
                unlocked_at: Some(now_ms),
            },
        );
        info!(achievement = a.id, "achievement unlocked");
        unlocked.push(a);
    }
    (state, unlocked)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlocks_once_and_keeps_first_stamp() {
        let mut s = GameState::default();
        s.prestige.lifetime_earned = 1_500.0;
        let session = SessionCounters::default();

        let (s, first) = apply_achievements(s, &session, 10);
        let ids: Vec<_> = first.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec!["firstSteps", "thousandaire"]);

        let (s, second) = apply_achievements(s, &session, 20);
        assert!(second.is_empty());
        assert_eq!(s.achievements["firstSteps"].unlocked_at, Some(10));
    }

    #[test]
    fn session_rules_read_counters() {
        let mut session = SessionCounters::default();
        for t in 0..30 {
            session.record_click(t * 100);
        }
        for _ in 0..10 {
            session.record_insufficient_funds();
        }
        session.record_lucky();
        let (s, unlocked) = apply_achievements(GameState::default(), &session, 3_000);
        for id in ["rapidFire", "windowShopper", "feelingLucky"] {
            assert!(s.is_unlocked(id), "{id} should unlock");
        }
        assert!(!s.is_unlocked("clickFrenzy"));
        assert_eq!(unlocked.len(), 3);
    }

    #[test]
    fn upgrade_and_rate_rules() {
        let mut s = GameState::default();
        for id in [
            "homeRowNovice",
            "shortcutSensei",
            "scriptRunner",
            "extensionDeveloper",
            "snippetLibrary",
        ] {
            s.upgrades.insert(id.to_string(), 1);
        }
        s.upgrades.insert("homeRowNovice".into(), 10);
        let (s, _) = apply_achievements(s, &SessionCounters::default(), 0);
        for id in ["firstUpgrade", "homeRowHero", "collector", "idleAwakening"] {
            assert!(s.is_unlocked(id), "{id} should unlock");
        }
        assert!(!s.is_unlocked("idleTycoon"));
    }

    #[test]
    fn existing_unlocks_are_never_cleared() {
        let mut s = GameState::default();
        s.achievements.insert(
            "billionaire".into(),
            AchievementRecord {
                unlocked: true,
                unlocked_at: Some(1),
            },
        );
        let (s, unlocked) = apply_achievements(s, &SessionCounters::default(), 5);
        assert!(unlocked.is_empty());
        assert!(s.is_unlocked("billionaire"));
    }
}
