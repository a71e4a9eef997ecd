//! Static upgrade catalogs.
//!
//! Regular upgrades are bought with currency and reset on prestige.
//! Prestige upgrades are bought with prestige points and are permanent.

use serde::{Deserialize, Serialize};

/// How an upgrade's effect feeds production.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpgradeCategory {
    /// Adds to the click value.
    Active,
    /// Adds to the idle rate.
    Idle,
    /// Multiplies production or changes economy rules.
    Efficiency,
}

/// Special handling inside a category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpgradeRole {
    /// Routed purely by category.
    Standard,
    /// Efficiency upgrade whose effect is a direct multiplier, floored at 1.
    GlobalMultiplier,
    /// Discounts upgrade prices instead of boosting production.
    CostReduction,
    /// Enables golden-command rolls on click.
    LuckyCommands,
    /// Converts click value into idle income, one click per level per second.
    AutoClick,
}

/// Scaling of an effect with upgrade level.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum EffectScale {
    /// `level`
    Linear,
    /// `ratio ^ level`
    Geometric(f64),
}

impl EffectScale {
    pub fn at(self, level: u32) -> f64 {
        match self {
            EffectScale::Linear => f64::from(level),
            EffectScale::Geometric(ratio) => ratio.powi(saturating_i32(level)),
        }
    }
}

fn saturating_i32(level: u32) -> i32 {
    i32::try_from(level).unwrap_or(i32::MAX)
}

/// A level threshold and the multiplier it unlocks.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub level: u32,
    pub multiplier: f64,
}

/// A regular, currency-priced upgrade.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UpgradeDefinition {
    pub id: &'static str,
    pub name: &'static str,
    pub category: UpgradeCategory,
    pub role: UpgradeRole,
    /// Price of the first level.
    pub base_cost: f64,
    /// Price growth per owned level.
    pub cost_multiplier: f64,
    pub base_effect: f64,
    pub scale: EffectScale,
    /// Ascending thresholds.
    pub milestones: &'static [Milestone],
}

impl UpgradeDefinition {
    /// Multiplier of the highest milestone `level` qualifies for, else 1.
    pub fn milestone_bonus(&self, level: u32) -> f64 {
        self.milestones
            .iter()
            .filter(|m| level >= m.level)
            .max_by_key(|m| m.level)
            .map(|m| m.multiplier)
            .unwrap_or(1.0)
    }

    /// Effect at `level` given the stored milestone multiplier.
    pub fn effect(&self, level: u32, milestone_bonus: f64) -> f64 {
        self.base_effect * self.scale.at(level) * milestone_bonus
    }

    /// Undiscounted price of the next level when `level` are owned.
    pub fn base_cost_at(&self, level: u32) -> f64 {
        self.base_cost * self.cost_multiplier.powi(saturating_i32(level))
    }
}

/// Milestones shared by the active and idle lines.
pub const PRODUCTION_MILESTONES: &[Milestone] = &[
    Milestone {
        level: 10,
        multiplier: 2.0,
    },
    Milestone {
        level: 25,
        multiplier: 3.0,
    },
    Milestone {
        level: 50,
        multiplier: 5.0,
    },
    Milestone {
        level: 100,
        multiplier: 10.0,
    },
];

const fn production(
    id: &'static str,
    name: &'static str,
    category: UpgradeCategory,
    base_cost: f64,
    base_effect: f64,
) -> UpgradeDefinition {
    UpgradeDefinition {
        id,
        name,
        category,
        role: UpgradeRole::Standard,
        base_cost,
        cost_multiplier: 1.15,
        base_effect,
        scale: EffectScale::Linear,
        milestones: PRODUCTION_MILESTONES,
    }
}

const fn efficiency(
    id: &'static str,
    name: &'static str,
    role: UpgradeRole,
    base_cost: f64,
    cost_multiplier: f64,
    base_effect: f64,
    scale: EffectScale,
) -> UpgradeDefinition {
    UpgradeDefinition {
        id,
        name,
        category: UpgradeCategory::Efficiency,
        role,
        base_cost,
        cost_multiplier,
        base_effect,
        scale,
        milestones: &[],
    }
}

pub const UPGRADES: &[UpgradeDefinition] = &[
    production(
        "homeRowNovice",
        "Home Row Novice",
        UpgradeCategory::Active,
        10.0,
        0.5,
    ),
    production(
        "shortcutSensei",
        "Shortcut Sensei",
        UpgradeCategory::Active,
        110.0,
        3.0,
    ),
    production(
        "hotkeyVirtuoso",
        "Hotkey Virtuoso",
        UpgradeCategory::Active,
        1_200.0,
        16.0,
    ),
    production(
        "commandPaletteMaster",
        "Command Palette Master",
        UpgradeCategory::Active,
        13_000.0,
        90.0,
    ),
    production(
        "scriptRunner",
        "Script Runner",
        UpgradeCategory::Idle,
        15.0,
        0.2,
    ),
    production(
        "extensionDeveloper",
        "Extension Developer",
        UpgradeCategory::Idle,
        160.0,
        1.5,
    ),
    production(
        "workflowArchitect",
        "Workflow Architect",
        UpgradeCategory::Idle,
        1_700.0,
        9.0,
    ),
    production(
        "automationGuru",
        "Automation Guru",
        UpgradeCategory::Idle,
        18_000.0,
        55.0,
    ),
    production(
        "cloudSync",
        "Cloud Sync",
        UpgradeCategory::Idle,
        200_000.0,
        320.0,
    ),
    efficiency(
        "snippetLibrary",
        "Snippet Library",
        UpgradeRole::Standard,
        750.0,
        1.6,
        0.05,
        EffectScale::Linear,
    ),
    efficiency(
        "quicklinkCurator",
        "Quicklink Curator",
        UpgradeRole::Standard,
        8_000.0,
        1.8,
        0.1,
        EffectScale::Linear,
    ),
    efficiency(
        "raycastProMode",
        "Raycast Pro Mode",
        UpgradeRole::CostReduction,
        25_000.0,
        2.2,
        0.04,
        EffectScale::Linear,
    ),
    efficiency(
        "luckyCommands",
        "Lucky Commands",
        UpgradeRole::LuckyCommands,
        5_000.0,
        1.9,
        1.0,
        EffectScale::Linear,
    ),
    efficiency(
        "autoClickDaemon",
        "Auto-Click Daemon",
        UpgradeRole::AutoClick,
        60_000.0,
        2.5,
        1.0,
        EffectScale::Linear,
    ),
    efficiency(
        "aiOptimizer",
        "AI Optimizer",
        UpgradeRole::GlobalMultiplier,
        2_500_000.0,
        4.0,
        1.0,
        EffectScale::Geometric(2.0),
    ),
];

/// Look up a regular upgrade by id.
pub fn upgrade(id: &str) -> Option<&'static UpgradeDefinition> {
    UPGRADES.iter().find(|u| u.id == id)
}

/// Effect of a prestige upgrade as a function of level.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum PrestigeEffect {
    /// `base + step * level`
    Linear { base: f64, step: f64 },
    /// `ratio ^ level`
    Geometric { ratio: f64 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrestigeCategory {
    Production,
    Economy,
    Utility,
}

/// What a prestige upgrade changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrestigeRole {
    /// Multiplies click and idle output.
    ProductionMultiplier,
    /// Flat bonus added to the click accumulator.
    ClickBonus,
    /// Flat bonus added to the idle accumulator.
    IdleBonus,
    /// Multiplies idle tick speed.
    TickSpeed,
    /// Discounts regular upgrade prices.
    CostReduction,
    /// Starting currency after prestige.
    QuickStart,
    /// Starting level of every regular upgrade after prestige.
    SecondWind,
    /// Unlocks bulk buying.
    BulkBuy,
}

/// A permanent upgrade bought with prestige points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PrestigeUpgradeDefinition {
    pub id: &'static str,
    pub name: &'static str,
    /// Price of the first level, in prestige points.
    pub cost: u64,
    pub cost_multiplier: f64,
    pub effect: PrestigeEffect,
    pub max_level: u32,
    /// Minimum `prestige.level` required to buy.
    pub unlock_level: u32,
    pub category: PrestigeCategory,
    pub role: PrestigeRole,
}

impl PrestigeUpgradeDefinition {
    pub fn effect_at(&self, level: u32) -> f64 {
        match self.effect {
            PrestigeEffect::Linear { base, step } => base + step * f64::from(level),
            PrestigeEffect::Geometric { ratio } => ratio.powi(saturating_i32(level)),
        }
    }

    /// Price in prestige points of the next level when `level` are owned.
    pub fn cost_at(&self, level: u32) -> u64 {
        let raw = (self.cost as f64) * self.cost_multiplier.powi(saturating_i32(level));
        if raw.is_finite() {
            raw.ceil() as u64
        } else {
            u64::MAX
        }
    }
}

pub const PRESTIGE_UPGRADES: &[PrestigeUpgradeDefinition] = &[
    PrestigeUpgradeDefinition {
        id: "empoweredLegacy",
        name: "Empowered Legacy",
        cost: 1,
        cost_multiplier: 1.5,
        effect: PrestigeEffect::Linear {
            base: 1.0,
            step: 0.25,
        },
        max_level: 10,
        unlock_level: 0,
        category: PrestigeCategory::Production,
        role: PrestigeRole::ProductionMultiplier,
    },
    PrestigeUpgradeDefinition {
        id: "clickApprentice",
        name: "Click Apprentice",
        cost: 1,
        cost_multiplier: 1.4,
        effect: PrestigeEffect::Linear {
            base: 0.0,
            step: 2.0,
        },
        max_level: 10,
        unlock_level: 0,
        category: PrestigeCategory::Production,
        role: PrestigeRole::ClickBonus,
    },
    PrestigeUpgradeDefinition {
        id: "idleApprentice",
        name: "Idle Apprentice",
        cost: 1,
        cost_multiplier: 1.4,
        effect: PrestigeEffect::Linear {
            base: 0.0,
            step: 1.0,
        },
        max_level: 10,
        unlock_level: 0,
        category: PrestigeCategory::Production,
        role: PrestigeRole::IdleBonus,
    },
    PrestigeUpgradeDefinition {
        id: "frugalShopper",
        name: "Frugal Shopper",
        cost: 2,
        cost_multiplier: 1.3,
        effect: PrestigeEffect::Linear {
            base: 0.0,
            step: 0.02,
        },
        max_level: 25,
        unlock_level: 0,
        category: PrestigeCategory::Economy,
        role: PrestigeRole::CostReduction,
    },
    PrestigeUpgradeDefinition {
        id: "quickStart",
        name: "Quick Start",
        cost: 1,
        cost_multiplier: 1.5,
        effect: PrestigeEffect::Linear {
            base: 0.0,
            step: 50.0,
        },
        max_level: 10,
        unlock_level: 0,
        category: PrestigeCategory::Economy,
        role: PrestigeRole::QuickStart,
    },
    PrestigeUpgradeDefinition {
        id: "secondWind",
        name: "Second Wind",
        cost: 5,
        cost_multiplier: 2.0,
        effect: PrestigeEffect::Linear {
            base: 0.0,
            step: 1.0,
        },
        max_level: 5,
        unlock_level: 2,
        category: PrestigeCategory::Economy,
        role: PrestigeRole::SecondWind,
    },
    PrestigeUpgradeDefinition {
        id: "fasterTick",
        name: "Faster Tick",
        cost: 10,
        cost_multiplier: 1.0,
        effect: PrestigeEffect::Geometric { ratio: 2.0 },
        max_level: 1,
        unlock_level: 3,
        category: PrestigeCategory::Utility,
        role: PrestigeRole::TickSpeed,
    },
    PrestigeUpgradeDefinition {
        id: "bulkBuyerPro",
        name: "Bulk Buyer Pro",
        cost: 3,
        cost_multiplier: 1.0,
        effect: PrestigeEffect::Linear {
            base: 0.0,
            step: 1.0,
        },
        max_level: 1,
        unlock_level: 1,
        category: PrestigeCategory::Utility,
        role: PrestigeRole::BulkBuy,
    },
    PrestigeUpgradeDefinition {
        id: "infinityEngine",
        name: "Infinity Engine",
        cost: 25,
        cost_multiplier: 3.0,
        effect: PrestigeEffect::Geometric { ratio: 2.0 },
        max_level: 3,
        unlock_level: 5,
        category: PrestigeCategory::Production,
        role: PrestigeRole::ProductionMultiplier,
    },
];

/// Look up a prestige upgrade by id.
pub fn prestige_upgrade(id: &str) -> Option<&'static PrestigeUpgradeDefinition> {
    PRESTIGE_UPGRADES.iter().find(|u| u.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn ids_are_unique() {
        let mut seen = BTreeSet::new();
        for u in UPGRADES {
            assert!(seen.insert(u.id), "duplicate upgrade id {}", u.id);
        }
        let mut seen = BTreeSet::new();
        for u in PRESTIGE_UPGRADES {
            assert!(seen.insert(u.id), "duplicate prestige id {}", u.id);
        }
    }

    #[test]
    fn home_row_novice_costs_ten_at_level_zero() {
        let u = upgrade("homeRowNovice").unwrap();
        assert_eq!(u.category, UpgradeCategory::Active);
        assert_eq!(u.base_cost_at(0), 10.0);
    }

    #[test]
    fn milestone_bonus_uses_highest_threshold_met() {
        let u = upgrade("scriptRunner").unwrap();
        assert_eq!(u.milestone_bonus(0), 1.0);
        assert_eq!(u.milestone_bonus(9), 1.0);
        assert_eq!(u.milestone_bonus(10), 2.0);
        assert_eq!(u.milestone_bonus(49), 3.0);
        assert_eq!(u.milestone_bonus(500), 10.0);
        assert_eq!(upgrade("aiOptimizer").unwrap().milestone_bonus(200), 1.0);
    }

    #[test]
    fn effect_scales_with_level() {
        let u = upgrade("homeRowNovice").unwrap();
        assert_eq!(u.effect(4, 1.0), 2.0);
        assert_eq!(u.effect(10, 2.0), 10.0);
        let ai = upgrade("aiOptimizer").unwrap();
        assert_eq!(ai.effect(3, 1.0), 8.0);
    }

    #[test]
    fn prestige_costs_grow_and_round_up() {
        let u = prestige_upgrade("empoweredLegacy").unwrap();
        assert_eq!(u.cost_at(0), 1);
        assert_eq!(u.cost_at(1), 2); // ceil(1.5)
        assert_eq!(u.cost_at(2), 3); // ceil(2.25)
        let ft = prestige_upgrade("fasterTick").unwrap();
        assert_eq!(ft.effect_at(1), 2.0);
    }
}
