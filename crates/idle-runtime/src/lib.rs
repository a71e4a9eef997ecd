#![deny(warnings)]

//! Game runtime: pure state transitions, achievements, the command engine
//! and the accrual scheduler.
//!
//! Every transition is a reducer in [`reducers`] taking a state and
//! returning a new one. [`Game`] owns the live state, applies reducers in
//! sequence, evaluates achievements and writes through the guarded
//! persistence layer. [`scheduler::run`] drives periodic accrual in either
//! the foreground or the background mode.

use idle_econ::EconError;
use serde::Serialize;
use thiserror::Error;

pub mod achievements;
pub mod engine;
pub mod reducers;
pub mod scheduler;
pub mod session;

pub use achievements::{apply_achievements, AchievementDefinition, AchievementRule, ACHIEVEMENTS};
pub use engine::{CommandOutcome, Game, LoadReport, Phase};
pub use scheduler::{run, Mode, RunSummary, TickReport};
pub use session::SessionCounters;

/// Domain failures of a command. All are recoverable and reported to the
/// caller as a result plus a notification.
#[derive(Debug, Error, PartialEq)]
pub enum GameError {
    #[error("unknown upgrade: {0}")]
    UnknownUpgrade(String),
    /// Purchase price exceeds available currency.
    #[error("not enough currency: need {shortfall:.2} more")]
    InsufficientFunds { cost: f64, shortfall: f64 },
    /// Prestige upgrade already at its cap.
    #[error("{name} is already at maximum level")]
    UpgradeAlreadyMaxed { name: &'static str, max_level: u32 },
    /// Prestige upgrade requires a higher prestige level.
    #[error("{name} unlocks at prestige level {unlock_level}")]
    PrestigeUpgradeLocked {
        name: &'static str,
        unlock_level: u32,
    },
    #[error("not enough prestige points: need {shortfall} more")]
    InsufficientPrestigePoints { cost: u64, shortfall: u64 },
    /// Prestige would award zero points.
    #[error("not enough progress to prestige: earn {remaining:.0} more")]
    NotEnoughToPrestige { remaining: f64 },
}

impl From<EconError> for GameError {
    fn from(e: EconError) -> Self {
        match e {
            EconError::UnknownUpgrade(id) | EconError::UnknownPrestigeUpgrade(id) => {
                GameError::UnknownUpgrade(id)
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Failure,
    Info,
}

/// Message for the UI layer to render.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn failure(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Failure,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Info,
            title: title.into(),
            message: message.into(),
        }
    }
}
