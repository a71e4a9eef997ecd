//! The command engine: owns the live state of one process.
//!
//! All mutations go through `&mut self`, so within a process two commands
//! (or a command and a tick) never interleave. Every mutation is followed
//! by achievement evaluation and a guarded write. Write failures are
//! logged and swallowed; the in-memory state stays authoritative.

use crate::achievements::apply_achievements;
use crate::reducers::{
    apply_click, apply_offline_accrual, apply_prestige, apply_prestige_purchase, apply_purchase,
    apply_purchase_max, apply_reset, apply_tick, apply_toggle_lucky_toasts, lucky_level, Accrual,
};
use crate::session::SessionCounters;
use crate::{GameError, Notification};
use idle_core::{prestige_upgrade, upgrade, validate_stamp, Clock, GameConfig, GameState};
use idle_econ::pricing::{prestige_upgrade_cost_by_id, upgrade_cost_by_id};
use idle_econ::{compute_gain, with_derived};
use persistence::{
    clear_document, load_document, read_document, save_guarded, LoadSource, Store, WriteOutcome,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, error, info, warn};

/// Lifecycle of the save held by a [`Game`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Loaded and offline income granted; no command or tick yet.
    Loaded,
    Running,
    Prestiging,
    Resetting,
}

/// What happened while loading.
#[derive(Clone, Debug, PartialEq)]
pub struct LoadReport {
    pub source: LoadSource,
    /// Currency granted for time spent offline.
    pub offline_earnings: f64,
}

/// A command's result plus the notifications the UI should show.
#[derive(Clone, Debug, PartialEq)]
pub struct CommandOutcome<T> {
    pub value: T,
    pub notifications: Vec<Notification>,
}

impl<T> CommandOutcome<T> {
    fn new(value: T, notifications: Vec<Notification>) -> Self {
        Self {
            value,
            notifications,
        }
    }
}

pub struct Game<S: Store, C: Clock> {
    store: S,
    clock: C,
    config: GameConfig,
    state: GameState,
    session: SessionCounters,
    rng: ChaCha8Rng,
    phase: Phase,
    load_report: LoadReport,
    /// Reference point of the next tick's elapsed time.
    pub(crate) last_tick_at: i64,
    pub(crate) last_saved_at: i64,
}

impl<S: Store, C: Clock> Game<S, C> {
    /// Load the shared document and grant offline income exactly once.
    ///
    /// The stamped state is written back before returning, so a second load
    /// finds no unaccounted offline time.
    pub async fn load(store: S, clock: C, config: GameConfig) -> Self {
        let now = clock.now_ms();
        let loaded = match load_document(&store, now).await {
            Ok(out) => out,
            Err(e) => {
                error!(error = %e, "failed to read save, starting from initial state");
                persistence::LoadOutcome {
                    state: GameState::default(),
                    source: LoadSource::Fresh,
                }
            }
        };
        let (state, offline_earnings) =
            apply_offline_accrual(&with_derived(loaded.state), now, config.offline_rate);
        info!(
            source = ?loaded.source,
            offline_earnings,
            currency = state.currency,
            "save loaded"
        );

        let seed = config.rng_seed.unwrap_or(now as u64);
        let mut game = Self {
            store,
            clock,
            config,
            state,
            session: SessionCounters::default(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            phase: Phase::Loaded,
            load_report: LoadReport {
                source: loaded.source,
                offline_earnings,
            },
            last_tick_at: now,
            last_saved_at: now,
        };
        game.evaluate_achievements(now);
        game.persist().await;
        game
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn session(&self) -> &SessionCounters {
        &self.session
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn load_report(&self) -> &LoadReport {
        &self.load_report
    }

    pub(crate) fn store(&self) -> &S {
        &self.store
    }

    pub(crate) fn now(&self) -> i64 {
        self.clock.now_ms()
    }

    /// Prestige points a prestige would award right now.
    pub fn prestige_preview(&self) -> u64 {
        compute_gain(
            self.state.prestige.total_earned,
            self.config.prestige_divisor,
        )
    }

    /// Current price of the next level of a regular upgrade.
    pub fn upgrade_cost(&self, id: &str) -> Result<f64, GameError> {
        Ok(upgrade_cost_by_id(id, &self.state)?)
    }

    /// Current prestige-point price of the next level of a prestige upgrade.
    pub fn prestige_upgrade_cost(&self, id: &str) -> Result<u64, GameError> {
        Ok(prestige_upgrade_cost_by_id(id, &self.state)?)
    }

    /// Write the current state unless a newer document is stored.
    pub(crate) async fn persist(&mut self) {
        match save_guarded(&self.store, &self.state).await {
            Ok(WriteOutcome::Written) => {
                self.last_saved_at = self.clock.now_ms();
                debug!(last_update = self.state.last_update, "state saved");
            }
            Ok(WriteOutcome::Stale { persisted }) => {
                debug!(
                    persisted,
                    local = self.state.last_update,
                    "newer save already stored, write skipped"
                );
            }
            Err(e) => {
                error!(error = %e, "save failed; keeping in-memory state");
            }
        }
    }

    /// Run achievement rules and return a notification per unlock.
    pub(crate) fn evaluate_achievements(&mut self, now: i64) -> Vec<Notification> {
        let state = std::mem::take(&mut self.state);
        let (state, unlocked) = apply_achievements(state, &self.session, now);
        self.state = state;
        unlocked
            .into_iter()
            .map(|a| Notification::success("Achievement Unlocked!", a.name))
            .collect()
    }

    /// Install a new state, evaluate achievements and persist.
    async fn commit(&mut self, next: GameState, notes: &mut Vec<Notification>) {
        let now = next.last_update;
        self.state = next;
        self.phase = Phase::Running;
        notes.extend(self.evaluate_achievements(now));
        self.persist().await;
    }

    /// Replace local state with the stored document when it is strictly
    /// newer. Returns the adopted stamp.
    pub(crate) async fn adopt_if_newer(&mut self) -> Option<i64> {
        let stored = match read_document(&self.store).await {
            Ok(stored) => stored?,
            Err(e) => {
                error!(error = %e, "failed to read shared save");
                return None;
            }
        };
        if let Err(e) = validate_stamp(stored.last_update, self.clock.now_ms()) {
            warn!(error = %e, "ignoring shared save stamped in the future");
            return None;
        }
        if stored.last_update > self.state.last_update {
            debug!(
                stored = stored.last_update,
                local = self.state.last_update,
                "adopting newer shared save"
            );
            self.state = with_derived(stored);
            Some(self.state.last_update)
        } else {
            None
        }
    }

    /// Credit idle income since the previous tick.
    pub(crate) fn accrue(&mut self, now: i64) -> (Option<f64>, Vec<Notification>) {
        let elapsed = now - self.last_tick_at;
        self.last_tick_at = now;
        match apply_tick(&self.state, elapsed, now, self.config.min_gain_epsilon) {
            Accrual::Gained { state, amount } => {
                self.state = state;
                self.phase = Phase::Running;
                let notes = self.evaluate_achievements(now);
                (Some(amount), notes)
            }
            Accrual::Suppressed => (None, Vec::new()),
        }
    }

    /// Manual click. `combo` is clamped to `[1, 3]`. Returns the points earned.
    pub async fn click(&mut self, combo: f64) -> CommandOutcome<f64> {
        let now = self.clock.now_ms();
        let roll = (lucky_level(&self.state) > 0).then(|| self.rng.gen::<f64>());
        let result = apply_click(&self.state, combo, roll, now);
        self.session.record_click(now);

        let mut notes = Vec::new();
        if result.golden {
            self.session.record_lucky();
            if result.state.settings.lucky_toasts_enabled {
                notes.push(Notification::success(
                    "Golden Command!",
                    format!("x10 Click ({:.2})", result.points),
                ));
            }
        }
        self.commit(result.state, &mut notes).await;
        CommandOutcome::new(result.points, notes)
    }

    /// Buy one level of a regular upgrade.
    pub async fn purchase_upgrade(&mut self, id: &str) -> CommandOutcome<bool> {
        let now = self.clock.now_ms();
        let mut notes = Vec::new();
        match apply_purchase(&self.state, id, now) {
            Ok((next, receipt)) => {
                if let Some(bonus) = receipt.milestone {
                    notes.push(Notification::success(
                        "Milestone Reached!",
                        format!(
                            "{} reached level {} ({}x bonus)!",
                            receipt.name, receipt.new_level, bonus
                        ),
                    ));
                }
                notes.push(Notification::success(
                    format!("{} Purchased!", receipt.name),
                    format!("Level {}", receipt.new_level),
                ));
                info!(
                    upgrade = id,
                    level = receipt.new_level,
                    cost = receipt.cost,
                    "upgrade purchased"
                );
                self.commit(next, &mut notes).await;
                CommandOutcome::new(true, notes)
            }
            Err(GameError::InsufficientFunds { shortfall, .. }) => {
                self.session.record_insufficient_funds();
                notes.push(Notification::failure(
                    "Not enough currency!",
                    format!("You need {shortfall:.2} more"),
                ));
                let unlocked = self.evaluate_achievements(now);
                if !unlocked.is_empty() {
                    notes.extend(unlocked);
                    self.persist().await;
                }
                CommandOutcome::new(false, notes)
            }
            Err(e) => {
                notes.push(Notification::failure("Purchase failed", e.to_string()));
                CommandOutcome::new(false, notes)
            }
        }
    }

    /// Buy as many levels of a regular upgrade as currency allows.
    pub async fn purchase_upgrade_max(&mut self, id: &str) -> CommandOutcome<u32> {
        let now = self.clock.now_ms();
        let mut notes = Vec::new();
        match apply_purchase_max(&self.state, id, self.config.purchase_max_cap, now) {
            Ok((_, receipt)) if receipt.bought == 0 => {
                let shortfall = upgrade_cost_by_id(id, &self.state)
                    .map(|cost| (cost - self.state.currency).max(0.0))
                    .unwrap_or(0.0);
                notes.push(Notification::failure(
                    "Not enough currency!",
                    format!("You need {shortfall:.2} more"),
                ));
                CommandOutcome::new(0, notes)
            }
            Ok((next, receipt)) => {
                let name = display_name(id).unwrap_or(id);
                for (level, bonus) in &receipt.milestones {
                    notes.push(Notification::success(
                        "Milestone Reached!",
                        format!("{name} reached level {level} ({bonus}x bonus)!"),
                    ));
                }
                notes.push(Notification::success(
                    format!("{name} Purchased!"),
                    format!(
                        "Bought {} level{} for {:.2}",
                        receipt.bought,
                        if receipt.bought == 1 { "" } else { "s" },
                        receipt.spent
                    ),
                ));
                info!(
                    upgrade = id,
                    bought = receipt.bought,
                    spent = receipt.spent,
                    "bulk purchase"
                );
                self.commit(next, &mut notes).await;
                CommandOutcome::new(receipt.bought, notes)
            }
            Err(e) => {
                notes.push(Notification::failure("Purchase failed", e.to_string()));
                CommandOutcome::new(0, notes)
            }
        }
    }

    /// Buy one level of a prestige upgrade.
    pub async fn purchase_prestige_upgrade(&mut self, id: &str) -> CommandOutcome<bool> {
        let now = self.clock.now_ms();
        let mut notes = Vec::new();
        match apply_prestige_purchase(&self.state, id, now) {
            Ok((next, receipt)) => {
                notes.push(Notification::success(
                    format!("{} Purchased!", receipt.name),
                    format!("Level {}/{}", receipt.new_level, receipt.max_level),
                ));
                info!(
                    upgrade = id,
                    level = receipt.new_level,
                    cost = receipt.cost,
                    "prestige upgrade purchased"
                );
                self.commit(next, &mut notes).await;
                CommandOutcome::new(true, notes)
            }
            Err(e) => {
                let (title, message) = match &e {
                    GameError::UpgradeAlreadyMaxed { name, .. } => (
                        "Maximum level reached",
                        format!("{name} is already at maximum level"),
                    ),
                    GameError::InsufficientPrestigePoints { shortfall, .. } => (
                        "Not enough prestige points",
                        format!("You need {shortfall} more prestige points"),
                    ),
                    GameError::PrestigeUpgradeLocked { name, unlock_level } => (
                        "Upgrade locked",
                        format!("Reach prestige level {unlock_level} to unlock {name}"),
                    ),
                    other => ("Purchase failed", other.to_string()),
                };
                debug!(upgrade = id, error = %e, "prestige purchase rejected");
                notes.push(Notification::failure(title, message));
                CommandOutcome::new(false, notes)
            }
        }
    }

    /// Trade this run's earnings for prestige points.
    ///
    /// Achievements are not evaluated here, so the carried-over records are
    /// exactly those held before the prestige; rules run again on the next
    /// mutation.
    pub async fn prestige(&mut self) -> CommandOutcome<bool> {
        let now = self.clock.now_ms();
        match apply_prestige(&self.state, self.config.prestige_divisor, now) {
            Ok((next, receipt)) => {
                self.phase = Phase::Prestiging;
                self.state = next;
                self.last_tick_at = now;
                self.persist().await;
                self.phase = Phase::Running;
                info!(
                    gained = receipt.gained,
                    level = receipt.new_level,
                    "prestige complete"
                );
                let plural = if receipt.gained == 1 { "" } else { "s" };
                CommandOutcome::new(
                    true,
                    vec![Notification::success(
                        "Prestige Complete!",
                        format!("Gained {} prestige point{plural}!", receipt.gained),
                    )],
                )
            }
            Err(GameError::NotEnoughToPrestige { remaining }) => CommandOutcome::new(
                false,
                vec![Notification::failure(
                    "Not enough progress!",
                    format!("Earn {remaining:.0} more total to gain a Prestige Point."),
                )],
            ),
            Err(e) => CommandOutcome::new(
                false,
                vec![Notification::failure("Prestige failed", e.to_string())],
            ),
        }
    }

    /// Wipe the save back to the initial state.
    pub async fn reset(&mut self) -> CommandOutcome<GameState> {
        let now = self.clock.now_ms();
        self.phase = Phase::Resetting;
        if let Err(e) = clear_document(&self.store).await {
            error!(error = %e, "failed to clear stored save");
        }
        self.state = apply_reset(now);
        self.session = SessionCounters::default();
        self.last_tick_at = now;
        self.persist().await;
        self.phase = Phase::Loaded;
        info!("game reset");
        CommandOutcome::new(
            self.state.clone(),
            vec![Notification::success("Game Reset", "Starting over from scratch")],
        )
    }

    /// Flip golden-command notifications. Returns the new setting.
    pub async fn toggle_lucky_toasts(&mut self) -> CommandOutcome<bool> {
        let now = self.clock.now_ms();
        self.state = apply_toggle_lucky_toasts(&self.state, now);
        self.phase = Phase::Running;
        self.persist().await;
        let enabled = self.state.settings.lucky_toasts_enabled;
        CommandOutcome::new(
            enabled,
            vec![Notification::success(
                format!(
                    "Lucky Toasts {}",
                    if enabled { "Enabled" } else { "Disabled" }
                ),
                "",
            )],
        )
    }
}

/// Name of a catalog entry for display, regular or prestige.
pub fn display_name(id: &str) -> Option<&'static str> {
    upgrade(id)
        .map(|u| u.name)
        .or_else(|| prestige_upgrade(id).map(|u| u.name))
}
