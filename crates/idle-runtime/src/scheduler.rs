//! Periodic accrual and cross-process reconciliation.
//!
//! Two deployment modes share one save document:
//!
//! - `Foreground` accrues while no background lease is live and saves at
//!   most every `foreground_save_interval_ms`. While a lease is live it
//!   only adopts strictly newer documents.
//! - `Background` holds the soft lease, adopts documents written by
//!   foreground commands, accrues and saves every tick.
//!
//! If the lease is already held by another background process, a second
//! background behaves as a follower until the lease lapses.

use crate::engine::{CommandOutcome, Game};
use idle_core::Clock;
use persistence::{read_lease, release_lease, renew_lease, LeaseOutcome, Store};
use std::future::Future;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    Foreground,
    Background { holder: String },
}

/// What one tick did.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TickReport {
    Accrued { gained: f64 },
    /// Gain below epsilon or nothing elapsed.
    Suppressed,
    /// Replaced local state with a newer stored document.
    Adopted { last_update: i64 },
    /// Following another process; nothing newer to adopt.
    Deferred,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RunSummary {
    pub ticks: u64,
    pub accrued: f64,
    pub adoptions: u64,
}

impl RunSummary {
    fn record(&mut self, report: &TickReport) {
        self.ticks += 1;
        match *report {
            TickReport::Accrued { gained } => self.accrued += gained,
            TickReport::Adopted { .. } => self.adoptions += 1,
            TickReport::Suppressed | TickReport::Deferred => {}
        }
    }
}

impl<S: Store, C: Clock> Game<S, C> {
    /// Run one scheduler step in `mode`.
    pub async fn tick(&mut self, mode: &Mode) -> CommandOutcome<TickReport> {
        match mode {
            Mode::Foreground => self.foreground_tick().await,
            Mode::Background { holder } => self.background_tick(holder).await,
        }
    }

    async fn follow(&mut self, now: i64) -> CommandOutcome<TickReport> {
        self.last_tick_at = now;
        let value = match self.adopt_if_newer().await {
            Some(last_update) => TickReport::Adopted { last_update },
            None => TickReport::Deferred,
        };
        CommandOutcome {
            value,
            notifications: Vec::new(),
        }
    }

    async fn foreground_tick(&mut self) -> CommandOutcome<TickReport> {
        let now = self.now();
        match read_lease(self.store(), now).await {
            Ok(Some(lease)) => {
                debug!(holder = %lease.holder, "background lease live, following");
                return self.follow(now).await;
            }
            Ok(None) => {}
            Err(e) => error!(error = %e, "failed to read lease, accruing locally"),
        }

        let (gained, notifications) = self.accrue(now);
        let value = match gained {
            Some(gained) => {
                if now - self.last_saved_at >= self.config().foreground_save_interval_ms {
                    self.persist().await;
                }
                TickReport::Accrued { gained }
            }
            None => TickReport::Suppressed,
        };
        CommandOutcome {
            value,
            notifications,
        }
    }

    async fn background_tick(&mut self, holder: &str) -> CommandOutcome<TickReport> {
        let now = self.now();
        let ttl = self.config().lease_ttl_ms;
        match renew_lease(self.store(), holder, now, ttl).await {
            Ok(LeaseOutcome::HeldBy(other)) => {
                debug!(holder, owner = %other.holder, "lease held elsewhere, following");
                return self.follow(now).await;
            }
            Ok(LeaseOutcome::Acquired(_)) => {}
            Err(e) => warn!(error = %e, holder, "lease renewal failed, accruing anyway"),
        }

        let adopted = self.adopt_if_newer().await;
        let (gained, notifications) = self.accrue(now);
        let value = match (gained, adopted) {
            (Some(gained), _) => {
                self.persist().await;
                TickReport::Accrued { gained }
            }
            (None, Some(last_update)) => TickReport::Adopted { last_update },
            (None, None) => TickReport::Suppressed,
        };
        CommandOutcome {
            value,
            notifications,
        }
    }

    /// Final save; a background process also gives up its lease.
    pub async fn shutdown(&mut self, mode: &Mode) {
        self.persist().await;
        if let Mode::Background { holder } = mode {
            match release_lease(self.store(), holder).await {
                Ok(true) => info!(holder = %holder, "lease released"),
                Ok(false) => debug!(holder = %holder, "no lease to release"),
                Err(e) => error!(error = %e, "failed to release lease"),
            }
        }
    }
}

/// Tick `game` every `tick_period_ms` until `shutdown` resolves, then save
/// and release any lease.
pub async fn run<S, C, F>(game: &mut Game<S, C>, mode: Mode, shutdown: F) -> RunSummary
where
    S: Store,
    C: Clock,
    F: Future<Output = ()>,
{
    let period = Duration::from_millis(game.config().tick_period_ms.max(1));
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    info!(?mode, period_ms = period.as_millis() as u64, "scheduler started");
    let mut summary = RunSummary::default();
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                let outcome = game.tick(&mode).await;
                summary.record(&outcome.value);
                for note in &outcome.notifications {
                    info!(title = %note.title, message = %note.message, "notification");
                }
            }
        }
    }
    game.shutdown(&mode).await;
    info!(
        ticks = summary.ticks,
        accrued = summary.accrued,
        adoptions = summary.adoptions,
        "scheduler stopped"
    );
    summary
}
