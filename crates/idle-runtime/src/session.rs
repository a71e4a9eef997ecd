//! Per-process counters that feed achievements.
//!
//! These are deliberately not part of the save document: they start from
//! zero whenever a process starts, so achievements gated on them must be
//! earned within one process lifetime.

use std::collections::VecDeque;

/// Width of the sliding click window.
pub const CLICK_WINDOW_MS: i64 = 30_000;

#[derive(Clone, Debug, Default)]
pub struct SessionCounters {
    click_times: VecDeque<i64>,
    lucky_triggers: u32,
    insufficient_funds: u32,
}

impl SessionCounters {
    pub fn record_click(&mut self, now_ms: i64) {
        self.click_times.push_back(now_ms);
        self.prune(now_ms);
    }

    fn prune(&mut self, now_ms: i64) {
        let cutoff = now_ms - CLICK_WINDOW_MS;
        while self.click_times.front().is_some_and(|&t| t <= cutoff) {
            self.click_times.pop_front();
        }
    }

    /// Clicks recorded in the 30 seconds up to `now_ms`.
    pub fn clicks_in_window(&self, now_ms: i64) -> usize {
        let cutoff = now_ms - CLICK_WINDOW_MS;
        self.click_times.iter().filter(|&&t| t > cutoff).count()
    }

    pub fn record_lucky(&mut self) {
        self.lucky_triggers = self.lucky_triggers.saturating_add(1);
    }

    pub fn lucky_triggers(&self) -> u32 {
        self.lucky_triggers
    }

    pub fn record_insufficient_funds(&mut self) {
        self.insufficient_funds = self.insufficient_funds.saturating_add(1);
    }

    pub fn insufficient_funds(&self) -> u32 {
        self.insufficient_funds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_slides() {
        let mut s = SessionCounters::default();
        for t in 0..10 {
            s.record_click(t * 1_000);
        }
        assert_eq!(s.clicks_in_window(9_000), 10);
        assert_eq!(s.clicks_in_window(30_500), 9);
        s.record_click(45_000);
        assert_eq!(s.clicks_in_window(45_000), 1);
    }

    #[test]
    fn counters_accumulate() {
        let mut s = SessionCounters::default();
        s.record_lucky();
        s.record_insufficient_funds();
        s.record_insufficient_funds();
        assert_eq!(s.lucky_triggers(), 1);
        assert_eq!(s.insufficient_funds(), 2);
    }
}
