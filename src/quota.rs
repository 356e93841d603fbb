//! Rolling usage quota kept in client storage.
//!
//! The counter is advisory: clearing storage resets it. The window restarts
//! exactly `window_ms` after it opened, independent of calendar boundaries.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::store::{StateStore, StoreError, ANALYSIS_COUNT_KEY, LAST_RESET_TIME_KEY};

/// Analyses allowed per window.
pub const DEFAULT_CEILING: u32 = 5;

/// 24 hours in milliseconds.
pub const DEFAULT_WINDOW_MS: i64 = 24 * 60 * 60 * 1000;

const HOUR_MS: i64 = 60 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaPolicy {
    pub ceiling: u32,
    pub window_ms: i64,
}

impl QuotaPolicy {
    pub fn new(ceiling: u32, window_ms: i64) -> Self {
        Self { ceiling, window_ms }
    }
}

impl Default for QuotaPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_CEILING, DEFAULT_WINDOW_MS)
    }
}

/// Refusal to start another analysis in the current window.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("Analysis limit reached, try again in {} hours", wait_hours(.wait_ms))]
pub struct QuotaExceeded {
    /// Milliseconds until the window rolls over.
    pub wait_ms: i64,
}

impl QuotaExceeded {
    pub fn hours(&self) -> i64 {
        ceil_hours(self.wait_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaState {
    pub count: u32,
    /// Epoch milliseconds at which the current window opened.
    pub window_start: i64,
}

impl QuotaState {
    /// An empty window opening at `now`.
    pub fn fresh(now: i64) -> Self {
        Self {
            count: 0,
            window_start: now,
        }
    }

    /// Read persisted state and apply rollover for `now`.
    ///
    /// The result depends only on what is stored and on `now`, so a reload
    /// reaches the same decision a fresh session would. Missing or unreadable
    /// entries open a new window.
    pub fn load<S: StateStore + ?Sized>(store: &S, policy: &QuotaPolicy, now: i64) -> Self {
        let count = store
            .get(ANALYSIS_COUNT_KEY)
            .and_then(|v| v.trim().parse::<u32>().ok());
        let window_start = store
            .get(LAST_RESET_TIME_KEY)
            .and_then(|v| v.trim().parse::<i64>().ok());

        let stored = match (count, window_start) {
            (Some(count), Some(window_start)) => Some(Self {
                count,
                window_start,
            }),
            _ => None,
        };

        let state = match stored {
            Some(s) => s.rolled_over(policy, now),
            None => {
                debug!("No stored quota state, opening a new window");
                Self::fresh(now)
            }
        };

        if stored != Some(state) {
            if let Err(e) = state.persist(store) {
                warn!("Failed to persist quota state: {}", e);
            }
        }

        state
    }

    /// Whether the window has run its full length at `now`.
    ///
    /// A window start in the future cannot come from this client's clock and
    /// is treated as expired, as is one too far away to measure.
    pub fn is_expired(&self, policy: &QuotaPolicy, now: i64) -> bool {
        match now.checked_sub(self.window_start) {
            Some(elapsed) => elapsed < 0 || elapsed >= policy.window_ms,
            None => true,
        }
    }

    /// Same state, or a fresh window if this one has expired.
    pub fn rolled_over(self, policy: &QuotaPolicy, now: i64) -> Self {
        if self.is_expired(policy, now) {
            info!(
                "Quota window expired (started {}, now {}), resetting count from {}",
                self.window_start, now, self.count
            );
            Self::fresh(now)
        } else {
            self
        }
    }

    /// Account for one analysis attempt at `now`.
    ///
    /// Rolls the window over first, so an exhausted window that has expired
    /// admits the attempt and leaves the count at 1.
    pub fn try_consume(&mut self, policy: &QuotaPolicy, now: i64) -> Result<(), QuotaExceeded> {
        *self = self.rolled_over(policy, now);
        if self.is_exhausted(policy) {
            return Err(QuotaExceeded {
                wait_ms: self.wait_ms(policy, now),
            });
        }
        self.count += 1;
        Ok(())
    }

    pub fn is_exhausted(&self, policy: &QuotaPolicy) -> bool {
        self.count >= policy.ceiling
    }

    /// Analyses left in this window.
    pub fn remaining(&self, policy: &QuotaPolicy) -> u32 {
        policy.ceiling.saturating_sub(self.count)
    }

    /// Milliseconds until the window rolls over, never negative.
    pub fn wait_ms(&self, policy: &QuotaPolicy, now: i64) -> i64 {
        self.window_start
            .saturating_add(policy.window_ms)
            .saturating_sub(now)
            .max(0)
    }

    /// Whole hours until rollover, rounded up for display.
    pub fn hours_until_reset(&self, policy: &QuotaPolicy, now: i64) -> i64 {
        ceil_hours(self.wait_ms(policy, now))
    }

    pub fn persist<S: StateStore + ?Sized>(&self, store: &S) -> Result<(), StoreError> {
        store.set(ANALYSIS_COUNT_KEY, &self.count.to_string())?;
        store.set(LAST_RESET_TIME_KEY, &self.window_start.to_string())
    }
}

fn wait_hours(wait_ms: &i64) -> i64 {
    ceil_hours(*wait_ms)
}

fn ceil_hours(ms: i64) -> i64 {
    ms.saturating_add(HOUR_MS - 1).div_euclid(HOUR_MS)
}
