//! Per-key quota record.

use std::time::Duration;
use tokio::time::Instant;

/// Observable state of a quota record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    /// Window active and units remain
    Fresh,
    /// Every unit of the current window has been consumed
    Exhausted,
}

/// Consumption of a single key within its current fixed window.
///
/// Records are not synchronized themselves; the tracker only mutates them
/// while holding the registry lock for their key.
#[derive(Debug, Clone)]
pub struct QuotaRecord {
    /// Units consumed in the current window
    count: u64,
    /// When the current window started
    window_start: Instant,
}

impl QuotaRecord {
    /// Create an empty record whose window starts at `now`.
    pub fn new(now: Instant) -> Self {
        Self {
            count: 0,
            window_start: now,
        }
    }

    /// Units consumed in the current window.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// State as last recorded, without applying any pending reset.
    pub fn state(&self, capacity: u64) -> RecordState {
        if self.count < capacity {
            RecordState::Fresh
        } else {
            RecordState::Exhausted
        }
    }

    /// Whether the window that started at `window_start` is over.
    pub fn is_expired(&self, window: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.window_start) >= window
    }

    /// Start a new window at `now` if the current one has elapsed.
    ///
    /// Returns `true` if the record was reset.
    pub fn maybe_reset(&mut self, window: Duration, now: Instant) -> bool {
        if self.is_expired(window, now) {
            self.count = 0;
            self.window_start = now;
            true
        } else {
            false
        }
    }

    /// Consume one unit if any remain in the current window.
    ///
    /// The caller must apply `maybe_reset` first. A denied attempt leaves the
    /// count untouched.
    pub fn try_consume(&mut self, capacity: u64) -> bool {
        if self.count < capacity {
            self.count += 1;
            true
        } else {
            false
        }
    }

    /// Units still available, treating an elapsed window as fully restored.
    pub fn remaining(&self, capacity: u64, window: Duration, now: Instant) -> u64 {
        if self.is_expired(window, now) {
            capacity
        } else {
            capacity.saturating_sub(self.count)
        }
    }

    /// Time until the current window elapses.
    pub fn reset_in(&self, window: Duration, now: Instant) -> Duration {
        window.saturating_sub(now.saturating_duration_since(self.window_start))
    }
}
