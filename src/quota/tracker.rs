//! Concurrency-safe fixed-window quota tracker.

use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use tracing::{debug, trace};

use super::record::{QuotaRecord, RecordState};
use crate::error::{Result, TollgateError};

/// Outcome of a single quota check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaStatus {
    /// Whether this check consumed a unit
    pub allowed: bool,
    /// Units left in the current window after this check
    pub remaining: u64,
    /// Time until the current window elapses
    pub reset_in: Duration,
    /// Record state after this check
    pub state: RecordState,
}

/// Per-key fixed-window counter.
///
/// Every key gets `capacity` units per `window`. When the window of a key
/// elapses, the next check restores all units at once. Records are created
/// lazily and never evicted.
///
/// The registry is sharded, and a check holds its key's shard lock for the
/// whole read-modify-write, so checks on one key are linearizable while checks
/// on different keys only contend when they land in the same shard.
#[derive(Debug)]
pub struct QuotaTracker {
    capacity: u64,
    window: Duration,
    records: DashMap<String, QuotaRecord>,
}

impl QuotaTracker {
    /// Create a tracker admitting `capacity` units per key per `window`.
    ///
    /// Fails if `capacity` is zero or `window` is zero, since such a tracker
    /// would never admit or never reset.
    pub fn new(capacity: u64, window: Duration) -> Result<Self> {
        if capacity == 0 {
            return Err(TollgateError::InvalidQuota(
                "capacity must be at least 1".to_string(),
            ));
        }
        if window.is_zero() {
            return Err(TollgateError::InvalidQuota(
                "window must be longer than zero".to_string(),
            ));
        }

        debug!(capacity, window = ?window, "Creating quota tracker");

        Ok(Self {
            capacity,
            window,
            records: DashMap::new(),
        })
    }

    /// Consume one unit for `key` if its quota allows it.
    pub fn allow(&self, key: &str) -> bool {
        self.check(key).allowed
    }

    /// Consume one unit for `key` if its quota allows it, reporting the
    /// resulting quota state.
    pub fn check(&self, key: &str) -> QuotaStatus {
        let now = Instant::now();

        // The entry guard holds the shard write lock until it is dropped.
        let mut record = self.records.entry(key.to_string()).or_insert_with(|| {
            debug!(key = %key, "Creating quota record");
            QuotaRecord::new(now)
        });

        if record.maybe_reset(self.window, now) {
            debug!(key = %key, "Quota window elapsed, record reset");
        }

        let allowed = record.try_consume(self.capacity);
        let status = QuotaStatus {
            allowed,
            remaining: self.capacity.saturating_sub(record.count()),
            reset_in: record.reset_in(self.window, now),
            state: record.state(self.capacity),
        };
        drop(record);

        trace!(
            key = %key,
            allowed = status.allowed,
            remaining = status.remaining,
            state = ?status.state,
            "Checked quota"
        );

        if !allowed {
            debug!(key = %key, reset_in = ?status.reset_in, "Quota exhausted");
        }

        status
    }

    /// Units still available for `key` without consuming any.
    pub fn remaining(&self, key: &str) -> u64 {
        let now = Instant::now();
        self.records
            .get(key)
            .map_or(self.capacity, |r| r.remaining(self.capacity, self.window, now))
    }

    /// Maximum units per key per window.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Length of the reset interval.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Number of keys that have been observed.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no key has been observed yet.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drop every record.
    ///
    /// This is primarily useful for testing.
    pub fn clear(&self) {
        self.records.clear();
    }
}
