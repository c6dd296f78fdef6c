//! Global atomic counters for workflow observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. at the end of a daemon tick).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters, no allocations and no locking.
pub struct Metrics {
    events_published: AtomicU64,
    observer_failures: AtomicU64,
    transitions_applied: AtomicU64,
    votes_cast: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            events_published: AtomicU64::new(0),
            observer_failures: AtomicU64::new(0),
            transitions_applied: AtomicU64::new(0),
            votes_cast: AtomicU64::new(0),
        }
    }

    /// Increment the events-published counter by one.
    pub fn inc_events_published(&self) {
        self.events_published.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "events_published", "counter incremented");
    }

    /// Increment the observer-failures counter by one.
    pub fn inc_observer_failures(&self) {
        self.observer_failures.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "observer_failures", "counter incremented");
    }

    /// Increment the transitions-applied counter by one.
    pub fn inc_transitions(&self) {
        self.transitions_applied.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "transitions_applied", "counter incremented");
    }

    /// Increment the votes-cast counter by one.
    pub fn inc_votes(&self) {
        self.votes_cast.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "votes_cast", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            events_published = self.events_published(),
            observer_failures = self.observer_failures(),
            transitions_applied = self.transitions_applied(),
            votes_cast = self.votes_cast(),
        );
    }

    pub fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }

    pub fn observer_failures(&self) -> u64 {
        self.observer_failures.load(Ordering::Relaxed)
    }

    pub fn transitions_applied(&self) -> u64 {
        self.transitions_applied.load(Ordering::Relaxed)
    }

    pub fn votes_cast(&self) -> u64 {
        self.votes_cast.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.events_published.store(0, Ordering::Relaxed);
        self.observer_failures.store(0, Ordering::Relaxed);
        self.transitions_applied.store(0, Ordering::Relaxed);
        self.votes_cast.store(0, Ordering::Relaxed);
    }
}
