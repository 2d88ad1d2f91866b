//! Listener and gate counters.
//!
//! Tracks what the facade did over a session: how many listeners came and
//! went, how often the native sensor was armed, which calls the gate turned
//! away. Nothing here records event contents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug)]
pub struct ListenerStats {
    /// Listeners that became active
    registrations: AtomicU64,
    /// Registrations ignored because the listener was already active
    duplicate_registrations: AtomicU64,
    /// Listeners that went from active to inactive
    removals: AtomicU64,
    /// Non-callable values passed to add/remove
    rejected_callbacks: AtomicU64,
    /// Native arm signals sent
    arm_signals: AtomicU64,
    /// Native disarm signals sent
    disarm_signals: AtomicU64,
    /// Calls short-circuited by the capability gate
    gated_calls: AtomicU64,
    /// Events handed to registered listeners
    events_delivered: AtomicU64,
    session_start: DateTime<Utc>,
}

impl ListenerStats {
    pub fn new() -> Self {
        Self {
            registrations: AtomicU64::new(0),
            duplicate_registrations: AtomicU64::new(0),
            removals: AtomicU64::new(0),
            rejected_callbacks: AtomicU64::new(0),
            arm_signals: AtomicU64::new(0),
            disarm_signals: AtomicU64::new(0),
            gated_calls: AtomicU64::new(0),
            events_delivered: AtomicU64::new(0),
            session_start: Utc::now(),
        }
    }

    pub fn record_registration(&self) {
        self.registrations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_duplicate_registration(&self) {
        self.duplicate_registrations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_removal(&self) {
        self.removals.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected_callback(&self) {
        self.rejected_callbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_arm(&self) {
        self.arm_signals.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_disarm(&self) {
        self.disarm_signals.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_gated_call(&self) {
        self.gated_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_event_delivered(&self) {
        self.events_delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> ListenerStatsSnapshot {
        ListenerStatsSnapshot {
            registrations: self.registrations.load(Ordering::Relaxed),
            duplicate_registrations: self.duplicate_registrations.load(Ordering::Relaxed),
            removals: self.removals.load(Ordering::Relaxed),
            rejected_callbacks: self.rejected_callbacks.load(Ordering::Relaxed),
            arm_signals: self.arm_signals.load(Ordering::Relaxed),
            disarm_signals: self.disarm_signals.load(Ordering::Relaxed),
            gated_calls: self.gated_calls.load(Ordering::Relaxed),
            events_delivered: self.events_delivered.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Listener Statistics:\n\
             - Listeners registered: {}\n\
             - Duplicate registrations ignored: {}\n\
             - Listeners removed: {}\n\
             - Rejected callbacks: {}\n\
             - Sensor armed: {} time(s)\n\
             - Sensor disarmed: {} time(s)\n\
             - Calls refused on this platform: {}\n\
             - Events delivered: {}\n\
             - Session duration: {} seconds",
            stats.registrations,
            stats.duplicate_registrations,
            stats.removals,
            stats.rejected_callbacks,
            stats.arm_signals,
            stats.disarm_signals,
            stats.gated_calls,
            stats.events_delivered,
            stats.session_duration_secs
        )
    }

    pub fn reset(&self) {
        self.registrations.store(0, Ordering::Relaxed);
        self.duplicate_registrations.store(0, Ordering::Relaxed);
        self.removals.store(0, Ordering::Relaxed);
        self.rejected_callbacks.store(0, Ordering::Relaxed);
        self.arm_signals.store(0, Ordering::Relaxed);
        self.disarm_signals.store(0, Ordering::Relaxed);
        self.gated_calls.store(0, Ordering::Relaxed);
        self.events_delivered.store(0, Ordering::Relaxed);
    }
}

impl Default for ListenerStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`ListenerStats`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerStatsSnapshot {
    pub registrations: u64,
    pub duplicate_registrations: u64,
    pub removals: u64,
    pub rejected_callbacks: u64,
    pub arm_signals: u64,
    pub disarm_signals: u64,
    pub gated_calls: u64,
    pub events_delivered: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

/// Thread-safe shared counters.
pub type SharedListenerStats = Arc<ListenerStats>;

pub fn create_shared_stats() -> SharedListenerStats {
    Arc::new(ListenerStats::new())
}
