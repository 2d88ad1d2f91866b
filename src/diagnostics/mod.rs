//! Session diagnostics for the screen-status facade.

pub mod stats;

pub use stats::{create_shared_stats, ListenerStats, ListenerStatsSnapshot, SharedListenerStats};
