//! Screen Status Detect - screen security state behind one stable interface.
//!
//! This library exposes a platform screen sensor (recording, mirroring,
//! secure flag) and the app signing certificate digests to application code.
//! Calls the current platform can't serve degrade to logged no-ops instead of
//! errors.
//!
//! # Listeners
//!
//! Callbacks are registered and removed by value. The registry gives each
//! distinct callback a stable identity, keeps at most one live subscription
//! per identity on the shared `screenStatusChange` channel, and arms the
//! native sensor only while at least one listener is active.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                      ScreenStatusDetect                       │
//! ├───────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────────┐   │
//! │  │  Capability  │──▶│   Listener   │──▶│ EventDispatcher  │   │
//! │  │     Gate     │   │   Registry   │   │ (named channels) │   │
//! │  └──────────────┘   └──────────────┘   └──────────────────┘   │
//! │         │                  │ arm / disarm                     │
//! │         ▼                  ▼                                  │
//! │  ┌─────────────────────────────────┐   ┌──────────────────┐   │
//! │  │          NativeSensor           │   │  ListenerStats   │   │
//! │  └─────────────────────────────────┘   └──────────────────┘   │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use screen_status_detect::{
//!     dispatcher::Listener, sensor::NoopSensor, ChannelDispatcher, ScreenStatusDetect,
//!     StatusEvent,
//! };
//! use std::sync::Arc;
//!
//! let dispatcher = ChannelDispatcher::new();
//! let detect = ScreenStatusDetect::new(Arc::new(NoopSensor::new()), Arc::new(dispatcher));
//!
//! let on_change: Listener = Arc::new(|event: &StatusEvent| println!("{}", event.screen_status));
//! detect.add_listener(on_change.clone());
//! detect.remove_listener(on_change);
//! ```

pub mod config;
pub mod diagnostics;
pub mod dispatcher;
pub mod error;
pub mod facade;
pub mod platform;
pub mod registry;
pub mod sensor;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError};
pub use diagnostics::{ListenerStats, ListenerStatsSnapshot, SharedListenerStats};
pub use dispatcher::{
    ChannelDispatcher, EventDispatcher, Listener, Subscription, SCREEN_STATUS_CHANGE,
};
pub use error::ScreenStatusError;
pub use facade::{ScreenStatusDetect, ScreenStatusDetectBuilder};
pub use platform::{Capability, CapabilityGate, Operation, Platform};
pub use registry::{HostValue, ListenerId, ListenerRegistry};
pub use sensor::{
    CertificateFingerprint, CertificateValue, NativeSensor, ScreenStatus, SensorError,
    StatusEvent,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
