//! Native sensor seam.
//!
//! The actual detection (display listeners, media-store observers, package
//! signature lookup) lives in the host platform. This module defines the
//! [`NativeSensor`] trait the facade talks to, plus in-process
//! implementations for hosts without a native module and for driving the
//! facade from tests and the CLI.

pub mod noop;
pub mod probe;
pub mod simulated;
pub mod types;

use async_trait::async_trait;
use thiserror::Error;

// Re-export commonly used types
pub use noop::NoopSensor;
pub use probe::EmulatorProbe;
pub use simulated::{SensorCall, SimulatedSensor};
pub use types::{
    format_digest, CertificateFingerprint, CertificateValue, ScreenStatus, StatusEvent,
};

/// Errors reported by a native sensor query.
#[derive(Debug, Error)]
pub enum SensorError {
    /// The native side rejected the request.
    #[error("{0}")]
    Rejected(String),

    /// No native module is available on this host.
    #[error("native module is not available")]
    Unavailable,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Platform screen-security sensor.
///
/// Queries suspend until the native side answers; commands are fire and
/// forget. The facade only calls into an implementation after the capability
/// gate has approved the operation.
#[async_trait]
pub trait NativeSensor: Send + Sync {
    async fn get_current_status(&self) -> Result<StatusEvent, SensorError>;

    async fn get_certificate_fingerprint(&self) -> Result<CertificateFingerprint, SensorError>;

    async fn get_certificate_value(&self) -> Result<CertificateValue, SensorError>;

    async fn is_emulator(&self) -> Result<bool, SensorError>;

    async fn check_is_bluestacks(&self) -> Result<bool, SensorError>;

    fn enable_secure_screen(&self);

    fn disable_secure_screen(&self);

    /// Arm: the first listener appeared, start observing.
    ///
    /// Called with the facade's registry lock held. Events must go out through
    /// the dispatcher later, never from inside this call.
    fn subscribe(&self);

    /// Disarm: the last listener went away, stop observing.
    ///
    /// Same locking rule as [`Self::subscribe`].
    fn unsubscribe(&self);
}
