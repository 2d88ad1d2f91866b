//! Error types surfaced by the facade.

use crate::sensor::SensorError;
use thiserror::Error;

/// Errors that can be reported through [`crate::Capability::Failed`].
///
/// None of these are raised as panics. Listener bookkeeping failures are
/// logged and handed back as values so the caller can ignore them.
#[derive(Debug, Error)]
pub enum ScreenStatusError {
    /// A non-callable value was passed to `addListener`/`removeListener`.
    #[error("callback is not a function (got {0})")]
    InvalidCallback(&'static str),

    /// The native sensor query itself failed.
    #[error("native sensor failure: {0}")]
    Native(#[from] SensorError),
}

impl ScreenStatusError {
    pub fn is_invalid_callback(&self) -> bool {
        matches!(self, ScreenStatusError::InvalidCallback(_))
    }
}
