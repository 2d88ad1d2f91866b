//! Sensor for hosts with no native screen-status module.
//!
//! This exists so the facade can be constructed everywhere. It always
//! reports a normal screen and has no certificate to hand out.

use crate::sensor::types::{CertificateFingerprint, CertificateValue, ScreenStatus, StatusEvent};
use crate::sensor::{NativeSensor, SensorError};
use async_trait::async_trait;

/// A sensor that never observes anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSensor;

impl NoopSensor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NativeSensor for NoopSensor {
    async fn get_current_status(&self) -> Result<StatusEvent, SensorError> {
        Ok(StatusEvent::snapshot(ScreenStatus::ScreenNormal))
    }

    async fn get_certificate_fingerprint(&self) -> Result<CertificateFingerprint, SensorError> {
        Err(SensorError::Unavailable)
    }

    async fn get_certificate_value(&self) -> Result<CertificateValue, SensorError> {
        Err(SensorError::Unavailable)
    }

    async fn is_emulator(&self) -> Result<bool, SensorError> {
        Ok(false)
    }

    async fn check_is_bluestacks(&self) -> Result<bool, SensorError> {
        Ok(false)
    }

    fn enable_secure_screen(&self) {}

    fn disable_secure_screen(&self) {}

    fn subscribe(&self) {}

    fn unsubscribe(&self) {}
}
