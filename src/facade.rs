//! Public entry point for application code.

use crate::config::Config;
use crate::diagnostics::{create_shared_stats, SharedListenerStats};
use crate::dispatcher::{ChannelDispatcher, EventDispatcher, SCREEN_STATUS_CHANGE};
use crate::platform::{Capability, CapabilityGate, Operation, Platform};
use crate::registry::{HostValue, ListenerId, ListenerRegistry};
use crate::sensor::{CertificateFingerprint, CertificateValue, NativeSensor, StatusEvent};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Screen-security facade over a native sensor.
///
/// Every operation is gated on the platform first. Listener bookkeeping is
/// synchronous and completes (arm/disarm included) before the call returns;
/// the data queries are `async` and resolve when the sensor answers.
pub struct ScreenStatusDetect {
    gate: CapabilityGate,
    sensor: Arc<dyn NativeSensor>,
    registry: Mutex<ListenerRegistry>,
    stats: SharedListenerStats,
}

impl ScreenStatusDetect {
    /// Facade for the current platform on the default channel.
    pub fn new(sensor: Arc<dyn NativeSensor>, dispatcher: Arc<dyn EventDispatcher>) -> Self {
        Self::builder(sensor).dispatcher(dispatcher).build()
    }

    pub fn builder(sensor: Arc<dyn NativeSensor>) -> ScreenStatusDetectBuilder {
        ScreenStatusDetectBuilder::new(sensor)
    }

    /// Facade configured from `config`, falling back to the current platform.
    pub fn from_config(
        config: &Config,
        sensor: Arc<dyn NativeSensor>,
        dispatcher: Arc<dyn EventDispatcher>,
    ) -> Self {
        Self::builder(sensor)
            .platform(config.platform())
            .event_name(config.event_name.clone())
            .dispatcher(dispatcher)
            .build()
    }

    pub fn platform(&self) -> Platform {
        self.gate.platform()
    }

    pub fn gate(&self) -> &CapabilityGate {
        &self.gate
    }

    pub fn stats(&self) -> &SharedListenerStats {
        &self.stats
    }

    fn registry(&self) -> MutexGuard<'_, ListenerRegistry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn allowed(&self, operation: Operation) -> bool {
        if self.gate.check(operation) {
            true
        } else {
            self.stats.record_gated_call();
            false
        }
    }

    pub async fn get_current_status(&self) -> Capability<StatusEvent> {
        if !self.allowed(Operation::GetCurrentStatus) {
            return Capability::Unsupported(Operation::GetCurrentStatus);
        }
        self.sensor.get_current_status().await.into()
    }

    pub async fn get_certificate_fingerprint(&self) -> Capability<CertificateFingerprint> {
        if !self.allowed(Operation::GetCertificateFingerprint) {
            return Capability::Unsupported(Operation::GetCertificateFingerprint);
        }
        self.sensor.get_certificate_fingerprint().await.into()
    }

    pub async fn get_certificate_value(&self) -> Capability<CertificateValue> {
        if !self.allowed(Operation::GetCertificateValue) {
            return Capability::Unsupported(Operation::GetCertificateValue);
        }
        self.sensor.get_certificate_value().await.into()
    }

    pub async fn is_emulator(&self) -> Capability<bool> {
        if !self.allowed(Operation::IsEmulator) {
            return Capability::Unsupported(Operation::IsEmulator);
        }
        self.sensor.is_emulator().await.into()
    }

    pub async fn check_is_bluestacks(&self) -> Capability<bool> {
        if !self.allowed(Operation::CheckIsBlueStacks) {
            return Capability::Unsupported(Operation::CheckIsBlueStacks);
        }
        self.sensor.check_is_bluestacks().await.into()
    }

    pub fn enable_secure_screen(&self) -> Capability<()> {
        if !self.allowed(Operation::EnableSecureScreen) {
            return Capability::Unsupported(Operation::EnableSecureScreen);
        }
        self.sensor.enable_secure_screen();
        Capability::Supported(())
    }

    pub fn disable_secure_screen(&self) -> Capability<()> {
        if !self.allowed(Operation::DisableSecureScreen) {
            return Capability::Unsupported(Operation::DisableSecureScreen);
        }
        self.sensor.disable_secure_screen();
        Capability::Supported(())
    }

    /// Register `callback` for `screenStatusChange` events.
    ///
    /// Registering an already active callback is ignored. The returned id can
    /// be passed to [`Self::remove_listener_by_id`], but holding on to it is
    /// optional; removing by the same callback works too.
    pub fn add_listener(&self, callback: impl Into<HostValue>) -> Capability<ListenerId> {
        if !self.allowed(Operation::AddListener) {
            return Capability::Unsupported(Operation::AddListener);
        }
        self.registry().register(&callback.into()).into()
    }

    /// Remove a previously registered callback.
    ///
    /// Yields `false` when the callback was not active.
    pub fn remove_listener(&self, callback: impl Into<HostValue>) -> Capability<bool> {
        if !self.allowed(Operation::RemoveListener) {
            return Capability::Unsupported(Operation::RemoveListener);
        }
        self.registry().remove(&callback.into()).into()
    }

    pub fn remove_listener_by_id(&self, id: ListenerId) -> bool {
        self.registry().remove_by_id(id)
    }

    pub fn is_listening(&self, id: ListenerId) -> bool {
        self.registry().is_active(id)
    }

    pub fn active_listener_count(&self) -> usize {
        self.registry().active_count()
    }

    /// Remove every listener. The facade stays usable afterwards.
    pub fn shutdown(&self) {
        self.registry().shutdown();
    }
}

/// Builder for [`ScreenStatusDetect`].
pub struct ScreenStatusDetectBuilder {
    sensor: Arc<dyn NativeSensor>,
    dispatcher: Option<Arc<dyn EventDispatcher>>,
    platform: Platform,
    event_name: String,
    stats: Option<SharedListenerStats>,
}

impl ScreenStatusDetectBuilder {
    pub fn new(sensor: Arc<dyn NativeSensor>) -> Self {
        Self {
            sensor,
            dispatcher: None,
            platform: Platform::current(),
            event_name: SCREEN_STATUS_CHANGE.to_string(),
            stats: None,
        }
    }

    pub fn platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn dispatcher(mut self, dispatcher: Arc<dyn EventDispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn event_name(mut self, event_name: impl Into<String>) -> Self {
        self.event_name = event_name.into();
        self
    }

    pub fn stats(mut self, stats: SharedListenerStats) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn build(self) -> ScreenStatusDetect {
        let gate = CapabilityGate::new(self.platform);
        let stats = self.stats.unwrap_or_else(create_shared_stats);
        let dispatcher = self
            .dispatcher
            .unwrap_or_else(|| Arc::new(ChannelDispatcher::new()));

        let registry = ListenerRegistry::new(
            self.event_name,
            dispatcher,
            Arc::clone(&self.sensor),
            gate,
            Arc::clone(&stats),
        );

        ScreenStatusDetect {
            gate,
            sensor: self.sensor,
            registry: Mutex::new(registry),
            stats,
        }
    }
}
