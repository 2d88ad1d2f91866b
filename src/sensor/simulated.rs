//! Scripted in-process sensor.
//!
//! Plays back a list of screen states, records every call the facade makes,
//! and pushes status events onto a bounded channel while armed. The CLI uses
//! it for `watch`; the tests use it to observe arm/disarm edges and gating.

use crate::sensor::probe::EmulatorProbe;
use crate::sensor::types::{CertificateFingerprint, CertificateValue, ScreenStatus, StatusEvent};
use crate::sensor::{NativeSensor, SensorError};
use async_trait::async_trait;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A call made into the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorCall {
    GetCurrentStatus,
    GetCertificateFingerprint,
    GetCertificateValue,
    IsEmulator,
    CheckIsBlueStacks,
    EnableSecureScreen,
    DisableSecureScreen,
    Subscribe,
    Unsubscribe,
}

struct SimState {
    script: VecDeque<ScreenStatus>,
    current: ScreenStatus,
    calls: Vec<SensorCall>,
    secure: bool,
}

pub struct SimulatedSensor {
    state: Mutex<SimState>,
    sender: Sender<StatusEvent>,
    receiver: Receiver<StatusEvent>,
    armed: AtomicBool,
    always_on: AtomicBool,
    fail_queries: AtomicBool,
    fingerprint: CertificateFingerprint,
    certificate: CertificateValue,
    probe: Option<EmulatorProbe>,
}

impl SimulatedSensor {
    /// Create a sensor with an empty script and a normal screen.
    pub fn new() -> Self {
        // Bounded so an unobserved sensor can't grow without limit
        let (sender, receiver) = bounded(1_024);

        Self {
            state: Mutex::new(SimState {
                script: VecDeque::new(),
                current: ScreenStatus::ScreenNormal,
                calls: Vec::new(),
                secure: false,
            }),
            sender,
            receiver,
            armed: AtomicBool::new(false),
            always_on: AtomicBool::new(false),
            fail_queries: AtomicBool::new(false),
            fingerprint: CertificateFingerprint::default(),
            certificate: CertificateValue::from_signature_hashes([]),
            probe: None,
        }
    }

    pub fn with_script<I>(script: I) -> Self
    where
        I: IntoIterator<Item = ScreenStatus>,
    {
        let sensor = Self::new();
        sensor.enqueue(script);
        sensor
    }

    /// Append states to the end of the script.
    pub fn enqueue<I>(&self, statuses: I)
    where
        I: IntoIterator<Item = ScreenStatus>,
    {
        self.state().script.extend(statuses);
    }

    pub fn with_certificate(
        mut self,
        fingerprint: CertificateFingerprint,
        certificate: CertificateValue,
    ) -> Self {
        self.fingerprint = fingerprint;
        self.certificate = certificate;
        self
    }

    pub fn with_probe(mut self, probe: EmulatorProbe) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Emit events even when nobody armed the sensor.
    ///
    /// Hosts without an arm/disarm signal observe continuously.
    pub fn set_always_on(&self, always_on: bool) {
        self.always_on.store(always_on, Ordering::SeqCst);
    }

    /// Make every query fail with [`SensorError::Rejected`].
    pub fn set_fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: SensorCall) {
        self.state().calls.push(call);
    }

    fn query<T>(&self, call: SensorCall, value: impl FnOnce() -> T) -> Result<T, SensorError> {
        self.record(call);
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(SensorError::Rejected(
                "this feature supports android api level 17 and above".to_string(),
            ));
        }
        Ok(value())
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }

    pub fn is_secure(&self) -> bool {
        self.state().secure
    }

    fn is_emitting(&self) -> bool {
        self.is_armed() || self.always_on.load(Ordering::SeqCst)
    }

    pub fn current_status(&self) -> ScreenStatus {
        self.state().current
    }

    /// All calls in the order they were made.
    pub fn calls(&self) -> Vec<SensorCall> {
        self.state().calls.clone()
    }

    pub fn call_count(&self, call: SensorCall) -> usize {
        self.state().calls.iter().filter(|c| **c == call).count()
    }

    pub fn remaining(&self) -> usize {
        self.state().script.len()
    }

    /// Receiver for events produced while the sensor is emitting.
    pub fn receiver(&self) -> &Receiver<StatusEvent> {
        &self.receiver
    }

    /// Move to the next scripted state. Returns the event if one was emitted.
    pub fn advance(&self) -> Option<StatusEvent> {
        let next = self.state().script.pop_front()?;
        self.push_status(next)
    }

    /// Set the current state and emit it if the sensor is emitting.
    pub fn push_status(&self, status: ScreenStatus) -> Option<StatusEvent> {
        self.state().current = status;
        if !self.is_emitting() {
            return None;
        }
        let event = StatusEvent::new(status);
        // Don't block if the channel is full - just drop the event
        match self.sender.try_send(event.clone()) {
            Ok(()) => Some(event),
            Err(_) => {
                tracing::debug!(status = status.as_str(), "event channel full, dropping");
                None
            }
        }
    }
}

impl Default for SimulatedSensor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NativeSensor for SimulatedSensor {
    async fn get_current_status(&self) -> Result<StatusEvent, SensorError> {
        let current = self.current_status();
        self.query(SensorCall::GetCurrentStatus, || StatusEvent::snapshot(current))
    }

    async fn get_certificate_fingerprint(&self) -> Result<CertificateFingerprint, SensorError> {
        self.query(SensorCall::GetCertificateFingerprint, || {
            self.fingerprint.clone()
        })
    }

    async fn get_certificate_value(&self) -> Result<CertificateValue, SensorError> {
        self.query(SensorCall::GetCertificateValue, || self.certificate)
    }

    async fn is_emulator(&self) -> Result<bool, SensorError> {
        self.query(SensorCall::IsEmulator, || {
            self.probe.as_ref().map(|p| p.is_emulator()).unwrap_or(false)
        })
    }

    async fn check_is_bluestacks(&self) -> Result<bool, SensorError> {
        self.query(SensorCall::CheckIsBlueStacks, || {
            self.probe.as_ref().map(|p| p.is_bluestacks()).unwrap_or(false)
        })
    }

    fn enable_secure_screen(&self) {
        let mut state = self.state();
        state.calls.push(SensorCall::EnableSecureScreen);
        state.secure = true;
    }

    fn disable_secure_screen(&self) {
        let mut state = self.state();
        state.calls.push(SensorCall::DisableSecureScreen);
        state.secure = false;
    }

    fn subscribe(&self) {
        self.record(SensorCall::Subscribe);
        self.armed.store(true, Ordering::SeqCst);
    }

    fn unsubscribe(&self) {
        self.record(SensorCall::Unsubscribe);
        self.armed.store(false, Ordering::SeqCst);
    }
}
