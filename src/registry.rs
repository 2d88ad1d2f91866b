//! Listener identity and subscription registry.
//!
//! Application code registers plain callbacks and later removes them by
//! handing back the same callback. The registry turns that into precise
//! subscription bookkeeping against one shared dispatcher channel:
//!
//! - every distinct callback gets a [`ListenerId`] the first time it is seen,
//!   and keeps it for the registry's lifetime;
//! - an identity has at most one live subscription at a time;
//! - the native sensor is armed when the first listener becomes active and
//!   disarmed when the last one goes away.
//!
//! Callbacks are shared [`Listener`]s (`Arc<dyn Fn>`). Two callbacks are the
//! same listener when they point at the same allocation, so clones of one
//! `Arc` share an identity and separately allocated closures never do. The
//! identity table keeps a [`Weak`] to every callback it has seen. That pins
//! the allocation, so its address is never reused, while the closure and
//! whatever it captures are freed once the caller lets go.
//!
//! ```text
//!  register(cb) ──▶ resolve_identity ──▶ SubscriptionMap[id]
//!                                          │ Inactive ──▶ dispatcher.add_listener
//!                                          │              active += 1 (0→1: arm)
//!                                          │ Active   ──▶ ignored
//!  remove(cb)   ──▶ resolve_identity ──▶ SubscriptionMap[id]
//!                                          │ Active   ──▶ handle.remove, Inactive
//!                                          │              active -= 1 (1→0: disarm)
//!                                          │ Inactive ──▶ no-op
//! ```

use crate::diagnostics::SharedListenerStats;
use crate::dispatcher::{EventDispatcher, Listener, Subscription};
use crate::error::ScreenStatusError;
use crate::platform::{CapabilityGate, Operation};
use crate::sensor::{NativeSensor, StatusEvent};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

/// Stable token for one registered callback, rendered as `L<n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// A value handed in from the host side of the bridge.
///
/// Only the `Function` variant can be registered. Anything else is rejected
/// with a logged diagnostic.
#[derive(Clone)]
pub enum HostValue {
    Function(Listener),
    Value(serde_json::Value),
}

impl HostValue {
    /// Wrap a closure as a fresh listener.
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&StatusEvent) + Send + Sync + 'static,
    {
        HostValue::Function(Arc::new(f))
    }

    pub fn as_listener(&self) -> Option<&Listener> {
        match self {
            HostValue::Function(listener) => Some(listener),
            HostValue::Value(_) => None,
        }
    }

    /// Host-side type name, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            HostValue::Function(_) => "function",
            HostValue::Value(serde_json::Value::Null) => "null",
            HostValue::Value(serde_json::Value::Bool(_)) => "boolean",
            HostValue::Value(serde_json::Value::Number(_)) => "number",
            HostValue::Value(serde_json::Value::String(_)) => "string",
            HostValue::Value(serde_json::Value::Array(_)) => "array",
            HostValue::Value(serde_json::Value::Object(_)) => "object",
        }
    }
}

impl fmt::Debug for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostValue::Function(listener) => {
                write!(f, "Function({:p})", Arc::as_ptr(listener) as *const ())
            }
            HostValue::Value(value) => f.debug_tuple("Value").field(value).finish(),
        }
    }
}

impl From<Listener> for HostValue {
    fn from(listener: Listener) -> Self {
        HostValue::Function(listener)
    }
}

impl From<&Listener> for HostValue {
    fn from(listener: &Listener) -> Self {
        HostValue::Function(Arc::clone(listener))
    }
}

impl From<serde_json::Value> for HostValue {
    fn from(value: serde_json::Value) -> Self {
        HostValue::Value(value)
    }
}

impl From<i32> for HostValue {
    fn from(value: i32) -> Self {
        HostValue::Value(value.into())
    }
}

impl From<f64> for HostValue {
    fn from(value: f64) -> Self {
        HostValue::Value(value.into())
    }
}

impl From<bool> for HostValue {
    fn from(value: bool) -> Self {
        HostValue::Value(value.into())
    }
}

impl From<&str> for HostValue {
    fn from(value: &str) -> Self {
        HostValue::Value(value.into())
    }
}

impl From<String> for HostValue {
    fn from(value: String) -> Self {
        HostValue::Value(value.into())
    }
}

/// Allocation address of a listener, vtable stripped.
fn listener_key(listener: &Listener) -> usize {
    Arc::as_ptr(listener) as *const () as usize
}

struct IdentityEntry {
    // Keeps the allocation, not the closure, so the address can't be reused.
    _pin: Weak<dyn Fn(&StatusEvent) + Send + Sync>,
    id: ListenerId,
}

enum SubscriptionSlot {
    Active(Box<dyn Subscription>),
    Inactive,
}

/// Owns the identity table, the subscription map and the active count.
///
/// Not internally synchronized; [`crate::ScreenStatusDetect`] keeps it behind
/// a single mutex so all three move together.
pub struct ListenerRegistry {
    event_name: String,
    dispatcher: Arc<dyn EventDispatcher>,
    sensor: Arc<dyn NativeSensor>,
    gate: CapabilityGate,
    stats: SharedListenerStats,
    identities: HashMap<usize, IdentityEntry>,
    next_id: u64,
    subscriptions: HashMap<ListenerId, SubscriptionSlot>,
    active: usize,
}

impl ListenerRegistry {
    pub fn new(
        event_name: impl Into<String>,
        dispatcher: Arc<dyn EventDispatcher>,
        sensor: Arc<dyn NativeSensor>,
        gate: CapabilityGate,
        stats: SharedListenerStats,
    ) -> Self {
        Self {
            event_name: event_name.into(),
            dispatcher,
            sensor,
            gate,
            stats,
            identities: HashMap::new(),
            next_id: 0,
            subscriptions: HashMap::new(),
            active: 0,
        }
    }

    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    /// Identity for `listener`, minting one on first sight.
    ///
    /// Identities are never reused and never forgotten.
    pub fn resolve_identity(&mut self, listener: &Listener) -> ListenerId {
        let key = listener_key(listener);
        if let Some(entry) = self.identities.get(&key) {
            return entry.id;
        }

        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.identities.insert(
            key,
            IdentityEntry {
                _pin: Arc::downgrade(listener),
                id,
            },
        );
        id
    }

    /// Identity previously assigned to `listener`, without minting one.
    pub fn identity_of(&self, listener: &Listener) -> Option<ListenerId> {
        self.identities.get(&listener_key(listener)).map(|e| e.id)
    }

    /// Activate `callback` on the shared channel.
    ///
    /// A callback that is already active is left alone: no second
    /// subscription, no second count.
    pub fn register(&mut self, callback: &HostValue) -> Result<ListenerId, ScreenStatusError> {
        let listener = self.accept(callback)?;
        let id = self.resolve_identity(&listener);

        if self.is_active(id) {
            tracing::debug!(listener = %id, "listener already active, ignoring");
            self.stats.record_duplicate_registration();
            return Ok(id);
        }

        let handle = self
            .dispatcher
            .add_listener(&self.event_name, self.delivering(listener));
        self.subscriptions.insert(id, SubscriptionSlot::Active(handle));
        self.active += 1;
        self.stats.record_registration();
        tracing::debug!(listener = %id, active = self.active, "listener registered");

        if self.active == 1 {
            self.arm();
        }
        Ok(id)
    }

    /// Deactivate `callback`. Returns whether anything was removed.
    pub fn remove(&mut self, callback: &HostValue) -> Result<bool, ScreenStatusError> {
        let listener = self.accept(callback)?;
        let id = self.resolve_identity(&listener);
        Ok(self.deactivate(id))
    }

    /// Deactivate by token. Unknown or inactive ids are a no-op.
    pub fn remove_by_id(&mut self, id: ListenerId) -> bool {
        self.deactivate(id)
    }

    pub fn is_active(&self, id: ListenerId) -> bool {
        matches!(self.subscriptions.get(&id), Some(SubscriptionSlot::Active(_)))
    }

    /// Whether `id` was ever subscribed, active or not.
    pub fn has_subscribed(&self, id: ListenerId) -> bool {
        self.subscriptions.contains_key(&id)
    }

    pub fn active_count(&self) -> usize {
        self.active
    }

    pub fn identity_count(&self) -> usize {
        self.identities.len()
    }

    /// Drop every active subscription, disarming the sensor if it was armed.
    ///
    /// Identities survive, so a callback registered again afterwards keeps
    /// its old id.
    pub fn shutdown(&mut self) {
        let mut active: Vec<ListenerId> = self
            .subscriptions
            .iter()
            .filter(|(_, slot)| matches!(slot, SubscriptionSlot::Active(_)))
            .map(|(id, _)| *id)
            .collect();
        active.sort();

        for id in active {
            self.deactivate(id);
        }
    }

    fn accept(&self, callback: &HostValue) -> Result<Listener, ScreenStatusError> {
        match callback.as_listener() {
            Some(listener) => Ok(Arc::clone(listener)),
            None => {
                tracing::error!(got = callback.type_name(), "callback is not a function");
                self.stats.record_rejected_callback();
                Err(ScreenStatusError::InvalidCallback(callback.type_name()))
            }
        }
    }

    /// Wrap `listener` so deliveries show up in the stats.
    fn delivering(&self, listener: Listener) -> Listener {
        let stats = Arc::clone(&self.stats);
        Arc::new(move |event: &StatusEvent| {
            stats.record_event_delivered();
            listener(event);
        })
    }

    fn deactivate(&mut self, id: ListenerId) -> bool {
        let Some(slot) = self.subscriptions.get_mut(&id) else {
            return false;
        };

        match std::mem::replace(slot, SubscriptionSlot::Inactive) {
            SubscriptionSlot::Active(mut handle) => {
                handle.remove();
                self.active = self.active.saturating_sub(1);
                self.stats.record_removal();
                tracing::debug!(listener = %id, active = self.active, "listener removed");

                if self.active == 0 {
                    self.disarm();
                }
                true
            }
            SubscriptionSlot::Inactive => false,
        }
    }

    fn arm(&self) {
        if self.gate.supports(Operation::Subscribe) {
            tracing::debug!("first listener, arming sensor");
            self.sensor.subscribe();
            self.stats.record_arm();
        }
    }

    fn disarm(&self) {
        if self.gate.supports(Operation::Unsubscribe) {
            tracing::debug!("last listener gone, disarming sensor");
            self.sensor.unsubscribe();
            self.stats.record_disarm();
        }
    }
}

impl Drop for ListenerRegistry {
    fn drop(&mut self) {
        self.shutdown();
    }
}
