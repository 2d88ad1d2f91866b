//! Named-channel event dispatcher.
//!
//! The registry binds listeners through the [`EventDispatcher`] trait and gets
//! back a disposable [`Subscription`] per bind. [`ChannelDispatcher`] is the
//! in-process implementation: `emit` calls every listener bound to a channel
//! synchronously, in bind order.

use crate::sensor::StatusEvent;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

/// Fixed channel the screen sensor publishes on.
pub const SCREEN_STATUS_CHANGE: &str = "screenStatusChange";

/// A callback attached to a channel.
pub type Listener = Arc<dyn Fn(&StatusEvent) + Send + Sync>;

/// Handle returned for every bind.
pub trait Subscription: Send {
    /// Detach the listener. Calling it again does nothing.
    ///
    /// Runs while the facade's registry lock is held, so it must not call
    /// back into the facade.
    fn remove(&mut self);
}

/// Publish/subscribe service keyed by channel name.
///
/// `add_listener` is called while the facade's registry lock is held. It must
/// not deliver to the new listener synchronously: a listener that adds or
/// removes listeners from inside that delivery would deadlock.
pub trait EventDispatcher: Send + Sync {
    fn add_listener(&self, event_name: &str, listener: Listener) -> Box<dyn Subscription>;
}

struct Binding {
    key: u64,
    listener: Listener,
}

#[derive(Default)]
struct Channels {
    next_key: u64,
    bindings: HashMap<String, Vec<Binding>>,
}

fn lock(channels: &Mutex<Channels>) -> MutexGuard<'_, Channels> {
    channels.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-process dispatcher. Cloning shares the same channels.
#[derive(Clone, Default)]
pub struct ChannelDispatcher {
    channels: Arc<Mutex<Channels>>,
}

impl ChannelDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `event` to every listener on `event_name`.
    ///
    /// Listeners run without the dispatcher lock held, so they may add or
    /// remove listeners themselves. Returns the number of listeners called.
    pub fn emit(&self, event_name: &str, event: &StatusEvent) -> usize {
        let listeners: Vec<Listener> = match lock(&self.channels).bindings.get(event_name) {
            Some(bound) => bound.iter().map(|b| Arc::clone(&b.listener)).collect(),
            None => return 0,
        };

        for listener in &listeners {
            listener(event);
        }
        listeners.len()
    }

    pub fn listener_count(&self, event_name: &str) -> usize {
        lock(&self.channels)
            .bindings
            .get(event_name)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Forward everything queued on `receiver` to `event_name`.
    ///
    /// Does not block. Returns the number of events forwarded.
    pub fn pump(&self, event_name: &str, receiver: &Receiver<StatusEvent>) -> usize {
        let mut forwarded = 0;
        while let Ok(event) = receiver.try_recv() {
            self.emit(event_name, &event);
            forwarded += 1;
        }
        forwarded
    }

    /// Wait up to `timeout` for one event and forward it.
    ///
    /// Returns `Ok(false)` on timeout and `Err` once every sender is gone.
    pub fn pump_timeout(
        &self,
        event_name: &str,
        receiver: &Receiver<StatusEvent>,
        timeout: Duration,
    ) -> Result<bool, RecvTimeoutError> {
        match receiver.recv_timeout(timeout) {
            Ok(event) => {
                self.emit(event_name, &event);
                Ok(true)
            }
            Err(RecvTimeoutError::Timeout) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

impl EventDispatcher for ChannelDispatcher {
    fn add_listener(&self, event_name: &str, listener: Listener) -> Box<dyn Subscription> {
        let mut channels = lock(&self.channels);
        channels.next_key += 1;
        let key = channels.next_key;
        channels
            .bindings
            .entry(event_name.to_string())
            .or_default()
            .push(Binding { key, listener });

        tracing::trace!(event_name, key, "listener bound");

        Box::new(ChannelSubscription {
            channels: Arc::downgrade(&self.channels),
            event_name: event_name.to_string(),
            key,
            active: true,
        })
    }
}

/// Handle for a [`ChannelDispatcher`] binding.
///
/// Holds only a weak reference, so an outstanding handle does not keep a
/// dropped dispatcher alive.
struct ChannelSubscription {
    channels: Weak<Mutex<Channels>>,
    event_name: String,
    key: u64,
    active: bool,
}

impl Subscription for ChannelSubscription {
    fn remove(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;

        let Some(channels) = self.channels.upgrade() else {
            return;
        };
        let mut channels = lock(&channels);
        if let Some(bound) = channels.bindings.get_mut(&self.event_name) {
            bound.retain(|b| b.key != self.key);
            if bound.is_empty() {
                channels.bindings.remove(&self.event_name);
            }
        }
        tracing::trace!(event_name = %self.event_name, key = self.key, "listener unbound");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::ScreenStatus;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_listener(counter: &Arc<AtomicUsize>) -> Listener {
        let counter = Arc::clone(counter);
        Arc::new(move |_event: &StatusEvent| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_emit_reaches_only_named_channel() {
        let dispatcher = ChannelDispatcher::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let _sub = dispatcher.add_listener(SCREEN_STATUS_CHANGE, counting_listener(&hits));

        let event = StatusEvent::new(ScreenStatus::ScreenMirroring);
        assert_eq!(dispatcher.emit(SCREEN_STATUS_CHANGE, &event), 1);
        assert_eq!(dispatcher.emit("somethingElse", &event), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let dispatcher = ChannelDispatcher::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let mut sub = dispatcher.add_listener(SCREEN_STATUS_CHANGE, counting_listener(&hits));
        let _other = dispatcher.add_listener(SCREEN_STATUS_CHANGE, counting_listener(&hits));
        assert_eq!(dispatcher.listener_count(SCREEN_STATUS_CHANGE), 2);

        sub.remove();
        sub.remove();
        assert_eq!(dispatcher.listener_count(SCREEN_STATUS_CHANGE), 1);

        dispatcher.emit(SCREEN_STATUS_CHANGE, &StatusEvent::new(ScreenStatus::ScreenNormal));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_listener_may_unbind_during_emit() {
        let dispatcher = ChannelDispatcher::new();
        let slot: Arc<Mutex<Option<Box<dyn Subscription>>>> = Arc::new(Mutex::new(None));

        let inner = Arc::clone(&slot);
        let listener: Listener = Arc::new(move |_event: &StatusEvent| {
            if let Some(mut sub) = inner.lock().unwrap().take() {
                sub.remove();
            }
        });
        *slot.lock().unwrap() = Some(dispatcher.add_listener(SCREEN_STATUS_CHANGE, listener));

        dispatcher.emit(SCREEN_STATUS_CHANGE, &StatusEvent::new(ScreenStatus::ScreenNormal));
        assert_eq!(dispatcher.listener_count(SCREEN_STATUS_CHANGE), 0);
    }

    #[test]
    fn test_pump_forwards_queued_events() {
        let dispatcher = ChannelDispatcher::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let _sub = dispatcher.add_listener(SCREEN_STATUS_CHANGE, counting_listener(&hits));

        let (tx, rx) = crossbeam_channel::unbounded();
        tx.send(StatusEvent::new(ScreenStatus::ScreenMirroring)).unwrap();
        tx.send(StatusEvent::new(ScreenStatus::ScreenNormal)).unwrap();

        assert_eq!(dispatcher.pump(SCREEN_STATUS_CHANGE, &rx), 2);
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        let waited = dispatcher.pump_timeout(SCREEN_STATUS_CHANGE, &rx, Duration::from_millis(10));
        assert_eq!(waited, Ok(false));

        drop(tx);
        assert!(dispatcher
            .pump_timeout(SCREEN_STATUS_CHANGE, &rx, Duration::from_millis(10))
            .is_err());
    }

    #[test]
    fn test_handle_outlives_dispatcher() {
        let dispatcher = ChannelDispatcher::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let mut sub = dispatcher.add_listener(SCREEN_STATUS_CHANGE, counting_listener(&hits));
        drop(dispatcher);
        sub.remove();
        sub.remove();
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
