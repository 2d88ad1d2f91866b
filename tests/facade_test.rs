//! Integration tests for the listener lifecycle and platform gating.

use screen_status_detect::sensor::{
    CertificateFingerprint, CertificateValue, SensorCall, SimulatedSensor,
};
use screen_status_detect::{
    Capability, ChannelDispatcher, HostValue, Listener, ListenerId, Platform, ScreenStatus,
    ScreenStatusDetect, StatusEvent, SCREEN_STATUS_CHANGE,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn setup(platform: Platform) -> (ScreenStatusDetect, ChannelDispatcher, Arc<SimulatedSensor>) {
    let sensor = Arc::new(SimulatedSensor::new());
    let dispatcher = ChannelDispatcher::new();
    let detect = ScreenStatusDetect::builder(sensor.clone())
        .platform(platform)
        .dispatcher(Arc::new(dispatcher.clone()))
        .build();
    (detect, dispatcher, sensor)
}

fn recording_listener(seen: &Arc<Mutex<Vec<ScreenStatus>>>) -> Listener {
    let seen = Arc::clone(seen);
    Arc::new(move |event: &StatusEvent| {
        seen.lock().unwrap().push(event.screen_status);
    })
}

fn noop_listener() -> Listener {
    Arc::new(|_event: &StatusEvent| {})
}

#[test]
fn test_register_remove_register_round_trip() {
    let (detect, dispatcher, _sensor) = setup(Platform::Android);
    let before = detect.active_listener_count();
    let cb = noop_listener();

    let first = detect.add_listener(cb.clone()).into_option().unwrap();
    assert_eq!(detect.remove_listener(cb.clone()).into_option(), Some(true));
    let second = detect.add_listener(cb.clone()).into_option().unwrap();

    assert_eq!(first, second);
    assert!(detect.is_listening(second));
    assert_eq!(detect.active_listener_count(), before + 1);
    assert_eq!(dispatcher.listener_count(SCREEN_STATUS_CHANGE), 1);
}

#[test]
fn test_idempotent_remove() {
    let (detect, _dispatcher, sensor) = setup(Platform::Android);
    let cb = noop_listener();

    assert_eq!(detect.remove_listener(cb.clone()).into_option(), Some(false));

    detect.add_listener(cb.clone());
    detect.remove_listener(cb.clone());
    assert_eq!(detect.remove_listener(cb).into_option(), Some(false));

    assert_eq!(detect.active_listener_count(), 0);
    assert_eq!(sensor.call_count(SensorCall::Unsubscribe), 1);
}

#[test]
fn test_duplicate_registration_delivers_once() {
    let (detect, dispatcher, _sensor) = setup(Platform::Android);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let cb = recording_listener(&seen);

    detect.add_listener(cb.clone());
    detect.add_listener(cb.clone());
    assert_eq!(detect.active_listener_count(), 1);

    dispatcher.emit(
        SCREEN_STATUS_CHANGE,
        &StatusEvent::new(ScreenStatus::ScreenMirroring),
    );
    assert_eq!(*seen.lock().unwrap(), vec![ScreenStatus::ScreenMirroring]);
    assert_eq!(detect.stats().stats().duplicate_registrations, 1);
}

#[test]
fn test_arm_disarm_edges() {
    let (detect, _dispatcher, sensor) = setup(Platform::Android);
    let a = noop_listener();
    let b = noop_listener();

    detect.add_listener(a.clone()); // 0 -> 1
    assert!(sensor.is_armed());
    detect.add_listener(b.clone()); // 1 -> 2
    detect.remove_listener(a); // 2 -> 1
    assert!(sensor.is_armed());
    assert_eq!(sensor.call_count(SensorCall::Subscribe), 1);
    assert_eq!(sensor.call_count(SensorCall::Unsubscribe), 0);

    detect.remove_listener(b); // 1 -> 0
    assert!(!sensor.is_armed());
    assert_eq!(sensor.call_count(SensorCall::Subscribe), 1);
    assert_eq!(sensor.call_count(SensorCall::Unsubscribe), 1);

    let stats = detect.stats().stats();
    assert_eq!(stats.arm_signals, 1);
    assert_eq!(stats.disarm_signals, 1);
}

#[test]
fn test_invalid_input_rejection() {
    let (detect, _dispatcher, sensor) = setup(Platform::Android);
    detect.add_listener(noop_listener());
    let before = detect.active_listener_count();

    let added = detect.add_listener(42);
    let removed = detect.remove_listener("x");

    assert!(added.error().is_some_and(|e| e.is_invalid_callback()));
    assert!(removed.error().is_some_and(|e| e.is_invalid_callback()));
    assert_eq!(detect.active_listener_count(), before);
    assert_eq!(sensor.call_count(SensorCall::Subscribe), 1);
    assert_eq!(detect.stats().stats().rejected_callbacks, 2);
}

#[test]
fn test_object_values_are_rejected() {
    let (detect, _dispatcher, _sensor) = setup(Platform::Android);
    let value = HostValue::from(serde_json::json!({ "onChange": true }));
    assert_eq!(value.type_name(), "object");
    assert!(detect.add_listener(value).is_failed());
}

#[tokio::test]
async fn test_platform_gating_skips_native_calls() {
    let (detect, _dispatcher, sensor) = setup(Platform::Ios);

    assert!(detect.enable_secure_screen().is_unsupported());
    assert!(detect.disable_secure_screen().is_unsupported());
    assert_eq!(detect.get_certificate_fingerprint().await.into_option(), None);
    assert!(detect.get_certificate_value().await.into_result().unwrap().is_none());
    assert!(detect.check_is_bluestacks().await.is_unsupported());

    assert!(sensor.calls().is_empty());
    assert!(!sensor.is_secure());
}

#[tokio::test]
async fn test_listeners_work_without_arm_signal() {
    let (detect, dispatcher, sensor) = setup(Platform::Ios);
    sensor.set_always_on(true);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let cb = recording_listener(&seen);

    assert!(detect.add_listener(cb.clone()).is_supported());
    sensor.push_status(ScreenStatus::VideoRecordingDetected);
    dispatcher.pump(SCREEN_STATUS_CHANGE, sensor.receiver());

    assert_eq!(*seen.lock().unwrap(), vec![ScreenStatus::VideoRecordingDetected]);
    assert!(sensor.calls().is_empty());
}

#[tokio::test]
async fn test_android_queries_reach_sensor() {
    let fingerprint = CertificateFingerprint::from_digests(&[0xde, 0xad], &[0x01], &[0xbe, 0xef]);
    let sensor = Arc::new(
        SimulatedSensor::new()
            .with_certificate(fingerprint.clone(), CertificateValue::from_signature_hashes([7])),
    );
    let detect = ScreenStatusDetect::builder(sensor.clone())
        .platform(Platform::Android)
        .build();

    assert_eq!(
        detect.get_certificate_fingerprint().await.into_option(),
        Some(fingerprint)
    );
    assert_eq!(
        detect
            .get_certificate_value()
            .await
            .into_option()
            .map(|v| v.certificate_hash),
        Some(7)
    );
    assert_eq!(detect.is_emulator().await.into_option(), Some(false));
    assert_eq!(
        sensor.calls(),
        vec![
            SensorCall::GetCertificateFingerprint,
            SensorCall::GetCertificateValue,
            SensorCall::IsEmulator
        ]
    );
}

#[tokio::test]
async fn test_native_failure_propagates() {
    let (detect, _dispatcher, sensor) = setup(Platform::Android);
    sensor.set_fail_queries(true);

    match detect.get_current_status().await {
        Capability::Failed(e) => assert!(e.to_string().contains("api level 17")),
        other => panic!("expected failure, got {other:?}"),
    }
}

#[test]
fn test_end_to_end_scripted_delivery() {
    let sensor = Arc::new(SimulatedSensor::with_script([
        ScreenStatus::ScreenMirroring,
        ScreenStatus::ScreenNormal,
        ScreenStatus::VideoRecordingDetected,
    ]));
    let dispatcher = ChannelDispatcher::new();
    let detect = ScreenStatusDetect::builder(sensor.clone())
        .platform(Platform::Android)
        .dispatcher(Arc::new(dispatcher.clone()))
        .build();

    // Not armed yet, so this change is not observed
    sensor.advance();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let cb = recording_listener(&seen);
    detect.add_listener(cb.clone());

    sensor.advance();
    dispatcher.pump(SCREEN_STATUS_CHANGE, sensor.receiver());

    detect.remove_listener(cb);
    sensor.advance();
    dispatcher.pump(SCREEN_STATUS_CHANGE, sensor.receiver());

    assert_eq!(*seen.lock().unwrap(), vec![ScreenStatus::ScreenNormal]);
    assert_eq!(detect.stats().stats().events_delivered, 1);
}

#[test]
fn test_callback_capturing_facade_does_not_leak() {
    let (detect, _dispatcher, sensor) = setup(Platform::Android);
    let detect = Arc::new(detect);

    let cb: Listener = {
        let detect = Arc::clone(&detect);
        Arc::new(move |_event: &StatusEvent| {
            detect.active_listener_count();
        })
    };
    detect.add_listener(cb.clone());
    detect.remove_listener(cb.clone());
    drop(cb);

    assert_eq!(Arc::strong_count(&detect), 1);
    drop(detect);
    assert!(!sensor.is_armed());
    assert_eq!(sensor.call_count(SensorCall::Unsubscribe), 1);
}

#[test]
fn test_listener_may_remove_itself_during_delivery() {
    let (detect, dispatcher, sensor) = setup(Platform::Android);
    let detect = Arc::new(detect);
    let own_id: Arc<Mutex<Option<ListenerId>>> = Arc::new(Mutex::new(None));
    let hits = Arc::new(AtomicUsize::new(0));

    let cb: Listener = {
        let detect = Arc::downgrade(&detect);
        let own_id = Arc::clone(&own_id);
        let hits = Arc::clone(&hits);
        Arc::new(move |_event: &StatusEvent| {
            hits.fetch_add(1, Ordering::SeqCst);
            let id = *own_id.lock().unwrap();
            if let (Some(detect), Some(id)) = (detect.upgrade(), id) {
                detect.remove_listener_by_id(id);
            }
        })
    };
    let id = detect.add_listener(cb).into_option().unwrap();
    *own_id.lock().unwrap() = Some(id);

    let event = StatusEvent::new(ScreenStatus::ScreenMirroring);
    dispatcher.emit(SCREEN_STATUS_CHANGE, &event);
    dispatcher.emit(SCREEN_STATUS_CHANGE, &event);

    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert!(!detect.is_listening(id));
    assert!(!sensor.is_armed());
}

#[test]
fn test_shared_across_threads() {
    let (detect, _dispatcher, sensor) = setup(Platform::Android);
    let detect = Arc::new(detect);
    let counter = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let detect = Arc::clone(&detect);
            let counter = Arc::clone(&counter);
            std::thread::spawn(move || {
                let cb: Listener = Arc::new(move |_event: &StatusEvent| {
                    counter.fetch_add(1, Ordering::SeqCst);
                });
                for _ in 0..50 {
                    detect.add_listener(cb.clone());
                    detect.remove_listener(cb.clone());
                }
                detect.add_listener(cb);
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(detect.active_listener_count(), 8);
    assert!(sensor.is_armed());
    assert_eq!(
        sensor.call_count(SensorCall::Subscribe),
        sensor.call_count(SensorCall::Unsubscribe) + 1
    );

    detect.shutdown();
    assert_eq!(detect.active_listener_count(), 0);
    assert!(!sensor.is_armed());
}
