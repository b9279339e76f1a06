use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use tm_bridge::inspector::{Button, Probe};
use tm_bridge::{
    BridgeEngine, BridgeError, Competition, EngineConfig, FieldsetState, Inspector, SimulatedFieldset,
    SimulatedInspector, Snapshot, SnapshotEvent, SnapshotStream,
};

const TITLE: &str = "Match Field Set #1";

fn fast_config() -> EngineConfig {
    EngineConfig {
        poll_interval_ms: 1,
        reconnect_backoff_ms: 5,
        ..EngineConfig::default()
    }
}

fn setup() -> (Arc<SimulatedFieldset>, Arc<BridgeEngine>) {
    let inspector = Arc::new(SimulatedInspector::new());
    let target = inspector.add_fieldset(TITLE, Competition::V5rc);
    let engine = BridgeEngine::new(Competition::V5rc, inspector as Arc<dyn Inspector>, fast_config());
    (target, Arc::new(engine))
}

fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    cond()
}

fn next_matching(stream: &SnapshotStream, pred: impl Fn(&SnapshotEvent) -> bool) -> SnapshotEvent {
    loop {
        let event = stream.recv_timeout(Duration::from_secs(5)).unwrap();
        if pred(&event) {
            return event;
        }
    }
}

#[test]
fn engine_concurrent_lookups_share_one_handle_and_one_monitor() {
    let (target, engine) = setup();
    engine.start().unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || engine.get_fieldset(TITLE).unwrap())
        })
        .collect();
    let fieldsets: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    for fieldset in &fieldsets[1..] {
        assert!(Arc::ptr_eq(&fieldsets[0], fieldset));
    }
    assert_eq!(engine.monitor_count(), 1);
    assert_eq!(target.connect_attempts(), 1);
    engine.stop();
}

#[test]
fn engine_lookups_fail_while_stopped() {
    let (_target, engine) = setup();
    assert!(matches!(engine.get_fieldset(TITLE), Err(BridgeError::NotRunning)));

    engine.start().unwrap();
    engine.get_fieldset(TITLE).unwrap();
    engine.stop();
    assert!(matches!(engine.get_fieldset(TITLE), Err(BridgeError::NotRunning)));
}

#[test]
fn engine_restart_keeps_handles_and_resumes_polling() {
    let (target, engine) = setup();
    engine.start().unwrap();
    let fieldset = engine.get_fieldset(TITLE).unwrap();
    assert!(wait_until(|| fieldset.latest_snapshot().is_some()));
    engine.stop();
    assert_eq!(engine.monitor_count(), 0);

    target.update(|s| s.state = FieldsetState::Prestart);
    engine.start().unwrap();
    assert!(Arc::ptr_eq(&fieldset, &engine.get_fieldset(TITLE).unwrap()));
    assert!(wait_until(|| {
        fieldset
            .latest_snapshot()
            .is_some_and(|s| s.match_state == FieldsetState::Prestart)
    }));
    engine.stop();
}

#[test]
fn engine_start_is_gated_on_match_state() {
    let (target, engine) = setup();
    engine.start().unwrap();
    let fieldset = engine.get_fieldset(TITLE).unwrap();

    target.update(|s| s.state = FieldsetState::DriverControl);
    let err = fieldset.start_match().unwrap_err();
    assert!(err.is_invalid_state());
    assert_eq!(target.probe_count(Probe::Click(Button::StartMatch)), 0);

    target.update(|s| s.state = FieldsetState::Disabled);
    fieldset.start_match().unwrap();
    assert!(wait_until(|| {
        fieldset
            .latest_snapshot()
            .is_some_and(|s| s.match_state == FieldsetState::Autonomous && s.match_time == 15)
    }));
    engine.stop();
}

#[test]
fn engine_monitor_recovers_after_dialog_reopens() {
    let (target, engine) = setup();
    engine.start().unwrap();
    let fieldset = engine.get_fieldset(TITLE).unwrap();
    let stream = fieldset.stream();
    assert!(wait_until(|| fieldset.latest_snapshot().is_some()));

    target.set_online(false);
    assert!(wait_until(|| !fieldset.is_connected()));
    let attempts = target.connect_attempts();
    assert!(wait_until(|| target.connect_attempts() > attempts));

    target.update(|s| {
        s.online = true;
        s.state = FieldsetState::Prestart;
        s.timer = Some("15".to_string());
    });
    let event = next_matching(&stream, |e| e.snapshot.match_state == FieldsetState::Prestart);
    assert_eq!(event.title, TITLE);
    assert_eq!(event.snapshot.prestart_time, 15);
    assert!(fieldset.is_connected());
    assert_eq!(engine.monitor_count(), 1);
    engine.stop();
}

#[test]
fn engine_drop_stops_monitors() {
    let (target, engine) = setup();
    engine.start().unwrap();
    let fieldset = engine.get_fieldset(TITLE).unwrap();
    assert!(wait_until(|| fieldset.latest_snapshot().is_some()));
    drop(engine);

    let before = target.total_probes();
    thread::sleep(Duration::from_millis(30));
    assert_eq!(target.total_probes(), before);
}

#[test]
fn engine_restart_does_not_renotify_unchanged_dialog() {
    let (_target, engine) = setup();
    engine.start().unwrap();
    let fieldset = engine.get_fieldset(TITLE).unwrap();
    let calls = Arc::new(Mutex::new(0_usize));
    let sink = Arc::clone(&calls);
    fieldset.subscribe(Arc::new(move |_: &Arc<Snapshot>| *sink.lock().unwrap() += 1));
    assert!(wait_until(|| *calls.lock().unwrap() >= 1));

    engine.stop();
    let heard = *calls.lock().unwrap();
    engine.start().unwrap();
    assert_eq!(engine.monitor_count(), 1);
    thread::sleep(Duration::from_millis(80));
    assert_eq!(*calls.lock().unwrap(), heard);
    engine.stop();
}
