/*!
 * Session Lifecycle Tests
 * End-to-end monitoring against the simulation source
 */

use avc_audit::avc::{FILE_OPEN, FILE_READ, FILE_WRITE};
use avc_audit::core::errors::AuditError;
use avc_audit::policy::{PolicyRule, PolicySnapshot};
use avc_audit::probe::{AvcEvent, Channel, ProbeError, SimulationSource};
use avc_audit::session::{AuditSession, SessionConfig, StopToken};
use avc_audit::{DebugLog, ObservationSource};
use std::time::Duration;

fn snapshot() -> PolicySnapshot {
    PolicySnapshot::build(
        "my_app_t",
        vec![
            PolicyRule::new("my_app_t", "tmp_t", "file", ["read", "write", "open"]),
            PolicyRule::new("my_app_t", "etc_t", "dir", ["search"]),
        ],
    )
}

fn event(pid: u32, requested: u32, granted: bool, channel: Channel) -> AvcEvent {
    AvcEvent {
        pid,
        comm: "my_app".into(),
        ssid: 1,
        tsid: 2,
        class: 6,
        requested,
        granted,
        channel,
        timestamp_ns: 0,
    }
}

fn test_config() -> SessionConfig {
    SessionConfig {
        poll_timeout: Duration::from_millis(10),
        // keep /proc rescans out of short-lived tests
        pid_rescan_interval: Duration::from_secs(3600),
        ..SessionConfig::default()
    }
}

#[tokio::test]
async fn test_session_end_to_end() {
    let (tx, rx) = flume::bounded(1024);
    let source = SimulationSource::new(tx);
    let handle = source.clone();

    let stop = StopToken::new();
    let session = AuditSession::new(
        snapshot(),
        source,
        rx,
        stop.clone(),
        DebugLog::disabled(),
    )
    .with_config(test_config());

    let task = tokio::spawn(session.run(vec![100]));

    // wait until the source is attached and accepting events
    let ev = event(100, FILE_READ | FILE_OPEN, true, Channel::Slow);
    while !handle.emit(ev.clone()) {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    // duplicate via the checkpoint channel, a denial, and a non-target pid
    assert!(handle.emit(event(100, FILE_READ, true, Channel::Fast)));
    assert!(handle.emit(event(100, FILE_WRITE, false, Channel::Slow)));
    assert!(!handle.emit(event(999, FILE_WRITE, true, Channel::Slow)));

    tokio::time::sleep(Duration::from_millis(50)).await;
    stop.interrupt();

    let report = task.await.unwrap().unwrap();

    // read+open used, write granted but only denied: partially used
    assert_eq!(report.partially_used.len(), 1);
    let partial = &report.partially_used[0];
    assert!(partial.used.contains("read"));
    assert!(partial.used.contains("open"));
    assert!(partial.unused.contains("write"));

    // the dir rule was never touched
    assert_eq!(report.completely_unused.len(), 1);
    assert_eq!(report.completely_unused[0].key.class, "dir");

    assert_eq!(report.stats.total_events, 3);
    assert_eq!(report.stats.slow_path, 2);
    assert_eq!(report.stats.fast_path, 1);
    assert_eq!(report.stats.denied_events, 1);
    assert_eq!(report.stats.by_class.get(&6), Some(&3));
}

#[tokio::test]
async fn test_session_fails_without_decision_path_hooks() {
    let (tx, rx) = flume::bounded(16);
    // every checkpoint attaches, both decision-path probes fail
    let source = SimulationSource::new(tx)
        .with_unavailable(&["avc_decision_entry", "avc_decision_ret"]);

    let session = AuditSession::new(
        snapshot(),
        source,
        rx,
        StopToken::new(),
        DebugLog::disabled(),
    )
    .with_config(test_config());

    let result = session.run(vec![100]).await;
    assert!(matches!(
        result,
        Err(AuditError::Probe(ProbeError::NoDecisionPath))
    ));
}

#[tokio::test]
async fn test_session_survives_single_hook_failure() {
    let (tx, rx) = flume::bounded(16);
    let source = SimulationSource::new(tx).with_unavailable(&["checkpoint_getattr"]);
    let handle = source.clone();

    let stop = StopToken::new();
    let session = AuditSession::new(
        snapshot(),
        source,
        rx,
        stop.clone(),
        DebugLog::disabled(),
    )
    .with_config(test_config());
    let task = tokio::spawn(session.run(vec![100]));

    let ev = event(100, FILE_READ, true, Channel::Slow);
    while !handle.emit(ev.clone()) {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    stop.interrupt();

    let report = task.await.unwrap().unwrap();
    assert_eq!(report.stats.total_events, 1);
}

#[tokio::test]
async fn test_queued_events_are_drained_after_stop() {
    let (tx, rx) = flume::bounded(1024);
    let mut source = SimulationSource::new(tx);
    let handle = source.clone();

    // attach directly so events can be queued before the consumer ever runs
    source.attach(&[100]).unwrap().ensure_viable().unwrap();
    for _ in 0..20 {
        assert!(handle.emit(event(100, FILE_READ, true, Channel::Fast)));
    }

    let stop = StopToken::new();
    stop.interrupt(); // stop already requested when the session starts

    let session = AuditSession::new(
        snapshot(),
        source,
        rx,
        stop,
        DebugLog::disabled(),
    )
    .with_config(test_config());

    let report = session.run(vec![100]).await.unwrap();
    // nothing arriving before the stop is lost
    assert_eq!(report.stats.total_events, 20);
}

#[tokio::test]
async fn test_forced_stop_abandons_drain() {
    let (tx, rx) = flume::bounded(1024);
    let mut source = SimulationSource::new(tx);
    let handle = source.clone();

    source.attach(&[100]).unwrap().ensure_viable().unwrap();
    for _ in 0..20 {
        handle.emit(event(100, FILE_READ, true, Channel::Fast));
    }

    let stop = StopToken::new();
    stop.interrupt();
    stop.interrupt(); // second interrupt: lossy report, immediately

    let session = AuditSession::new(
        snapshot(),
        source,
        rx,
        stop,
        DebugLog::disabled(),
    )
    .with_config(test_config());

    let report = session.run(vec![100]).await.unwrap();
    // the report still generates; queued events may be skipped
    assert!(report.stats.total_events <= 20);
}

#[tokio::test]
async fn test_late_target_pids_are_admitted() {
    let (tx, rx) = flume::bounded(1024);
    let source = SimulationSource::new(tx);
    let handle = source.clone();

    let stop = StopToken::new();
    let session = AuditSession::new(
        snapshot(),
        source,
        rx,
        stop.clone(),
        DebugLog::disabled(),
    )
    .with_config(test_config());
    let task = tokio::spawn(session.run(vec![100]));

    let ev = event(100, FILE_READ, true, Channel::Slow);
    while !handle.emit(ev.clone()) {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    // a process that appeared mid-session, admitted via the filter update
    assert!(!handle.emit(event(200, FILE_OPEN, true, Channel::Slow)));
    handle.add_target_pids(&[200]).unwrap();
    assert!(handle.emit(event(200, FILE_OPEN, true, Channel::Slow)));

    tokio::time::sleep(Duration::from_millis(50)).await;
    stop.interrupt();

    let report = task.await.unwrap().unwrap();
    assert_eq!(report.stats.total_events, 2);
}
