/*!
 * Classification and Report Tests
 */

use avc_audit::avc::{FILE_EXECUTE, FILE_GETATTR, FILE_OPEN, FILE_READ};
use avc_audit::policy::{PolicyRule, PolicySnapshot};
use avc_audit::probe::{AvcEvent, Channel};
use avc_audit::session::{SessionStats, UsageAccumulator, UsageReport};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn event(class: u16, requested: u32, granted: bool, channel: Channel) -> AvcEvent {
    AvcEvent {
        pid: 100,
        comm: "my_app".into(),
        ssid: 1,
        tsid: 2,
        class,
        requested,
        granted,
        channel,
        timestamp_ns: 0,
    }
}

fn build_report(snapshot: &PolicySnapshot, events: &[AvcEvent]) -> UsageReport {
    let mut accumulator = UsageAccumulator::new();
    let mut stats = SessionStats::default();
    for ev in events {
        accumulator.fold(snapshot, &mut stats, ev);
    }
    UsageReport::build(snapshot, &accumulator, stats)
}

#[test]
fn test_never_observed_rule_is_completely_unused() {
    let snapshot = PolicySnapshot::build(
        "my_app_t",
        vec![PolicyRule::new(
            "my_app_t",
            "tmp_t",
            "file",
            ["read", "write", "create", "unlink"],
        )],
    );

    let report = build_report(&snapshot, &[]);
    assert_eq!(report.completely_unused.len(), 1);
    assert!(report.partially_used.is_empty());
    assert!(report.fully_used.is_empty());
}

#[test]
fn test_exact_usage_is_fully_used() {
    let events = [
        event(6, FILE_READ | FILE_OPEN, true, Channel::Fast),
        event(6, FILE_GETATTR, true, Channel::Fast),
        event(6, FILE_EXECUTE, true, Channel::Slow),
    ];

    let snapshot = PolicySnapshot::build(
        "my_app_t",
        vec![PolicyRule::new(
            "my_app_t",
            "bin_t",
            "file",
            ["read", "open", "getattr", "execute"],
        )],
    );
    let report = build_report(&snapshot, &events);
    assert_eq!(report.fully_used.len(), 1);
    assert!(report.partially_used.is_empty());
    assert!(report.completely_unused.is_empty());

    // one extra granted permission and the same usage is only partial
    let wider = PolicySnapshot::build(
        "my_app_t",
        vec![PolicyRule::new(
            "my_app_t",
            "bin_t",
            "file",
            ["read", "open", "getattr", "execute", "map"],
        )],
    );
    let report = build_report(&wider, &events);
    assert_eq!(report.partially_used.len(), 1);
    assert!(report.partially_used[0].unused.contains("map"));
}

#[test]
fn test_partial_usage_reports_both_complements() {
    let snapshot = PolicySnapshot::build(
        "my_app_t",
        vec![PolicyRule::new(
            "my_app_t",
            "var_t",
            "file",
            ["getattr", "open", "read", "append", "create", "unlink", "write"],
        )],
    );

    let report = build_report(
        &snapshot,
        &[event(6, FILE_GETATTR | FILE_OPEN | FILE_READ, true, Channel::Slow)],
    );

    assert_eq!(report.partially_used.len(), 1);
    let partial = &report.partially_used[0];
    let used: Vec<_> = partial.used.iter().map(String::as_str).collect();
    let unused: Vec<_> = partial.unused.iter().map(String::as_str).collect();
    assert_eq!(used, vec!["getattr", "open", "read"]);
    assert_eq!(unused, vec!["append", "create", "unlink", "write"]);

    // used and unused partition the granted set
    let granted = &partial.rule.permissions;
    let union: std::collections::BTreeSet<_> = partial.used.union(&partial.unused).collect();
    assert_eq!(union.len(), granted.len());
    assert!(partial.used.intersection(&partial.unused).next().is_none());
}

#[test]
fn test_duplicate_events_do_not_change_classification() {
    let snapshot = PolicySnapshot::build(
        "my_app_t",
        vec![PolicyRule::new("my_app_t", "tmp_t", "file", ["read", "write"])],
    );

    // same access seen on the decision path and again via a checkpoint
    let once = build_report(&snapshot, &[event(6, FILE_READ, true, Channel::Slow)]);
    let twice = build_report(
        &snapshot,
        &[
            event(6, FILE_READ, true, Channel::Slow),
            event(6, FILE_READ, true, Channel::Fast),
        ],
    );

    assert_eq!(
        serde_json::to_value(&once.partially_used).unwrap(),
        serde_json::to_value(&twice.partially_used).unwrap()
    );
}

#[test]
fn test_denied_events_do_not_count_as_usage() {
    let snapshot = PolicySnapshot::build(
        "my_app_t",
        vec![PolicyRule::new("my_app_t", "shadow_t", "file", ["read"])],
    );

    let report = build_report(&snapshot, &[event(6, FILE_READ, false, Channel::Slow)]);
    assert_eq!(report.completely_unused.len(), 1);
    assert_eq!(report.stats.denied_events, 1);
}

#[test]
fn test_empty_snapshot_surfaces_orphans() {
    let snapshot = PolicySnapshot::build("my_app_t", Vec::new());
    let report = build_report(&snapshot, &[event(6, FILE_READ, true, Channel::Slow)]);

    assert_eq!(report.total_rules(), 0);
    assert!(report.orphans.get("file").unwrap().contains("read"));
}

#[test]
fn test_unknown_class_event_is_survivable_and_distinct() {
    let snapshot = PolicySnapshot::build(
        "my_app_t",
        vec![PolicyRule::new("my_app_t", "tmp_t", "file", ["read"])],
    );

    let report = build_report(
        &snapshot,
        &[
            event(77, FILE_READ, true, Channel::Slow),
            event(6, FILE_READ, true, Channel::Slow),
        ],
    );

    // the valid event still classified, the unknown one is diagnosed
    assert_eq!(report.fully_used.len(), 1);
    assert_eq!(report.stats.unknown_classes, 1);
    assert!(report.orphans.contains_key("class_77"));
}

fn permutation_fixture() -> (PolicySnapshot, Vec<AvcEvent>) {
    let snapshot = PolicySnapshot::build(
        "my_app_t",
        vec![
            PolicyRule::new("my_app_t", "tmp_t", "file", ["read", "write", "open"]),
            PolicyRule::new("my_app_t", "etc_t", "file", ["getattr", "read"]),
            PolicyRule::new("my_app_t", "var_t", "dir", ["search"]),
        ],
    );
    let events = vec![
        event(6, FILE_READ | FILE_OPEN, true, Channel::Slow),
        event(6, FILE_GETATTR, true, Channel::Fast),
        event(6, FILE_READ, true, Channel::Fast),
        event(7, 0x20000, true, Channel::Slow), // dir search
        event(6, 0x4, false, Channel::Slow),    // denied write
        event(42, FILE_READ, true, Channel::Slow), // unknown class
    ];
    (snapshot, events)
}

proptest! {
    #[test]
    fn test_report_is_order_invariant(
        order in Just((0..6usize).collect::<Vec<_>>()).prop_shuffle()
    ) {
        let (snapshot, events) = permutation_fixture();
        let baseline = build_report(&snapshot, &events);

        let permuted: Vec<AvcEvent> = order.iter().map(|&i| events[i].clone()).collect();
        let report = build_report(&snapshot, &permuted);

        prop_assert_eq!(
            serde_json::to_value(&baseline).unwrap(),
            serde_json::to_value(&report).unwrap()
        );
    }
}
