/*!
 * Audit Session
 * Monitoring lifecycle: attach, poll, cooperative stop, drain, report
 *
 * The session is an explicit state machine threaded through the pipeline;
 * the interrupt handler only bumps a counter on the shared stop token and
 * never touches session state directly.
 */

use super::accumulator::{SessionStats, UsageAccumulator};
use super::report::UsageReport;
use crate::core::limits::{
    DEBUG_LOG_SAMPLE_EVENTS, DRAIN_DEADLINE, DRAIN_MAX_EVENTS, PID_RESCAN_INTERVAL,
    POLL_TIMEOUT, PROGRESS_LOG_INTERVAL,
};
use crate::core::types::{AuditResult, Pid};
use crate::monitoring::DebugLog;
use crate::policy::PolicySnapshot;
use crate::probe::{pids_for_context, AvcEvent, ObservationSource};
use serde_json::json;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Session lifecycle phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Init,
    AttachingHooks,
    Monitoring,
    Stopping,
    Reporting,
    Done,
}

/// Shared cancellation token. The first interrupt requests a cooperative
/// stop; a second one forces immediate (possibly lossy) report generation.
#[derive(Debug, Clone, Default)]
pub struct StopToken {
    interrupts: Arc<AtomicU32>,
}

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one interrupt; returns how many have been seen.
    pub fn interrupt(&self) -> u32 {
        self.interrupts.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// A stop has been requested.
    pub fn requested(&self) -> bool {
        self.interrupts.load(Ordering::SeqCst) > 0
    }

    /// A second interrupt demanded an immediate report.
    pub fn forced(&self) -> bool {
        self.interrupts.load(Ordering::SeqCst) > 1
    }
}

/// Session tunables. Defaults come from [`crate::core::limits`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub poll_timeout: Duration,
    pub pid_rescan_interval: Duration,
    pub drain_max_events: usize,
    pub drain_deadline: Duration,
    pub progress_interval: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_timeout: POLL_TIMEOUT,
            pid_rescan_interval: PID_RESCAN_INTERVAL,
            drain_max_events: DRAIN_MAX_EVENTS,
            drain_deadline: DRAIN_DEADLINE,
            progress_interval: PROGRESS_LOG_INTERVAL,
        }
    }
}

/// One monitoring session: owns the source, the consumer loop, and all
/// mutable session state. The consumer loop is the only writer of the
/// accumulator and statistics, so neither needs locking.
pub struct AuditSession<S: ObservationSource> {
    snapshot: PolicySnapshot,
    source: S,
    receiver: flume::Receiver<AvcEvent>,
    stop: StopToken,
    config: SessionConfig,
    debug_log: DebugLog,
    phase: SessionPhase,
    accumulator: UsageAccumulator,
    stats: SessionStats,
    seen_pids: HashSet<Pid>,
    sampled: u64,
}

impl<S: ObservationSource> AuditSession<S> {
    pub fn new(
        snapshot: PolicySnapshot,
        source: S,
        receiver: flume::Receiver<AvcEvent>,
        stop: StopToken,
        debug_log: DebugLog,
    ) -> Self {
        Self {
            snapshot,
            source,
            receiver,
            stop,
            config: SessionConfig::default(),
            debug_log,
            phase: SessionPhase::Init,
            accumulator: UsageAccumulator::new(),
            stats: SessionStats::default(),
            seen_pids: HashSet::new(),
            sampled: 0,
        }
    }

    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Run the session to completion: attach hooks, monitor until the stop
    /// token fires, drain, and build the report.
    pub async fn run(mut self, initial_pids: Vec<Pid>) -> AuditResult<UsageReport> {
        self.phase = SessionPhase::AttachingHooks;
        let attach = self.source.attach(&initial_pids)?;
        for outcome in attach.outcomes() {
            self.debug_log.record(
                "hook attachment",
                json!({
                    "program": outcome.spec.program,
                    "symbol": outcome.spec.symbol,
                    "status": &outcome.status,
                }),
            );
        }
        info!(
            attached = attach.attached_count(),
            total = attach.outcomes().len(),
            "hook attachment complete"
        );
        // checkpoint hooks alone cannot substitute for the decision path
        attach.ensure_viable()?;
        self.seen_pids.extend(initial_pids);

        self.phase = SessionPhase::Monitoring;
        info!(subject = self.snapshot.subject(), "monitoring active");
        let mut last_rescan = Instant::now();

        while !self.stop.requested() {
            let polled =
                tokio::time::timeout(self.config.poll_timeout, self.receiver.recv_async()).await;
            match polled {
                Ok(Ok(event)) => self.consume(event),
                // all producers gone; nothing more will arrive
                Ok(Err(_)) => break,
                Err(_) => {}
            }

            if last_rescan.elapsed() >= self.config.pid_rescan_interval {
                last_rescan = Instant::now();
                self.rescan_targets();
            }
        }

        self.phase = SessionPhase::Stopping;
        info!("stop requested, draining queued events");
        self.source.detach();
        self.drain();

        self.phase = SessionPhase::Reporting;
        self.stats.dropped_events = self.source.dropped_events();
        let report = UsageReport::build(&self.snapshot, &self.accumulator, self.stats.clone());
        self.debug_log.record(
            "session summary",
            json!({
                "subject": &report.subject,
                "total_events": report.stats.total_events,
                "rules": report.total_rules(),
                "used_permissions": self.accumulator.used_permission_count(),
            }),
        );

        self.phase = SessionPhase::Done;
        Ok(report)
    }

    fn consume(&mut self, event: AvcEvent) {
        if self.sampled < DEBUG_LOG_SAMPLE_EVENTS {
            self.sampled += 1;
            self.debug_log.record(
                "sampled event",
                json!({
                    "pid": event.pid,
                    "comm": &event.comm,
                    "tclass": event.class,
                    "requested": format!("0x{:08x}", event.requested),
                    "granted": event.granted,
                    "channel": event.channel,
                }),
            );
        }

        let diag = self
            .accumulator
            .fold(&self.snapshot, &mut self.stats, &event);
        if !diag.is_clean() {
            self.debug_log.record(
                "decode failure",
                json!({
                    "tclass": event.class,
                    "requested": format!("0x{:08x}", event.requested),
                    "unknown_class": diag.unknown_class,
                    "residual": format!("0x{:x}", diag.residual),
                }),
            );
        }

        if self.stats.total_events % self.config.progress_interval == 0 {
            debug!(
                captured = self.stats.total_events,
                "capture progress"
            );
        }
    }

    /// Finite drain of already-queued events. Bounded by count, deadline, and
    /// the forced-stop escape hatch; never re-arms monitoring and emits no
    /// partial report.
    fn drain(&mut self) {
        let deadline = Instant::now() + self.config.drain_deadline;
        let mut drained = 0usize;

        while drained < self.config.drain_max_events && Instant::now() < deadline {
            if self.stop.forced() {
                warn!(drained, "second interrupt, abandoning drain");
                break;
            }
            match self.receiver.try_recv() {
                Ok(event) => {
                    self.consume(event);
                    drained += 1;
                }
                Err(_) => break,
            }
        }
        debug!(drained, "drain complete");
    }

    /// Pick up processes that started under the audited context after the
    /// session began and extend the kernel-side filter.
    fn rescan_targets(&mut self) {
        let current = pids_for_context(self.snapshot.subject());
        let new: Vec<Pid> = current
            .into_iter()
            .filter(|pid| !self.seen_pids.contains(pid))
            .collect();
        if new.is_empty() {
            return;
        }
        info!(pids = ?new, "new target processes discovered");
        if let Err(e) = self.source.add_target_pids(&new) {
            warn!(error = %e, "could not extend target filter");
        }
        self.seen_pids.extend(new);
    }
}
