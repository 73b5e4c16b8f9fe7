/*!
 * Simulation Source
 * In-memory observation source for tests and unsupported platforms
 *
 * Mirrors the kernel-side behavior the Linux source relies on: the process
 * filter is applied at the point of production, and a full channel drops the
 * event rather than blocking the producer.
 */

use super::hooks::{catalog, AttachReport, HookOutcome, HookStatus};
use super::source::ObservationSource;
use super::types::{AvcEvent, ProbeResult};
use crate::core::types::Pid;
use ahash::RandomState;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

pub struct SimulationSource {
    sender: flume::Sender<AvcEvent>,
    targets: Arc<DashMap<Pid, (), RandomState>>,
    /// Program names that simulate an attachment failure.
    unavailable: HashSet<&'static str>,
    attached: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
}

impl SimulationSource {
    pub fn new(sender: flume::Sender<AvcEvent>) -> Self {
        Self {
            sender,
            targets: Arc::new(DashMap::with_hasher(RandomState::new())),
            unavailable: HashSet::new(),
            attached: Arc::new(AtomicBool::new(false)),
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Simulate hooks whose kernel symbol cannot be instrumented.
    pub fn with_unavailable(mut self, programs: &[&'static str]) -> Self {
        self.unavailable = programs.iter().copied().collect();
        self
    }

    /// Inject an event as the kernel side would: filtered by target PID at
    /// the point of production, dropped (and counted) when the channel is
    /// full. Returns whether the event was delivered.
    pub fn emit(&self, event: AvcEvent) -> bool {
        if !self.attached.load(Ordering::Relaxed) || !self.targets.contains_key(&event.pid) {
            return false;
        }
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }
}

// Clones share the filter, channel, and counters: a cloned handle can keep
// injecting events while the session owns the source itself.
impl Clone for SimulationSource {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            targets: Arc::clone(&self.targets),
            unavailable: self.unavailable.clone(),
            attached: Arc::clone(&self.attached),
            dropped: Arc::clone(&self.dropped),
        }
    }
}

impl ObservationSource for SimulationSource {
    fn attach(&mut self, target_pids: &[Pid]) -> ProbeResult<AttachReport> {
        let outcomes = catalog()
            .iter()
            .map(|spec| HookOutcome {
                spec: *spec,
                status: if self.unavailable.contains(spec.program) {
                    HookStatus::Skipped {
                        reason: format!("symbol {} not available", spec.symbol),
                    }
                } else {
                    HookStatus::Attached
                },
            })
            .collect();

        for &pid in target_pids {
            self.targets.insert(pid, ());
        }
        self.attached.store(true, Ordering::Relaxed);

        Ok(AttachReport::new(outcomes))
    }

    fn add_target_pids(&self, pids: &[Pid]) -> ProbeResult<()> {
        for &pid in pids {
            self.targets.insert(pid, ());
        }
        Ok(())
    }

    fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn detach(&mut self) {
        self.attached.store(false, Ordering::Relaxed);
    }
}
