/*!
 * Linux Observation Source
 * Real kernel instrumentation via aya kprobes and per-CPU perf buffers
 *
 * The eBPF programs themselves live in a prebuilt instrumentation object
 * loaded from disk; this module owns the userspace half of the contract:
 * program/map names, attach-or-skip bookkeeping, the kernel-side PID filter,
 * and the reader tasks that move wire records into the bounded channel.
 */

use super::hooks::{catalog, AttachReport, HookOutcome, HookStatus};
use super::source::ObservationSource;
use super::types::{parse_wire_event, AvcEvent, ProbeError, ProbeResult, WIRE_EVENT_SIZE};
use crate::core::limits::{BPF_OBJECT_ENV, DEFAULT_BPF_OBJECT_PATH, PERF_PAGES_PER_CPU, POLL_TIMEOUT};
use crate::core::types::Pid;
use aya::maps::perf::AsyncPerfEventArray;
use aya::maps::HashMap as BpfHashMap;
use aya::programs::KProbe;
use aya::util::online_cpus;
use aya::Bpf;
use bytes::BytesMut;
use nix::sys::resource::{setrlimit, Resource, RLIM_INFINITY};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Name of the perf event output map in the instrumentation object.
const EVENTS_MAP: &str = "EVENTS";

/// Name of the kernel-side PID filter map.
const TARGET_PIDS_MAP: &str = "TARGET_PIDS";

/// Scratch buffers handed to each perf read.
const READ_BUFFERS: usize = 16;

/// Linux source configuration.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Path of the prebuilt instrumentation object.
    pub object_path: PathBuf,
}

impl ProbeConfig {
    /// Resolve the object path: CLI override, then `AVC_AUDIT_BPF_OBJECT`,
    /// then the install default.
    pub fn resolve(override_path: Option<PathBuf>) -> Self {
        let object_path = override_path
            .or_else(|| std::env::var_os(BPF_OBJECT_ENV).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BPF_OBJECT_PATH));
        Self { object_path }
    }
}

pub struct LinuxAvcSource {
    config: ProbeConfig,
    sender: flume::Sender<AvcEvent>,
    bpf: Mutex<Option<Bpf>>,
    stop: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
}

impl LinuxAvcSource {
    pub fn new(config: ProbeConfig, sender: flume::Sender<AvcEvent>) -> Self {
        Self {
            config,
            sender,
            bpf: Mutex::new(None),
            stop: Arc::new(AtomicBool::new(false)),
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    fn attach_hook(bpf: &mut Bpf, program: &'static str, symbol: &'static str) -> HookStatus {
        let Some(prog) = bpf.program_mut(program) else {
            return HookStatus::Skipped {
                reason: format!("program {program} not present in instrumentation object"),
            };
        };
        let kprobe: &mut KProbe = match prog.try_into() {
            Ok(p) => p,
            Err(e) => {
                return HookStatus::Skipped {
                    reason: format!("{program} is not a kprobe program: {e}"),
                }
            }
        };
        if let Err(e) = kprobe.load() {
            return HookStatus::Skipped {
                reason: format!("load failed: {e}"),
            };
        }
        match kprobe.attach(symbol, 0) {
            Ok(_) => HookStatus::Attached,
            Err(e) => HookStatus::Skipped {
                reason: format!("attach to {symbol} failed: {e}"),
            },
        }
    }

    fn seed_targets(bpf: &mut Bpf, pids: &[Pid]) -> ProbeResult<()> {
        let map = bpf
            .map_mut(TARGET_PIDS_MAP)
            .ok_or(ProbeError::MapMissing { name: TARGET_PIDS_MAP })?;
        let mut targets: BpfHashMap<_, u32, u8> =
            BpfHashMap::try_from(map).map_err(|e| ProbeError::MapError {
                reason: e.to_string(),
            })?;
        for &pid in pids {
            targets.insert(pid, 1, 0).map_err(|e| ProbeError::MapError {
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }

    fn spawn_readers(&self, bpf: &mut Bpf) -> ProbeResult<()> {
        let map = bpf
            .take_map(EVENTS_MAP)
            .ok_or(ProbeError::MapMissing { name: EVENTS_MAP })?;
        let mut events = AsyncPerfEventArray::try_from(map).map_err(|e| ProbeError::MapError {
            reason: e.to_string(),
        })?;
        let cpus = online_cpus().map_err(|e| ProbeError::MapError {
            reason: format!("cannot enumerate online cpus: {e}"),
        })?;

        for cpu in cpus {
            let mut buf = events
                .open(cpu, Some(PERF_PAGES_PER_CPU))
                .map_err(|e| ProbeError::MapError {
                    reason: format!("cannot open perf buffer for cpu {cpu}: {e}"),
                })?;
            let sender = self.sender.clone();
            let stop = Arc::clone(&self.stop);
            let dropped = Arc::clone(&self.dropped);

            tokio::spawn(async move {
                let mut buffers = (0..READ_BUFFERS)
                    .map(|_| BytesMut::with_capacity(WIRE_EVENT_SIZE * 4))
                    .collect::<Vec<_>>();

                while !stop.load(Ordering::Relaxed) {
                    // bounded wait so a stop request is observed promptly
                    let read = match tokio::time::timeout(POLL_TIMEOUT, buf.read_events(&mut buffers)).await
                    {
                        Err(_) => continue,
                        Ok(Err(e)) => {
                            warn!(cpu, error = %e, "perf buffer read failed, reader exiting");
                            break;
                        }
                        Ok(Ok(read)) => read,
                    };

                    if read.lost > 0 {
                        dropped.fetch_add(read.lost as u64, Ordering::Relaxed);
                    }
                    for record in buffers.iter_mut().take(read.read) {
                        match parse_wire_event(record) {
                            Some(event) => {
                                if sender.try_send(event).is_err() {
                                    dropped.fetch_add(1, Ordering::Relaxed);
                                }
                            }
                            // short record: count it with the losses
                            None => {
                                dropped.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                    }
                }
                debug!(cpu, "perf reader stopped");
            });
        }
        Ok(())
    }
}

impl ObservationSource for LinuxAvcSource {
    fn attach(&mut self, target_pids: &[Pid]) -> ProbeResult<AttachReport> {
        // Older kernels account perf/BPF memory against RLIMIT_MEMLOCK.
        if let Err(e) = setrlimit(Resource::RLIMIT_MEMLOCK, RLIM_INFINITY, RLIM_INFINITY) {
            debug!(error = %e, "could not raise RLIMIT_MEMLOCK");
        }

        info!(object = %self.config.object_path.display(), "loading instrumentation object");
        let mut bpf = Bpf::load_file(&self.config.object_path).map_err(|e| ProbeError::LoadFailed {
            reason: format!("{}: {e}", self.config.object_path.display()),
        })?;

        let mut outcomes = Vec::with_capacity(catalog().len());
        for spec in catalog() {
            let status = Self::attach_hook(&mut bpf, spec.program, spec.symbol);
            match &status {
                HookStatus::Attached => {
                    info!(hook = spec.program, symbol = spec.symbol, "hook attached")
                }
                HookStatus::Skipped { reason } => {
                    warn!(hook = spec.program, symbol = spec.symbol, %reason, "hook skipped")
                }
            }
            outcomes.push(HookOutcome {
                spec: *spec,
                status,
            });
        }

        Self::seed_targets(&mut bpf, target_pids)?;
        self.spawn_readers(&mut bpf)?;
        *self.bpf.lock() = Some(bpf);

        Ok(AttachReport::new(outcomes))
    }

    fn add_target_pids(&self, pids: &[Pid]) -> ProbeResult<()> {
        let mut guard = self.bpf.lock();
        match guard.as_mut() {
            Some(bpf) => Self::seed_targets(bpf, pids),
            None => Ok(()),
        }
    }

    fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn detach(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        // dropping the Bpf handle detaches every attached program
        *self.bpf.lock() = None;
    }
}
