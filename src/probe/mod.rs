/*!
 * Probe Module
 * Kernel observation points for access-control decisions
 *
 * Two hook families feed one event stream: decision-path probes on
 * `avc_has_perm` (the uncached slow path, authoritative for full permission
 * bitmasks) and checkpoint probes on per-operation security hooks, which fire
 * on every invocation and are the only way to see decisions served from the
 * AVC. The engine downstream never cares which family produced an event.
 */

mod hooks;
mod simulation;
mod source;
mod target;
mod types;

#[cfg(target_os = "linux")]
mod linux;

pub use hooks::{catalog, AttachReport, HookFamily, HookOutcome, HookSpec, HookStatus, ProbeKind};
pub use simulation::SimulationSource;
pub use source::ObservationSource;
pub use target::pids_for_context;
pub use types::{parse_wire_event, AvcEvent, Channel, ProbeError, ProbeResult, WIRE_EVENT_SIZE};

#[cfg(target_os = "linux")]
pub use linux::{LinuxAvcSource, ProbeConfig};
