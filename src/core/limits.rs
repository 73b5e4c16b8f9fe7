/*!
 * Limits and Constants
 *
 * Centralized location for session-wide limits, intervals, and default paths.
 */

use std::time::Duration;

// =============================================================================
// EVENT PIPELINE
// =============================================================================

/// Capacity of the bounded user-space event channel.
/// When full, producers drop events and count them instead of blocking the
/// audited workload.
pub const EVENT_CHANNEL_CAPACITY: usize = 8192;

/// Perf ring-buffer size per CPU, in pages.
pub const PERF_PAGES_PER_CPU: usize = 64;

/// Consumer poll timeout. Bounds every blocking wait so a stop request is
/// observed promptly.
pub const POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// Upper bound on events consumed during the STOPPING drain. The drain only
/// empties what is already queued; it never re-arms monitoring.
pub const DRAIN_MAX_EVENTS: usize = EVENT_CHANNEL_CAPACITY;

/// Wall-clock bound on the STOPPING drain.
pub const DRAIN_DEADLINE: Duration = Duration::from_secs(2);

// =============================================================================
// TARGET DISCOVERY
// =============================================================================

/// Interval between /proc rescans for new processes under the audited context.
pub const PID_RESCAN_INTERVAL: Duration = Duration::from_secs(5);

/// Progress is logged every this many captured events.
pub const PROGRESS_LOG_INTERVAL: u64 = 10;

// =============================================================================
// DIAGNOSTICS
// =============================================================================

/// Number of raw events sampled into the debug log at the start of a session.
pub const DEBUG_LOG_SAMPLE_EVENTS: u64 = 5;

/// Default path of the append-only debug log.
pub const DEFAULT_DEBUG_LOG_PATH: &str = "/tmp/avc_audit_debug.log";

/// Default install location of the instrumentation object, overridable via
/// `AVC_AUDIT_BPF_OBJECT` or `--bpf-object`.
pub const DEFAULT_BPF_OBJECT_PATH: &str = "/usr/lib/avc-audit/avc_probe.bpf.o";

/// Environment variable overriding the instrumentation object path.
pub const BPF_OBJECT_ENV: &str = "AVC_AUDIT_BPF_OBJECT";
