/*!
 * Probe Types
 * Raw decision events and the wire contract with the instrumentation object
 */

use crate::core::types::{AccessVector, ClassId, Pid, SecurityId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Probe errors. Everything here is fatal to session start; per-hook
/// attachment failures are bookkept in [`super::AttachReport`] instead.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("failed to load instrumentation object: {reason}")]
    LoadFailed { reason: String },

    #[error("instrumentation object has no `{name}` map")]
    MapMissing { name: &'static str },

    #[error("map operation failed: {reason}")]
    MapError { reason: String },

    #[error("no decision-path hook attached; access decisions cannot be observed")]
    NoDecisionPath,
}

/// Result type for probe operations
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Which observation channel delivered an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Uncached decision path (`avc_has_perm`), carries the full requested
    /// bitmask and the real outcome.
    Slow,
    /// Per-operation checkpoint hook, fires regardless of decision caching.
    Fast,
}

/// One access-control decision notification delivered from kernel context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AvcEvent {
    pub pid: Pid,
    /// Reporting process name, best effort, truncated to 16 bytes kernel-side.
    pub comm: String,
    pub ssid: SecurityId,
    pub tsid: SecurityId,
    pub class: ClassId,
    /// Requested permission bitmask. Zero only for checkpoint hooks that
    /// carry no permission information.
    pub requested: AccessVector,
    pub granted: bool,
    pub channel: Channel,
    /// Monotonic kernel timestamp.
    pub timestamp_ns: u64,
}

/// Size of one wire record emitted by the instrumentation object.
///
/// Layout (C, native endianness):
/// `pid:u32 ssid:u32 tsid:u32 tclass:u16 channel:u8 granted:u8
///  requested:u32 pad:u32 timestamp:u64 comm:[u8;16]`
pub const WIRE_EVENT_SIZE: usize = 48;

fn read_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_ne_bytes(buf[offset..offset + 4].try_into().unwrap())
}

fn read_u16(buf: &[u8], offset: usize) -> u16 {
    u16::from_ne_bytes(buf[offset..offset + 2].try_into().unwrap())
}

fn read_u64(buf: &[u8], offset: usize) -> u64 {
    u64::from_ne_bytes(buf[offset..offset + 8].try_into().unwrap())
}

/// Parse one wire record. A short record yields `None` and is counted by the
/// caller as a decode failure; it never aborts monitoring.
pub fn parse_wire_event(buf: &[u8]) -> Option<AvcEvent> {
    if buf.len() < WIRE_EVENT_SIZE {
        return None;
    }

    let comm_bytes = &buf[32..48];
    let comm_len = comm_bytes.iter().position(|&b| b == 0).unwrap_or(16);
    let comm = String::from_utf8_lossy(&comm_bytes[..comm_len]).into_owned();

    Some(AvcEvent {
        pid: read_u32(buf, 0),
        ssid: read_u32(buf, 4),
        tsid: read_u32(buf, 8),
        class: read_u16(buf, 12),
        channel: if buf[14] == 0 { Channel::Slow } else { Channel::Fast },
        granted: buf[15] != 0,
        requested: read_u32(buf, 16),
        timestamp_ns: read_u64(buf, 24),
        comm,
    })
}
