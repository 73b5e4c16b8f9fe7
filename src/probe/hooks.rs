/*!
 * Hook Catalog
 * The fixed set of kernel observation points and per-hook attach bookkeeping
 */

use super::types::{ProbeError, ProbeResult};
use serde::{Deserialize, Serialize};

/// Probe mechanism used for a hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeKind {
    KProbe,
    KRetProbe,
}

/// Why a decision becomes visible at this hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookFamily {
    /// Entry/return instrumentation on the central decision function. Every
    /// uncached decision passes through here with the full bitmask.
    DecisionPath,
    /// Per-operation security checkpoint, invoked on every call regardless of
    /// the decision cache.
    Checkpoint,
}

/// One observation point in the instrumentation object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HookSpec {
    /// Program name inside the instrumentation object.
    pub program: &'static str,
    /// Kernel symbol the program attaches to.
    pub symbol: &'static str,
    pub kind: ProbeKind,
    pub family: HookFamily,
    /// Permissions a checkpoint hook can assert without a decision-path
    /// bitmask. Empty for decision-path hooks, which carry the real mask.
    pub implies: &'static [&'static str],
}

/// The complete hook set.
///
/// Checkpoint implied-permission mapping: `selinux_file_open` always implies
/// `open` plus `read`/`write` from the file's f_mode; `selinux_mmap_file`
/// implies `read`/`write`/`execute` from the PROT_* bits (no event for empty
/// prot); `selinux_inode_getattr` implies `getattr`. The instrumentation
/// composes the corresponding file-class bits kernel-side, so checkpoint
/// events still arrive as ordinary bitmask events.
const HOOKS: &[HookSpec] = &[
    HookSpec {
        program: "avc_decision_entry",
        symbol: "avc_has_perm",
        kind: ProbeKind::KProbe,
        family: HookFamily::DecisionPath,
        implies: &[],
    },
    HookSpec {
        program: "avc_decision_ret",
        symbol: "avc_has_perm",
        kind: ProbeKind::KRetProbe,
        family: HookFamily::DecisionPath,
        implies: &[],
    },
    HookSpec {
        program: "checkpoint_file_open",
        symbol: "selinux_file_open",
        kind: ProbeKind::KProbe,
        family: HookFamily::Checkpoint,
        implies: &["open", "read", "write"],
    },
    HookSpec {
        program: "checkpoint_mmap_file",
        symbol: "selinux_mmap_file",
        kind: ProbeKind::KProbe,
        family: HookFamily::Checkpoint,
        implies: &["read", "write", "execute"],
    },
    HookSpec {
        program: "checkpoint_getattr",
        symbol: "selinux_inode_getattr",
        kind: ProbeKind::KProbe,
        family: HookFamily::Checkpoint,
        implies: &["getattr"],
    },
];

/// The fixed hook catalog.
pub fn catalog() -> &'static [HookSpec] {
    HOOKS
}

/// Outcome of one attachment attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum HookStatus {
    Attached,
    /// Attachment failed (inlined symbol, verifier rejection, missing
    /// program). Recoverable: the session continues with remaining hooks.
    Skipped { reason: String },
}

/// Per-hook attachment record.
#[derive(Debug, Clone, Serialize)]
pub struct HookOutcome {
    pub spec: HookSpec,
    pub status: HookStatus,
}

impl HookOutcome {
    pub fn is_attached(&self) -> bool {
        matches!(self.status, HookStatus::Attached)
    }
}

/// Attachment bookkeeping for a whole session. Immutable once monitoring
/// starts.
#[derive(Debug, Clone, Serialize)]
pub struct AttachReport {
    outcomes: Vec<HookOutcome>,
}

impl AttachReport {
    pub fn new(outcomes: Vec<HookOutcome>) -> Self {
        Self { outcomes }
    }

    pub fn outcomes(&self) -> &[HookOutcome] {
        &self.outcomes
    }

    pub fn attached_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_attached()).count()
    }

    /// Whether any decision-path hook is live. Checkpoint hooks alone cannot
    /// substitute: they do not all carry multi-permission bitmasks.
    pub fn decision_path_live(&self) -> bool {
        self.outcomes
            .iter()
            .any(|o| o.is_attached() && o.spec.family == HookFamily::DecisionPath)
    }

    /// Fail session start unless at least one decision-path hook attached.
    pub fn ensure_viable(&self) -> ProbeResult<()> {
        if self.decision_path_live() {
            Ok(())
        } else {
            Err(ProbeError::NoDecisionPath)
        }
    }
}
