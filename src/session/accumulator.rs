/*!
 * Usage Accumulator
 * Folds decision events into per-rule used-permission sets
 */

use crate::avc;
use crate::core::types::ClassId;
use crate::policy::{PolicySnapshot, RuleKey};
use crate::probe::{AvcEvent, Channel};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Session statistics, accumulated alongside folding rather than recomputed
/// from raw events.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct SessionStats {
    pub total_events: u64,
    /// Events from the uncached decision path.
    pub slow_path: u64,
    /// Events from checkpoint hooks.
    pub fast_path: u64,
    /// Event counts per object class.
    pub by_class: BTreeMap<ClassId, u64>,
    /// Granted-only accounting: denied decisions are counted here and never
    /// reach the accumulator.
    pub denied_events: u64,
    /// Events whose object class is outside the known table.
    pub unknown_classes: u64,
    /// Events whose bitmask had bits no table resolves.
    pub residual_bits: u64,
    /// Events lost to ring-buffer overruns or the bounded channel.
    pub dropped_events: u64,
}

impl SessionStats {
    fn observe(&mut self, event: &AvcEvent) {
        self.total_events += 1;
        match event.channel {
            Channel::Slow => self.slow_path += 1,
            Channel::Fast => self.fast_path += 1,
        }
        *self.by_class.entry(event.class).or_default() += 1;
    }
}

/// Decode diagnostics for one folded event, for debug-log visibility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FoldDiag {
    pub unknown_class: bool,
    /// Bits of the requested vector no table could resolve.
    pub residual: crate::core::types::AccessVector,
}

impl FoldDiag {
    pub fn is_clean(&self) -> bool {
        !self.unknown_class && self.residual == 0
    }
}

/// Mutable runtime state of one session: which granted permissions have been
/// observed in use. Grows monotonically; permissions are only ever added.
#[derive(Debug, Default)]
pub struct UsageAccumulator {
    used: HashMap<RuleKey, BTreeSet<String>>,
    /// Observed (class, permission) pairs matching no snapshot rule —
    /// "used but not granted", surfaced instead of dropped.
    orphans: BTreeMap<String, BTreeSet<String>>,
}

impl UsageAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event. Union semantics make this idempotent under duplicate
    /// delivery (the same access observed via both hook families) and
    /// independent of event order.
    ///
    /// Raw sids cannot be resolved to type names from userspace, so
    /// attribution is by object class and permission against the
    /// subject-filtered snapshot; the subject side is already pinned by the
    /// kernel-side process filter.
    pub fn fold(
        &mut self,
        snapshot: &PolicySnapshot,
        stats: &mut SessionStats,
        event: &AvcEvent,
    ) -> FoldDiag {
        let mut diag = FoldDiag::default();
        stats.observe(event);

        // only granted usage counts as need: the goal is excess grants
        if !event.granted {
            stats.denied_events += 1;
            return diag;
        }

        let label = avc::class_label(event.class);
        if avc::class_name(event.class).is_none() {
            stats.unknown_classes += 1;
            diag.unknown_class = true;
        }

        let decoded = avc::decode(event.class, event.requested);
        if decoded.residual != 0 {
            stats.residual_bits += 1;
            diag.residual = decoded.residual;
        }

        for perm in &decoded.perms {
            let mut matched = false;
            for rule in snapshot.rules_for_class(&label) {
                if rule.permissions.contains(*perm) {
                    self.used
                        .entry(rule.key.clone())
                        .or_default()
                        .insert((*perm).to_string());
                    matched = true;
                }
            }
            if !matched {
                self.orphans
                    .entry(label.clone())
                    .or_default()
                    .insert((*perm).to_string());
            }
        }

        diag
    }

    /// Used set for a rule key; empty if the key was never observed.
    pub fn used_for(&self, key: &RuleKey) -> BTreeSet<String> {
        self.used.get(key).cloned().unwrap_or_default()
    }

    pub fn orphans(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.orphans
    }

    /// Number of distinct (rule, permission) usages observed.
    pub fn used_permission_count(&self) -> usize {
        self.used.values().map(BTreeSet::len).sum()
    }
}
