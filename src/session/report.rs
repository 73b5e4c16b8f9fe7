/*!
 * Usage Report
 * Reconciles the usage accumulator against the policy snapshot
 */

use super::accumulator::{SessionStats, UsageAccumulator};
use crate::avc;
use crate::policy::{PolicyRule, PolicySnapshot};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

/// A rule with some but not all granted permissions observed in use.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct PartialRule {
    pub rule: PolicyRule,
    pub used: BTreeSet<String>,
    /// `granted − used`: candidates for removal.
    pub unused: BTreeSet<String>,
}

/// Read-only classification of every snapshot rule, computed once at session
/// end.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct UsageReport {
    pub subject: String,
    pub partially_used: Vec<PartialRule>,
    pub completely_unused: Vec<PolicyRule>,
    pub fully_used: Vec<PolicyRule>,
    /// Observed permissions matching no rule, per object class.
    pub orphans: BTreeMap<String, BTreeSet<String>>,
    pub stats: SessionStats,
}

impl UsageReport {
    /// Classify every rule: used == granted is fully used, an empty used set
    /// (including keys never observed) is completely unused, anything in
    /// between is partially used with both complements reported.
    pub fn build(
        snapshot: &PolicySnapshot,
        accumulator: &UsageAccumulator,
        stats: SessionStats,
    ) -> Self {
        let mut partially_used = Vec::new();
        let mut completely_unused = Vec::new();
        let mut fully_used = Vec::new();

        for rule in snapshot.rules() {
            let used = accumulator.used_for(&rule.key);
            if used.is_empty() {
                completely_unused.push(rule.clone());
            } else if used == rule.permissions {
                fully_used.push(rule.clone());
            } else {
                let unused = rule.permissions.difference(&used).cloned().collect();
                partially_used.push(PartialRule {
                    rule: rule.clone(),
                    used,
                    unused,
                });
            }
        }

        Self {
            subject: snapshot.subject().to_string(),
            partially_used,
            completely_unused,
            fully_used,
            orphans: accumulator.orphans().clone(),
            stats,
        }
    }

    pub fn total_rules(&self) -> usize {
        self.partially_used.len() + self.completely_unused.len() + self.fully_used.len()
    }

    fn total_permissions(&self) -> usize {
        let granted = |rules: &[PolicyRule]| -> usize {
            rules.iter().map(|r| r.permissions.len()).sum()
        };
        granted(&self.completely_unused)
            + granted(&self.fully_used)
            + self
                .partially_used
                .iter()
                .map(|p| p.rule.permissions.len())
                .sum::<usize>()
    }

    fn used_permissions(&self) -> usize {
        self.fully_used
            .iter()
            .map(|r| r.permissions.len())
            .sum::<usize>()
            + self.partially_used.iter().map(|p| p.used.len()).sum::<usize>()
    }

    /// Render the three-section text report with summary statistics.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let rule = "=".repeat(70);

        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "SELinux AVC Analysis Report");
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "Context:        {}", self.subject);
        let _ = writeln!(out, "AVC Events:     {}", self.stats.total_events);
        let _ = writeln!(out, "Total Rules:    {}", self.total_rules());
        let _ = writeln!(out);

        if self.stats.total_events == 0 {
            let _ = writeln!(out, "No events captured. Make sure:");
            let _ = writeln!(out, "   1. The application is running");
            let _ = writeln!(out, "   2. The application is performing operations");
            let _ = writeln!(out, "   3. You have root privileges");
        }

        let total = self.total_permissions();
        let used = self.used_permissions();
        let unused = total.saturating_sub(used);
        let pct = |n: usize| {
            if total == 0 {
                0.0
            } else {
                100.0 * n as f64 / total as f64
            }
        };
        let _ = writeln!(out, "Total Permissions:  {total}");
        let _ = writeln!(out, "Used Permissions:   {used} ({:.1}%)", pct(used));
        let _ = writeln!(out, "Unused Permissions: {unused} ({:.1}%)", pct(unused));

        if !self.partially_used.is_empty() {
            let _ = writeln!(out, "\n{rule}");
            let _ = writeln!(out, "PARTIALLY USED RULES (Some permissions excessive)");
            let _ = writeln!(out, "{rule}");
            for (i, partial) in self.partially_used.iter().enumerate() {
                let _ = writeln!(out, "\n{:2}. Rule: {}", i + 1, partial.rule.key);
                let _ = writeln!(out, "    + Used:   {{ {} }}", join(&partial.used));
                let _ = writeln!(out, "    - UNUSED: {{ {} }}", join(&partial.unused));
            }
        }

        if !self.completely_unused.is_empty() {
            let _ = writeln!(out, "\n{rule}");
            let _ = writeln!(out, "COMPLETELY UNUSED RULES (Remove entirely)");
            let _ = writeln!(out, "{rule}");
            for (i, rule_entry) in self.completely_unused.iter().enumerate() {
                let _ = writeln!(
                    out,
                    "{:2}. {} {{ {} }};",
                    i + 1,
                    rule_entry.key,
                    join(&rule_entry.permissions)
                );
            }
            let _ = writeln!(
                out,
                "\nThese permissions were never exercised and may be removable to"
            );
            let _ = writeln!(out, "reduce the attack surface.");
        }

        if !self.fully_used.is_empty() {
            let _ = writeln!(out, "\n{rule}");
            let _ = writeln!(out, "FULLY USED RULES (All permissions needed)");
            let _ = writeln!(out, "{rule}");
            for (i, rule_entry) in self.fully_used.iter().enumerate() {
                let _ = writeln!(
                    out,
                    "{:2}. {} {{ {} }};",
                    i + 1,
                    rule_entry.key,
                    join(&rule_entry.permissions)
                );
            }
        }

        if !self.orphans.is_empty() {
            let _ = writeln!(out, "\n{rule}");
            let _ = writeln!(out, "USED BUT NOT GRANTED (observed without a matching rule)");
            let _ = writeln!(out, "{rule}");
            for (class, perms) in &self.orphans {
                let _ = writeln!(out, "  {class}: {{ {} }}", join(perms));
            }
        }

        let _ = writeln!(out, "\n{rule}");
        let _ = writeln!(out, "MONITORING STATISTICS");
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "Total events captured: {}", self.stats.total_events);
        let _ = writeln!(out, "  Slow path (AVC):     {}", self.stats.slow_path);
        let _ = writeln!(out, "  Fast path (Cached):  {}", self.stats.fast_path);
        if self.stats.denied_events > 0 {
            let _ = writeln!(out, "  Denied decisions:    {}", self.stats.denied_events);
        }
        if self.stats.dropped_events > 0 {
            let _ = writeln!(out, "  Dropped events:      {}", self.stats.dropped_events);
        }
        if self.stats.unknown_classes > 0 {
            let _ = writeln!(out, "  Unknown classes:     {}", self.stats.unknown_classes);
        }
        if !self.stats.by_class.is_empty() {
            let _ = writeln!(out, "\nEvents by object class:");
            for (class, count) in &self.stats.by_class {
                let _ = writeln!(
                    out,
                    "  {} (tclass {class}): {count} events",
                    avc::class_label(*class)
                );
            }
        }
        let _ = writeln!(out, "{rule}");

        out
    }
}

fn join(perms: &BTreeSet<String>) -> String {
    perms.iter().cloned().collect::<Vec<_>>().join(" ")
}
