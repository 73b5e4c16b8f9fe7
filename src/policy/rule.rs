/*!
 * Policy Rules
 * Structured form of statically granted allow rules
 */

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Unique key of an allow rule: (subject type, object type, object class).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RuleKey {
    pub source: String,
    pub target: String,
    pub class: String,
}

impl std::fmt::Display for RuleKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "allow {} {}:{}", self.source, self.target, self.class)
    }
}

/// One statically granted rule for the audited subject type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PolicyRule {
    pub key: RuleKey,
    /// Granted permission names. Non-empty, deduplicated by construction.
    pub permissions: BTreeSet<String>,
}

impl PolicyRule {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        class: impl Into<String>,
        permissions: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            key: RuleKey {
                source: source.into(),
                target: target.into(),
                class: class.into(),
            },
            permissions: permissions.into_iter().map(Into::into).collect(),
        }
    }
}

/// Immutable set of rules for one subject type, indexed by object class for
/// correlation lookups.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct PolicySnapshot {
    subject: String,
    rules: Vec<PolicyRule>,
    #[serde(skip)]
    by_class: HashMap<String, Vec<usize>>,
}

impl PolicySnapshot {
    /// Build a snapshot, merging duplicate rule lines for the same key. The
    /// extractor usually merges already; this tolerates input that does not.
    pub fn build(subject: impl Into<String>, rules: impl IntoIterator<Item = PolicyRule>) -> Self {
        let mut merged: Vec<PolicyRule> = Vec::new();
        let mut index: HashMap<RuleKey, usize> = HashMap::new();
        for rule in rules {
            match index.get(&rule.key) {
                Some(&i) => merged[i].permissions.extend(rule.permissions),
                None => {
                    index.insert(rule.key.clone(), merged.len());
                    merged.push(rule);
                }
            }
        }

        let mut by_class: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, rule) in merged.iter().enumerate() {
            by_class.entry(rule.key.class.clone()).or_default().push(i);
        }

        Self {
            subject: subject.into(),
            rules: merged,
            by_class,
        }
    }

    /// Subject type this snapshot was extracted for.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn rules(&self) -> &[PolicyRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Total number of granted permissions across all rules.
    pub fn total_permissions(&self) -> usize {
        self.rules.iter().map(|r| r.permissions.len()).sum()
    }

    /// Rules granting anything on the given object class.
    pub fn rules_for_class<'a>(&'a self, class: &str) -> impl Iterator<Item = &'a PolicyRule> {
        self.by_class
            .get(class)
            .into_iter()
            .flatten()
            .map(move |&i| &self.rules[i])
    }
}
