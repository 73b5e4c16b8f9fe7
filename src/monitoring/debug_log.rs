/*!
 * Debug Log
 * Append-only JSON-lines log for post-hoc troubleshooting
 *
 * Records hook-attachment outcomes, sampled events, and decode failures at a
 * fixed path. Unavailability must never affect monitoring: write failures are
 * counted and otherwise ignored.
 */

use serde_json::json;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

pub struct DebugLog {
    path: Option<PathBuf>,
    failures: AtomicU64,
}

impl DebugLog {
    /// Log appending to `path`. The file is created on first write.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            failures: AtomicU64::new(0),
        }
    }

    /// No-op log.
    pub fn disabled() -> Self {
        Self {
            path: None,
            failures: AtomicU64::new(0),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Append one entry. Infallible by contract; failures are counted.
    pub fn record(&self, message: &str, data: serde_json::Value) {
        let Some(path) = &self.path else { return };

        let timestamp = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default();
        let entry = json!({
            "timestamp": timestamp,
            "message": message,
            "data": data,
        });

        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut file| writeln!(file, "{entry}"));
        if result.is_err() {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Number of entries that could not be written.
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appends_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("debug.log");
        let log = DebugLog::at(&path);

        log.record("session start", json!({"subject": "my_app_t"}));
        log.record("hook attachment", json!({"program": "avc_decision_entry"}));

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            let entry: serde_json::Value = serde_json::from_str(line).unwrap();
            assert!(entry["timestamp"].is_string());
            assert!(entry["message"].is_string());
        }
        assert_eq!(log.failures(), 0);
    }

    #[test]
    fn test_unwritable_path_counts_failures() {
        let log = DebugLog::at("/nonexistent-dir/debug.log");
        log.record("entry", json!({}));
        assert_eq!(log.failures(), 1);
    }

    #[test]
    fn test_disabled_log_is_silent() {
        let log = DebugLog::disabled();
        log.record("entry", json!({}));
        assert_eq!(log.failures(), 0);
    }
}
