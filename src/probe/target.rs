/*!
 * Target Discovery
 * Finds processes running under the audited security context
 */

use crate::core::types::Pid;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Extract the type component from a security label
/// (`user:role:type:level...`).
fn context_type(label: &str) -> Option<&str> {
    label.split(':').nth(2)
}

/// PIDs of all processes currently running with `subject` as the type
/// component of their security context, discovered by scanning
/// `/proc/<pid>/attr/current`.
///
/// Unreadable entries (races with process exit, permission) are skipped
/// silently; this is a best-effort snapshot that gets refreshed periodically
/// during the session.
pub fn pids_for_context(subject: &str) -> Vec<Pid> {
    let mut pids = Vec::new();
    let entries = match fs::read_dir("/proc") {
        Ok(entries) => entries,
        Err(e) => {
            debug!(error = %e, "cannot read /proc");
            return pids;
        }
    };

    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(pid) = name.to_str().and_then(|s| s.parse::<Pid>().ok()) else {
            continue;
        };
        if process_matches(&entry.path(), subject) {
            pids.push(pid);
        }
    }

    pids
}

fn process_matches(proc_dir: &Path, subject: &str) -> bool {
    let Ok(label) = fs::read_to_string(proc_dir.join("attr/current")) else {
        return false;
    };
    let label = label.trim_end_matches(['\n', '\0']);
    context_type(label) == Some(subject)
}
