/*!
 * Policy Extraction
 * Invokes the external `sesearch` tool and parses its allow-rule output
 */

use super::rule::{PolicyRule, PolicySnapshot};
use std::process::Command;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Policy extraction errors. "No rules for this type" is not an error; it is
/// an empty snapshot. These variants all mean the policy could not be queried
/// at all.
#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("sesearch not found; install setools (e.g. `dnf install setools-console`)")]
    ToolMissing,

    #[error("could not invoke sesearch: {0}")]
    Invoke(std::io::Error),

    #[error("sesearch failed with {status}: {stderr}")]
    ToolFailed {
        status: std::process::ExitStatus,
        stderr: String,
    },
}

/// Extract the allow rules granted to `subject` from the active policy.
///
/// Returns an empty snapshot when the policy has no rules for the type; the
/// audit then proceeds and every observation reports as "used but not
/// granted".
pub fn extract_rules(subject: &str) -> Result<PolicySnapshot, PolicyError> {
    info!(subject, "extracting policy rules via sesearch");

    let output = Command::new("sesearch")
        .args(["--allow", "-s", subject])
        .output()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => PolicyError::ToolMissing,
            _ => PolicyError::Invoke(e),
        })?;

    if !output.status.success() {
        return Err(PolicyError::ToolFailed {
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut rules = Vec::new();
    for line in stdout.lines() {
        let line = line.trim();
        if !line.starts_with("allow") || !line.contains(subject) {
            continue;
        }
        match parse_rule(line) {
            Some(rule) => rules.push(rule),
            None => warn!(line, "skipping unparsable allow rule"),
        }
    }

    info!(count = rules.len(), "policy extraction complete");
    Ok(PolicySnapshot::build(subject, rules))
}

/// Parse one allow rule line.
///
/// Handles both the braced form `allow src tgt:class { p1 p2 };` and the
/// unbraced single-permission form `allow src tgt:class p1;` that sesearch
/// emits for one-permission rules.
pub fn parse_rule(line: &str) -> Option<PolicyRule> {
    let rest = line.strip_prefix("allow")?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let rest = rest.trim_start();
    let mut parts = rest.splitn(2, char::is_whitespace);
    let source = parts.next()?;
    let rest = parts.next()?.trim_start();

    let mut parts = rest.splitn(2, char::is_whitespace);
    let target_class = parts.next()?;
    let perms_part = parts.next()?.trim();

    let (target, class) = target_class.split_once(':')?;
    if target.is_empty() || class.is_empty() {
        return None;
    }
    // sesearch prints the class with a trailing semicolon in some malformed
    // captures; a clean class name never contains one
    let class = class.trim_end_matches(';');

    let perms: Vec<&str> = if let Some(inner) = perms_part
        .strip_prefix('{')
        .and_then(|p| p.trim_end_matches(';').trim_end().strip_suffix('}'))
    {
        inner.split_whitespace().collect()
    } else {
        // unbraced single permission
        let perm = perms_part.trim_end_matches(';').trim();
        if perm.is_empty() || perm.contains(char::is_whitespace) {
            debug!(line, "rule body is neither braced nor a single permission");
            return None;
        }
        vec![perm]
    };

    if perms.is_empty() {
        return None;
    }

    Some(PolicyRule::new(source, target, class, perms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_braced_rule() {
        let rule = parse_rule("allow httpd_t httpd_log_t:file { read write append };").unwrap();
        assert_eq!(rule.key.source, "httpd_t");
        assert_eq!(rule.key.target, "httpd_log_t");
        assert_eq!(rule.key.class, "file");
        let perms: Vec<_> = rule.permissions.iter().collect();
        assert_eq!(perms, vec!["append", "read", "write"]);
    }

    #[test]
    fn test_parse_unbraced_single_permission() {
        let rule = parse_rule("allow my_app_t etc_t:dir search;").unwrap();
        assert_eq!(rule.key.class, "dir");
        assert!(rule.permissions.contains("search"));
        assert_eq!(rule.permissions.len(), 1);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_rule("allow my_app_t").is_none());
        assert!(parse_rule("allow my_app_t tmp_t file { read };").is_none());
        assert!(parse_rule("allowxyz a b:c { read };").is_none());
        assert!(parse_rule("allow a b:c ").is_none());
    }
}
