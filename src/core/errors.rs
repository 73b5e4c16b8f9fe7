/*!
 * Error Types
 * Centralized error handling with thiserror
 */

use thiserror::Error;

// Re-export domain errors so callers can match on them through one path
pub use crate::policy::PolicyError;
pub use crate::probe::ProbeError;

/// Top-level audit error. Only fatal conditions surface here; per-hook and
/// per-event failures are degraded and counted instead.
#[derive(Error, Debug)]
pub enum AuditError {
    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error("elevated privileges required: {reason}")]
    PrivilegeRequired { reason: String },

    #[error("platform not supported: {platform}")]
    UnsupportedPlatform { platform: &'static str },
}
