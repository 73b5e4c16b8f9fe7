/*!
 * Core Types
 * Common types used across the auditor
 */

/// Process ID type
pub type Pid = u32;

/// Raw kernel security identifier (ssid/tsid)
///
/// Opaque to userspace: there is no stable interface that resolves a SID back
/// to a context string, so these are carried for diagnostics only.
pub type SecurityId = u32;

/// SELinux object class identifier
pub type ClassId = u16;

/// Access-vector bitmask as delivered by the kernel
pub type AccessVector = u32;

/// Common result type for audit operations
pub type AuditResult<T> = Result<T, super::errors::AuditError>;
