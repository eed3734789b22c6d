//! Worktree provisioning errors.
//!
//! Provisioning failures fall into distinct recovery classes: an invalid
//! base reference triggers the interactive retry path, an infrastructure
//! failure (permissions, filesystem) triggers the one-shot fallback
//! location, and any other git semantic failure propagates as-is.

use thiserror::Error;

/// Error from worktree provisioning.
#[derive(Debug, Error)]
pub enum WorktreeError {
    /// The requested base reference does not resolve.
    #[error("invalid base ref '{base}': {detail}")]
    InvalidBaseRef { base: String, detail: String },

    /// A git semantic failure (branch already checked out, bad refname, ...).
    #[error("git: {0}")]
    Git(String),

    /// A filesystem/permission-class failure at the target location.
    #[error("infrastructure: {0}")]
    Infrastructure(String),

    /// I/O failure outside git itself.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl WorktreeError {
    /// True when the one-shot fallback-location retry applies.
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, Self::Infrastructure(_) | Self::Io(_))
    }

    /// True when the interactive base-ref retry applies.
    pub fn is_invalid_base(&self) -> bool {
        matches!(self, Self::InvalidBaseRef { .. })
    }
}

/// Stderr fragments that indicate a filesystem/permission failure rather
/// than a git semantic error.
const INFRASTRUCTURE_SIGNALS: &[&str] = &[
    "permission denied",
    "read-only file system",
    "no space left on device",
    "operation not permitted",
    "could not create directory",
    "could not create work tree",
    "unable to create",
];

/// Stderr fragments that indicate the base reference did not resolve.
const INVALID_BASE_SIGNALS: &[&str] = &[
    "not a valid object name",
    "invalid reference",
    "unknown revision or path",
    "bad revision",
    "not a valid branch point",
];

/// Classify a failed git invocation by its stderr.
pub fn classify_git_failure(stderr: &str, base_ref: &str) -> WorktreeError {
    let lower = stderr.to_lowercase();
    if INVALID_BASE_SIGNALS.iter().any(|s| lower.contains(s)) {
        return WorktreeError::InvalidBaseRef {
            base: base_ref.to_string(),
            detail: stderr.trim().to_string(),
        };
    }
    if INFRASTRUCTURE_SIGNALS.iter().any(|s| lower.contains(s)) {
        return WorktreeError::Infrastructure(stderr.trim().to_string());
    }
    WorktreeError::Git(stderr.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_invalid_base() {
        let err = classify_git_failure(
            "fatal: 'origin/main' is not a valid object name",
            "origin/main",
        );
        assert!(err.is_invalid_base());
        assert!(!err.is_infrastructure());
    }

    #[test]
    fn test_classify_permission_denied() {
        let err = classify_git_failure(
            "fatal: could not create work tree dir '/root/x': Permission denied",
            "main",
        );
        assert!(err.is_infrastructure());
    }

    #[test]
    fn test_classify_semantic_fallthrough() {
        let err = classify_git_failure("fatal: 'topic' is already checked out", "main");
        assert!(matches!(err, WorktreeError::Git(_)));
        assert!(!err.is_infrastructure());
        assert!(!err.is_invalid_base());
    }

    #[test]
    fn test_invalid_base_wins_over_infrastructure() {
        // Both phrases present: the base-ref path is the more specific recovery.
        let err = classify_git_failure(
            "fatal: bad revision 'dev'; also permission denied somewhere",
            "dev",
        );
        assert!(err.is_invalid_base());
    }

    #[test]
    fn test_io_counts_as_infrastructure() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = WorktreeError::from(io);
        assert!(err.is_infrastructure());
    }
}
