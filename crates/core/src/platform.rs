//! Collaborator traits
//!
//! The orchestrator never talks to a platform directly. Hosts supply these
//! seams: a status probe answering "is this permission already decided", a
//! decision cache that remembers outcomes across sessions, and the terminal
//! result callback.

/// Synchronous permission status checks, answered by the hosting platform.
pub trait StatusProbe {
    /// True when the permission is currently granted.
    fn is_granted(&self, permission: &str) -> bool;

    /// True when the user has denied the permission in a way that makes
    /// re-requesting pointless. The exact boundary (OS version dependent)
    /// is owned by the implementation, not the orchestrator.
    fn is_permanently_denied(&self, permission: &str) -> bool;
}

/// Persisted store of prior grant/deny outcomes.
///
/// Writes are fire-and-forget: a failed write never surfaces as an
/// orchestration error.
pub trait DecisionCache: Send + Sync {
    /// Record the outcome of a platform request for one permission.
    fn persist_decision(&self, permission: &str, granted: bool);
}

/// Terminal result callback, invoked exactly once per session.
pub trait PermissionCallback: Send + Sync {
    /// Receives the final partition of all requested permissions.
    fn on_permission_result(&self, granted: &[String], denied: &[String]);
}

/// Cache implementation for hosts that do not persist decisions.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

impl DecisionCache for NoopCache {
    fn persist_decision(&self, _permission: &str, _granted: bool) {}
}

/// Probe that reports every permission as undecided. Useful for hosts that
/// always want the platform dialog, and for tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysUndecided;

impl StatusProbe for AlwaysUndecided {
    fn is_granted(&self, _permission: &str) -> bool {
        false
    }

    fn is_permanently_denied(&self, _permission: &str) -> bool {
        false
    }
}
