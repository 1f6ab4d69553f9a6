//! Request Session
//!
//! One [`RequestSession`] tracks a single orchestration run: which groups are
//! still pending, which permissions have been resolved, and the final
//! granted/denied partition. The session enforces resolve-once-wins: a
//! permission decided by an earlier group (or by the initial filter) is never
//! re-requested or flipped by a later group.

use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::descriptor::{Explanation, PermissionGroup};
use crate::platform::StatusProbe;

/// Terminal partition of every requested permission.
///
/// Invariant at session end: `granted` and `denied` are disjoint and together
/// cover each unique permission identifier of the input exactly once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    /// Permissions resolved as granted, in resolution order.
    pub granted: Vec<String>,
    /// Permissions resolved as denied, in resolution order.
    pub denied: Vec<String>,
}

/// The group currently awaiting an external outcome, reduced to what the
/// orchestrator still needs from it.
#[derive(Debug, Clone)]
pub struct GroupPlan {
    /// Identifiers of this group not yet resolved when it was dequeued.
    pub unresolved: Vec<String>,
    /// Whether a denial here cancels all subsequent groups.
    pub abort_on_deny: bool,
    /// Explanation to surface before the platform request, if any.
    pub explanation: Option<Explanation>,
}

/// Mutable state of one orchestration run.
pub struct RequestSession {
    pending: VecDeque<PermissionGroup>,
    current: Option<GroupPlan>,
    granted: Vec<String>,
    denied: Vec<String>,
    resolved: HashSet<String>,
}

impl RequestSession {
    /// Create a session and run the initial filter pass.
    ///
    /// Every permission already decided per the probe is resolved up front;
    /// a group is queued only while at least one of its permissions still
    /// needs a request. Filtering is idempotent: classifying the same
    /// undecided set twice yields the same partition.
    pub fn new(groups: Vec<PermissionGroup>, probe: &dyn StatusProbe) -> Self {
        let mut session = Self {
            pending: VecDeque::new(),
            current: None,
            granted: Vec::new(),
            denied: Vec::new(),
            resolved: HashSet::new(),
        };
        for group in groups {
            let mut undecided = false;
            for permission in group.permissions() {
                if session.resolved.contains(permission) {
                    continue;
                }
                if probe.is_granted(permission) {
                    trace!(permission = permission.as_str(), "already granted");
                    session.mark(permission, true);
                } else if probe.is_permanently_denied(permission) {
                    trace!(permission = permission.as_str(), "permanently denied");
                    session.mark(permission, false);
                } else {
                    trace!(permission = permission.as_str(), "needs request");
                    undecided = true;
                }
            }
            if undecided {
                session.pending.push_back(group);
            }
        }
        session
    }

    /// Dequeue the next group that still has unresolved permissions.
    ///
    /// Groups fully resolved in the meantime (their permissions overlapped
    /// with an earlier group) are skipped without evaluating their abort
    /// flag. Returns `None` once nothing is left.
    pub fn next_plan(&mut self) -> Option<&GroupPlan> {
        while let Some(group) = self.pending.pop_front() {
            let unresolved: Vec<String> = group
                .permissions()
                .iter()
                .filter(|p| !self.resolved.contains(p.as_str()))
                .cloned()
                .collect();
            if unresolved.is_empty() {
                trace!("skipping fully resolved group");
                continue;
            }
            self.current = Some(GroupPlan {
                unresolved,
                abort_on_deny: group.abort_on_deny(),
                explanation: group.explanation().cloned(),
            });
            return self.current.as_ref();
        }
        None
    }

    /// The group currently awaiting an external outcome.
    pub fn current(&self) -> Option<&GroupPlan> {
        self.current.as_ref()
    }

    /// Resolve one permission. Returns `false` when it was already resolved
    /// (resolve-once-wins) and nothing changed.
    pub fn mark(&mut self, permission: &str, granted: bool) -> bool {
        if !self.resolved.insert(permission.to_string()) {
            return false;
        }
        if granted {
            self.granted.push(permission.to_string());
        } else {
            self.denied.push(permission.to_string());
        }
        true
    }

    /// Deny every unresolved permission of the current group and clear it.
    pub fn deny_current(&mut self) {
        if let Some(plan) = self.current.take() {
            for permission in &plan.unresolved {
                self.mark(permission, false);
            }
        }
    }

    /// Drop the current group after its outcome has been applied.
    pub fn complete_current(&mut self) {
        self.current = None;
    }

    /// Deny everything still unresolved: the current group's remainder plus
    /// every queued group. Used for abort-on-deny propagation.
    pub fn abort_remaining(&mut self) {
        self.deny_current();
        while let Some(group) = self.pending.pop_front() {
            for permission in group.permissions() {
                self.mark(permission, false);
            }
        }
    }

    /// True once no group is active or queued.
    pub fn is_exhausted(&self) -> bool {
        self.current.is_none() && self.pending.is_empty()
    }

    /// Permissions resolved as granted so far.
    pub fn granted(&self) -> &[String] {
        &self.granted
    }

    /// Permissions resolved as denied so far.
    pub fn denied(&self) -> &[String] {
        &self.denied
    }

    /// Number of groups still queued.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Consume the session into its terminal partition.
    pub fn into_outcome(self) -> Outcome {
        Outcome {
            granted: self.granted,
            denied: self.denied,
        }
    }
}
