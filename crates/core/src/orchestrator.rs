//! Permission Orchestrator
//!
//! Drives one permission-request session through its states:
//! `Idle → AwaitingExplanation → AwaitingPlatformResult → ... → Finished`.
//!
//! The orchestrator owns no platform bindings. Each transition method returns
//! a [`Directive`] telling the host what to surface next, and the host feeds
//! the outcome back in: explanation dialogs via [`Orchestrator::explanation_outcome`],
//! platform request results via [`Orchestrator::platform_result`]. Every
//! transition is triggered by exactly one external event; nothing is polled.
//!
//! All transitions are expected to run on a single logical owner thread.
//! The terminal callback is held weakly so a destroyed host never leaks
//! through the orchestrator, and it fires at most once per session.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use tracing::{debug, info, trace, warn};

use crate::descriptor::{Explanation, PermissionGroup};
use crate::error::{PermFlowError, Result};
use crate::events::{EventBus, PermissionEvent};
use crate::platform::{DecisionCache, PermissionCallback, StatusProbe};
use crate::session::{Outcome, RequestSession};

/// Orchestration state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    /// No session started yet
    Idle,
    /// An explanation prompt is in front of the user
    AwaitingExplanation,
    /// A platform request is outstanding
    AwaitingPlatformResult,
    /// The session ended and the outcome was delivered
    Finished,
}

/// What the host must do next after a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    /// Surface this explanation and report the outcome via
    /// [`Orchestrator::explanation_outcome`]
    ShowExplanation(Explanation),
    /// Invoke the platform request primitive with these identifiers and
    /// report the result map via [`Orchestrator::platform_result`]
    RequestPermissions(Vec<String>),
    /// The session is over; this is the terminal partition
    Finished(Outcome),
}

/// State machine coordinating one permission-request session.
pub struct Orchestrator {
    state: OrchestratorState,
    session: Option<RequestSession>,
    cache: Arc<dyn DecisionCache>,
    callback: Option<Weak<dyn PermissionCallback>>,
    events: Arc<EventBus>,
    outcome: Option<Outcome>,
}

impl Orchestrator {
    /// Create an orchestrator persisting decisions to the given cache.
    pub fn new(cache: Arc<dyn DecisionCache>) -> Self {
        Self {
            state: OrchestratorState::Idle,
            session: None,
            cache,
            callback: None,
            events: Arc::new(EventBus::new()),
            outcome: None,
        }
    }

    /// Attach the terminal result callback.
    ///
    /// Only a weak reference is kept: the caller retains ownership, and a
    /// callback dropped before the session finishes is simply not invoked.
    pub fn with_callback<C>(mut self, callback: &Arc<C>) -> Self
    where
        C: PermissionCallback + 'static,
    {
        let weak: Weak<C> = Arc::downgrade(callback);
        let weak: Weak<dyn PermissionCallback> = weak;
        self.callback = Some(weak);
        self
    }

    /// Event bus carrying session progress, for UI surfaces to subscribe to.
    pub fn event_bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.events)
    }

    /// Current orchestration state.
    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    /// Terminal partition, available once the session finished. Hosts
    /// replaying their lifecycle can read it here without a second
    /// callback delivery.
    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    /// Start a session over the given groups.
    ///
    /// Every permission already decided per the probe is resolved without a
    /// request; the rest are processed strictly in input order. An empty
    /// input finishes immediately with an empty partition.
    pub fn start(
        &mut self,
        groups: Vec<PermissionGroup>,
        probe: &dyn StatusProbe,
    ) -> Result<Directive> {
        if self.state != OrchestratorState::Idle {
            return Err(PermFlowError::IllegalState(
                "a session was already started on this orchestrator".into(),
            ));
        }
        if groups.is_empty() {
            trace!("permission list is empty, nothing to request");
        }
        let session = RequestSession::new(groups, probe);
        self.events.emit(PermissionEvent::SessionStarted {
            pending_groups: session.pending_len(),
        });
        self.session = Some(session);
        self.advance()
    }

    /// Report the user's reaction to the current explanation prompt.
    ///
    /// `agreed` moves on to the platform request; a decline denies the
    /// group's unresolved permissions and, with abort-on-deny set, cancels
    /// everything still queued.
    pub fn explanation_outcome(&mut self, agreed: bool) -> Result<Directive> {
        if self.state != OrchestratorState::AwaitingExplanation {
            return Err(PermFlowError::IllegalState(
                "no explanation prompt is outstanding".into(),
            ));
        }
        let session = self.session.as_mut().ok_or_else(Self::no_session)?;
        let plan = session.current().cloned().ok_or_else(Self::no_session)?;

        if agreed {
            debug!("explanation accepted");
            self.issue_request(plan.unresolved)
        } else {
            debug!("explanation declined, denying group");
            session.deny_current();
            if plan.abort_on_deny {
                session.abort_remaining();
                self.events.emit(PermissionEvent::SessionAborted);
                self.finish()
            } else {
                self.advance()
            }
        }
    }

    /// Apply the platform's result map for the outstanding request.
    ///
    /// A requested identifier missing from the map is treated as denied so
    /// the final partition stays total. A map that matches none of the
    /// requested identifiers is a stale or duplicate delivery and is
    /// rejected without touching the session.
    pub fn platform_result(&mut self, results: &HashMap<String, bool>) -> Result<Directive> {
        if self.state != OrchestratorState::AwaitingPlatformResult {
            return Err(PermFlowError::IllegalState(
                "no platform request is outstanding".into(),
            ));
        }
        let session = self.session.as_mut().ok_or_else(Self::no_session)?;
        let plan = session.current().cloned().ok_or_else(Self::no_session)?;

        if !plan.unresolved.iter().any(|p| results.contains_key(p)) {
            return Err(PermFlowError::IllegalState(
                "platform result does not match the outstanding request".into(),
            ));
        }

        let mut has_denied = false;
        for permission in &plan.unresolved {
            let reported = results.get(permission).copied();
            let granted = match reported {
                Some(granted) => granted,
                None => {
                    warn!(
                        permission = permission.as_str(),
                        "platform result omitted a requested permission, treating as denied"
                    );
                    false
                }
            };
            if session.mark(permission, granted) {
                // Only decisions the platform actually reported are worth
                // remembering; an omitted entry is not a user choice.
                if reported.is_some() {
                    self.cache.persist_decision(permission, granted);
                }
                self.events.emit(PermissionEvent::DecisionRecorded {
                    permission: permission.clone(),
                    granted,
                });
            }
            if !granted {
                has_denied = true;
            }
        }
        for permission in results.keys() {
            if !plan.unresolved.iter().any(|p| p == permission) {
                warn!(
                    permission = permission.as_str(),
                    "ignoring result for a permission that was not requested"
                );
            }
        }
        session.complete_current();

        if has_denied && plan.abort_on_deny {
            debug!("denial in abort-on-deny group, cancelling remaining groups");
            session.abort_remaining();
            self.events.emit(PermissionEvent::SessionAborted);
            self.finish()
        } else {
            self.advance()
        }
    }

    /// Move to the next undecided group, or finish when none is left.
    fn advance(&mut self) -> Result<Directive> {
        let session = self.session.as_mut().ok_or_else(Self::no_session)?;
        let next = session
            .next_plan()
            .map(|plan| (plan.explanation.clone(), plan.unresolved.clone()));
        match next {
            Some((Some(explanation), _)) => {
                self.set_state(OrchestratorState::AwaitingExplanation);
                self.events.emit(PermissionEvent::ExplanationSurfaced {
                    title: explanation.title.clone(),
                });
                Ok(Directive::ShowExplanation(explanation))
            }
            Some((None, unresolved)) => self.issue_request(unresolved),
            None => self.finish(),
        }
    }

    fn issue_request(&mut self, permissions: Vec<String>) -> Result<Directive> {
        debug!(?permissions, "issuing platform request");
        self.set_state(OrchestratorState::AwaitingPlatformResult);
        self.events.emit(PermissionEvent::PlatformRequestIssued {
            permissions: permissions.clone(),
        });
        Ok(Directive::RequestPermissions(permissions))
    }

    /// Deliver the terminal partition: weakly-held callback at most once,
    /// then the event bus. The callback reference is cleared so lifecycle
    /// replay can never deliver twice.
    fn finish(&mut self) -> Result<Directive> {
        self.set_state(OrchestratorState::Finished);
        let session = self.session.take().ok_or_else(Self::no_session)?;
        let outcome = session.into_outcome();

        if let Some(weak) = self.callback.take() {
            match weak.upgrade() {
                Some(callback) => {
                    callback.on_permission_result(&outcome.granted, &outcome.denied)
                }
                None => debug!("result callback was dropped before the session finished"),
            }
        }
        self.events.emit(PermissionEvent::SessionFinished {
            granted: outcome.granted.clone(),
            denied: outcome.denied.clone(),
        });
        info!(
            granted = outcome.granted.len(),
            denied = outcome.denied.len(),
            "permission session finished"
        );
        self.outcome = Some(outcome.clone());
        Ok(Directive::Finished(outcome))
    }

    fn set_state(&mut self, state: OrchestratorState) {
        debug!("State transition: {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    fn no_session() -> PermFlowError {
        PermFlowError::IllegalState("no active session".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{AlwaysUndecided, NoopCache};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedProbe {
        granted: Vec<&'static str>,
        permanently_denied: Vec<&'static str>,
    }

    impl StatusProbe for FixedProbe {
        fn is_granted(&self, permission: &str) -> bool {
            self.granted.contains(&permission)
        }

        fn is_permanently_denied(&self, permission: &str) -> bool {
            self.permanently_denied.contains(&permission)
        }
    }

    #[derive(Default)]
    struct RecordingCache {
        writes: Mutex<Vec<(String, bool)>>,
    }

    impl DecisionCache for RecordingCache {
        fn persist_decision(&self, permission: &str, granted: bool) {
            self.writes.lock().push((permission.to_string(), granted));
        }
    }

    #[derive(Default)]
    struct CountingCallback {
        calls: AtomicUsize,
        last: Mutex<Option<(Vec<String>, Vec<String>)>>,
    }

    impl PermissionCallback for CountingCallback {
        fn on_permission_result(&self, granted: &[String], denied: &[String]) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last.lock() = Some((granted.to_vec(), denied.to_vec()));
        }
    }

    fn group(permissions: &[&str]) -> PermissionGroup {
        PermissionGroup::builder(permissions.iter().copied())
            .build()
            .unwrap()
    }

    fn abort_group(permissions: &[&str]) -> PermissionGroup {
        PermissionGroup::builder(permissions.iter().copied())
            .abort_on_deny(true)
            .build()
            .unwrap()
    }

    fn explained_group(permissions: &[&str], abort: bool) -> PermissionGroup {
        PermissionGroup::builder(permissions.iter().copied())
            .abort_on_deny(abort)
            .explanation_message("why we ask")
            .decline_label("Not now")
            .build()
            .unwrap()
    }

    fn results(entries: &[(&str, bool)]) -> HashMap<String, bool> {
        entries
            .iter()
            .map(|(p, g)| (p.to_string(), *g))
            .collect()
    }

    #[test]
    fn test_empty_input_finishes_immediately() {
        let callback = Arc::new(CountingCallback::default());
        let mut orchestrator =
            Orchestrator::new(Arc::new(NoopCache)).with_callback(&callback);
        let directive = orchestrator.start(vec![], &AlwaysUndecided).unwrap();
        assert_eq!(directive, Directive::Finished(Outcome::default()));
        assert_eq!(orchestrator.state(), OrchestratorState::Finished);
        assert_eq!(callback.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concrete_scenario() {
        // [CAMERA], then [READ_STORAGE, WRITE_STORAGE] with abort-on-deny.
        let callback = Arc::new(CountingCallback::default());
        let cache = Arc::new(RecordingCache::default());
        let mut orchestrator =
            Orchestrator::new(cache.clone()).with_callback(&callback);

        let directive = orchestrator
            .start(
                vec![
                    group(&["CAMERA"]),
                    abort_group(&["READ_STORAGE", "WRITE_STORAGE"]),
                ],
                &AlwaysUndecided,
            )
            .unwrap();
        assert_eq!(
            directive,
            Directive::RequestPermissions(vec!["CAMERA".into()])
        );

        let directive = orchestrator
            .platform_result(&results(&[("CAMERA", true)]))
            .unwrap();
        assert_eq!(
            directive,
            Directive::RequestPermissions(vec![
                "READ_STORAGE".into(),
                "WRITE_STORAGE".into()
            ])
        );

        let directive = orchestrator
            .platform_result(&results(&[
                ("READ_STORAGE", false),
                ("WRITE_STORAGE", false),
            ]))
            .unwrap();
        match directive {
            Directive::Finished(outcome) => {
                assert_eq!(outcome.granted, ["CAMERA"]);
                assert_eq!(outcome.denied, ["READ_STORAGE", "WRITE_STORAGE"]);
            }
            other => panic!("expected Finished, got {:?}", other),
        }

        let (granted, denied) = callback.last.lock().clone().unwrap();
        assert_eq!(granted, ["CAMERA"]);
        assert_eq!(denied, ["READ_STORAGE", "WRITE_STORAGE"]);
        assert_eq!(callback.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.writes.lock().len(), 3);
    }

    #[test]
    fn test_pre_granted_group_is_skipped() {
        let probe = FixedProbe {
            granted: vec!["A"],
            permanently_denied: vec![],
        };
        let mut orchestrator = Orchestrator::new(Arc::new(NoopCache));
        let directive = orchestrator
            .start(vec![group(&["A"]), group(&["B"])], &probe)
            .unwrap();
        // A never surfaces anything; the first directive requests B.
        assert_eq!(directive, Directive::RequestPermissions(vec!["B".into()]));
    }

    #[test]
    fn test_abort_propagation() {
        let cache = Arc::new(RecordingCache::default());
        let mut orchestrator = Orchestrator::new(cache.clone());
        let directive = orchestrator
            .start(
                vec![abort_group(&["A"]), group(&["B"]), group(&["C"])],
                &AlwaysUndecided,
            )
            .unwrap();
        assert_eq!(directive, Directive::RequestPermissions(vec!["A".into()]));

        let directive = orchestrator
            .platform_result(&results(&[("A", false)]))
            .unwrap();
        match directive {
            Directive::Finished(outcome) => {
                assert!(outcome.granted.is_empty());
                assert_eq!(outcome.denied, ["A", "B", "C"]);
            }
            other => panic!("expected Finished, got {:?}", other),
        }
        // The platform primitive was never asked about B or C.
        assert_eq!(*cache.writes.lock(), [("A".to_string(), false)]);
    }

    #[test]
    fn test_explanation_decline_without_abort_continues() {
        let mut orchestrator = Orchestrator::new(Arc::new(NoopCache));
        let directive = orchestrator
            .start(
                vec![explained_group(&["A"], false), group(&["B"])],
                &AlwaysUndecided,
            )
            .unwrap();
        assert!(matches!(directive, Directive::ShowExplanation(_)));

        let directive = orchestrator.explanation_outcome(false).unwrap();
        assert_eq!(directive, Directive::RequestPermissions(vec!["B".into()]));

        let directive = orchestrator
            .platform_result(&results(&[("B", true)]))
            .unwrap();
        match directive {
            Directive::Finished(outcome) => {
                assert_eq!(outcome.granted, ["B"]);
                assert_eq!(outcome.denied, ["A"]);
            }
            other => panic!("expected Finished, got {:?}", other),
        }
    }

    #[test]
    fn test_explanation_decline_with_abort_cancels_rest() {
        let mut orchestrator = Orchestrator::new(Arc::new(NoopCache));
        let directive = orchestrator
            .start(
                vec![explained_group(&["A"], true), group(&["B"])],
                &AlwaysUndecided,
            )
            .unwrap();
        assert!(matches!(directive, Directive::ShowExplanation(_)));

        let directive = orchestrator.explanation_outcome(false).unwrap();
        match directive {
            Directive::Finished(outcome) => {
                assert!(outcome.granted.is_empty());
                assert_eq!(outcome.denied, ["A", "B"]);
            }
            other => panic!("expected Finished, got {:?}", other),
        }
    }

    #[test]
    fn test_explanation_agree_requests_group() {
        let mut orchestrator = Orchestrator::new(Arc::new(NoopCache));
        let directive = orchestrator
            .start(vec![explained_group(&["A"], false)], &AlwaysUndecided)
            .unwrap();
        let explanation = match directive {
            Directive::ShowExplanation(explanation) => explanation,
            other => panic!("expected ShowExplanation, got {:?}", other),
        };
        assert_eq!(explanation.message, "why we ask");

        let directive = orchestrator.explanation_outcome(true).unwrap();
        assert_eq!(directive, Directive::RequestPermissions(vec!["A".into()]));
    }

    #[test]
    fn test_duplicate_platform_result_is_rejected() {
        let callback = Arc::new(CountingCallback::default());
        let mut orchestrator =
            Orchestrator::new(Arc::new(NoopCache)).with_callback(&callback);
        orchestrator
            .start(vec![group(&["A"]), group(&["B"])], &AlwaysUndecided)
            .unwrap();

        let directive = orchestrator
            .platform_result(&results(&[("A", true)]))
            .unwrap();
        assert_eq!(directive, Directive::RequestPermissions(vec!["B".into()]));

        // The platform misbehaves and delivers A's result a second time.
        let err = orchestrator
            .platform_result(&results(&[("A", true)]))
            .unwrap_err();
        assert!(matches!(err, PermFlowError::IllegalState(_)));

        let directive = orchestrator
            .platform_result(&results(&[("B", true)]))
            .unwrap();
        match directive {
            Directive::Finished(outcome) => {
                assert_eq!(outcome.granted, ["A", "B"]);
                assert!(outcome.denied.is_empty());
            }
            other => panic!("expected Finished, got {:?}", other),
        }
        assert_eq!(callback.calls.load(Ordering::SeqCst), 1);

        // Another replay after the session ended is rejected too.
        let err = orchestrator
            .platform_result(&results(&[("B", true)]))
            .unwrap_err();
        assert!(matches!(err, PermFlowError::IllegalState(_)));
        assert_eq!(callback.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_missing_result_entry_counts_as_denied() {
        let cache = Arc::new(RecordingCache::default());
        let mut orchestrator = Orchestrator::new(cache.clone());
        orchestrator
            .start(vec![group(&["A", "B"])], &AlwaysUndecided)
            .unwrap();

        let directive = orchestrator
            .platform_result(&results(&[("A", true)]))
            .unwrap();
        match directive {
            Directive::Finished(outcome) => {
                assert_eq!(outcome.granted, ["A"]);
                assert_eq!(outcome.denied, ["B"]);
            }
            other => panic!("expected Finished, got {:?}", other),
        }
        // The omitted entry is not a user decision and is not persisted.
        assert_eq!(*cache.writes.lock(), [("A".to_string(), true)]);
    }

    #[test]
    fn test_overlapping_groups_request_only_remainder() {
        let mut orchestrator = Orchestrator::new(Arc::new(NoopCache));
        let directive = orchestrator
            .start(vec![group(&["A"]), group(&["A", "B"])], &AlwaysUndecided)
            .unwrap();
        assert_eq!(directive, Directive::RequestPermissions(vec!["A".into()]));

        let directive = orchestrator
            .platform_result(&results(&[("A", true)]))
            .unwrap();
        assert_eq!(directive, Directive::RequestPermissions(vec!["B".into()]));

        let directive = orchestrator
            .platform_result(&results(&[("B", false)]))
            .unwrap();
        match directive {
            Directive::Finished(outcome) => {
                assert_eq!(outcome.granted, ["A"]);
                assert_eq!(outcome.denied, ["B"]);
            }
            other => panic!("expected Finished, got {:?}", other),
        }
    }

    #[test]
    fn test_dropped_callback_does_not_block_finish() {
        let callback = Arc::new(CountingCallback::default());
        let mut orchestrator =
            Orchestrator::new(Arc::new(NoopCache)).with_callback(&callback);
        orchestrator
            .start(vec![group(&["A"])], &AlwaysUndecided)
            .unwrap();
        drop(callback);

        let directive = orchestrator
            .platform_result(&results(&[("A", true)]))
            .unwrap();
        assert!(matches!(directive, Directive::Finished(_)));
        assert_eq!(orchestrator.outcome().unwrap().granted, ["A"]);
    }

    #[test]
    fn test_start_twice_is_illegal() {
        let mut orchestrator = Orchestrator::new(Arc::new(NoopCache));
        orchestrator
            .start(vec![group(&["A"])], &AlwaysUndecided)
            .unwrap();
        let err = orchestrator
            .start(vec![group(&["B"])], &AlwaysUndecided)
            .unwrap_err();
        assert!(matches!(err, PermFlowError::IllegalState(_)));
    }

    #[test]
    fn test_explanation_outcome_without_prompt_is_illegal() {
        let mut orchestrator = Orchestrator::new(Arc::new(NoopCache));
        let err = orchestrator.explanation_outcome(true).unwrap_err();
        assert!(matches!(err, PermFlowError::IllegalState(_)));
    }

    #[test]
    fn test_events_trace_the_session() {
        let mut orchestrator = Orchestrator::new(Arc::new(NoopCache));
        let subscription = orchestrator.event_bus().subscribe();
        orchestrator
            .start(vec![group(&["A"])], &AlwaysUndecided)
            .unwrap();
        orchestrator
            .platform_result(&results(&[("A", true)]))
            .unwrap();

        let events: Vec<PermissionEvent> = subscription.iter().collect();
        assert!(matches!(
            events[0],
            PermissionEvent::SessionStarted { pending_groups: 1 }
        ));
        assert!(matches!(
            events[1],
            PermissionEvent::PlatformRequestIssued { .. }
        ));
        assert!(matches!(
            events[2],
            PermissionEvent::DecisionRecorded { granted: true, .. }
        ));
        assert!(matches!(
            events.last(),
            Some(PermissionEvent::SessionFinished { .. })
        ));
    }
}
