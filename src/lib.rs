//! permflow - Sequential runtime-permission request orchestration
//!
//! A host-agnostic reimplementation of the sequential permission-request
//! flow found in mobile permission toolkits: ordered permission groups with
//! per-group explanation prompts and abort-on-deny policy, driven through a
//! small state machine that delivers a total granted/denied partition to a
//! weakly-held callback exactly once.
//!
//! ## Architecture
//!
//! permflow is organized into two crates:
//!
//! - `permflow-core`: descriptors, request sessions, the orchestration
//!   state machine, and the collaborator traits hosts implement
//! - `permflow-store`: persisted decision records with a TOML backend and
//!   the permanently-denied probe built on them
//!
//! ## Driving a session
//!
//! The orchestrator returns a [`Directive`](permflow_core::Directive) from
//! each transition; the host surfaces it (explanation dialog, platform
//! request) and feeds the outcome back. No platform calls happen inside the
//! library.

pub use permflow_core as core;
pub use permflow_store as store;

/// Prelude module for convenient imports
pub mod prelude {
    pub use permflow_core::{
        DecisionCache, Directive, EventBus, Explanation, Orchestrator, OrchestratorState,
        Outcome, PermFlowError, PermissionCallback, PermissionEvent, PermissionGroup,
        StatusProbe,
    };
    pub use permflow_store::{
        CachedProbe, DecisionFlag, DecisionStore, PlatformSignals, StoreConfig,
    };
}
