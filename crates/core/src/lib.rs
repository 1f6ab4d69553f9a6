//! permflow-core - Permission request orchestration
//!
//! This crate provides the platform-independent heart of permflow: the
//! permission-group descriptor and builder, the request session with its
//! totality bookkeeping, and the orchestration state machine that sequences
//! explanation prompts, platform requests, and abort-on-deny propagation.
//! Platform bindings are supplied by hosts through the traits in
//! [`platform`].

pub mod descriptor;
pub mod error;
pub mod events;
pub mod orchestrator;
pub mod platform;
pub mod session;

pub use descriptor::{Explanation, PermissionGroup, PermissionGroupBuilder};
pub use error::{PermFlowError, Result};
pub use events::{EventBus, EventSubscription, PermissionEvent};
pub use orchestrator::{Directive, Orchestrator, OrchestratorState};
pub use platform::{DecisionCache, PermissionCallback, StatusProbe};
pub use session::Outcome;

/// permflow version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
