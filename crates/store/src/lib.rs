//! permflow-store - Persisted permission decisions
//!
//! The Decision Cache behind the orchestrator: per-permission records of
//! past outcomes (flag, last request time, deny counter) with a TOML file
//! backend, a deny back-off window, and the permanently-denied probe built
//! on top of the records.

pub mod error;
pub mod flags;
pub mod probe;
pub mod store;

pub use error::{Result, StoreError};
pub use flags::{DecisionFlag, DecisionRecord};
pub use probe::{CachedProbe, PlatformSignals};
pub use store::{DecisionStore, StoreConfig};
