//! Error types for permflow
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// Main error type for permission orchestration
#[derive(Error, Debug)]
pub enum PermFlowError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Illegal state: {0}")]
    IllegalState(String),
}

/// Result type alias for permflow operations
pub type Result<T> = std::result::Result<T, PermFlowError>;

impl PermFlowError {
    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            PermFlowError::InvalidArgument(msg) => format!("Invalid request: {}", msg),
            PermFlowError::IllegalState(msg) => format!("Orchestrator misuse: {}", msg),
        }
    }
}
