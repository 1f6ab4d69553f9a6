//! Error types for the decision store

use thiserror::Error;

/// Errors raised while loading or saving decision records
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Store path error: {0}")]
    Path(String),
}

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, StoreError>;
