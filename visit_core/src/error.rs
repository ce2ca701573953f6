//! Error types for the visit_core library.
//!
//! Only the boundary operations (config files, schema and snapshot loading,
//! CSV reports) return these. Schema evaluation itself never fails: missing
//! inputs surface as `None` and findings as plain data.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for visit_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Schema document could not be interpreted
    #[error("Schema error: {0}")]
    Schema(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
