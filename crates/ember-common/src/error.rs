//! Error types shared across Ember crates.

use thiserror::Error;

use crate::version::SchemaVersion;

/// Top-level error type for Ember wire and storage operations.
#[derive(Debug, Error)]
pub enum EmberError {
    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Payload did not start with the expected magic bytes
    #[error("Invalid payload format")]
    InvalidFormat,

    /// Schema version mismatch
    #[error("Schema version mismatch: expected {expected}, got {actual}")]
    VersionMismatch {
        /// Expected version
        expected: SchemaVersion,
        /// Actual version found
        actual: SchemaVersion,
    },
}

/// Result type alias for Ember operations.
pub type EmberResult<T> = Result<T, EmberError>;
