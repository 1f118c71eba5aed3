//! Error types shared across Chimera crates.

use thiserror::Error;

use crate::version::SchemaVersion;

/// Top-level error type for Chimera operations.
#[derive(Debug, Error)]
pub enum ChimeraError {
    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be used
    #[error("Config error: {0}")]
    Config(String),

    /// File did not start with the expected magic bytes
    #[error("Bad magic bytes: expected {expected:?}, got {actual:?}")]
    BadMagic {
        /// Expected magic
        expected: [u8; 4],
        /// Magic found in the data
        actual: [u8; 4],
    },

    /// Schema version mismatch
    #[error("Schema version mismatch: expected {expected}, got {actual}")]
    VersionMismatch {
        /// Expected version
        expected: SchemaVersion,
        /// Actual version found
        actual: SchemaVersion,
    },
}

/// Result type alias for Chimera operations.
pub type ChimeraResult<T> = Result<T, ChimeraError>;
