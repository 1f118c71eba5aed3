//! Errors raised by the gameplay crate.
//!
//! Only data loading and persistence can fail. Combat itself never returns
//! errors: bad arguments are ignored and missing pieces are logged.

use chimera_common::ChimeraError;
use thiserror::Error;

/// Errors from blueprint data, tuning validation and snapshots.
#[derive(Debug, Error)]
pub enum CombatError {
    /// No blueprint with this name
    #[error("Unknown blueprint: {0}")]
    UnknownBlueprint(String),

    /// Blueprint data is inconsistent
    #[error("Invalid blueprint {name}: {reason}")]
    InvalidBlueprint {
        /// Blueprint name
        name: String,
        /// What is wrong with it
        reason: String,
    },

    /// Tuning value out of range
    #[error("Invalid tuning: {0}")]
    InvalidTuning(String),

    /// Data file could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// Snapshot could not be encoded or decoded
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Shared error from the common crate
    #[error(transparent)]
    Common(#[from] ChimeraError),
}

/// Result type alias for gameplay operations.
pub type CombatResult<T> = Result<T, CombatError>;
