//! Error types for dmf-fusion
//!
//! Per-request analysis never surfaces these to the caller: malformed records
//! are dropped and analyzer failures degrade to fewer sources. Only
//! construction-time configuration problems are fatal.

use thiserror::Error;

/// Fusion error type
#[derive(Debug, Error)]
pub enum FusionError {
    /// Entity name has no alphanumeric content after canonicalization
    #[error("Invalid entity name: {0:?}")]
    InvalidEntityName(String),

    /// Invalid construction-time configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// dmf-common error
    #[error("Common error: {0}")]
    Common(#[from] dmf_common::Error),
}

/// Result type for fallible fusion operations
pub type FusionResult<T> = Result<T, FusionError>;
