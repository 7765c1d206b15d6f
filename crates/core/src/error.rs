//! Error types for the core crate.

use thiserror::Error;

/// Core error type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Invalid wallet address format.
    #[error("Invalid address format: {0}")]
    InvalidAddress(String),

    /// Unknown API key tier.
    #[error("Invalid tier: {0} (expected free, pro or enterprise)")]
    InvalidTier(String),

    /// Unknown risk category label.
    #[error("Invalid risk category: {0}")]
    InvalidRiskCategory(String),

    /// Unknown verification level label.
    #[error("Invalid verification level: {0}")]
    InvalidVerificationLevel(String),

    /// Invalid hex encoding.
    #[error("Invalid hex encoding")]
    InvalidHex,

    /// Canonical JSON serialization failed.
    #[error("Canonical JSON encoding failed: {0}")]
    Canonicalization(String),
}

/// Result type alias for CoreError.
pub type Result<T> = std::result::Result<T, CoreError>;
