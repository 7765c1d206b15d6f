//! Prover error type.

use aura_core::CoreError;
use thiserror::Error;

/// Errors raised while building credentials and proofs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProverError {
    /// The identity secret was empty.
    #[error("identity secret must not be empty")]
    EmptySecret,

    /// Attestation data could not be encoded.
    #[error("invalid attestation data: {0}")]
    InvalidAttestation(String),

    /// Hashing or canonicalization failed.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type alias for ProverError.
pub type Result<T> = std::result::Result<T, ProverError>;
