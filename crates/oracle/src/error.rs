//! Error types for the oracle services.

use aura_core::CoreError;
use aura_prover::ProverError;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Which limit rejected a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RateLimit {
    /// API key quota exhausted.
    Quota {
        /// Tier quota.
        limit: i64,
        /// Requests already consumed.
        used: i64,
    },
    /// Forced refresh cooldown still running.
    Cooldown {
        /// Seconds until the next refresh is allowed.
        retry_after_secs: u64,
    },
}

impl fmt::Display for RateLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateLimit::Quota { limit, used } => {
                write!(f, "quota of {} requests exhausted ({} used)", limit, used)
            }
            RateLimit::Cooldown { retry_after_secs } => {
                write!(f, "refresh cooldown active, retry in {}s", retry_after_secs)
            }
        }
    }
}

/// Oracle service error.
#[derive(Debug, Error)]
pub enum OracleError {
    /// Requested entity does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed or out-of-range input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A badge was already issued for this identity.
    #[error("Identity already holds a badge (nullifier {nullifier})")]
    DuplicateIdentity {
        /// Conflicting nullifier.
        nullifier: String,
    },

    /// Request rejected by a quota or cooldown.
    #[error("Rate limited: {0}")]
    RateLimited(RateLimit),

    /// API key unknown or revoked.
    #[error("Invalid or revoked API key")]
    InvalidKey,

    /// A required collaborator could not be reached.
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Anything else.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<CoreError> for OracleError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Canonicalization(_) => OracleError::Internal(err.into()),
            other => OracleError::InvalidInput(other.to_string()),
        }
    }
}

impl From<ProverError> for OracleError {
    fn from(err: ProverError) -> Self {
        match err {
            ProverError::Core(core) => core.into(),
            other => OracleError::InvalidInput(other.to_string()),
        }
    }
}

/// Result alias for oracle operations.
pub type OracleResult<T> = std::result::Result<T, OracleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_parse_errors_become_invalid_input() {
        let err: OracleError = CoreError::InvalidAddress("0x12".into()).into();
        assert!(matches!(err, OracleError::InvalidInput(_)));

        let err: OracleError = CoreError::Canonicalization("boom".into()).into();
        assert!(matches!(err, OracleError::Internal(_)));
    }

    #[test]
    fn test_prover_errors_map_to_input_errors() {
        let err: OracleError = ProverError::EmptySecret.into();
        assert!(matches!(err, OracleError::InvalidInput(_)));
    }

    #[test]
    fn test_rate_limit_details_serialize_flat() {
        let quota = serde_json::to_value(RateLimit::Quota { limit: 5, used: 5 }).unwrap();
        assert_eq!(quota, serde_json::json!({"limit": 5, "used": 5}));

        let cooldown =
            serde_json::to_value(RateLimit::Cooldown { retry_after_secs: 42 }).unwrap();
        assert_eq!(cooldown, serde_json::json!({"retry_after_secs": 42}));
    }
}
