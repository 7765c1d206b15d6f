//! # Aura Core
//!
//! Core types, constants and hashing utilities for the Aura credit oracle.
//!
//! This crate provides the building blocks shared by every Aura component so
//! that the scoring engine, the credential prover and the oracle services
//! agree on addresses, tiers and commitment formats.
//!
//! ## Features
//!
//! - **Domain Types**: WalletAddress, RiskCategory, ReputationTier, ApiTier, VerificationLevel
//! - **Constants**: Published scoring weights, divisors and thresholds
//! - **Hashing**: SHA-256 over RFC 8785 canonical JSON

#![warn(missing_docs)]

pub mod constants;
pub mod error;
pub mod hashing;
pub mod types;

// Re-export commonly used items
pub use constants::*;
pub use error::{CoreError, Result};
pub use hashing::{canonical_json, hash_canonical, sha256_hex, sha256_prefixed};
pub use types::*;

pub use alloy_primitives::Address;
