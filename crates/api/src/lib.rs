//! HTTP surface of the Aura credit oracle.
//!
//! Keyed routes (risk, reputation, trust and passports) consume one request
//! from the caller's `X-API-Key` quota. Proof-of-humanity, threshold proof,
//! API key management and status routes are open.

#![warn(missing_docs)]

/// API server runtime and in-process app builder.
pub mod server;
