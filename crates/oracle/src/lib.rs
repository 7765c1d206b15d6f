//! Stateful services for the Aura credit oracle.
//!
//! This crate provides:
//! - Configuration loading and validation
//! - SQLite storage for passports, enrollments, badges, API keys and events
//! - The per-wallet feature cache
//! - Signal collection from external providers with bounded timeouts
//! - The scoring pipeline and the continuous refresh scheduler
//! - API key issuance and quota enforcement
//! - Proof-of-humanity enrollment and badge issuance
//!
//! # Architecture
//!
//! ```text
//! signal sources ──► feature cache ──► scoring + reputation engines
//!                                              │
//!                                              ▼
//!                   scheduler ──────────► passport (SQLite) ──► events
//!                                              │
//!                                              ▼
//!                                   API key gate ──► aura-api
//! ```
//!
//! The scheduler drives the same pipeline on a timer that the API drives
//! per request. Every read-compute-write of a passport runs under that
//! wallet's lock.

#![warn(clippy::all)]

pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod feature_store;
pub mod gate;
pub mod locks;
pub mod pipeline;
pub mod poh;
pub mod reputation;
pub mod scheduler;
pub mod sources;
pub mod storage;
pub mod store;

pub use config::Config;
pub use context::AppContext;
pub use error::{OracleError, OracleResult, RateLimit};
