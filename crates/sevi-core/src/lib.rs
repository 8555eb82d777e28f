//! # sevi-core
//!
//! Core types, traits, and abstractions for the sevi ontology service.
//!
//! This crate provides the foundational data structures and trait definitions
//! that the query, maintenance and service crates depend on.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Maintenance step failed, index or store left stale |
//! | WARN  | Recoverable issue, e.g. a skipped source or a hierarchy cycle |
//! | INFO  | Lifecycle events, maintenance start and completion |
//! | DEBUG | Query execution, cache fills and evictions |
//! | TRACE | Per-row iteration |
//!
//! Structured fields used across crates: `concept_type`, `concept_uri`, `op`,
//! `endpoint`, `result_count`, `duration_ms`, `run_id`, `queue`, `error`,
//! `cache_key`.

pub mod config;
pub mod defaults;
pub mod error;
pub mod models;
pub mod results;
pub mod traits;

// Re-export commonly used types at crate root
pub use config::{OntologyConfig, ProxyConfig};
pub use error::{Error, ErrorCategory, Result};
pub use models::*;
pub use results::{Solution, Solutions};
pub use traits::*;
