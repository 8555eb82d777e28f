//! # sevi-ontology
//!
//! Concept service over the SKOS vocabularies held in Fuseki.
//!
//! This crate provides:
//! - [`OntologyService`]: cached read operations and maintenance entry points
//! - [`ConceptCache`]: the process-wide cache-aside store
//! - [`OntologyMaintenance`]: the handler executing delete, fetch and reindex
//!   runs on the single maintenance worker
//!
//! ## Example
//!
//! ```ignore
//! use sevi_ontology::{OntologyConfig, OntologyService, UpdateResponse};
//!
//! let service = OntologyService::from_config(OntologyConfig::from_env())?;
//! let concept = service.get_concept("http://www.yso.fi/onto/jupo/p1074").await?;
//!
//! match service.fetch_and_index().await? {
//!     UpdateResponse::Conflict => println!("an update is already running"),
//!     other => println!("{:?}", other),
//! }
//! ```

pub mod cache;
pub mod maintenance;
pub mod service;

// Re-export core types
pub use sevi_core::*;

pub use cache::{CacheStats, CachedValue, Cacheable, ConceptCache};
pub use maintenance::OntologyMaintenance;
pub use service::OntologyService;
pub use sevi_jobs::{
    MaintenanceEvent, MaintenanceOp, MaintenanceResult, MaintenanceTicket, UpdateResponse,
};
