//! # sevi-jobs
//!
//! Maintenance scheduling and indexing for the ontology service.
//!
//! This crate provides:
//! - Single-flight admission of maintenance operations
//! - A one-slot worker running each operation to completion
//! - Lifecycle notifications via broadcast channels
//! - Bounded fan-out of concepts, top-level batches and views to the indexer
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use sevi_jobs::{MaintenanceOp, MaintenanceWorker, NoOpHandler, UpdateOrchestrator};
//!
//! let worker = MaintenanceWorker::new(Arc::new(NoOpHandler)).start();
//! let orchestrator = UpdateOrchestrator::new(worker, Duration::from_secs(5));
//!
//! // Listen for events
//! let mut events = orchestrator.events();
//!
//! // A second call while this one runs answers `UpdateResponse::Conflict`
//! let response = orchestrator.run_update(MaintenanceOp::Fetch).await?;
//!
//! // Graceful shutdown
//! orchestrator.shutdown().await?;
//! ```

pub mod handler;
pub mod indexing;
pub mod orchestrator;
pub mod worker;

// Re-export core types
pub use sevi_core::*;

pub use handler::{
    MaintenanceContext, MaintenanceHandler, MaintenanceOp, MaintenanceResult, NoOpHandler,
};
pub use indexing::{HttpIndexingTransport, IndexReport, IndexingDispatcher};
pub use orchestrator::{MaintenanceTicket, UpdateGuard, UpdateOrchestrator, UpdateResponse};
pub use worker::{MaintenanceEvent, MaintenanceWorker, WorkerHandle};
