//! # sevi-sparql
//!
//! SPARQL access to the concept vocabularies.
//!
//! This crate provides:
//! - A deterministic SELECT query builder
//! - Per concept type query strategies (scoped and all-schemes)
//! - Projection of result rows onto concepts
//! - A repository routing each query to the right endpoint and timeout
//! - Assembly of nested views from top-level concepts
//! - An HTTP client for Fuseki (queries and dataset maintenance)
//!
//! # Feature Flags
//!
//! - `mock`: Enable the in-memory [`mock::MockQueryExecutor`]

pub mod builder;
pub mod client;
pub mod hierarchy;
pub mod projection;
pub mod repository;
pub mod strategy;

// Mock query executor for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export core types
pub use sevi_core::*;

pub use builder::SparqlQueryBuilder;
pub use client::{FusekiClient, RdfFormat};
pub use hierarchy::{HierarchyAssembler, NarrowerLookup};
pub use projection::Concepts;
pub use repository::{ConceptRepository, QueryTimeouts};
pub use strategy::{ConceptQueryStrategy, SchemeScope, StrategyRegistry};
