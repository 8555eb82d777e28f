//! Core traits for the external collaborators.
//!
//! The triple store and the indexing transport are reached only through
//! these traits, so the query, cache and maintenance layers can be tested
//! without a network.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;

use crate::defaults;
use crate::error::Result;
use crate::models::IndexQueue;
use crate::results::Solutions;

// =============================================================================
// QUERY EXECUTION
// =============================================================================

/// Which logical query service a query is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryEndpoint {
    /// Dataset with inference enabled.
    Inference,
    /// Dataset without inference.
    Plain,
}

/// Endpoint plus per-call timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionProfile {
    pub endpoint: QueryEndpoint,
    pub timeout: Duration,
}

impl ExecutionProfile {
    /// Short-timeout profile for single lookups and traversal.
    pub fn standard(endpoint: QueryEndpoint) -> Self {
        Self {
            endpoint,
            timeout: Duration::from_secs(defaults::QUERY_TIMEOUT_SECS),
        }
    }

    /// Long-timeout profile for bulk listings.
    pub fn bulk(endpoint: QueryEndpoint) -> Self {
        Self {
            endpoint,
            timeout: Duration::from_secs(defaults::BULK_QUERY_TIMEOUT_SECS),
        }
    }

    /// Override the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Executes SELECT queries against the triple store.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Run `query` with the given profile and return its rows.
    async fn select(&self, query: &str, profile: ExecutionProfile) -> Result<Solutions>;
}

// =============================================================================
// DATASET MAINTENANCE
// =============================================================================

/// Replaces or clears the triple store contents on every logical service.
#[async_trait]
pub trait DatasetStore: Send + Sync {
    /// Load every configured source document into every service.
    async fn create_all(&self) -> Result<()>;

    /// Remove all data from every service.
    async fn delete_all(&self) -> Result<()>;
}

// =============================================================================
// INDEXING
// =============================================================================

/// Delivers documents to the search index.
#[async_trait]
pub trait IndexingTransport: Send + Sync {
    /// Send a single document.
    async fn send(
        &self,
        document: JsonValue,
        indexed_at: DateTime<Utc>,
        queue: IndexQueue,
    ) -> Result<()>;

    /// Send a batch of documents as one message.
    async fn send_batch(
        &self,
        documents: Vec<JsonValue>,
        indexed_at: DateTime<Utc>,
        queue: IndexQueue,
    ) -> Result<()>;
}
