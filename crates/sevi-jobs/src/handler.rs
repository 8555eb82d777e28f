//! Maintenance operations and the handler that executes them.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use sevi_core::ConceptType;

/// A long-running maintenance operation. At most one runs at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum MaintenanceOp {
    /// Clear both triple store services, then evict caches.
    Delete,
    /// Delete, reload every source document, then evict caches.
    Fetch,
    /// Fetch, then index everything.
    FetchAndIndex,
    /// Index the selected parts. Omitted parts are indexed.
    Index {
        #[serde(default = "default_true")]
        all: bool,
        #[serde(default = "default_true")]
        top_levels: bool,
        #[serde(default = "default_true")]
        views: bool,
    },
    /// Index every concept of one vocabulary.
    IndexType { concept_type: ConceptType },
    /// Index classification top-level concepts as one batch.
    IndexTopLevels,
    /// Index classification views as one batch.
    IndexViews,
}

fn default_true() -> bool {
    true
}

impl MaintenanceOp {
    /// Index every part.
    pub fn index_everything() -> Self {
        MaintenanceOp::Index {
            all: true,
            top_levels: true,
            views: true,
        }
    }

    /// Short operation name for logs and events.
    pub fn name(&self) -> &'static str {
        match self {
            MaintenanceOp::Delete => "delete",
            MaintenanceOp::Fetch => "fetch",
            MaintenanceOp::FetchAndIndex => "fetch_and_index",
            MaintenanceOp::Index { .. } => "index",
            MaintenanceOp::IndexType { .. } => "index_type",
            MaintenanceOp::IndexTopLevels => "index_top_levels",
            MaintenanceOp::IndexViews => "index_views",
        }
    }

    /// Whether the operation rewrites the triple store.
    pub fn is_destructive(&self) -> bool {
        matches!(
            self,
            MaintenanceOp::Delete | MaintenanceOp::Fetch | MaintenanceOp::FetchAndIndex
        )
    }
}

impl fmt::Display for MaintenanceOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Progress callback type for maintenance handlers.
pub type ProgressCallback = Box<dyn Fn(i32, Option<&str>) + Send + Sync>;

/// Context provided to maintenance handlers.
pub struct MaintenanceContext {
    /// Identifier of this run (UUIDv7).
    pub run_id: Uuid,
    /// The operation to perform.
    pub op: MaintenanceOp,
    progress_callback: Option<ProgressCallback>,
}

impl MaintenanceContext {
    pub fn new(op: MaintenanceOp) -> Self {
        Self {
            run_id: Uuid::now_v7(),
            op,
            progress_callback: None,
        }
    }

    /// Set the progress callback.
    pub fn with_progress_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(i32, Option<&str>) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Box::new(callback));
        self
    }

    /// Report progress to the callback.
    pub fn report_progress(&self, percent: i32, message: Option<&str>) {
        if let Some(ref callback) = self.progress_callback {
            callback(percent, message);
        }
    }
}

impl fmt::Debug for MaintenanceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaintenanceContext")
            .field("run_id", &self.run_id)
            .field("op", &self.op)
            .finish()
    }
}

/// Result of a maintenance run.
#[derive(Debug, Clone, PartialEq)]
pub enum MaintenanceResult {
    /// Completed, with optional summary data.
    Success(Option<JsonValue>),
    /// Failed with an error message. Never retried.
    Failed(String),
}

impl MaintenanceResult {
    pub fn is_success(&self) -> bool {
        matches!(self, MaintenanceResult::Success(_))
    }
}

/// Executes maintenance operations.
#[async_trait]
pub trait MaintenanceHandler: Send + Sync {
    async fn execute(&self, ctx: MaintenanceContext) -> MaintenanceResult;
}

/// No-op handler for testing.
pub struct NoOpHandler;

#[async_trait]
impl MaintenanceHandler for NoOpHandler {
    async fn execute(&self, ctx: MaintenanceContext) -> MaintenanceResult {
        ctx.report_progress(50, Some("Processing..."));
        ctx.report_progress(100, Some("Done"));
        MaintenanceResult::Success(None)
    }
}
