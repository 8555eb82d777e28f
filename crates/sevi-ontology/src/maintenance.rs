//! Maintenance runs: reload the triple store, evict caches, reindex.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::{info, instrument, warn};

use sevi_core::{Concept, ConceptType, DatasetStore, Error, Result, View};
use sevi_jobs::{
    IndexReport, IndexingDispatcher, MaintenanceContext, MaintenanceHandler, MaintenanceOp,
    MaintenanceResult,
};
use sevi_sparql::{ConceptRepository, HierarchyAssembler};

use crate::cache::ConceptCache;

/// Top-level concepts of every classification facet, in facet order.
pub(crate) async fn classification_top_levels(
    repository: &ConceptRepository,
) -> Result<Vec<Concept>> {
    let mut top_levels = Vec::new();
    for concept_type in ConceptType::classifications() {
        top_levels.extend(repository.top_level_concepts(*concept_type).await?);
    }
    Ok(top_levels)
}

/// View trees of every classification facet.
pub(crate) async fn classification_views(repository: &ConceptRepository) -> Result<Vec<View>> {
    let top_levels = classification_top_levels(repository).await?;
    HierarchyAssembler::new(repository).assemble(top_levels).await
}

/// Counters collected over one run.
#[derive(Debug, Default)]
struct RunSummary {
    concepts: IndexReport,
    top_levels: Option<usize>,
    views: Option<usize>,
    evicted: Option<usize>,
}

impl RunSummary {
    fn into_result(self) -> MaintenanceResult {
        if !self.concepts.is_complete() {
            return MaintenanceResult::Failed(format!(
                "{} of {} concepts could not be queued for indexing",
                self.concepts.failed,
                self.concepts.sent + self.concepts.failed
            ));
        }
        MaintenanceResult::Success(Some(json!({
            "indexed": self.concepts.sent,
            "topLevels": self.top_levels,
            "views": self.views,
            "evicted": self.evicted,
        })))
    }
}

/// Executes [`MaintenanceOp`]s against the triple store and the indexer.
pub struct OntologyMaintenance {
    repository: Arc<ConceptRepository>,
    store: Arc<dyn DatasetStore>,
    dispatcher: Arc<IndexingDispatcher>,
    cache: ConceptCache,
}

impl OntologyMaintenance {
    pub fn new(
        repository: Arc<ConceptRepository>,
        store: Arc<dyn DatasetStore>,
        dispatcher: Arc<IndexingDispatcher>,
        cache: ConceptCache,
    ) -> Self {
        Self {
            repository,
            store,
            dispatcher,
            cache,
        }
    }

    async fn run(&self, ctx: &MaintenanceContext) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        match ctx.op {
            MaintenanceOp::Delete => {
                let deleted = self.store.delete_all().await;
                summary.evicted = Some(self.cache.evict_all().await);
                deleted?;
            }
            MaintenanceOp::Fetch => self.fetch(ctx, &mut summary).await?,
            MaintenanceOp::FetchAndIndex => {
                self.fetch(ctx, &mut summary).await?;
                self.index(ctx, true, true, true, &mut summary).await?;
            }
            MaintenanceOp::Index {
                all,
                top_levels,
                views,
            } => self.index(ctx, all, top_levels, views, &mut summary).await?,
            MaintenanceOp::IndexType { concept_type } => {
                summary.concepts = self.index_type(concept_type).await?;
            }
            MaintenanceOp::IndexTopLevels => {
                summary.top_levels = Some(self.index_top_levels().await?);
            }
            MaintenanceOp::IndexViews => {
                summary.views = Some(self.index_views().await?);
            }
        }
        Ok(summary)
    }

    /// Delete, reload and evict. Caches are evicted once the store was
    /// touched, even when reloading failed.
    async fn fetch(&self, ctx: &MaintenanceContext, summary: &mut RunSummary) -> Result<()> {
        ctx.report_progress(0, Some("Deleting datasets"));
        let reloaded = match self.store.delete_all().await {
            Ok(()) => {
                ctx.report_progress(20, Some("Loading source documents"));
                self.store.create_all().await
            }
            Err(e) => Err(e),
        };
        summary.evicted = Some(self.cache.evict_all().await);
        reloaded
    }

    async fn index(
        &self,
        ctx: &MaintenanceContext,
        all: bool,
        top_levels: bool,
        views: bool,
        summary: &mut RunSummary,
    ) -> Result<()> {
        if top_levels {
            ctx.report_progress(40, Some("Indexing top-level concepts"));
            summary.top_levels = Some(self.index_top_levels().await?);
        }
        if views {
            ctx.report_progress(50, Some("Indexing views"));
            summary.views = Some(self.index_views().await?);
        }
        if all {
            let vocabularies = ConceptType::vocabularies();
            for (i, concept_type) in vocabularies.iter().enumerate() {
                let percent = 60 + (i * 40 / vocabularies.len()) as i32;
                ctx.report_progress(percent, Some(concept_type.as_str()));
                summary.concepts += self.index_type(*concept_type).await?;
            }
        }
        ctx.report_progress(100, None);
        Ok(())
    }

    #[instrument(skip(self), fields(op = "index_type"))]
    async fn index_type(&self, concept_type: ConceptType) -> Result<IndexReport> {
        if concept_type == ConceptType::All {
            return Err(Error::InvalidConceptType(
                "ALL cannot be indexed per type".to_string(),
            ));
        }
        let concepts: Vec<Concept> = self.repository.concepts(concept_type).await?.collect();
        Ok(self.dispatcher.reindex_concepts(concepts).await)
    }

    async fn index_top_levels(&self) -> Result<usize> {
        let top_levels = classification_top_levels(&self.repository).await?;
        let count = top_levels.len();
        self.dispatcher.reindex_top_levels(top_levels).await?;
        Ok(count)
    }

    async fn index_views(&self) -> Result<usize> {
        let views = classification_views(&self.repository).await?;
        let count = views.len();
        self.dispatcher.reindex_views(views).await?;
        Ok(count)
    }
}

#[async_trait]
impl MaintenanceHandler for OntologyMaintenance {
    #[instrument(skip(self, ctx), fields(run_id = %ctx.run_id, op = ctx.op.name()))]
    async fn execute(&self, ctx: MaintenanceContext) -> MaintenanceResult {
        match self.run(&ctx).await {
            Ok(summary) => {
                let result = summary.into_result();
                if let MaintenanceResult::Failed(ref error) = result {
                    warn!(%error, "Maintenance finished with indexing failures");
                } else {
                    info!("Maintenance run finished");
                }
                result
            }
            Err(e) => MaintenanceResult::Failed(e.to_string()),
        }
    }
}
