//! Ontology service facade.
//!
//! Read operations go through the cache; maintenance operations go through
//! the single-flight orchestrator. Every maintenance run that touches the
//! triple store evicts the whole cache.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value as JsonValue;
use tokio::sync::broadcast;
use tracing::{info, instrument};

use sevi_core::{
    Concept, ConceptType, DatasetStore, Error, OntologyConfig, QueryExecutor, Result, View,
};
use sevi_jobs::{
    HttpIndexingTransport, IndexingDispatcher, IndexingTransport, MaintenanceEvent,
    MaintenanceOp, MaintenanceTicket, MaintenanceWorker, UpdateOrchestrator, UpdateResponse,
};
use sevi_sparql::{ConceptRepository, FusekiClient};

use crate::cache::{CacheStats, ConceptCache};
use crate::maintenance::{classification_views, OntologyMaintenance};

/// Per-type listings serve one vocabulary or facet, never `ALL`.
fn refuse_all(concept_type: ConceptType) -> Result<()> {
    if concept_type == ConceptType::All {
        return Err(Error::InvalidConceptType(
            "listing every concept is not supported per type".to_string(),
        ));
    }
    Ok(())
}

/// Read and maintenance entry points of the ontology service.
pub struct OntologyService {
    repository: Arc<ConceptRepository>,
    dispatcher: Arc<IndexingDispatcher>,
    cache: ConceptCache,
    orchestrator: UpdateOrchestrator,
}

impl OntologyService {
    /// Wire the service from its collaborators and start the maintenance
    /// worker. Must be called inside a tokio runtime.
    pub fn new(
        repository: ConceptRepository,
        store: Arc<dyn DatasetStore>,
        dispatcher: IndexingDispatcher,
        response_timeout: Duration,
    ) -> Self {
        let repository = Arc::new(repository);
        let dispatcher = Arc::new(dispatcher);
        let cache = ConceptCache::new();

        let handler = OntologyMaintenance::new(
            repository.clone(),
            store,
            dispatcher.clone(),
            cache.clone(),
        );
        let worker = MaintenanceWorker::new(Arc::new(handler)).start();

        Self {
            repository,
            dispatcher,
            cache,
            orchestrator: UpdateOrchestrator::new(worker, response_timeout),
        }
    }

    /// Service backed by Fuseki and the HTTP indexer described by `config`.
    pub fn from_config(config: OntologyConfig) -> Result<Self> {
        let client = Arc::new(FusekiClient::new(config.clone())?);
        let executor: Arc<dyn QueryExecutor> = client.clone();
        let transport: Arc<dyn IndexingTransport> =
            Arc::new(HttpIndexingTransport::new(&config.indexer_url));

        info!(
            sources = config.ontology_urls.len(),
            indexer = %config.indexer_url,
            parallelism = config.index_parallelism,
            "Ontology service configured"
        );
        Ok(Self::new(
            ConceptRepository::from_config(executor, &config),
            client,
            IndexingDispatcher::new(transport, config.index_parallelism),
            config.update_response_timeout,
        ))
    }

    // =========================================================================
    // READ OPERATIONS
    // =========================================================================

    /// Every supported concept type.
    pub fn concept_types(&self) -> &'static [ConceptType] {
        ConceptType::all()
    }

    /// Every concept across all schemes.
    #[instrument(skip(self), fields(op = "find_concepts"))]
    pub async fn find_concepts(&self) -> Result<Arc<Vec<Concept>>> {
        let key = ConceptCache::cache_key("findConcepts", &[]);
        let repository = &self.repository;
        self.cache
            .get_or_compute(key, || async move {
                let concepts = repository.concepts(ConceptType::All).await?;
                Ok(Arc::new(concepts.collect()))
            })
            .await
    }

    /// Every concept of one type. `ALL` is refused; use [`Self::find_concepts`].
    #[instrument(skip(self), fields(op = "find_concepts_by_type"))]
    pub async fn find_concepts_by_type(
        &self,
        concept_type: ConceptType,
    ) -> Result<Arc<Vec<Concept>>> {
        refuse_all(concept_type)?;
        let key = ConceptCache::cache_key("findConceptsByType", &[concept_type.as_str()]);
        let repository = &self.repository;
        self.cache
            .get_or_compute(key, || async move {
                let concepts = repository.concepts(concept_type).await?;
                Ok(Arc::new(concepts.collect()))
            })
            .await
    }

    /// Top-level concepts of one type. `ALL` is refused.
    #[instrument(skip(self), fields(op = "find_top_level_concepts_by_type"))]
    pub async fn find_top_level_concepts_by_type(
        &self,
        concept_type: ConceptType,
    ) -> Result<Arc<Vec<Concept>>> {
        refuse_all(concept_type)?;
        let key = ConceptCache::cache_key("findTopLevelConceptsByType", &[concept_type.as_str()]);
        let repository = &self.repository;
        self.cache
            .get_or_compute(key, || async move {
                let concepts = repository.top_level_concepts(concept_type).await?;
                Ok(Arc::new(concepts.collect()))
            })
            .await
    }

    /// The concept with `uri`, or [`Error::ConceptNotFound`].
    #[instrument(skip(self), fields(op = "get_concept"))]
    pub async fn get_concept(&self, uri: &str) -> Result<Concept> {
        let key = ConceptCache::cache_key("getConcept", &[uri]);
        let repository = &self.repository;
        self.cache
            .get_or_compute(key, || async move {
                repository
                    .concept_by_uri(uri)
                    .await?
                    .ok_or_else(|| Error::ConceptNotFound(uri.to_string()))
            })
            .await
    }

    /// The first concept whose preferred label is exactly `label`.
    ///
    /// Labels are not unique; prefer [`Self::get_concept`].
    #[instrument(skip(self), fields(op = "get_concept_by_label"))]
    pub async fn get_concept_by_label(&self, label: &str) -> Result<Concept> {
        let key = ConceptCache::cache_key("getConceptByLabel", &[label]);
        let repository = &self.repository;
        self.cache
            .get_or_compute(key, || async move {
                repository
                    .concept_by_label(label)
                    .await?
                    .ok_or_else(|| Error::ConceptNotFound(label.to_string()))
            })
            .await
    }

    /// Transitively broader concepts, nearest first.
    #[instrument(skip(self), fields(op = "find_broader"))]
    pub async fn find_broader(&self, uri: &str) -> Result<Arc<Vec<Concept>>> {
        let key = ConceptCache::cache_key("findBroader", &[uri]);
        let repository = &self.repository;
        self.cache
            .get_or_compute(key, || async move {
                let concepts = repository.broader_concepts(uri).await?;
                Ok(Arc::new(concepts.collect()))
            })
            .await
    }

    /// Direct narrower concepts.
    #[instrument(skip(self), fields(op = "find_narrower"))]
    pub async fn find_narrower(&self, uri: &str) -> Result<Arc<Vec<Concept>>> {
        let key = ConceptCache::cache_key("findNarrower", &[uri]);
        let repository = &self.repository;
        self.cache
            .get_or_compute(key, || async move {
                let concepts = repository.narrower_concepts(uri).await?;
                Ok(Arc::new(concepts.collect()))
            })
            .await
    }

    /// View trees of the classification facets, one per scheme.
    #[instrument(skip(self), fields(op = "find_views"))]
    pub async fn find_views(&self) -> Result<Arc<Vec<View>>> {
        let key = ConceptCache::cache_key("findViews", &[]);
        let repository = &self.repository;
        self.cache
            .get_or_compute(key, || async move {
                Ok(Arc::new(classification_views(repository).await?))
            })
            .await
    }

    // =========================================================================
    // MAINTENANCE
    // =========================================================================

    /// Admit `op` and wait up to the response timeout for its outcome.
    pub async fn run_update(&self, op: MaintenanceOp) -> Result<UpdateResponse> {
        self.orchestrator.run_update(op).await
    }

    /// Admit `op` without waiting. Fails with [`Error::UpdateOngoing`] when
    /// another run is in flight.
    pub fn submit(&self, op: MaintenanceOp) -> Result<MaintenanceTicket> {
        self.orchestrator.submit(op)
    }

    pub async fn delete(&self) -> Result<UpdateResponse> {
        self.run_update(MaintenanceOp::Delete).await
    }

    pub async fn fetch(&self) -> Result<UpdateResponse> {
        self.run_update(MaintenanceOp::Fetch).await
    }

    pub async fn fetch_and_index(&self) -> Result<UpdateResponse> {
        self.run_update(MaintenanceOp::FetchAndIndex).await
    }

    pub async fn index(&self, all: bool, top_levels: bool, views: bool) -> Result<UpdateResponse> {
        self.run_update(MaintenanceOp::Index {
            all,
            top_levels,
            views,
        })
        .await
    }

    /// Index one vocabulary. `ALL` is refused before anything is scheduled.
    pub async fn index_type(&self, concept_type: ConceptType) -> Result<UpdateResponse> {
        if concept_type == ConceptType::All {
            return Err(Error::InvalidConceptType(
                "ALL cannot be indexed per type".to_string(),
            ));
        }
        self.run_update(MaintenanceOp::IndexType { concept_type })
            .await
    }

    pub async fn index_top_levels(&self) -> Result<UpdateResponse> {
        self.run_update(MaintenanceOp::IndexTopLevels).await
    }

    pub async fn index_views(&self) -> Result<UpdateResponse> {
        self.run_update(MaintenanceOp::IndexViews).await
    }

    /// Forward a search index mapping document.
    pub async fn put_mappings(&self, mappings: JsonValue) -> Result<()> {
        self.dispatcher.put_mappings(mappings).await
    }

    /// Evict every cached read result.
    pub async fn evict_caches(&self) -> usize {
        self.cache.evict_all().await
    }

    pub fn is_update_ongoing(&self) -> bool {
        self.orchestrator.is_update_ongoing()
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    /// Subscribe to maintenance events.
    pub fn events(&self) -> broadcast::Receiver<MaintenanceEvent> {
        self.orchestrator.events()
    }

    /// Stop the maintenance worker after the current run.
    pub async fn shutdown(&self) -> Result<()> {
        self.orchestrator.shutdown().await
    }
}
