//! Concept repository: runs strategy queries and projects their results.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, instrument};

use sevi_core::{
    Concept, ConceptType, ExecutionProfile, OntologyConfig, QueryEndpoint, QueryExecutor, Result,
};

use crate::hierarchy::NarrowerLookup;
use crate::projection::Concepts;
use crate::strategy::{ConceptQueryStrategy, StrategyRegistry};

/// Timeouts applied to the two execution profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryTimeouts {
    pub standard: Duration,
    pub bulk: Duration,
}

impl QueryTimeouts {
    fn standard(&self, endpoint: QueryEndpoint) -> ExecutionProfile {
        ExecutionProfile::standard(endpoint).with_timeout(self.standard)
    }

    fn bulk(&self, endpoint: QueryEndpoint) -> ExecutionProfile {
        ExecutionProfile::bulk(endpoint).with_timeout(self.bulk)
    }
}

impl Default for QueryTimeouts {
    fn default() -> Self {
        Self {
            standard: ExecutionProfile::standard(QueryEndpoint::Inference).timeout,
            bulk: ExecutionProfile::bulk(QueryEndpoint::Plain).timeout,
        }
    }
}

/// Executes concept queries and returns lazy concept sequences.
///
/// Routing:
///
/// | Query | Endpoint | Timeout |
/// |-------|----------|---------|
/// | all concepts, by label | plain | bulk |
/// | top-level concepts | inference | bulk |
/// | by uri, broader, narrower | inference | standard |
#[derive(Clone)]
pub struct ConceptRepository {
    executor: Arc<dyn QueryExecutor>,
    strategies: Arc<StrategyRegistry>,
    timeouts: QueryTimeouts,
}

impl ConceptRepository {
    pub fn new(executor: Arc<dyn QueryExecutor>, strategies: StrategyRegistry) -> Self {
        Self {
            executor,
            strategies: Arc::new(strategies),
            timeouts: QueryTimeouts::default(),
        }
    }

    /// Repository configured with the language and timeouts of `config`.
    pub fn from_config(executor: Arc<dyn QueryExecutor>, config: &OntologyConfig) -> Self {
        Self::new(executor, StrategyRegistry::new(&config.language)).with_timeouts(QueryTimeouts {
            standard: config.query_timeout,
            bulk: config.bulk_query_timeout,
        })
    }

    pub fn with_timeouts(mut self, timeouts: QueryTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn strategies(&self) -> &StrategyRegistry {
        &self.strategies
    }

    async fn run(
        &self,
        strategy: &ConceptQueryStrategy,
        op: &'static str,
        query: String,
        profile: ExecutionProfile,
    ) -> Result<Concepts> {
        let start = Instant::now();
        debug!(
            op,
            concept_type = %strategy.concept_type(),
            endpoint = ?profile.endpoint,
            "Executing query:\n{}",
            query
        );
        let rows = self.executor.select(&query, profile).await?;
        debug!(
            op,
            concept_type = %strategy.concept_type(),
            result_count = rows.size_hint().0,
            duration_ms = start.elapsed().as_millis() as u64,
            "Query complete"
        );
        Ok(Concepts::new(rows, strategy.spans_all_schemes()))
    }

    /// Every concept of `concept_type`. `ALL` spans every scheme.
    #[instrument(skip(self), fields(op = "concepts"))]
    pub async fn concepts(&self, concept_type: ConceptType) -> Result<Concepts> {
        let strategy = self.strategies.for_type(concept_type)?;
        let profile = self.timeouts.bulk(QueryEndpoint::Plain);
        self.run(strategy, "concepts", strategy.all_concepts_query(), profile)
            .await
    }

    /// Top-level concepts of `concept_type`.
    #[instrument(skip(self), fields(op = "top_level_concepts"))]
    pub async fn top_level_concepts(&self, concept_type: ConceptType) -> Result<Concepts> {
        let strategy = self.strategies.for_type(concept_type)?;
        let profile = self.timeouts.bulk(QueryEndpoint::Inference);
        self.run(strategy, "top_level_concepts", strategy.top_level_query(), profile)
            .await
    }

    /// First concept with the given uri, in any scheme.
    #[instrument(skip(self), fields(op = "concept_by_uri"))]
    pub async fn concept_by_uri(&self, uri: &str) -> Result<Option<Concept>> {
        let strategy = self.strategies.all_schemes()?;
        let profile = self.timeouts.standard(QueryEndpoint::Inference);
        let mut concepts = self
            .run(strategy, "concept_by_uri", strategy.find_by_uri_query(uri), profile)
            .await?;
        Ok(concepts.next())
    }

    /// First concept whose preferred label equals `label`.
    #[instrument(skip(self), fields(op = "concept_by_label"))]
    pub async fn concept_by_label(&self, label: &str) -> Result<Option<Concept>> {
        let strategy = self.strategies.all_schemes()?;
        let profile = self.timeouts.bulk(QueryEndpoint::Plain);
        let mut concepts = self
            .run(strategy, "concept_by_label", strategy.by_label_query(label), profile)
            .await?;
        Ok(concepts.next())
    }

    /// Concepts transitively broader than `uri`, nearest first.
    #[instrument(skip(self), fields(op = "broader_concepts"))]
    pub async fn broader_concepts(&self, uri: &str) -> Result<Concepts> {
        let strategy = self.strategies.all_schemes()?;
        let profile = self.timeouts.standard(QueryEndpoint::Inference);
        self.run(strategy, "broader_concepts", strategy.broader_query(uri), profile)
            .await
    }

    /// Direct children of `uri`.
    #[instrument(skip(self), fields(op = "narrower_concepts"))]
    pub async fn narrower_concepts(&self, uri: &str) -> Result<Concepts> {
        let strategy = self.strategies.all_schemes()?;
        let profile = self.timeouts.standard(QueryEndpoint::Inference);
        self.run(strategy, "narrower_concepts", strategy.narrower_query(uri), profile)
            .await
    }
}

#[async_trait]
impl NarrowerLookup for ConceptRepository {
    async fn narrower(&self, uri: &str) -> Result<Vec<Concept>> {
        Ok(self.narrower_concepts(uri).await?.collect())
    }
}
