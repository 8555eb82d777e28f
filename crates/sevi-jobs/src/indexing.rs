//! Delivery of concepts, top-level batches, views and mappings to the
//! search indexer.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use tracing::{debug, info, instrument, warn};

use sevi_core::{defaults, Concept, Error, IndexQueue, IndexingTransport, Result, View};

/// Outcome of a per-concept fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexReport {
    pub sent: usize,
    pub failed: usize,
}

impl IndexReport {
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }
}

impl std::ops::AddAssign for IndexReport {
    fn add_assign(&mut self, other: Self) {
        self.sent += other.sent;
        self.failed += other.failed;
    }
}

/// Sends documents to the indexing transport.
///
/// Per-concept sends run concurrently, bounded by `parallelism`. A failed
/// send is logged and counted; it does not stop the remaining sends.
pub struct IndexingDispatcher {
    transport: Arc<dyn IndexingTransport>,
    parallelism: usize,
}

impl IndexingDispatcher {
    pub fn new(transport: Arc<dyn IndexingTransport>, parallelism: usize) -> Self {
        Self {
            transport,
            parallelism: parallelism.max(1),
        }
    }

    /// Queue one change message per concept.
    #[instrument(skip(self, concepts), fields(queue = %IndexQueue::ConceptChanged))]
    pub async fn reindex_concepts<I>(&self, concepts: I) -> IndexReport
    where
        I: IntoIterator<Item = Concept>,
    {
        let indexed_at = Utc::now();
        let start = Instant::now();

        let outcomes: Vec<bool> = stream::iter(concepts)
            .map(|concept| self.send_concept(concept, indexed_at))
            .buffer_unordered(self.parallelism)
            .collect()
            .await;

        let failed = outcomes.iter().filter(|ok| !**ok).count();
        let report = IndexReport {
            sent: outcomes.len() - failed,
            failed,
        };
        info!(
            result_count = report.sent,
            failed = report.failed,
            duration_ms = start.elapsed().as_millis() as u64,
            "Concepts queued for indexing"
        );
        report
    }

    async fn send_concept(&self, concept: Concept, indexed_at: DateTime<Utc>) -> bool {
        let uri = concept.id.clone();
        let document = match serde_json::to_value(&concept) {
            Ok(document) => document,
            Err(e) => {
                warn!(concept_uri = %uri, error = %e, "Failed to serialize concept");
                return false;
            }
        };
        match self
            .transport
            .send(document, indexed_at, IndexQueue::ConceptChanged)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!(concept_uri = %uri, error = %e, "Failed to queue concept for indexing");
                false
            }
        }
    }

    /// Send every top-level concept as one batch.
    pub async fn reindex_top_levels(&self, concepts: Vec<Concept>) -> Result<()> {
        self.send_batch(&concepts, IndexQueue::TopLevelsChanged).await
    }

    /// Send every view tree as one batch.
    pub async fn reindex_views(&self, views: Vec<View>) -> Result<()> {
        self.send_batch(&views, IndexQueue::ViewsChanged).await
    }

    /// Forward a search index mapping document.
    #[instrument(skip(self, mappings), fields(queue = %IndexQueue::UpdateMappings))]
    pub async fn put_mappings(&self, mappings: JsonValue) -> Result<()> {
        self.transport
            .send(mappings, Utc::now(), IndexQueue::UpdateMappings)
            .await?;
        info!("Index mappings sent");
        Ok(())
    }

    #[instrument(skip(self, items), fields(queue = %queue, result_count = items.len()))]
    async fn send_batch<T: Serialize>(&self, items: &[T], queue: IndexQueue) -> Result<()> {
        let documents = items
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        self.transport
            .send_batch(documents, Utc::now(), queue)
            .await?;
        info!("Batch sent to indexer");
        Ok(())
    }
}

// =============================================================================
// HTTP TRANSPORT
// =============================================================================

/// Indexing transport posting JSON envelopes to `{base_url}/queues/{queue}`.
///
/// Single documents are sent as `{"indexedAt": <millis>, "document": ...}`,
/// batches as `{"indexedAt": <millis>, "documents": [...]}`.
pub struct HttpIndexingTransport {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpIndexingTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(defaults::INDEXER_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post(&self, queue: IndexQueue, body: JsonValue) -> Result<()> {
        let url = format!("{}/queues/{}", self.base_url, queue.as_str());
        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Indexing(format!("Request to {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Indexing(format!("{} returned {}: {}", url, status, body)));
        }
        debug!(queue = %queue, "Indexer accepted message");
        Ok(())
    }
}

#[async_trait]
impl IndexingTransport for HttpIndexingTransport {
    async fn send(
        &self,
        document: JsonValue,
        indexed_at: DateTime<Utc>,
        queue: IndexQueue,
    ) -> Result<()> {
        self.post(
            queue,
            json!({ "indexedAt": indexed_at.timestamp_millis(), "document": document }),
        )
        .await
    }

    async fn send_batch(
        &self,
        documents: Vec<JsonValue>,
        indexed_at: DateTime<Utc>,
        queue: IndexQueue,
    ) -> Result<()> {
        self.post(
            queue,
            json!({ "indexedAt": indexed_at.timestamp_millis(), "documents": documents }),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<(IndexQueue, JsonValue)>>,
        batches: Mutex<Vec<(IndexQueue, Vec<JsonValue>)>>,
        fail_ids: Vec<String>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    #[async_trait]
    impl IndexingTransport for RecordingTransport {
        async fn send(
            &self,
            document: JsonValue,
            _indexed_at: DateTime<Utc>,
            queue: IndexQueue,
        ) -> Result<()> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if let Some(id) = document["id"].as_str() {
                if self.fail_ids.iter().any(|f| f == id) {
                    return Err(Error::Indexing("queue full".into()));
                }
            }
            self.sent.lock().unwrap().push((queue, document));
            Ok(())
        }

        async fn send_batch(
            &self,
            documents: Vec<JsonValue>,
            _indexed_at: DateTime<Utc>,
            queue: IndexQueue,
        ) -> Result<()> {
            self.batches.lock().unwrap().push((queue, documents));
            Ok(())
        }
    }

    fn concepts(n: usize) -> Vec<Concept> {
        (0..n)
            .map(|i| {
                Concept::new(
                    format!("http://www.yso.fi/onto/jupo/p{}", i),
                    format!("käsite {}", i),
                    "",
                    "http://www.yso.fi/onto/jupo/",
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn test_reindex_concepts_sends_one_message_each() {
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = IndexingDispatcher::new(transport.clone(), 4);

        let report = dispatcher.reindex_concepts(concepts(10)).await;
        assert_eq!(report, IndexReport { sent: 10, failed: 0 });

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 10);
        assert!(sent.iter().all(|(q, _)| *q == IndexQueue::ConceptChanged));
        assert_eq!(sent[0].1["conceptType"], "JUPO");
    }

    #[tokio::test]
    async fn test_reindex_concepts_respects_parallelism() {
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = IndexingDispatcher::new(transport.clone(), 2);
        dispatcher.reindex_concepts(concepts(20)).await;
        assert!(transport.max_in_flight.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_failed_send_is_counted_and_others_continue() {
        let transport = Arc::new(RecordingTransport {
            fail_ids: vec!["http://www.yso.fi/onto/jupo/p3".to_string()],
            ..RecordingTransport::default()
        });
        let dispatcher = IndexingDispatcher::new(transport.clone(), 1);

        let report = dispatcher.reindex_concepts(concepts(5)).await;
        assert_eq!(report, IndexReport { sent: 4, failed: 1 });
        assert!(!report.is_complete());
        assert_eq!(transport.sent.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_top_levels_and_views_are_single_batches() {
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = IndexingDispatcher::new(transport.clone(), 4);

        dispatcher.reindex_top_levels(concepts(3)).await.unwrap();
        let mut root = View::root("http://urn.fi/URN:NBN:fi:au:ptvl:KE");
        root.children.push(View::from(concepts(1).remove(0)));
        dispatcher.reindex_views(vec![root]).await.unwrap();

        let batches = transport.batches.lock().unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].0, IndexQueue::TopLevelsChanged);
        assert_eq!(batches[0].1.len(), 3);
        assert_eq!(batches[1].0, IndexQueue::ViewsChanged);
        assert_eq!(batches[1].1[0]["label"], "LIFESITUATION");
        assert_eq!(batches[1].1[0]["children"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_put_mappings_targets_mappings_queue() {
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = IndexingDispatcher::new(transport.clone(), 1);

        dispatcher
            .put_mappings(json!({ "properties": { "label": { "type": "text" } } }))
            .await
            .unwrap();
        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent[0].0, IndexQueue::UpdateMappings);
    }

    #[test]
    fn test_zero_parallelism_is_clamped() {
        let dispatcher = IndexingDispatcher::new(Arc::new(RecordingTransport::default()), 0);
        assert_eq!(dispatcher.parallelism, 1);
    }

    #[test]
    fn test_transport_trims_trailing_slash() {
        let transport = HttpIndexingTransport::new("http://indexer:8090/");
        assert_eq!(transport.base_url(), "http://indexer:8090");
    }
}
