//! In-process cache-aside store for read operations.
//!
//! Entries are keyed by operation name plus a hash of the arguments and live
//! until [`ConceptCache::evict_all`]. A read racing an eviction may repopulate
//! an entry with pre-eviction data.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::{debug, info};

use sevi_core::{Concept, Result, View};

const KEY_PREFIX: &str = "sevi:";

/// A cached read result.
#[derive(Debug, Clone)]
pub enum CachedValue {
    Concept(Concept),
    Concepts(Arc<Vec<Concept>>),
    Views(Arc<Vec<View>>),
}

/// Values that can be stored in the cache.
pub trait Cacheable: Clone + Send + Sync + 'static {
    fn into_cached(self) -> CachedValue;
    fn from_cached(value: &CachedValue) -> Option<Self>;
}

impl Cacheable for Concept {
    fn into_cached(self) -> CachedValue {
        CachedValue::Concept(self)
    }

    fn from_cached(value: &CachedValue) -> Option<Self> {
        match value {
            CachedValue::Concept(c) => Some(c.clone()),
            _ => None,
        }
    }
}

impl Cacheable for Arc<Vec<Concept>> {
    fn into_cached(self) -> CachedValue {
        CachedValue::Concepts(self)
    }

    fn from_cached(value: &CachedValue) -> Option<Self> {
        match value {
            CachedValue::Concepts(c) => Some(c.clone()),
            _ => None,
        }
    }
}

impl Cacheable for Arc<Vec<View>> {
    fn into_cached(self) -> CachedValue {
        CachedValue::Views(self)
    }

    fn from_cached(value: &CachedValue) -> Option<Self> {
        match value {
            CachedValue::Views(v) => Some(v.clone()),
            _ => None,
        }
    }
}

/// Cache statistics for monitoring.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
}

/// Shared cache of read results.
#[derive(Clone, Default)]
pub struct ConceptCache {
    inner: Arc<ConceptCacheInner>,
}

#[derive(Default)]
struct ConceptCacheInner {
    entries: RwLock<HashMap<String, CachedValue>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl ConceptCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a cache key from an operation name and its arguments.
    pub fn cache_key(op: &str, args: &[&str]) -> String {
        let mut hasher = Sha256::new();
        for arg in args {
            hasher.update(arg.as_bytes());
            hasher.update([0u8]);
        }
        let hash = hex::encode(hasher.finalize());
        format!("{}{}:{}", KEY_PREFIX, op, &hash[..16])
    }

    /// Get a cached value.
    pub async fn get<T: Cacheable>(&self, key: &str) -> Option<T> {
        let entries = self.inner.entries.read().await;
        entries.get(key).and_then(T::from_cached)
    }

    /// Store a value.
    pub async fn insert<T: Cacheable>(&self, key: String, value: T) {
        self.inner
            .entries
            .write()
            .await
            .insert(key, value.into_cached());
    }

    /// Return the cached value for `key`, or compute, store and return it.
    ///
    /// Errors from `compute` are returned and nothing is stored.
    pub async fn get_or_compute<T, F, Fut>(&self, key: String, compute: F) -> Result<T>
    where
        T: Cacheable,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(value) = self.get::<T>(&key).await {
            self.inner.hits.fetch_add(1, Ordering::Relaxed);
            debug!(cache_key = %key, "Cache HIT");
            return Ok(value);
        }

        self.inner.misses.fetch_add(1, Ordering::Relaxed);
        debug!(cache_key = %key, "Cache MISS");
        let value = compute().await?;
        self.insert(key, value.clone()).await;
        Ok(value)
    }

    /// Remove every entry.
    pub async fn evict_all(&self) -> usize {
        let removed = {
            let mut entries = self.inner.entries.write().await;
            let n = entries.len();
            entries.clear();
            n
        };
        self.inner
            .evictions
            .fetch_add(removed as u64, Ordering::Relaxed);
        info!(result_count = removed, "Cache FLUSH");
        removed
    }

    pub async fn len(&self) -> usize {
        self.inner.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.inner.hits.load(Ordering::Relaxed),
            misses: self.inner.misses.load(Ordering::Relaxed),
            evictions: self.inner.evictions.load(Ordering::Relaxed),
            entries: self.len().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sevi_core::Error;
    use std::sync::atomic::AtomicUsize;

    fn jupo(id: &str) -> Concept {
        Concept::new(id, "työ", "", "http://www.yso.fi/onto/jupo/")
    }

    #[test]
    fn test_cache_key_generation() {
        let key1 = ConceptCache::cache_key("getConcept", &["http://www.yso.fi/onto/jupo/p1"]);
        let key2 = ConceptCache::cache_key("getConcept", &["http://www.yso.fi/onto/jupo/p1"]);
        assert_eq!(key1, key2);
        assert!(key1.starts_with("sevi:getConcept:"));

        let key3 = ConceptCache::cache_key("getConcept", &["http://www.yso.fi/onto/jupo/p2"]);
        assert_ne!(key1, key3);

        // Operation name separates identical arguments
        let key4 = ConceptCache::cache_key("findBroader", &["http://www.yso.fi/onto/jupo/p1"]);
        assert_ne!(key1, key4);

        // Argument boundaries matter
        assert_ne!(
            ConceptCache::cache_key("op", &["ab", "c"]),
            ConceptCache::cache_key("op", &["a", "bc"])
        );
    }

    #[tokio::test]
    async fn test_get_or_compute_caches_success() {
        let cache = ConceptCache::new();
        let calls = AtomicUsize::new(0);
        let key = ConceptCache::cache_key("getConcept", &["p1"]);

        for _ in 0..3 {
            let concept: Concept = cache
                .get_or_compute(key.clone(), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(jupo("p1"))
                })
                .await
                .unwrap();
            assert_eq!(concept.id, "p1");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let stats = cache.stats().await;
        assert_eq!((stats.hits, stats.misses, stats.entries), (2, 1, 1));
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let cache = ConceptCache::new();
        let key = ConceptCache::cache_key("getConcept", &["missing"]);

        let result: Result<Concept> = cache
            .get_or_compute(key.clone(), || async {
                Err(Error::ConceptNotFound("missing".into()))
            })
            .await;
        assert!(matches!(result, Err(Error::ConceptNotFound(_))));
        assert!(cache.is_empty().await);

        let concept: Concept = cache
            .get_or_compute(key, || async { Ok(jupo("missing")) })
            .await
            .unwrap();
        assert_eq!(concept.id, "missing");
    }

    #[tokio::test]
    async fn test_evict_all_forces_recompute() {
        let cache = ConceptCache::new();
        let key = ConceptCache::cache_key("findConcepts", &[]);

        let first: Arc<Vec<Concept>> = cache
            .get_or_compute(key.clone(), || async { Ok(Arc::new(vec![jupo("old")])) })
            .await
            .unwrap();
        assert_eq!(first[0].id, "old");

        assert_eq!(cache.evict_all().await, 1);

        let second: Arc<Vec<Concept>> = cache
            .get_or_compute(key, || async { Ok(Arc::new(vec![jupo("new")])) })
            .await
            .unwrap();
        assert_eq!(second[0].id, "new");
        assert_eq!(cache.stats().await.evictions, 1);
    }

    #[tokio::test]
    async fn test_value_kinds_do_not_alias() {
        let cache = ConceptCache::new();
        cache.insert("k".to_string(), jupo("p1")).await;
        assert!(cache.get::<Arc<Vec<Concept>>>("k").await.is_none());
        assert!(cache.get::<Arc<Vec<View>>>("k").await.is_none());
        assert!(cache.get::<Concept>("k").await.is_some());
    }

    #[tokio::test]
    async fn test_concurrent_readers_share_entries() {
        let cache = ConceptCache::new();
        let key = ConceptCache::cache_key("findViews", &[]);
        cache
            .insert(key.clone(), Arc::new(vec![View::root("http://urn.fi/URN:NBN:fi:au:ptvl:KE")]))
            .await;

        let readers = (0..8).map(|_| {
            let cache = cache.clone();
            let key = key.clone();
            tokio::spawn(async move { cache.get::<Arc<Vec<View>>>(&key).await })
        });
        for reader in futures::future::join_all(readers).await {
            assert_eq!(reader.unwrap().unwrap().len(), 1);
        }
    }
}
