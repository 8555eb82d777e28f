//! In-memory query executor for deterministic testing.
//!
//! Rows are served by substring rules: the first rule whose pattern occurs in
//! the query text answers it; unmatched queries yield no rows.
//!
//! ## Usage
//!
//! ```rust
//! use sevi_core::Solution;
//! use sevi_sparql::mock::MockQueryExecutor;
//!
//! let executor = MockQueryExecutor::new().with_rows(
//!     "skos:topConceptOf",
//!     vec![Solution::new().with("uri", "http://localhost/dummy/1")],
//! );
//! assert_eq!(executor.call_count(), 0);
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use sevi_core::{Error, ExecutionProfile, QueryExecutor, Result, Solution, Solutions};

/// A recorded `select` call.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub query: String,
    pub profile: ExecutionProfile,
}

#[derive(Debug, Default)]
struct MockState {
    rules: Vec<(String, Vec<Solution>)>,
    failure: Option<String>,
    latency: Duration,
}

/// Query executor answering from canned rows.
#[derive(Clone, Default)]
pub struct MockQueryExecutor {
    state: Arc<Mutex<MockState>>,
    call_log: Arc<Mutex<Vec<MockCall>>>,
    released: Arc<AtomicUsize>,
}

impl MockQueryExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer queries containing `pattern` with `rows`.
    pub fn with_rows(self, pattern: impl Into<String>, rows: Vec<Solution>) -> Self {
        self.set_rows(pattern, rows);
        self
    }

    /// Fail every query with a [`Error::Query`] carrying `message`.
    pub fn failing(self, message: impl Into<String>) -> Self {
        self.state.lock().unwrap().failure = Some(message.into());
        self
    }

    /// Delay every answer.
    pub fn with_latency_ms(self, latency_ms: u64) -> Self {
        self.state.lock().unwrap().latency = Duration::from_millis(latency_ms);
        self
    }

    /// Replace the rows of an existing rule, or add a new one.
    pub fn set_rows(&self, pattern: impl Into<String>, rows: Vec<Solution>) {
        let pattern = pattern.into();
        let mut state = self.state.lock().unwrap();
        match state.rules.iter_mut().find(|(p, _)| *p == pattern) {
            Some(rule) => rule.1 = rows,
            None => state.rules.push((pattern, rows)),
        }
    }

    /// Get all logged calls for assertion.
    pub fn calls(&self) -> Vec<MockCall> {
        self.call_log.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.call_log.lock().unwrap().len()
    }

    /// Number of calls whose query contains `pattern`.
    pub fn calls_matching(&self, pattern: &str) -> usize {
        self.call_log
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.query.contains(pattern))
            .count()
    }

    /// Number of execution handles released so far.
    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn clear_calls(&self) {
        self.call_log.lock().unwrap().clear()
    }
}

#[async_trait]
impl QueryExecutor for MockQueryExecutor {
    async fn select(&self, query: &str, profile: ExecutionProfile) -> Result<Solutions> {
        self.call_log.lock().unwrap().push(MockCall {
            query: query.to_string(),
            profile,
        });

        let (latency, failure, rows) = {
            let state = self.state.lock().unwrap();
            let rows = state
                .rules
                .iter()
                .find(|(pattern, _)| query.contains(pattern.as_str()))
                .map(|(_, rows)| rows.clone())
                .unwrap_or_default();
            (state.latency, state.failure.clone(), rows)
        };

        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if let Some(message) = failure {
            return Err(Error::Query(message));
        }

        let released = self.released.clone();
        Ok(Solutions::new(rows).on_release(move || {
            released.fetch_add(1, Ordering::SeqCst);
        }))
    }
}
