//! Tabular query results.
//!
//! A [`Solutions`] value owns the execution handle of the query that produced
//! it. The handle is released exactly once: on [`Solutions::close`], or on drop
//! when the consumer stops early or the sequence is exhausted.

use std::collections::HashMap;

/// One row of named string bindings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Solution {
    bindings: HashMap<String, String>,
}

impl Solution {
    /// Create an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a binding, builder style.
    pub fn with(mut self, var: impl Into<String>, value: impl Into<String>) -> Self {
        self.bindings.insert(var.into(), value.into());
        self
    }

    /// Set a binding.
    pub fn insert(&mut self, var: impl Into<String>, value: impl Into<String>) {
        self.bindings.insert(var.into(), value.into());
    }

    /// Value bound to `var`, if any.
    pub fn get(&self, var: &str) -> Option<&str> {
        self.bindings.get(var).map(String::as_str)
    }

    /// Value bound to `var`, or the empty string when unbound.
    pub fn value_or_empty(&self, var: &str) -> String {
        self.get(var).unwrap_or_default().to_string()
    }
}

type ReleaseHook = Box<dyn FnOnce() + Send>;

/// Lazily consumed result rows plus the handle of the execution behind them.
pub struct Solutions {
    rows: std::vec::IntoIter<Solution>,
    release: Option<ReleaseHook>,
}

impl Solutions {
    /// Wrap already-materialized rows.
    pub fn new(rows: Vec<Solution>) -> Self {
        Self {
            rows: rows.into_iter(),
            release: None,
        }
    }

    /// An empty result.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Attach the hook that releases the execution handle.
    pub fn on_release<F>(mut self, hook: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.release = Some(Box::new(hook));
        self
    }

    /// Release the execution handle now, discarding unread rows.
    pub fn close(mut self) {
        self.release_handle();
    }

    fn release_handle(&mut self) {
        if let Some(hook) = self.release.take() {
            hook();
        }
    }
}

impl Iterator for Solutions {
    type Item = Solution;

    fn next(&mut self) -> Option<Solution> {
        self.rows.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

impl Drop for Solutions {
    fn drop(&mut self) {
        self.release_handle();
    }
}

impl std::fmt::Debug for Solutions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Solutions")
            .field("remaining", &self.rows.len())
            .field("open", &self.release.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counted(rows: Vec<Solution>) -> (Solutions, Arc<AtomicUsize>) {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = released.clone();
        let solutions = Solutions::new(rows).on_release(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (solutions, released)
    }

    #[test]
    fn test_value_or_empty() {
        let row = Solution::new().with("uri", "http://localhost/dummy/1");
        assert_eq!(row.value_or_empty("uri"), "http://localhost/dummy/1");
        assert_eq!(row.value_or_empty("notation"), "");
        assert!(row.get("scheme").is_none());
    }

    #[test]
    fn test_released_once_after_exhaustion() {
        let (solutions, released) = counted(vec![Solution::new(), Solution::new()]);
        assert_eq!(solutions.count(), 2);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_released_on_early_termination() {
        let (mut solutions, released) = counted(vec![Solution::new(), Solution::new()]);
        assert!(solutions.next().is_some());
        drop(solutions);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_close_does_not_release_twice() {
        let (solutions, released) = counted(vec![Solution::new()]);
        solutions.close();
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }
}
