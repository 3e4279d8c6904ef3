use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Per-request query counter.
///
/// One counter is created per request context; the repository and fixture
/// loaders record each statement they send, and the query-count middleware
/// reads the total after the response is built. Clones share the same
/// underlying count.
#[derive(Debug, Clone, Default)]
pub struct QueryCounter {
    inner: Arc<AtomicU64>,
}

impl QueryCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one executed statement.
    pub fn record(&self) {
        self.inner.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.inner.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_from_zero() {
        let counter = QueryCounter::new();
        assert_eq!(counter.count(), 0);

        counter.record();
        counter.record();
        assert_eq!(counter.count(), 2);
    }

    #[test]
    fn test_clones_share_the_count() {
        let counter = QueryCounter::new();
        let clone = counter.clone();

        clone.record();
        assert_eq!(counter.count(), 1);
    }
}
