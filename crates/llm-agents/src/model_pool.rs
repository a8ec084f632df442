//! Round-robin model assignment across a pool of model ids.
//!
//! Grounded on the `AtomicUsize` counter idiom used elsewhere in the
//! pack for concurrency-safe bookkeeping without a mutex (the
//! `taskdaemon` example's `MockLlmClient::call_count`), applied here to
//! a rotating cursor instead of a call counter.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Assigns models from a fixed pool round-robin. Consecutive calls
/// never repeat the same model unless the pool has only one entry —
/// the "diverse model pool... round-robin-no-repeat-when-possible"
/// property from SPEC_FULL.md's open questions.
pub struct ModelPool {
    models: Vec<String>,
    cursor: AtomicUsize,
}

impl ModelPool {
    pub fn new(models: Vec<String>) -> Self {
        assert!(!models.is_empty(), "model pool must not be empty");
        Self {
            models,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Next model in rotation.
    pub fn next(&self) -> String {
        let i = self.cursor.fetch_add(1, Ordering::Relaxed) % self.models.len();
        self.models[i].clone()
    }

    /// Assign `count` models at once, e.g. one per reviewer participant.
    pub fn assign(&self, count: usize) -> Vec<String> {
        (0..count).map(|_| self.next()).collect()
    }
}
