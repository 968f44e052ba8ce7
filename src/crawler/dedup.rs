use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Post ids already emitted during one crawl run
///
/// Cloning shares the underlying set. A new set is created per run and
/// handed to every chunk fetcher of that run.
#[derive(Debug, Clone, Default)]
pub struct SeenSet {
    inner: Arc<Mutex<HashSet<String>>>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, post_id: &str) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(post_id)
    }

    /// Inserts an id; returns false if it was already present
    pub fn insert(&self, post_id: &str) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(post_id.to_string())
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
