//! Cache of schemas known to exist.
//!
//! Saves redundant "ensure schema" calls in a long-running maintainer. The
//! cache is owned by whoever constructs it and is never consulted by health
//! analysis, which always works from a fresh catalog snapshot.

use std::collections::HashSet;
use std::sync::RwLock;
use tracing::{debug, trace};

/// Thread-safe set of schema names already ensured.
#[derive(Debug, Default)]
pub struct SchemaCache {
    schemas: RwLock<HashSet<String>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the schema was ensured since the last flush.
    pub fn contains(&self, schema: &str) -> bool {
        let hit = self
            .schemas
            .read()
            .map(|s| s.contains(schema))
            .unwrap_or(false);
        if hit {
            trace!(schema = %schema, "Schema cache hit");
        }
        hit
    }

    /// Record a schema as existing. Returns false if it was already cached.
    pub fn insert(&self, schema: &str) -> bool {
        match self.schemas.write() {
            Ok(mut schemas) => schemas.insert(schema.to_string()),
            Err(_) => false, // Lock poisoned, skip caching
        }
    }

    /// Forget one schema, e.g. after it was dropped.
    pub fn remove(&self, schema: &str) -> bool {
        self.schemas
            .write()
            .map(|mut s| s.remove(schema))
            .unwrap_or(false)
    }

    /// Forget every schema.
    pub fn flush(&self) {
        if let Ok(mut schemas) = self.schemas.write() {
            let count = schemas.len();
            schemas.clear();
            debug!(count, "Flushed schema cache");
        }
    }

    pub fn len(&self) -> usize {
        self.schemas.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_insert_and_contains() {
        let cache = SchemaCache::new();
        assert!(!cache.contains("archive"));

        assert!(cache.insert("archive"));
        assert!(!cache.insert("archive"));
        assert!(cache.contains("archive"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_flush_and_remove() {
        let cache = SchemaCache::new();
        cache.insert("a");
        cache.insert("b");

        assert!(cache.remove("a"));
        assert!(!cache.remove("a"));
        assert_eq!(cache.len(), 1);

        cache.flush();
        assert!(cache.is_empty());
        assert!(!cache.contains("b"));
    }

    #[test]
    fn test_shared_across_threads() {
        let cache = Arc::new(SchemaCache::new());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    cache.insert(&format!("schema_{}", i % 2));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 2);
    }
}
