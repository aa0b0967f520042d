//! Process-lifetime cache of unfiltered discovery results, keyed by region
//! identity. Written at most once per region; category-filter changes only
//! re-read it. No eviction: the entry count is bounded by the number of
//! distinct regions.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::types::ClassifiedPoint;

#[derive(Debug, Default)]
pub struct RegionCache {
    entries: RwLock<HashMap<String, Arc<[ClassifiedPoint]>>>,
}

impl RegionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Arc<[ClassifiedPoint]>> {
        self.entries.read().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Store `points` unless an entry already exists; returns the stored
    /// entry either way, so a racing writer observes the first write.
    pub fn insert_if_absent(
        &self,
        key: &str,
        points: Vec<ClassifiedPoint>,
    ) -> Arc<[ClassifiedPoint]> {
        let mut entries = self.entries.write();
        entries
            .entry(key.to_string())
            .or_insert_with(|| Arc::from(points))
            .clone()
    }

    /// Remove the entry for a region whose geometry changed. Returns
    /// whether an entry was present.
    pub fn invalidate(&self, key: &str) -> bool {
        self.entries.write().remove(key).is_some()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
