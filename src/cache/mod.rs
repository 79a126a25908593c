use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};
use crate::coverage::VisibilityMask;

pub const DEFAULT_CACHE_CAPACITY: usize = 64;

#[derive(Hash, PartialEq, Eq, Clone, Copy, Debug)]
pub struct CoverageKey {
    pub scenario: u64,
    pub flight_level_bits: u64,
}

impl CoverageKey {
    pub fn new(scenario: u64, flight_level_m: f64) -> Self {
        Self {
            scenario,
            flight_level_bits: flight_level_m.to_bits(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CoverageMetrics {
    pub layers_computed: u32,
    pub cache_hits: u32,
    pub last_compute_time_ms: u64,
}

/// Finished masks keyed by scenario fingerprint and flight level.
pub struct CoverageCache {
    cache: Mutex<LruCache<CoverageKey, Arc<VisibilityMask>>>,
}

impl Default for CoverageCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl CoverageCache {
    /// A capacity of zero is bumped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get(&self, key: &CoverageKey) -> Option<Arc<VisibilityMask>> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache.get(key).cloned()
    }

    pub fn insert(&self, key: CoverageKey, mask: Arc<VisibilityMask>) {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache.put(key, mask);
    }

    pub fn len(&self) -> usize {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache.clear();
    }
}
