//! # Adjacent-Quality Preload Cache
//!
//! Keeps resolved sources for the qualities next to the current one, so a
//! user-initiated switch can skip the resolver round-trip. Entries are
//! immutable once written and the whole cache is evicted at session disposal.

use bridge_traits::MediaSource;
use lru::LruCache;
use std::num::NonZeroUsize;
use tracing::debug;

/// Small LRU of quality id → resolved source.
pub struct PreloadCache {
    entries: LruCache<String, MediaSource>,
}

impl PreloadCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
        }
    }

    /// Store a prefetched source. First write wins; entries never change
    /// underneath a debounced switch that already read them.
    pub fn put(&mut self, quality_id: &str, source: MediaSource) {
        if self.entries.contains(quality_id) {
            return;
        }
        debug!(quality = quality_id, "preload cache warmed");
        self.entries.put(quality_id.to_string(), source);
    }

    /// Take a warm source out of the cache, consuming the entry.
    pub fn take(&mut self, quality_id: &str) -> Option<MediaSource> {
        let hit = self.entries.pop(quality_id);
        if hit.is_some() {
            debug!(quality = quality_id, "preload cache hit");
        }
        hit
    }

    pub fn contains(&self, quality_id: &str) -> bool {
        self.entries.contains(quality_id)
    }

    /// Evict everything; called at session disposal.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
