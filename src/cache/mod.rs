//! Cache module for rendered pages
//!
//! Pages are served from memory for a fixed revalidation interval. After that
//! they are still served, but the first request to see a stale page claims its
//! regeneration; later requests for the same key do not start another one
//! until the claim is released.
//!
//! At most `limit` pages are kept; inserting past that drops the least
//! recently served one.

use lru::LruCache;
use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

/// A rendered page and when it was rendered
#[derive(Debug, Clone)]
struct CacheEntry {
    html: String,
    rendered_at: Instant,
}

/// Result of looking a key up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// Rendered within the revalidation interval
    Fresh(String),
    /// Older than the interval; serve it and regenerate
    Stale(String),
    /// Never rendered (or evicted)
    Missing,
}

/// In-memory cache of rendered pages keyed by route
pub struct PageCache {
    revalidate: Duration,
    entries: RwLock<LruCache<String, CacheEntry>>,
    regenerating: RwLock<HashSet<String>>,
}

impl PageCache {
    pub fn new(revalidate: Duration, limit: NonZeroUsize) -> Self {
        Self {
            revalidate,
            entries: RwLock::new(LruCache::new(limit)),
            regenerating: RwLock::new(HashSet::new()),
        }
    }

    pub fn revalidate(&self) -> Duration {
        self.revalidate
    }

    pub fn limit(&self) -> NonZeroUsize {
        self.read_entries().cap()
    }

    fn read_entries(&self) -> RwLockReadGuard<'_, LruCache<String, CacheEntry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_entries(&self) -> RwLockWriteGuard<'_, LruCache<String, CacheEntry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_regenerating(&self) -> RwLockWriteGuard<'_, HashSet<String>> {
        self.regenerating
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn lookup(&self, key: &str) -> Lookup {
        match self.write_entries().get(key) {
            Some(entry) if entry.rendered_at.elapsed() < self.revalidate => {
                Lookup::Fresh(entry.html.clone())
            }
            Some(entry) => Lookup::Stale(entry.html.clone()),
            None => Lookup::Missing,
        }
    }

    pub fn insert(&self, key: &str, html: String) {
        let entry = CacheEntry {
            html,
            rendered_at: Instant::now(),
        };
        if let Some((evicted, _)) = self.write_entries().push(key.to_string(), entry) {
            if evicted != key {
                tracing::debug!("Cache full, dropped {}", evicted);
            }
        }
    }

    pub fn remove(&self, key: &str) {
        if self.write_entries().pop(key).is_some() {
            tracing::debug!("Evicted {}", key);
        }
    }

    pub fn len(&self) -> usize {
        self.read_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_entries().is_empty()
    }

    /// Claim the regeneration of `key`; false if someone else holds it
    pub fn try_claim(&self, key: &str) -> bool {
        self.write_regenerating().insert(key.to_string())
    }

    /// Release a claim taken with [`PageCache::try_claim`]
    pub fn release(&self, key: &str) {
        self.write_regenerating().remove(key);
    }

    pub fn is_regenerating(&self, key: &str) -> bool {
        self.regenerating
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }
}
