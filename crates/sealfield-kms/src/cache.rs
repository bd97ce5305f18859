//! Resolved-key cache owned by a [`KmsClient`](crate::KmsClient).
//!
//! Holds key material by canonical URI plus the redirect aliases learned
//! from key migrations. It lives exactly as long as the client that built it.

use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;

use sealfield_core::{KeyMaterial, KeyUri};

/// Default number of resolved keys kept per client.
pub const DEFAULT_CAPACITY: usize = 256;

struct CacheInner {
    keys: LruCache<KeyUri, KeyMaterial>,
    /// requested uri -> canonical uri
    aliases: LruCache<KeyUri, KeyUri>,
}

/// In-memory LRU cache of resolved keys.
pub struct KeyCache {
    inner: Mutex<CacheInner>,
}

impl KeyCache {
    /// Construct a cache holding up to `capacity` keys (at least one).
    pub fn new(capacity: usize) -> Self {
        let size = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(CacheInner {
                keys: LruCache::new(size),
                aliases: LruCache::new(size),
            }),
        }
    }

    /// Look up a key by the URI a caller asked for, following a recorded
    /// migration if there is one.
    pub fn get(&self, uri: &KeyUri) -> Option<KeyMaterial> {
        let mut inner = self.inner.lock();
        let canonical = inner.aliases.get(uri).cloned().unwrap_or_else(|| uri.clone());
        inner.keys.get(&canonical).cloned()
    }

    /// The canonical URI recorded for `uri`, if it was redirected.
    pub fn canonical_uri(&self, uri: &KeyUri) -> Option<KeyUri> {
        self.inner.lock().aliases.peek(uri).cloned()
    }

    /// Store material resolved for `requested`. When the broker answered
    /// with a different URI the pair is remembered as an alias.
    pub fn insert(&self, requested: &KeyUri, material: KeyMaterial) {
        let mut inner = self.inner.lock();
        if requested != &material.uri {
            inner.aliases.put(requested.clone(), material.uri.clone());
        }
        inner.keys.put(material.uri.clone(), material);
    }

    /// Drop a key, addressed by either its canonical or a redirected URI.
    pub fn evict(&self, uri: &KeyUri) {
        let mut inner = self.inner.lock();
        let canonical = inner.aliases.pop(uri).unwrap_or_else(|| uri.clone());
        inner.keys.pop(&canonical);
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.keys.clear();
        inner.aliases.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for KeyCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
