//! Function result cache module
//!
//! Per-route caches of successful function responses, keyed by request URL.
//! Caches are owned by a [`CacheStore`] keyed by [`RouteId`], so they survive
//! route re-registration and are replaced wholesale when a function's source
//! changes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::config::{FunctionRouteConfig, RouteId};
use crate::logger;

/// A response previously produced by a function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub status_code: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// Cached results of one function route
#[derive(Debug, Default)]
pub struct ResultCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Store an entry; anything other than a 200 is ignored
    pub fn set(&self, key: &str, entry: CacheEntry) {
        if entry.status_code != 200 {
            return;
        }
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), entry);
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// All result caches of the server, keyed by route identity
#[derive(Debug)]
pub struct CacheStore {
    enabled: bool,
    caches: RwLock<HashMap<RouteId, Arc<ResultCache>>>,
}

impl CacheStore {
    /// `enabled` is the server-wide cache switch
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            caches: RwLock::new(HashMap::new()),
        }
    }

    /// Whether `config` gets a cache at all
    pub const fn caches(&self, config: &FunctionRouteConfig) -> bool {
        self.enabled && config.caching_enabled
    }

    /// The route's current cache, created on first use
    pub fn cache_for(&self, config: &FunctionRouteConfig) -> Option<Arc<ResultCache>> {
        if !self.caches(config) {
            return None;
        }

        let id = config.route_id();
        if let Some(cache) = self
            .caches
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
        {
            return Some(Arc::clone(cache));
        }

        let mut caches = self.caches.write().unwrap_or_else(PoisonError::into_inner);
        let cache = caches.entry(id).or_insert_with(|| {
            logger::log_cache_initialized(&config.local_path);
            Arc::new(ResultCache::new())
        });
        Some(Arc::clone(cache))
    }

    /// Replace the route's cache with an empty one
    ///
    /// Handlers still holding the old instance keep writing into it, but it is
    /// no longer handed out. Returns false when the route is not cached.
    pub fn reset(&self, config: &FunctionRouteConfig) -> bool {
        if !self.caches(config) {
            return false;
        }

        self.caches
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(config.route_id(), Arc::new(ResultCache::new()));
        logger::log_cache_invalidated(&config.local_path);
        true
    }
}
