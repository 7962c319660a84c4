//! Memoization of resolution results.
//!
//! Collection names, foreign keys and associated members are computed once
//! per key and reused for the life of the owning [`IncludeContext`]. Entries
//! are never invalidated: changing a convention after a name was resolved
//! does not affect that name.
//!
//! ```rust
//! use prax_include::cache::ResolutionCache;
//!
//! let cache: ResolutionCache<&str, String> = ResolutionCache::new();
//! let name = cache.get_or_insert_with("Blog", || "blogs".to_string());
//! assert_eq!(name, "blogs");
//! assert_eq!(cache.get_or_insert_with("Blog", || "other".to_string()), "blogs");
//! ```
//!
//! [`IncludeContext`]: crate::context::IncludeContext

use std::any::TypeId;
use std::collections::HashMap;
use std::hash::Hash;

use parking_lot::RwLock;
use smol_str::SmolStr;

use crate::entity::{Member, MemberKey};

/// Hit and miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that computed a value.
    pub misses: u64,
}

impl CacheStats {
    /// Fraction of lookups answered from the cache.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// A concurrent insert-once map.
///
/// When two threads miss on the same key at once, both compute a value but
/// only the first insertion is kept and returned to both. Failed computations
/// are not stored.
#[derive(Debug)]
pub struct ResolutionCache<K, V> {
    entries: RwLock<HashMap<K, V>>,
    stats: RwLock<CacheStats>,
}

impl<K, V> Default for ResolutionCache<K, V> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            stats: RwLock::new(CacheStats::default()),
        }
    }
}

impl<K: Eq + Hash, V: Clone> ResolutionCache<K, V> {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a cached value.
    pub fn get(&self, key: &K) -> Option<V> {
        self.entries.read().get(key).cloned()
    }

    /// Get the cached value or compute and store it.
    pub fn get_or_insert_with<F>(&self, key: K, f: F) -> V
    where
        F: FnOnce() -> V,
    {
        match self.get_or_try_insert_with(key, || Ok::<V, std::convert::Infallible>(f())) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// Get the cached value or compute and store it, propagating failures.
    ///
    /// The computation runs without holding any lock, so it may itself consult
    /// other caches.
    pub fn get_or_try_insert_with<F, E>(&self, key: K, f: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(value) = self.get(&key) {
            self.stats.write().hits += 1;
            return Ok(value);
        }

        let value = f()?;
        self.stats.write().misses += 1;
        let mut entries = self.entries.write();
        Ok(entries.entry(key).or_insert(value).clone())
    }

    /// Check if a key has been resolved.
    pub fn contains(&self, key: &K) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Number of resolved keys.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if nothing has been resolved yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        *self.stats.read()
    }
}

/// The caches owned by an include context.
#[derive(Debug, Default)]
pub struct ResolutionCaches {
    /// Entity type to collection name.
    pub collection_names: ResolutionCache<TypeId, SmolStr>,
    /// Navigation to its foreign key member. `None` results are cached too.
    pub foreign_keys: ResolutionCache<MemberKey, Option<Member>>,
    /// Navigation to its associated member.
    pub associated_members: ResolutionCache<MemberKey, Member>,
}

impl ResolutionCaches {
    /// Drop every cached resolution.
    pub fn clear(&self) {
        self.collection_names.clear();
        self.foreign_keys.clear();
        self.associated_members.clear();
    }
}
