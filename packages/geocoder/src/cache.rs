//! Bounded least-recently-used memoization of geocoding lookups.
//!
//! Caches both hits (coordinates) and misses (`None`) so the same
//! unresolvable address is not re-queried on every request. Entries are
//! never invalidated; eviction happens only at capacity, oldest access
//! first, or via [`GeocodeCache::clear`].

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use immo_map_geo::Coordinate;

/// Default number of cached addresses.
pub const DEFAULT_CAPACITY: usize = 1000;

struct CacheInner {
    /// address -> (recency stamp, memoized result).
    entries: HashMap<String, (u64, Option<Coordinate>)>,
    /// recency stamp -> address, oldest first.
    recency: BTreeMap<u64, String>,
    /// Monotonic stamp source.
    clock: u64,
}

impl CacheInner {
    fn touch(&mut self, address: &str) -> Option<Option<Coordinate>> {
        let (stamp, result) = *self.entries.get(address)?;
        self.recency.remove(&stamp);
        self.clock += 1;
        let refreshed = self.clock;
        self.recency.insert(refreshed, address.to_string());
        self.entries.insert(address.to_string(), (refreshed, result));
        Some(result)
    }
}

/// Fixed-capacity LRU cache from address string to geocoding result.
///
/// Interior mutability behind a `Mutex` so concurrent requests can share
/// one instance; every operation is a short critical section.
pub struct GeocodeCache {
    inner: Mutex<CacheInner>,
    capacity: usize,
}

impl GeocodeCache {
    /// Creates a cache holding at most `capacity` addresses.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "cache capacity must be non-zero");
        Self {
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                recency: BTreeMap::new(),
                clock: 0,
            }),
            capacity,
        }
    }

    /// Looks up an address, refreshing its recency on hit.
    ///
    /// Returns `None` on a cache miss; `Some(None)` is a memoized
    /// negative result.
    #[must_use]
    pub fn get(&self, address: &str) -> Option<Option<Coordinate>> {
        let mut inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        inner.touch(address)
    }

    /// Inserts (or refreshes) an entry, evicting the least recently used
    /// address when at capacity.
    pub fn insert(&self, address: String, result: Option<Coordinate>) {
        let mut inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

        if let Some((stamp, _)) = inner.entries.remove(&address) {
            inner.recency.remove(&stamp);
        } else if inner.entries.len() >= self.capacity {
            let oldest_stamp = inner.recency.keys().next().copied();
            if let Some(stamp) = oldest_stamp
                && let Some(oldest_address) = inner.recency.remove(&stamp)
            {
                inner.entries.remove(&oldest_address);
            }
        }

        inner.clock += 1;
        let stamp = inner.clock;
        inner.recency.insert(stamp, address.clone());
        inner.entries.insert(address, (stamp, result));
    }

    /// Evicts every entry.
    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        inner.entries.clear();
        inner.recency.clear();
    }

    /// Number of cached addresses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .entries
            .len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPUBLIQUE: Coordinate = Coordinate::new(48.8673, 2.3632);

    #[test]
    fn returns_memoized_results() {
        let cache = GeocodeCache::new(10);
        cache.insert("1 Place de la République, Paris".to_string(), Some(REPUBLIQUE));

        let hit = cache.get("1 Place de la République, Paris").unwrap();
        assert_eq!(hit, Some(REPUBLIQUE));
        assert!(cache.get("unknown address").is_none());
    }

    #[test]
    fn memoizes_negative_results() {
        let cache = GeocodeCache::new(10);
        cache.insert("nowhere".to_string(), None);

        // A hit carrying `None`: the miss itself is cached.
        assert_eq!(cache.get("nowhere"), Some(None));
    }

    #[test]
    fn evicts_least_recently_used_at_capacity() {
        let cache = GeocodeCache::new(2);
        cache.insert("a".to_string(), None);
        cache.insert("b".to_string(), None);

        // Touch "a" so "b" becomes the eviction candidate.
        let _ = cache.get("a");
        cache.insert("c".to_string(), None);

        assert!(cache.get("a").is_some());
        assert!(cache.get("b").is_none());
        assert!(cache.get("c").is_some());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn reinserting_existing_key_does_not_evict() {
        let cache = GeocodeCache::new(2);
        cache.insert("a".to_string(), None);
        cache.insert("b".to_string(), None);
        cache.insert("a".to_string(), Some(REPUBLIQUE));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), Some(Some(REPUBLIQUE)));
        assert!(cache.get("b").is_some());
    }

    #[test]
    fn clear_empties_the_cache() {
        let cache = GeocodeCache::new(10);
        cache.insert("a".to_string(), Some(REPUBLIQUE));
        cache.clear();

        assert!(cache.is_empty());
        assert!(cache.get("a").is_none());
    }
}
