use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

// ---------------------------------------------------------------------------
// TtlCache -- last result per key, reused while younger than `ttl`
// ---------------------------------------------------------------------------

struct Entry<V> {
    value: V,
    fetched_at: Instant,
}

/// Thread-safe cache storing `(value, fetched_at)` per key.
///
/// Callers pass `now` explicitly so the freshness rule `now - fetched_at < ttl`
/// is deterministic under test.
pub struct TtlCache<K, V> {
    entries: RwLock<HashMap<K, Entry<V>>>,
    ttl: Duration,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Return a clone of the cached value if it is still fresh at `now`.
    pub fn get(&self, key: &K, now: Instant) -> Option<V> {
        let map = self.entries.read();
        let entry = map.get(key)?;
        // A `now` earlier than `fetched_at` saturates to zero age.
        let age = now.saturating_duration_since(entry.fetched_at);
        if age < self.ttl {
            Some(entry.value.clone())
        } else {
            None
        }
    }

    /// Store `value`, replacing any previous entry for `key`.
    pub fn insert(&self, key: K, value: V, now: Instant) {
        self.entries.write().insert(
            key,
            Entry {
                value,
                fetched_at: now,
            },
        );
    }

    pub fn invalidate(&self, key: &K) -> bool {
        self.entries.write().remove(key).is_some()
    }

    /// Drop every entry, returning how many were removed.
    pub fn clear(&self) -> usize {
        let mut map = self.entries.write();
        let n = map.len();
        map.clear();
        n
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_entry_is_returned() {
        let cache: TtlCache<&str, u32> = TtlCache::new(Duration::from_secs(300));
        let t0 = Instant::now();
        cache.insert("EURUSDT", 7, t0);

        assert_eq!(cache.get(&"EURUSDT", t0), Some(7));
        assert_eq!(cache.get(&"EURUSDT", t0 + Duration::from_secs(299)), Some(7));
    }

    #[test]
    fn entry_expires_at_ttl() {
        let cache: TtlCache<&str, u32> = TtlCache::new(Duration::from_secs(300));
        let t0 = Instant::now();
        cache.insert("EURUSDT", 7, t0);

        assert_eq!(cache.get(&"EURUSDT", t0 + Duration::from_secs(300)), None);
        assert_eq!(cache.get(&"EURUSDT", t0 + Duration::from_secs(301)), None);
    }

    #[test]
    fn zero_ttl_never_hits() {
        let cache: TtlCache<&str, u32> = TtlCache::new(Duration::ZERO);
        let t0 = Instant::now();
        cache.insert("k", 1, t0);
        assert_eq!(cache.get(&"k", t0), None);
    }

    #[test]
    fn insert_replaces_and_resets_age() {
        let cache: TtlCache<&str, u32> = TtlCache::new(Duration::from_secs(10));
        let t0 = Instant::now();
        cache.insert("k", 1, t0);
        cache.insert("k", 2, t0 + Duration::from_secs(8));

        assert_eq!(cache.get(&"k", t0 + Duration::from_secs(15)), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn invalidate_and_clear() {
        let cache: TtlCache<&str, u32> = TtlCache::new(Duration::from_secs(10));
        let t0 = Instant::now();
        cache.insert("a", 1, t0);
        cache.insert("b", 2, t0);

        assert!(cache.invalidate(&"a"));
        assert!(!cache.invalidate(&"a"));
        assert_eq!(cache.get(&"a", t0), None);
        assert_eq!(cache.clear(), 1);
        assert_eq!(cache.len(), 0);
    }
}
