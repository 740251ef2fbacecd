use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// Read-through cache with a per-entry TTL and a hard capacity. Entries
/// are written once per key and evicted on expiry or, when full, oldest
/// first. Lookups take `&mut self` so expired entries are dropped in place.
pub struct TtlCache<K, V> {
    ttl: Duration,
    capacity: usize,
    entries: HashMap<K, (Instant, V)>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity: capacity.max(1),
            entries: HashMap::new(),
        }
    }

    pub fn get(&mut self, key: &K) -> Option<&V> {
        let expired = match self.entries.get(key) {
            Some((stored_at, _)) => stored_at.elapsed() >= self.ttl,
            None => return None,
        };
        if expired {
            self.entries.remove(key);
            return None;
        }
        self.entries.get(key).map(|(_, value)| value)
    }

    pub fn insert(&mut self, key: K, value: V) {
        if self.entries.len() >= self.capacity && !self.entries.contains_key(&key) {
            self.evict_oldest();
        }
        self.entries.insert(key, (Instant::now(), value));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, (stored_at, _))| *stored_at)
            .map(|(key, _)| key.clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_within_ttl() {
        let mut cache = TtlCache::new(Duration::from_secs(60), 8);
        cache.insert("a", 1);
        assert_eq!(cache.get(&"a"), Some(&1));
    }

    #[test]
    fn test_expired_entry_is_dropped() {
        let mut cache = TtlCache::new(Duration::from_millis(0), 8);
        cache.insert("a", 1);
        assert_eq!(cache.get(&"a"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut cache = TtlCache::new(Duration::from_secs(60), 2);
        cache.insert("a", 1);
        std::thread::sleep(Duration::from_millis(5));
        cache.insert("b", 2);
        std::thread::sleep(Duration::from_millis(5));
        cache.insert("c", 3);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&"a"), None);
        assert_eq!(cache.get(&"b"), Some(&2));
        assert_eq!(cache.get(&"c"), Some(&3));
    }

    #[test]
    fn test_rewrite_of_existing_key_does_not_evict() {
        let mut cache = TtlCache::new(Duration::from_secs(60), 2);
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.insert("a", 3);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&"a"), Some(&3));
        assert_eq!(cache.get(&"b"), Some(&2));
    }
}
