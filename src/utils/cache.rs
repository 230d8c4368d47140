//! Time-to-live cache
//!
//! Used for spot prices. Entries are never refreshed in place; a stale
//! entry is simply ignored until the next `insert`.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

pub struct TtlCache<K, V> {
    entries: HashMap<K, (V, Instant)>,
    ttl: Duration,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    /// Fresh value for `key`, if any
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.entries
            .get(key)
            .filter(|(_, inserted)| inserted.elapsed() < self.ttl)
            .map(|(value, _)| value.clone())
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.entries.insert(key, (value, Instant::now()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_fresh_entries_are_returned() {
        let mut cache: TtlCache<String, f64> = TtlCache::new(Duration::from_secs(60));
        cache.insert("ethereum".to_string(), 3120.5);
        assert_eq!(cache.get("ethereum"), Some(3120.5));
        assert_eq!(cache.get("solana"), None);
    }

    #[test]
    fn test_entries_expire() {
        let mut cache: TtlCache<&'static str, f64> = TtlCache::new(Duration::from_millis(30));
        cache.insert("bitcoin", 60_000.0);
        sleep(Duration::from_millis(60));
        assert_eq!(cache.get("bitcoin"), None);

        cache.insert("bitcoin", 61_000.0);
        assert_eq!(cache.get("bitcoin"), Some(61_000.0));
    }
}
