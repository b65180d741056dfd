//! Small in-memory TTL cache with a bounded entry count.
//!
//! The cache memoizes GitHub responses for the lifetime of a client. Entries
//! expire once their age reaches the TTL and are removed lazily on read. When
//! the cache is full the entry with the oldest timestamp is evicted.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use crate::clock::{Clock, SystemClock};

/// A cached value and the time it was stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry<V> {
    /// Cached value.
    pub value: V,
    /// Milliseconds since the Unix epoch when the value was stored.
    pub timestamp_ms: u64,
}

/// Key/value cache with expiry and a maximum size.
///
/// A `max_size` of zero disables caching entirely; a `ttl` of zero makes every
/// entry expire immediately.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use pullgate::cache::TtlCache;
///
/// let mut cache = TtlCache::new(Duration::from_secs(60), 2);
/// cache.set("octo/repo", 42);
/// assert_eq!(cache.get(&"octo/repo"), Some(42));
/// ```
pub struct TtlCache<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    ttl: Duration,
    max_size: usize,
    clock: Arc<dyn Clock>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Creates a cache using the system clock.
    #[must_use]
    pub fn new(ttl: Duration, max_size: usize) -> Self {
        Self::with_clock(ttl, max_size, Arc::new(SystemClock))
    }

    /// Creates a cache reading time from `clock`.
    #[must_use]
    pub fn with_clock(ttl: Duration, max_size: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            max_size,
            clock,
        }
    }

    /// Stores `value` under `key`, refreshing the timestamp of an existing
    /// entry.
    pub fn set(&mut self, key: K, value: V) {
        if self.max_size == 0 {
            return;
        }

        if self.entries.len() >= self.max_size && !self.entries.contains_key(&key) {
            self.evict_oldest();
        }

        let timestamp_ms = self.clock.now_millis();
        self.entries.insert(
            key,
            CacheEntry {
                value,
                timestamp_ms,
            },
        );
    }

    /// Returns a clone of the live value for `key`.
    ///
    /// Expired entries are dropped as a side effect.
    pub fn get(&mut self, key: &K) -> Option<V> {
        if self.max_size == 0 {
            return None;
        }

        let timestamp_ms = self.entries.get(key)?.timestamp_ms;
        let age = Duration::from_millis(self.clock.now_millis().saturating_sub(timestamp_ms));

        if self.ttl.is_zero() || age >= self.ttl {
            self.entries.remove(key);
            return None;
        }

        self.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Number of stored entries, including ones that have expired but not yet
    /// been read.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.timestamp_ms)
            .map(|(key, _)| key.clone());

        if let Some(key) = oldest {
            self.entries.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use rstest::{fixture, rstest};

    use super::TtlCache;
    use crate::clock::ManualClock;

    #[fixture]
    fn clock() -> ManualClock {
        ManualClock::at(1_700_000_000_000)
    }

    fn cache(ttl_ms: u64, max_size: usize, clock: &ManualClock) -> TtlCache<String, u32> {
        TtlCache::with_clock(
            Duration::from_millis(ttl_ms),
            max_size,
            Arc::new(clock.clone()),
        )
    }

    #[rstest]
    #[case::fresh(0, Some(7))]
    #[case::just_before_expiry(999, Some(7))]
    #[case::at_expiry(1_000, None)]
    #[case::long_after(5_000, None)]
    fn values_expire_once_age_reaches_ttl(
        clock: ManualClock,
        #[case] elapsed_ms: u64,
        #[case] expected: Option<u32>,
    ) {
        let mut cache = cache(1_000, 4, &clock);
        cache.set("k".to_owned(), 7);

        clock.advance(Duration::from_millis(elapsed_ms));

        assert_eq!(cache.get(&"k".to_owned()), expected);
    }

    #[rstest]
    fn expired_entries_are_removed_on_read(clock: ManualClock) {
        let mut cache = cache(10, 4, &clock);
        cache.set("k".to_owned(), 1);
        clock.advance(Duration::from_millis(10));

        assert_eq!(cache.get(&"k".to_owned()), None);
        assert!(cache.is_empty(), "expired entry should be evicted lazily");
    }

    #[rstest]
    fn zero_ttl_expires_immediately(clock: ManualClock) {
        let mut cache = cache(0, 4, &clock);
        cache.set("k".to_owned(), 1);

        assert_eq!(cache.get(&"k".to_owned()), None);
    }

    #[rstest]
    fn zero_max_size_disables_caching(clock: ManualClock) {
        let mut cache = cache(1_000, 0, &clock);
        cache.set("k".to_owned(), 1);

        assert_eq!(cache.get(&"k".to_owned()), None);
        assert!(cache.is_empty());
    }

    #[rstest]
    fn full_cache_evicts_oldest_entry(clock: ManualClock) {
        let mut cache = cache(60_000, 3, &clock);
        for (offset, key) in ["a", "b", "c", "d"].into_iter().enumerate() {
            cache.set(key.to_owned(), u32::try_from(offset).unwrap_or_default());
            clock.advance(Duration::from_millis(1));
        }

        assert_eq!(cache.get(&"a".to_owned()), None, "oldest key should be gone");
        assert_eq!(cache.get(&"b".to_owned()), Some(1));
        assert_eq!(cache.get(&"c".to_owned()), Some(2));
        assert_eq!(cache.get(&"d".to_owned()), Some(3));
        assert_eq!(cache.len(), 3);
    }

    #[rstest]
    fn overwriting_refreshes_timestamp(clock: ManualClock) {
        let mut cache = cache(1_000, 2, &clock);
        cache.set("k".to_owned(), 1);
        clock.advance(Duration::from_millis(800));
        cache.set("k".to_owned(), 2);
        clock.advance(Duration::from_millis(800));

        assert_eq!(cache.get(&"k".to_owned()), Some(2));
    }

    #[rstest]
    fn overwriting_at_capacity_keeps_other_entries(clock: ManualClock) {
        let mut cache = cache(60_000, 2, &clock);
        cache.set("a".to_owned(), 1);
        clock.advance(Duration::from_millis(1));
        cache.set("b".to_owned(), 2);
        cache.set("b".to_owned(), 3);

        assert_eq!(cache.get(&"a".to_owned()), Some(1));
        assert_eq!(cache.get(&"b".to_owned()), Some(3));
    }
}
