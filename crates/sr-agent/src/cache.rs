use chrono::{DateTime, Duration, Utc};
use core_types::Timeframe;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

const CACHE_TTL_SECS: i64 = 3600;
const CACHE_CAPACITY: usize = 100;

/// Cache key for a single detection request. `lookback_days` is part of the key
/// because two requests for the same symbol/timeframe with different lookback
/// windows are not interchangeable results.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DetectionCacheKey {
    pub symbol: String,
    pub min_strength: u8,
    pub max_levels: usize,
    pub timeframe: &'static str,
    pub project_future: bool,
    pub lookback_days: Option<i64>,
}

impl DetectionCacheKey {
    pub fn new(
        symbol: &str,
        min_strength: u8,
        max_levels: usize,
        timeframe: Timeframe,
        project_future: bool,
        lookback_days: Option<i64>,
    ) -> Self {
        Self {
            symbol: symbol.to_uppercase(),
            min_strength,
            max_levels,
            timeframe: timeframe.as_str(),
            project_future,
            lookback_days,
        }
    }
}

struct Entry<V> {
    value: V,
    cached_at: DateTime<Utc>,
}

/// A TTL + LRU-capacity cache. Reads return `None` on expiry without evicting;
/// writes evict the single oldest entry once the cache is at capacity.
pub struct DetectionCache<V: Clone> {
    entries: Mutex<HashMap<DetectionCacheKey, Entry<V>>>,
    order: Mutex<VecDeque<DetectionCacheKey>>,
}

impl<V: Clone> DetectionCache<V> {
    pub fn new() -> Self {
        Self { entries: Mutex::new(HashMap::new()), order: Mutex::new(VecDeque::new()) }
    }

    pub fn get(&self, key: &DetectionCacheKey) -> Option<V> {
        let entries = self.entries.lock().unwrap();
        let entry = entries.get(key)?;
        if Utc::now() - entry.cached_at > Duration::seconds(CACHE_TTL_SECS) {
            return None;
        }
        Some(entry.value.clone())
    }

    pub fn insert(&self, key: DetectionCacheKey, value: V) {
        let mut entries = self.entries.lock().unwrap();
        let mut order = self.order.lock().unwrap();

        if !entries.contains_key(&key) {
            if entries.len() >= CACHE_CAPACITY {
                if let Some(oldest) = order.pop_front() {
                    entries.remove(&oldest);
                }
            }
            order.push_back(key.clone());
        }

        entries.insert(key, Entry { value, cached_at: Utc::now() });
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

impl<V: Clone> Default for DetectionCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get_round_trips() {
        let cache: DetectionCache<i32> = DetectionCache::new();
        let key = DetectionCacheKey::new("AAPL", 50, 10, Timeframe::Day1, false, None);
        cache.insert(key.clone(), 42);
        assert_eq!(cache.get(&key), Some(42));
    }

    #[test]
    fn eviction_drops_oldest_when_at_capacity() {
        let cache: DetectionCache<i32> = DetectionCache::new();
        for i in 0..CACHE_CAPACITY {
            let key = DetectionCacheKey::new(&format!("SYM{i}"), 50, 10, Timeframe::Day1, false, None);
            cache.insert(key, i as i32);
        }
        assert_eq!(cache.len(), CACHE_CAPACITY);

        let first_key = DetectionCacheKey::new("SYM0", 50, 10, Timeframe::Day1, false, None);
        let new_key = DetectionCacheKey::new("SYMNEW", 50, 10, Timeframe::Day1, false, None);
        cache.insert(new_key.clone(), 999);

        assert_eq!(cache.len(), CACHE_CAPACITY);
        assert_eq!(cache.get(&first_key), None);
        assert_eq!(cache.get(&new_key), Some(999));
    }
}
