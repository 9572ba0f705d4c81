use std::time::Duration;

use moka::sync::Cache;

use crate::metrics::Metrics;

/// The four independent LRU+TTL caches used by the scaling/costing path, plus
/// the GraphRAG `HybridResult` cache. Entries are pure values — never shared
/// references to mutable state — so the caches are safe to share across
/// concurrently running orchestration runs.
#[derive(Clone)]
pub struct CacheLayer {
    pub ingredient: NamedCache<String, serde_json::Value>,
    pub density: NamedCache<String, f64>,
    pub cost: NamedCache<String, f64>,
    pub fdc: NamedCache<String, serde_json::Value>,
}

impl CacheLayer {
    pub fn new(metrics: Metrics) -> Self {
        Self {
            ingredient: NamedCache::new("ingredient", 1_000, Duration::from_secs(3_600), metrics.clone()),
            density: NamedCache::new("density", 500, Duration::from_secs(24 * 3_600), metrics.clone()),
            cost: NamedCache::new("cost", 500, Duration::from_secs(6 * 3_600), metrics.clone()),
            fdc: NamedCache::new("fdc", 2_000, Duration::from_secs(7 * 24 * 3_600), metrics),
        }
    }
}

/// A single named LRU+TTL cache that reports hits/misses to the metrics
/// registry under `cache_name`.
#[derive(Clone)]
pub struct NamedCache<K, V>
where
    K: std::hash::Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    name: &'static str,
    inner: Cache<K, V>,
    metrics: Metrics,
}

impl<K, V> NamedCache<K, V>
where
    K: std::hash::Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn new(name: &'static str, max_entries: u64, ttl: Duration, metrics: Metrics) -> Self {
        let inner = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();
        Self { name, inner, metrics }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        match self.inner.get(key) {
            Some(value) => {
                self.metrics.record_cache_hit(self.name);
                Some(value)
            }
            None => {
                self.metrics.record_cache_miss(self.name);
                None
            }
        }
    }

    pub fn insert(&self, key: K, value: V) {
        self.inner.insert(key, value);
    }

    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_and_miss_are_recorded_against_the_right_cache_name() {
        let metrics = Metrics::new_for_test();
        let cache: NamedCache<String, f64> =
            NamedCache::new("density", 10, Duration::from_secs(60), metrics.clone());

        assert!(cache.get(&"den:oat_flour".to_string()).is_none());
        cache.insert("den:oat_flour".to_string(), 0.45);
        assert_eq!(cache.get(&"den:oat_flour".to_string()), Some(0.45));

        assert_eq!(metrics.cache_misses_for_test("density"), 1);
        assert_eq!(metrics.cache_hits_for_test("density"), 1);
    }
}
