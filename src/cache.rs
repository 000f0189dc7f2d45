//! Cache layer: memoizing, single-flight key/value cache with a default TTL.
//!
//! Built on `moka::future::Cache`, whose `try_get_with` coalesces concurrent
//! loads of the same key into one supplier run and never stores a failed load.
//! Serialization is per key; loads of unrelated keys proceed in parallel.

use crate::error::ContentError;
use chrono::{DateTime, Utc};
use moka::future::Cache;
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Default time-to-live for cached values.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Default maximum number of cached entries.
pub const DEFAULT_CAPACITY: u64 = 10_000;

/// A cached value with its bookkeeping.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub key: String,
    pub value: V,
    pub created_at: DateTime<Utc>,
    pub ttl: Duration,
}

impl<V> CacheEntry<V> {
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.created_at + chrono::Duration::from_std(self.ttl).unwrap_or_else(|_| chrono::Duration::days(36_500))
    }
}

/// Cache counters.
#[derive(Debug, Default)]
pub struct CacheMetrics {
    /// Lookups served without running the supplier (including coalesced waiters)
    hits: AtomicUsize,

    /// Lookups that ran the supplier
    misses: AtomicUsize,

    /// Supplier runs that failed (not cached)
    load_failures: AtomicUsize,

    invalidations: AtomicUsize,
}

impl CacheMetrics {
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_load_failure(&self) {
        self.load_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalidations(&self, count: usize) {
        self.invalidations.fetch_add(count, Ordering::Relaxed);
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    /// Number of supplier invocations.
    pub fn misses(&self) -> usize {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn load_failures(&self) -> usize {
        self.load_failures.load(Ordering::Relaxed)
    }

    pub fn invalidations(&self) -> usize {
        self.invalidations.load(Ordering::Relaxed)
    }

    /// Generate a metrics report.
    pub fn report(&self) -> CacheReport {
        let hits = self.hits();
        let misses = self.misses();
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        CacheReport {
            hits,
            misses,
            hit_rate,
            load_failures: self.load_failures(),
            invalidations: self.invalidations(),
        }
    }
}

/// Snapshot of cache counters.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheReport {
    pub hits: usize,
    pub misses: usize,

    /// Hit rate as a percentage (0-100)
    pub hit_rate: f64,

    pub load_failures: usize,
    pub invalidations: usize,
}

/// Single-flight TTL cache keyed by strings.
#[derive(Clone)]
pub struct ContentCache<V> {
    inner: Cache<String, CacheEntry<V>>,
    ttl: Duration,
    metrics: Arc<CacheMetrics>,
}

impl<V> ContentCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        let inner = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .build();
        Self {
            inner,
            ttl,
            metrics: Arc::new(CacheMetrics::default()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    /// Return the cached value for `key`, or compute it with `supplier`.
    ///
    /// Concurrent calls for the same uncached key run `supplier` exactly once;
    /// the others wait for and share its result. A failed supplier is not
    /// cached, so the next call retries.
    pub async fn get_or_set<F, Fut>(&self, key: &str, supplier: F) -> Result<V, ContentError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, ContentError>>,
    {
        let ran = AtomicBool::new(false);
        let ttl = self.ttl;

        let result = self
            .inner
            .try_get_with(key.to_string(), async {
                ran.store(true, Ordering::Relaxed);
                let value = supplier().await?;
                Ok::<_, ContentError>(CacheEntry {
                    key: key.to_string(),
                    value,
                    created_at: Utc::now(),
                    ttl,
                })
            })
            .await;

        let ran = ran.load(Ordering::Relaxed);
        if ran {
            self.metrics.record_miss();
        } else {
            self.metrics.record_hit();
        }

        match result {
            Ok(entry) => Ok(entry.value),
            Err(err) => {
                if ran {
                    self.metrics.record_load_failure();
                    debug!("Cache load for '{}' failed: {}", key, err);
                }
                Err(Arc::try_unwrap(err).unwrap_or_else(|shared| (*shared).clone()))
            }
        }
    }

    /// Cached value, if present and unexpired.
    pub async fn get(&self, key: &str) -> Option<V> {
        self.inner.get(key).await.map(|entry| entry.value)
    }

    /// Cached entry with its bookkeeping, if present and unexpired.
    pub async fn entry(&self, key: &str) -> Option<CacheEntry<V>> {
        self.inner.get(key).await
    }

    pub async fn invalidate(&self, key: &str) {
        self.inner.invalidate(key).await;
        self.metrics.record_invalidations(1);
    }

    /// Invalidate every entry whose key starts with `prefix`.
    ///
    /// # Returns
    /// The number of entries removed.
    pub async fn invalidate_prefix(&self, prefix: &str) -> usize {
        let keys: Vec<Arc<String>> = self
            .inner
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key)
            .collect();

        for key in &keys {
            self.inner.invalidate(key.as_str()).await;
        }

        self.metrics.record_invalidations(keys.len());
        debug!("Invalidated {} cache entries with prefix '{}'", keys.len(), prefix);
        keys.len()
    }

    pub async fn invalidate_all(&self) {
        self.inner.invalidate_all();
        self.inner.run_pending_tasks().await;
    }

    /// Number of live entries, after pending maintenance has run.
    pub async fn entry_count(&self) -> u64 {
        self.inner.run_pending_tasks().await;
        self.inner.entry_count()
    }
}
