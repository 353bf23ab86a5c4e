//! Tiered TTL cache for the aggregation read paths.
//!
//! Entries expire purely by time. Writes to the underlying stores (association
//! runs, imports) do not evict anything, so a reader may observe data up to
//! one TTL old. The tiers are sized by how volatile the data is:
//!
//! | Tier        | Data                                     | Policy   | TTL    |
//! |-------------|------------------------------------------|----------|--------|
//! | `reference` | contract types/statuses, states, years   | absolute | 24h    |
//! | `lists`     | contractor / area / block lists          | sliding  | 10 min |
//! | `tree`      | full nested map tree                     | sliding  | 5 min  |
//!
//! Each key owns a [`OnceCell`], so concurrent misses on the same key run the
//! computation once while other callers wait on that key only. The key map
//! itself is locked just long enough to find or create the slot.

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::debug;
use lru::LruCache;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

// ============================================================================
// Clock
// ============================================================================

/// Time source for expiry decisions.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> Instant;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock for tests and simulations.
#[derive(Debug, Clone)]
pub struct ManualClock {
    base: Instant,
    offset: Arc<Mutex<Duration>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    /// Move time forward. Clones of this clock observe the change.
    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock()
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// How the TTL is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpiryPolicy {
    /// Expires a fixed time after insertion.
    Absolute,
    /// Expires a fixed time after the last read.
    Sliding,
}

/// Settings for one cache tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierConfig {
    pub policy: ExpiryPolicy,
    /// Time to live in seconds.
    pub ttl_secs: u64,
    /// Maximum number of keys; least recently used keys are dropped first.
    pub capacity: usize,
}

impl TierConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Settings for every tier in front of the aggregation store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheConfig {
    /// Reference lookups. Default: absolute, 24h
    pub reference: TierConfig,
    /// Contractor/area/block lists. Default: sliding, 10 min
    pub lists: TierConfig,
    /// Nested map trees, one entry per filter. Default: sliding, 5 min
    pub tree: TierConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            reference: TierConfig {
                policy: ExpiryPolicy::Absolute,
                ttl_secs: 24 * 60 * 60,
                capacity: 16,
            },
            lists: TierConfig {
                policy: ExpiryPolicy::Sliding,
                ttl_secs: 10 * 60,
                capacity: 256,
            },
            tree: TierConfig {
                policy: ExpiryPolicy::Sliding,
                ttl_secs: 5 * 60,
                capacity: 128,
            },
        }
    }
}

// ============================================================================
// Cache
// ============================================================================

/// Hit/miss counters for one cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub expirations: u64,
    pub entries: usize,
}

struct Slot<V> {
    cell: Arc<OnceCell<Arc<V>>>,
    inserted_at: Instant,
    last_access: Instant,
}

/// Time-bounded key-value cache with compute-once misses.
pub struct TtlCache<V> {
    name: &'static str,
    policy: ExpiryPolicy,
    ttl: Duration,
    entries: Mutex<LruCache<String, Slot<V>>>,
    clock: Arc<dyn Clock>,
    hits: AtomicU64,
    misses: AtomicU64,
    expirations: AtomicU64,
}

impl<V> fmt::Debug for TtlCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtlCache")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .field("ttl", &self.ttl)
            .field("stats", &self.stats())
            .finish()
    }
}

impl<V> TtlCache<V> {
    /// Create a cache for one tier using wall-clock time.
    pub fn new(name: &'static str, tier: &TierConfig) -> Self {
        Self::with_clock(name, tier, Arc::new(SystemClock))
    }

    /// Create a cache with an explicit time source.
    pub fn with_clock(name: &'static str, tier: &TierConfig, clock: Arc<dyn Clock>) -> Self {
        let capacity = NonZeroUsize::new(tier.capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            name,
            policy: tier.policy,
            ttl: tier.ttl(),
            entries: Mutex::new(LruCache::new(capacity)),
            clock,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
        }
    }

    fn is_expired(&self, slot: &Slot<V>, now: Instant) -> bool {
        let anchor = match self.policy {
            ExpiryPolicy::Absolute => slot.inserted_at,
            ExpiryPolicy::Sliding => slot.last_access,
        };
        now.saturating_duration_since(anchor) >= self.ttl
    }

    /// Find the live slot for a key, replacing it if it has expired.
    fn slot_for(&self, key: &str, now: Instant) -> Arc<OnceCell<Arc<V>>> {
        let mut entries = self.entries.lock();

        if let Some(slot) = entries.get_mut(key) {
            if !self.is_expired(slot, now) {
                slot.last_access = now;
                return Arc::clone(&slot.cell);
            }
        }

        if entries.pop(key).is_some() {
            self.expirations.fetch_add(1, Ordering::Relaxed);
            debug!("[cache] {} expired key '{}'", self.name, key);
        }

        let cell = Arc::new(OnceCell::new());
        entries.put(
            key.to_string(),
            Slot {
                cell: Arc::clone(&cell),
                inserted_at: now,
                last_access: now,
            },
        );
        cell
    }

    /// Return the cached value, computing it on a miss.
    ///
    /// A failed computation leaves the key empty so the next call retries.
    pub fn get_or_try_insert_with<E, F>(&self, key: &str, compute: F) -> Result<Arc<V>, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        let cell = self.slot_for(key, self.clock.now());

        if let Some(value) = cell.get() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!("[cache] {} hit '{}'", self.name, key);
            return Ok(Arc::clone(value));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!("[cache] {} miss '{}'", self.name, key);
        cell.get_or_try_init(|| compute().map(Arc::new))
            .map(Arc::clone)
    }

    /// Read without computing. Expired entries read as absent.
    pub fn get(&self, key: &str) -> Option<Arc<V>> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        let slot = entries.get_mut(key)?;
        if self.is_expired(slot, now) {
            return None;
        }
        let value = slot.cell.get().cloned()?;
        slot.last_access = now;
        Some(value)
    }

    /// Store a value, replacing any existing entry for the key.
    pub fn insert(&self, key: &str, value: V) -> Arc<V> {
        let now = self.clock.now();
        let value = Arc::new(value);
        let cell = OnceCell::new();
        let _ = cell.set(Arc::clone(&value));
        self.entries.lock().put(
            key.to_string(),
            Slot {
                cell: Arc::new(cell),
                inserted_at: now,
                last_access: now,
            },
        );
        value
    }

    /// Drop one key. Returns whether it was present.
    pub fn invalidate(&self, key: &str) -> bool {
        self.entries.lock().pop(key).is_some()
    }

    /// Drop every key.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Number of keys currently held, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn policy(&self) -> ExpiryPolicy {
        self.policy
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Barrier;

    fn tier(policy: ExpiryPolicy, ttl_secs: u64) -> TierConfig {
        TierConfig {
            policy,
            ttl_secs,
            capacity: 8,
        }
    }

    fn cache_with_clock(policy: ExpiryPolicy, ttl_secs: u64) -> (TtlCache<u32>, ManualClock) {
        let clock = ManualClock::new();
        let cache = TtlCache::with_clock("test", &tier(policy, ttl_secs), Arc::new(clock.clone()));
        (cache, clock)
    }

    fn ok(value: u32) -> Result<u32, String> {
        Ok(value)
    }

    #[test]
    fn test_default_tiers() {
        let config = CacheConfig::default();
        assert_eq!(config.reference.policy, ExpiryPolicy::Absolute);
        assert_eq!(config.reference.ttl(), Duration::from_secs(86_400));
        assert_eq!(config.lists.policy, ExpiryPolicy::Sliding);
        assert_eq!(config.lists.ttl(), Duration::from_secs(600));
        assert_eq!(config.tree.policy, ExpiryPolicy::Sliding);
        assert_eq!(config.tree.ttl(), Duration::from_secs(300));
    }

    #[test]
    fn test_miss_then_hit() {
        let (cache, _clock) = cache_with_clock(ExpiryPolicy::Absolute, 60);

        let first = cache.get_or_try_insert_with("k", || ok(1)).unwrap();
        let second = cache.get_or_try_insert_with("k", || ok(2)).unwrap();

        assert_eq!(*first, 1);
        assert_eq!(*second, 1);
        assert!(Arc::ptr_eq(&first, &second));

        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.entries, 1);
    }

    #[test]
    fn test_absolute_expiry_ignores_reads() {
        let (cache, clock) = cache_with_clock(ExpiryPolicy::Absolute, 60);
        cache.get_or_try_insert_with("k", || ok(1)).unwrap();

        clock.advance(Duration::from_secs(40));
        assert_eq!(cache.get("k").as_deref(), Some(&1));

        // Reading at 40s does not extend an absolute entry
        clock.advance(Duration::from_secs(30));
        assert!(cache.get("k").is_none());

        let value = cache.get_or_try_insert_with("k", || ok(2)).unwrap();
        assert_eq!(*value, 2);
        assert_eq!(cache.stats().expirations, 1);
    }

    #[test]
    fn test_sliding_expiry_refreshed_by_reads() {
        let (cache, clock) = cache_with_clock(ExpiryPolicy::Sliding, 60);
        cache.get_or_try_insert_with("k", || ok(1)).unwrap();

        for _ in 0..5 {
            clock.advance(Duration::from_secs(45));
            assert_eq!(*cache.get_or_try_insert_with("k", || ok(9)).unwrap(), 1);
        }

        clock.advance(Duration::from_secs(61));
        assert_eq!(*cache.get_or_try_insert_with("k", || ok(9)).unwrap(), 9);
    }

    #[test]
    fn test_failed_compute_not_cached() {
        let (cache, _clock) = cache_with_clock(ExpiryPolicy::Sliding, 60);

        let err = cache
            .get_or_try_insert_with("k", || Err::<u32, _>("boom".to_string()))
            .unwrap_err();
        assert_eq!(err, "boom");
        assert!(cache.get("k").is_none());

        let value = cache.get_or_try_insert_with("k", || ok(3)).unwrap();
        assert_eq!(*value, 3);
    }

    #[test]
    fn test_insert_and_invalidate() {
        let (cache, _clock) = cache_with_clock(ExpiryPolicy::Sliding, 60);
        cache.insert("a", 1);
        cache.insert("b", 2);
        assert_eq!(cache.len(), 2);

        assert!(cache.invalidate("a"));
        assert!(!cache.invalidate("a"));
        assert!(cache.get("a").is_none());

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_capacity_evicts_least_recent() {
        let clock = ManualClock::new();
        let tier = TierConfig {
            policy: ExpiryPolicy::Sliding,
            ttl_secs: 60,
            capacity: 2,
        };
        let cache = TtlCache::with_clock("small", &tier, Arc::new(clock));
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.get("a");
        cache.insert("c", 3);

        assert!(cache.get("b").is_none());
        assert_eq!(cache.get("a").as_deref(), Some(&1));
        assert_eq!(cache.get("c").as_deref(), Some(&3));
    }

    #[test]
    fn test_concurrent_misses_compute_once() {
        let cache = TtlCache::<u32>::new("shared", &tier(ExpiryPolicy::Sliding, 60));
        let computations = AtomicUsize::new(0);
        let threads = 8;
        let barrier = Barrier::new(threads);

        std::thread::scope(|scope| {
            for _ in 0..threads {
                scope.spawn(|| {
                    barrier.wait();
                    let value = cache
                        .get_or_try_insert_with("tree", || {
                            computations.fetch_add(1, Ordering::SeqCst);
                            std::thread::sleep(Duration::from_millis(20));
                            ok(7)
                        })
                        .unwrap();
                    assert_eq!(*value, 7);
                });
            }
        });

        assert_eq!(computations.load(Ordering::SeqCst), 1);
    }
}
