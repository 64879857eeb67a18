// crates/tenant-guard-handlers/src/cache.rs
// ============================================================================
// Module: Resolver Cache
// Description: Keyed TTL cache interface, local implementation, single-flight.
// Purpose: Share expensive identity lookups across concurrent calls.
// Dependencies: tenant-guard-core, lru
// ============================================================================

//! ## Overview
//! [`KeyedCache`] is the storage seam the resolver consumes; [`LocalCache`]
//! is the process-local tier, an LRU bound with per-entry expiry. Keys are
//! built by [`public_key_cache_key`] and [`client_cache_key`] only.
//!
//! [`SingleFlight`] serializes work per key so concurrent misses for the
//! same key trigger one remote fetch. Distinct keys never block each other.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::time::Duration;
use std::time::Instant;

use lru::LruCache;
use tenant_guard_core::ClientId;
use tenant_guard_core::TenantId;

// ============================================================================
// SECTION: Cache Keys
// ============================================================================

/// Cache key for a tenant's verification key.
#[must_use]
pub fn public_key_cache_key(tenant_id: &TenantId) -> String {
    format!("public-key:{tenant_id}")
}

/// Cache key for an app client's permission list.
#[must_use]
pub fn client_cache_key(tenant_id: &TenantId, client_id: &ClientId) -> String {
    format!("client:{tenant_id}:{client_id}")
}

// ============================================================================
// SECTION: Cache Interface
// ============================================================================

/// Keyed store with per-entry lifetimes.
pub trait KeyedCache<V>: Send + Sync {
    /// Returns a live entry, if any.
    fn get(&self, key: &str) -> Option<V>;

    /// Stores an entry for `ttl`, replacing any existing value.
    fn put(&self, key: &str, value: V, ttl: Duration);

    /// Removes an entry.
    fn invalidate(&self, key: &str);
}

/// Cached value plus its expiry.
struct CacheEntry<V> {
    /// Stored value.
    value: V,
    /// Expiry instant; `None` when the lifetime overflows the clock.
    expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    /// Returns true when the entry is past its lifetime.
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

/// Process-local cache tier over an [`LruCache`].
///
/// # Invariants
/// - Never holds more than `max_entries` entries.
/// - Expired entries are never returned.
/// - At the bound, expired entries go before the least recently used one.
pub struct LocalCache<V> {
    /// Entries by key in recency order.
    entries: Mutex<LruCache<String, CacheEntry<V>>>,
}

impl<V> LocalCache<V> {
    /// Creates an empty cache holding at most `max_entries` entries (minimum one).
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Returns the number of stored entries, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    /// Returns true when nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V: Clone + Send> KeyedCache<V> for LocalCache<V> {
    fn get(&self, key: &str) -> Option<V> {
        let mut entries = lock(&self.entries);
        let now = Instant::now();
        if entries.peek(key)?.is_expired(now) {
            entries.pop(key);
            return None;
        }
        entries.get(key).map(|entry| entry.value.clone())
    }

    fn put(&self, key: &str, value: V, ttl: Duration) {
        let mut entries = lock(&self.entries);
        let now = Instant::now();
        if !entries.contains(key) && entries.len() >= entries.cap().get() {
            let expired: Vec<String> = entries
                .iter()
                .filter(|(_, entry)| entry.is_expired(now))
                .map(|(stale, _)| stale.clone())
                .collect();
            for stale in expired {
                entries.pop(&stale);
            }
        }
        entries.put(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: now.checked_add(ttl),
            },
        );
    }

    fn invalidate(&self, key: &str) {
        lock(&self.entries).pop(key);
    }
}

// ============================================================================
// SECTION: Single Flight
// ============================================================================

/// Per-key mutual exclusion for cache fills.
#[derive(Default)]
pub struct SingleFlight {
    /// Active key slots.
    slots: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SingleFlight {
    /// Creates an empty coordinator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `work` while holding the slot for `key`.
    ///
    /// Callers re-check the cache inside `work`; a waiter that acquires the
    /// slot after the first fill sees the cached value.
    pub fn run<T>(&self, key: &str, work: impl FnOnce() -> T) -> T {
        let slot = {
            let mut slots = lock(&self.slots);
            Arc::clone(slots.entry(key.to_string()).or_default())
        };
        let result = {
            let _held = lock(&slot);
            work()
        };
        let mut slots = lock(&self.slots);
        if Arc::strong_count(&slot) == 2 {
            slots.remove(key);
        }
        result
    }

    /// Returns the number of keys with work in progress or queued.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        lock(&self.slots).len()
    }
}

/// Locks a mutex, recovering the data from a poisoned lock.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
