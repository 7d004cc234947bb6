//! TTL read-through cache over an inner inventory.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use larder_core::{
    Clock, Count, Inventory, LarderResult, Quantity, ResourceKey, SystemClock, MIN_TTL,
};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::entry::CacheEntry;
use super::stats::{CacheStats, StatsCounters};

/// Per-key cache slot.
///
/// `generation` is bumped by every eviction. A miss remembers the generation
/// it saw before calling the inner layer and only installs its result if no
/// eviction happened in between, so a read racing a write can never leave a
/// pre-write value behind.
#[derive(Debug, Default)]
struct Slot {
    entry: Option<CacheEntry>,
    generation: u64,
}

/// Read-through cache with a fixed time-to-live per entry.
pub struct TimedCache<I> {
    inner: I,
    ttl: Duration,
    slots: DashMap<ResourceKey, Slot>,
    clock: Arc<dyn Clock>,
    counters: StatsCounters,
}

impl<I: Inventory> TimedCache<I> {
    /// Create a cache using the wall clock. A zero TTL is raised to 1ms.
    pub fn new(inner: I, ttl: Duration) -> Self {
        Self::with_clock(inner, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(inner: I, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        if ttl < MIN_TTL {
            tracing::debug!(requested_ms = ttl.as_millis() as u64, "Cache TTL raised to minimum");
        }
        Self {
            inner,
            ttl: ttl.max(MIN_TTL),
            slots: DashMap::new(),
            clock,
            counters: StatsCounters::default(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn inner(&self) -> &I {
        &self.inner
    }

    /// The entry currently held for `key`, if it is still valid.
    pub fn peek(&self, key: &ResourceKey) -> Option<CacheEntry> {
        let now = self.clock.now();
        self.slots
            .get(key)
            .and_then(|slot| slot.entry)
            .filter(|entry| entry.is_valid(now))
    }

    /// Drop any entry for `key`.
    pub fn invalidate(&self, key: &ResourceKey) {
        let mut slot = self.slots.entry(key.clone()).or_default();
        slot.generation += 1;
        if slot.entry.take().is_some() {
            StatsCounters::bump(&self.counters.evictions);
            tracing::debug!(key = %key, "Cache entry evicted");
        }
    }

    /// Drop every entry. Returns how many were dropped.
    pub fn invalidate_all(&self) -> u64 {
        let mut dropped = 0;
        for mut slot in self.slots.iter_mut() {
            slot.generation += 1;
            if slot.entry.take().is_some() {
                dropped += 1;
            }
        }
        self.counters
            .evictions
            .fetch_add(dropped, std::sync::atomic::Ordering::Relaxed);
        tracing::debug!(dropped, "Cache cleared");
        dropped
    }

    pub fn stats(&self) -> CacheStats {
        let entry_count = self.slots.iter().filter(|slot| slot.entry.is_some()).count();
        self.counters.snapshot(entry_count as u64)
    }

    /// Look up `key`, returning the cached value or the generation to fill
    /// against on a miss.
    fn lookup(&self, key: &ResourceKey) -> Result<Count, u64> {
        let now = self.clock.now();
        let (generation, expired) = match self.slots.get(key) {
            Some(slot) => match slot.entry {
                Some(entry) if entry.is_valid(now) => return Ok(entry.value),
                Some(_) => (slot.generation, true),
                None => (slot.generation, false),
            },
            None => (0, false),
        };

        if expired {
            // Lazy eviction; leave the generation alone so our own fill lands.
            if let Some(mut slot) = self.slots.get_mut(key) {
                if slot.entry.is_some_and(|entry| !entry.is_valid(now)) {
                    slot.entry = None;
                }
            }
            StatsCounters::bump(&self.counters.expirations);
            tracing::trace!(key = %key, "Cache entry expired");
        }
        Err(generation)
    }

    fn fill(&self, key: &ResourceKey, value: Count, generation: u64) {
        let entry = CacheEntry::new(value, self.clock.now(), self.ttl);
        match self.slots.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().generation == generation {
                    occupied.get_mut().entry = Some(entry);
                } else {
                    tracing::trace!(key = %key, "Skipping cache fill invalidated by a concurrent write");
                }
            }
            Entry::Vacant(vacant) => {
                if generation == 0 {
                    vacant.insert(Slot {
                        entry: Some(entry),
                        generation,
                    });
                }
            }
        }
    }
}

impl<I> fmt::Debug for TimedCache<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimedCache")
            .field("ttl", &self.ttl)
            .field("slots", &self.slots.len())
            .finish_non_exhaustive()
    }
}

impl<I: Inventory> Inventory for TimedCache<I> {
    fn get(&self, key: &ResourceKey) -> LarderResult<Count> {
        let generation = match self.lookup(key) {
            Ok(value) => {
                StatsCounters::bump(&self.counters.hits);
                tracing::trace!(key = %key, value, "Cache hit");
                return Ok(value);
            }
            Err(generation) => generation,
        };

        StatsCounters::bump(&self.counters.misses);
        tracing::trace!(key = %key, "Cache miss");
        let value = self.inner.get(key)?;
        self.fill(key, value, generation);
        Ok(value)
    }

    fn increase(&self, key: &ResourceKey, qty: Quantity) -> LarderResult<()> {
        self.inner.increase(key, qty)?;
        self.invalidate(key);
        Ok(())
    }

    fn reserve(&self, key: &ResourceKey, qty: Quantity) -> LarderResult<bool> {
        let reserved = self.inner.reserve(key, qty)?;
        // Evict on both outcomes; a failed reservation still observed truth.
        self.invalidate(key);
        Ok(reserved)
    }
}
