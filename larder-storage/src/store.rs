//! Ground-truth in-memory stock store.
//!
//! Every operation sleeps for the configured latency before touching the
//! map, modelling a slow backend. The sleep happens outside the lock so
//! callers working on different keys are not serialized behind each other's
//! latency; the check-and-subtract of `reserve` runs entirely under the
//! write lock.

use larder_core::{
    validate_quantity, Count, Inventory, LarderError, LarderResult, Operation, Quantity,
    ResourceKey, StorageError,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

const COMPONENT: &str = "resource store";

/// In-memory key -> count map with simulated latency.
#[derive(Debug)]
pub struct ResourceStore {
    counts: RwLock<HashMap<ResourceKey, Count>>,
    latency: Duration,
    read_calls: AtomicU64,
}

impl ResourceStore {
    /// Create an empty store.
    pub fn new(latency: Duration) -> Self {
        Self::with_stock(std::iter::empty::<(ResourceKey, Count)>(), latency)
    }

    /// Create a store seeded with initial counts.
    ///
    /// Keys that differ only in case collapse into one entry; the last one
    /// wins.
    pub fn with_stock<K, I>(stock: I, latency: Duration) -> Self
    where
        K: Into<ResourceKey>,
        I: IntoIterator<Item = (K, Count)>,
    {
        let counts: HashMap<ResourceKey, Count> =
            stock.into_iter().map(|(k, v)| (k.into(), v)).collect();
        tracing::debug!(
            keys = counts.len(),
            latency_ms = latency.as_millis() as u64,
            "Resource store constructed"
        );
        Self {
            counts: RwLock::new(counts),
            latency,
            read_calls: AtomicU64::new(0),
        }
    }

    /// Configured per-operation latency.
    pub fn latency(&self) -> Duration {
        self.latency
    }

    /// Number of `get` calls that reached this store.
    pub fn read_calls(&self) -> u64 {
        self.read_calls.load(Ordering::Relaxed)
    }

    /// Sorted copy of every count currently held.
    pub fn snapshot(&self) -> LarderResult<BTreeMap<String, Count>> {
        let counts = self.read()?;
        Ok(counts
            .iter()
            .map(|(k, v)| (k.as_str().to_string(), *v))
            .collect())
    }

    fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }
    }

    fn read(&self) -> LarderResult<RwLockReadGuard<'_, HashMap<ResourceKey, Count>>> {
        self.counts
            .read()
            .map_err(|_| LarderError::Storage(StorageError::LockPoisoned { component: COMPONENT }))
    }

    fn write(&self) -> LarderResult<RwLockWriteGuard<'_, HashMap<ResourceKey, Count>>> {
        self.counts
            .write()
            .map_err(|_| LarderError::Storage(StorageError::LockPoisoned { component: COMPONENT }))
    }
}

impl Inventory for ResourceStore {
    fn get(&self, key: &ResourceKey) -> LarderResult<Count> {
        self.read_calls.fetch_add(1, Ordering::Relaxed);
        self.simulate_latency();
        let counts = self.read()?;
        Ok(counts.get(key).copied().unwrap_or(0))
    }

    fn increase(&self, key: &ResourceKey, qty: Quantity) -> LarderResult<()> {
        let qty = validate_quantity(Operation::Increase, qty)?;
        self.simulate_latency();

        let mut counts = self.write()?;
        let current = counts.get(key).copied().unwrap_or(0);
        let updated = current.checked_add(qty).ok_or_else(|| {
            LarderError::Storage(StorageError::CountOverflow {
                key: key.to_string(),
            })
        })?;
        counts.insert(key.clone(), updated);
        tracing::trace!(key = %key, qty, count = updated, "Stock increased");
        Ok(())
    }

    fn reserve(&self, key: &ResourceKey, qty: Quantity) -> LarderResult<bool> {
        let qty = validate_quantity(Operation::Reserve, qty)?;
        self.simulate_latency();

        let mut counts = self.write()?;
        match counts.get_mut(key) {
            Some(count) if *count >= qty => {
                *count -= qty;
                tracing::trace!(key = %key, qty, count = *count, "Stock reserved");
                Ok(true)
            }
            _ => {
                tracing::trace!(key = %key, qty, "Insufficient stock");
                Ok(false)
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use larder_core::ErrorKind;
    use std::sync::{Arc, Barrier};
    use std::time::Instant;

    fn key(s: &str) -> ResourceKey {
        ResourceKey::new(s)
    }

    #[test]
    fn test_get_unknown_key_returns_zero() {
        let store = ResourceStore::new(Duration::ZERO);
        assert_eq!(store.get(&key("missing")).unwrap(), 0);
        assert_eq!(store.read_calls(), 1);
    }

    #[test]
    fn test_increase_creates_and_adds() {
        let store = ResourceStore::with_stock([("A", 10)], Duration::ZERO);
        store.increase(&key("A"), 3).unwrap();
        store.increase(&key("new"), 2).unwrap();
        assert_eq!(store.get(&key("A")).unwrap(), 13);
        assert_eq!(store.get(&key("new")).unwrap(), 2);
    }

    #[test]
    fn test_increase_rejects_non_positive() {
        let store = ResourceStore::with_stock([("A", 10)], Duration::ZERO);
        for qty in [0, -5] {
            let err = store.increase(&key("A"), qty).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        }
        assert_eq!(store.get(&key("A")).unwrap(), 10);
    }

    #[test]
    fn test_increase_overflow_leaves_count() {
        let store = ResourceStore::with_stock([("A", u64::MAX - 1)], Duration::ZERO);
        let err = store.increase(&key("A"), 5).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert_eq!(store.get(&key("A")).unwrap(), u64::MAX - 1);
    }

    #[test]
    fn test_reserve_success_and_insufficient() {
        let store = ResourceStore::with_stock([("A", 5)], Duration::ZERO);
        assert!(store.reserve(&key("A"), 3).unwrap());
        assert_eq!(store.get(&key("A")).unwrap(), 2);

        assert!(!store.reserve(&key("A"), 3).unwrap());
        assert_eq!(store.get(&key("A")).unwrap(), 2);

        assert!(store.reserve(&key("A"), 2).unwrap());
        assert_eq!(store.get(&key("A")).unwrap(), 0);
    }

    #[test]
    fn test_reserve_unknown_key_is_false() {
        let store = ResourceStore::new(Duration::ZERO);
        assert!(!store.reserve(&key("ghost"), 1).unwrap());
        assert!(store.snapshot().unwrap().is_empty());
    }

    #[test]
    fn test_reserve_rejects_non_positive() {
        let store = ResourceStore::with_stock([("A", 5)], Duration::ZERO);
        let err = store.reserve(&key("A"), 0).unwrap_err();
        assert!(err.is_invalid_argument());
        assert_eq!(store.get(&key("A")).unwrap(), 5);
    }

    #[test]
    fn test_keys_are_case_insensitive() {
        let store = ResourceStore::with_stock([("SKU-001", 10)], Duration::ZERO);
        assert_eq!(store.get(&key("sku-001")).unwrap(), 10);
        store.increase(&key("Sku-001"), 1).unwrap();
        assert_eq!(store.snapshot().unwrap().get("SKU-001"), Some(&11));
    }

    #[test]
    fn test_latency_applies_to_every_operation() {
        let store = ResourceStore::with_stock([("A", 5)], Duration::from_millis(20));
        let start = Instant::now();
        store.get(&key("A")).unwrap();
        store.increase(&key("A"), 1).unwrap();
        store.reserve(&key("A"), 1).unwrap();
        assert!(start.elapsed() >= Duration::from_millis(60));
    }

    #[test]
    fn test_concurrent_reserve_never_oversells() {
        let store = Arc::new(ResourceStore::with_stock([("A", 10)], Duration::from_millis(1)));
        let threads = 16;
        let barrier = Arc::new(Barrier::new(threads));

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    store.reserve(&ResourceKey::new("A"), 1).unwrap()
                })
            })
            .collect();

        let granted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(granted, 10);
        assert_eq!(store.get(&key("A")).unwrap(), 0);
    }
}
