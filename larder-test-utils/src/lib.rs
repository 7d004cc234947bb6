//! LARDER Test Utilities
//!
//! Shared test infrastructure for the LARDER workspace:
//! - Proptest generators for keys, stock maps and commands
//! - An instrumented in-memory inventory double
//! - Fixtures for stores and chains without simulated latency
//! - Assertions on error categories

// Re-export core types for convenience
pub use larder_core::{
    ChainConfig, Count, ErrorKind, Inventory, LarderError, LarderResult, LayerSet, ManualClock,
    Operation, Quantity, ResourceKey,
};
pub use larder_storage::{Chain, Composer, ResourceStore};

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

// ============================================================================
// COUNTING INVENTORY
// ============================================================================

/// In-memory [`Inventory`] that records how often each operation reached it.
///
/// Behaves like a zero-latency store; use it as the inner layer when a test
/// needs to know whether a proxy forwarded a call.
#[derive(Debug, Default)]
pub struct CountingInventory {
    counts: Mutex<HashMap<ResourceKey, Count>>,
    gets: AtomicU64,
    increases: AtomicU64,
    reserves: AtomicU64,
}

impl CountingInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stock<K: Into<ResourceKey>>(stock: impl IntoIterator<Item = (K, Count)>) -> Self {
        let inventory = Self::default();
        if let Ok(mut counts) = inventory.counts.lock() {
            counts.extend(stock.into_iter().map(|(k, v)| (k.into(), v)));
        }
        inventory
    }

    /// Calls of `operation` that reached this inventory, valid or not.
    pub fn calls(&self, operation: Operation) -> u64 {
        match operation {
            Operation::Get => self.gets.load(Ordering::SeqCst),
            Operation::Increase => self.increases.load(Ordering::SeqCst),
            Operation::Reserve => self.reserves.load(Ordering::SeqCst),
        }
    }

    pub fn total_calls(&self) -> u64 {
        self.calls(Operation::Get) + self.calls(Operation::Increase) + self.calls(Operation::Reserve)
    }

    /// Change a count without going through the contract, for simulating
    /// writes the cache cannot see.
    pub fn set_behind_back(&self, key: &str, count: Count) {
        if let Ok(mut counts) = self.counts.lock() {
            counts.insert(ResourceKey::new(key), count);
        }
    }

    fn counts(&self) -> LarderResult<std::sync::MutexGuard<'_, HashMap<ResourceKey, Count>>> {
        self.counts.lock().map_err(|_| {
            larder_core::StorageError::LockPoisoned {
                component: "counting inventory",
            }
            .into()
        })
    }
}

impl Inventory for CountingInventory {
    fn get(&self, key: &ResourceKey) -> LarderResult<Count> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        Ok(self.counts()?.get(key).copied().unwrap_or(0))
    }

    fn increase(&self, key: &ResourceKey, qty: Quantity) -> LarderResult<()> {
        self.increases.fetch_add(1, Ordering::SeqCst);
        let qty = larder_core::validate_quantity(Operation::Increase, qty)?;
        let mut counts = self.counts()?;
        let count = counts.entry(key.clone()).or_insert(0);
        *count = count.saturating_add(qty);
        Ok(())
    }

    fn reserve(&self, key: &ResourceKey, qty: Quantity) -> LarderResult<bool> {
        self.reserves.fetch_add(1, Ordering::SeqCst);
        let qty = larder_core::validate_quantity(Operation::Reserve, qty)?;
        let mut counts = self.counts()?;
        match counts.get_mut(key) {
            Some(count) if *count >= qty => {
                *count -= qty;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for LARDER inputs.

    use super::*;
    use proptest::prelude::*;

    /// A key from a small alphabet so generated commands collide often.
    pub fn arb_resource_key() -> impl Strategy<Value = ResourceKey> {
        prop_oneof![
            Just("SKU-001"),
            Just("sku-001"),
            Just("SKU-002"),
            Just("SKU-003"),
            Just("SKU-004"),
        ]
        .prop_map(ResourceKey::new)
    }

    /// Initial stock over the same key alphabet as [`arb_resource_key`].
    pub fn arb_stock() -> impl Strategy<Value = BTreeMap<String, Count>> {
        prop::collection::btree_map(
            prop_oneof![Just("SKU-001"), Just("SKU-002"), Just("SKU-003")].prop_map(String::from),
            0u64..50,
            0..=3,
        )
    }

    /// Mostly valid quantities, with the occasional non-positive one.
    pub fn arb_quantity() -> impl Strategy<Value = Quantity> {
        prop_oneof![
            8 => 1i64..20,
            1 => Just(0i64),
            1 => -5i64..0,
        ]
    }

    pub fn arb_operation() -> impl Strategy<Value = Operation> {
        prop_oneof![
            Just(Operation::Get),
            Just(Operation::Increase),
            Just(Operation::Reserve),
        ]
    }

    /// An operation with its key and quantity; `Get` ignores the quantity.
    pub fn arb_command() -> impl Strategy<Value = (Operation, ResourceKey, Quantity)> {
        (arb_operation(), arb_resource_key(), arb_quantity())
    }

    pub fn arb_layer_set() -> impl Strategy<Value = LayerSet> {
        (any::<bool>(), any::<bool>(), any::<bool>())
            .prop_map(|(lazy, guard, cache)| LayerSet { lazy, guard, cache })
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built stores and chains with no simulated latency.

    use super::*;
    use std::time::Duration;

    /// A zero-latency store seeded with `stock`.
    pub fn store_with(stock: &[(&str, Count)]) -> ResourceStore {
        ResourceStore::with_stock(stock.iter().copied(), Duration::ZERO)
    }

    /// A zero-latency chain config seeded with `stock`.
    pub fn config_with(stock: &[(&str, Count)], layers: LayerSet) -> ChainConfig {
        ChainConfig::new()
            .with_stock(stock.iter().copied())
            .with_layers(layers)
            .with_latency(Duration::ZERO)
    }

    /// A zero-latency chain over `stock` with the given layers.
    pub fn chain_with(stock: &[(&str, Count)], layers: LayerSet) -> Chain {
        match Composer::new(config_with(stock, layers)).build() {
            Ok(chain) => chain,
            Err(e) => panic!("fixture chain failed to build: {}", e),
        }
    }

    /// Run one generated command, mapping `increase` to `Ok(None)` and the
    /// others to their returned value.
    pub fn apply(
        inventory: &dyn Inventory,
        (operation, key, qty): &(Operation, ResourceKey, Quantity),
    ) -> LarderResult<Option<Count>> {
        match operation {
            Operation::Get => inventory.get(key).map(Some),
            Operation::Increase => inventory.increase(key, *qty).map(|()| None),
            Operation::Reserve => inventory.reserve(key, *qty).map(|ok| Some(Count::from(ok))),
        }
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions on LARDER error categories.

    use super::*;

    /// Assert that a result failed with the given error kind.
    #[track_caller]
    pub fn assert_kind<T: std::fmt::Debug>(result: &LarderResult<T>, kind: ErrorKind) {
        match result {
            Err(e) if e.kind() == kind => {}
            other => panic!("Expected {} error, got: {:?}", kind, other),
        }
    }

    #[track_caller]
    pub fn assert_access_denied<T: std::fmt::Debug>(result: &LarderResult<T>) {
        assert_kind(result, ErrorKind::AccessDenied);
    }

    #[track_caller]
    pub fn assert_invalid_argument<T: std::fmt::Debug>(result: &LarderResult<T>) {
        assert_kind(result, ErrorKind::InvalidArgument);
    }
}
