//! Chain assembly.
//!
//! Layer order is fixed, innermost first:
//!
//! ```text
//! ResourceStore ← LazyAccessor ← AccessGuard ← TimedCache ← caller
//! ```
//!
//! The guard sits inside the cache so every write is authorized before it
//! can evict anything; the cache is outermost so a hit never wakes a lazily
//! constructed store. Layers are individually optional but never reordered.

use larder_core::{
    ChainConfig, Clock, Count, Inventory, LarderResult, LayerSet, Quantity, ResourceKey,
    SystemClock,
};
use std::fmt;
use std::sync::Arc;

use crate::cache::{CacheStats, TimedCache};
use crate::guard::{AccessGuard, CapabilityFlag, WriteCapability};
use crate::lazy::LazyAccessor;
use crate::store::ResourceStore;

/// Type-erased layer, as held by the next layer out.
pub type DynInventory = Arc<dyn Inventory>;

type LazyStore = LazyAccessor<Arc<ResourceStore>>;

enum StoreSlot {
    Eager(Arc<ResourceStore>),
    Lazy(Arc<LazyStore>),
}

/// Builds a [`Chain`] from a [`ChainConfig`].
pub struct Composer {
    config: ChainConfig,
    clock: Arc<dyn Clock>,
    capability: Option<Box<dyn WriteCapability>>,
}

impl Composer {
    pub fn new(config: ChainConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
            capability: None,
        }
    }

    /// Use a specific clock for cache expiry.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the fixed `can_write` flag with a live predicate.
    pub fn with_capability(mut self, capability: impl WriteCapability + 'static) -> Self {
        self.capability = Some(Box::new(capability));
        self
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Validate the configuration and wire the enabled layers together.
    pub fn build(self) -> LarderResult<Chain> {
        self.config.validate()?;

        let Composer {
            config,
            clock,
            capability,
        } = self;
        let layers = config.layers;
        let latency = config.latency;

        let (mut head, store): (DynInventory, StoreSlot) = if layers.lazy {
            let stock = config.initial_stock.clone();
            let lazy: Arc<LazyStore> = Arc::new(LazyAccessor::new(move || {
                Arc::new(ResourceStore::with_stock(stock.clone(), latency))
            }));
            let head: DynInventory = lazy.clone();
            (head, StoreSlot::Lazy(lazy))
        } else {
            let store = Arc::new(ResourceStore::with_stock(
                config.initial_stock.clone(),
                latency,
            ));
            let head: DynInventory = store.clone();
            (head, StoreSlot::Eager(store))
        };

        let mut guard = None;
        if layers.guard {
            let capability =
                capability.unwrap_or_else(|| Box::new(CapabilityFlag::new(config.can_write)));
            let layer = Arc::new(AccessGuard::with_boxed_capability(head, capability));
            head = layer.clone();
            guard = Some(layer);
        }

        let mut cache = None;
        if layers.cache {
            let layer = Arc::new(TimedCache::with_clock(head, config.ttl, clock));
            head = layer.clone();
            cache = Some(layer);
        }

        tracing::debug!(
            layers = ?layers.enabled(),
            latency_ms = latency.as_millis() as u64,
            ttl_ms = config.ttl.as_millis() as u64,
            "Inventory chain built"
        );

        Ok(Chain {
            head,
            layers,
            store,
            guard,
            cache,
        })
    }
}

impl fmt::Debug for Composer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Composer")
            .field("config", &self.config)
            .field("custom_capability", &self.capability.is_some())
            .finish_non_exhaustive()
    }
}

/// A composed proxy chain plus handles onto its layers for observation.
pub struct Chain {
    head: DynInventory,
    layers: LayerSet,
    store: StoreSlot,
    guard: Option<Arc<AccessGuard<DynInventory>>>,
    cache: Option<Arc<TimedCache<DynInventory>>>,
}

impl Chain {
    /// Outermost layer; what callers should talk to.
    pub fn head(&self) -> DynInventory {
        Arc::clone(&self.head)
    }

    pub fn layers(&self) -> LayerSet {
        self.layers
    }

    /// The ground-truth store, if it has been constructed.
    pub fn store(&self) -> Option<Arc<ResourceStore>> {
        match &self.store {
            StoreSlot::Eager(store) => Some(Arc::clone(store)),
            StoreSlot::Lazy(lazy) => lazy.instance().cloned(),
        }
    }

    /// Factory invocations of the lazy layer; `None` without one.
    pub fn constructions(&self) -> Option<usize> {
        match &self.store {
            StoreSlot::Eager(_) => None,
            StoreSlot::Lazy(lazy) => Some(lazy.constructions()),
        }
    }

    pub fn guard_denials(&self) -> Option<u64> {
        self.guard.as_ref().map(|guard| guard.denials())
    }

    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(|cache| cache.stats())
    }

    /// Drop every cached entry; no-op without a cache layer.
    pub fn invalidate_cache(&self) -> u64 {
        self.cache
            .as_ref()
            .map(|cache| cache.invalidate_all())
            .unwrap_or(0)
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("layers", &self.layers)
            .field("store_constructed", &self.store().is_some())
            .finish_non_exhaustive()
    }
}

impl Inventory for Chain {
    fn get(&self, key: &ResourceKey) -> LarderResult<Count> {
        self.head.get(key)
    }

    fn increase(&self, key: &ResourceKey, qty: Quantity) -> LarderResult<()> {
        self.head.increase(key, qty)
    }

    fn reserve(&self, key: &ResourceKey, qty: Quantity) -> LarderResult<bool> {
        self.head.reserve(key, qty)
    }
}
