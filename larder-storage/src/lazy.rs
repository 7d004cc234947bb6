//! Deferred store construction.
//!
//! ```text
//! Uninitialized ─── first call ──→ Initialized (terminal)
//! ```
//!
//! The factory runs inside `OnceCell::get_or_init`: concurrent first callers
//! block until the single winning initializer finishes and then all observe
//! the same instance.

use larder_core::{Count, Inventory, LarderResult, Quantity, ResourceKey};
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

type Factory<S> = Box<dyn Fn() -> S + Send + Sync>;

/// Wraps a zero-argument factory and builds the inner inventory on first use.
pub struct LazyAccessor<S> {
    factory: Factory<S>,
    instance: OnceCell<S>,
    constructions: AtomicUsize,
}

impl<S: Inventory> LazyAccessor<S> {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> S + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            instance: OnceCell::new(),
            constructions: AtomicUsize::new(0),
        }
    }

    /// How many times the factory has run. Always 0 or 1.
    pub fn constructions(&self) -> usize {
        self.constructions.load(Ordering::SeqCst)
    }

    pub fn is_initialized(&self) -> bool {
        self.instance.get().is_some()
    }

    /// The constructed instance, without triggering construction.
    pub fn instance(&self) -> Option<&S> {
        self.instance.get()
    }

    fn inner(&self) -> &S {
        self.instance.get_or_init(|| {
            let n = self.constructions.fetch_add(1, Ordering::SeqCst) + 1;
            tracing::info!(constructions = n, "Lazy inventory constructed on first use");
            (self.factory)()
        })
    }
}

impl<S> fmt::Debug for LazyAccessor<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyAccessor")
            .field("initialized", &self.instance.get().is_some())
            .field("constructions", &self.constructions.load(Ordering::SeqCst))
            .finish()
    }
}

impl<S: Inventory> Inventory for LazyAccessor<S> {
    fn get(&self, key: &ResourceKey) -> LarderResult<Count> {
        self.inner().get(key)
    }

    fn increase(&self, key: &ResourceKey, qty: Quantity) -> LarderResult<()> {
        self.inner().increase(key, qty)
    }

    fn reserve(&self, key: &ResourceKey, qty: Quantity) -> LarderResult<bool> {
        self.inner().reserve(key, qty)
    }
}
