//! Write gating behind a capability predicate.
//!
//! Reads always pass through. Writes consult the predicate on every call,
//! so a capability revoked mid-session takes effect on the next write.

use larder_core::{
    Count, Inventory, InventoryError, LarderError, LarderResult, Operation, Quantity, ResourceKey,
};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Predicate consulted before any mutating operation.
pub trait WriteCapability: Send + Sync {
    fn can_write(&self) -> bool;
}

impl<F> WriteCapability for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn can_write(&self) -> bool {
        self()
    }
}

/// Shared, mutable capability switch.
///
/// Clones observe the same flag, so a caller can keep one clone and flip it
/// while the guard holds another.
#[derive(Debug, Clone, Default)]
pub struct CapabilityFlag(Arc<AtomicBool>);

impl CapabilityFlag {
    pub fn new(can_write: bool) -> Self {
        Self(Arc::new(AtomicBool::new(can_write)))
    }

    pub fn set(&self, can_write: bool) {
        self.0.store(can_write, Ordering::SeqCst);
    }

    pub fn grant(&self) {
        self.set(true);
    }

    pub fn revoke(&self) {
        self.set(false);
    }
}

impl WriteCapability for CapabilityFlag {
    fn can_write(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Proxy that denies writes when the capability predicate is false.
pub struct AccessGuard<I> {
    inner: I,
    capability: Box<dyn WriteCapability>,
    denials: AtomicU64,
}

impl<I: Inventory> AccessGuard<I> {
    pub fn new(inner: I, capability: impl WriteCapability + 'static) -> Self {
        Self::with_boxed_capability(inner, Box::new(capability))
    }

    pub fn with_boxed_capability(inner: I, capability: Box<dyn WriteCapability>) -> Self {
        Self {
            inner,
            capability,
            denials: AtomicU64::new(0),
        }
    }

    /// Number of writes rejected so far.
    pub fn denials(&self) -> u64 {
        self.denials.load(Ordering::Relaxed)
    }

    pub fn inner(&self) -> &I {
        &self.inner
    }

    fn authorize(&self, operation: Operation, key: &ResourceKey) -> LarderResult<()> {
        if self.capability.can_write() {
            return Ok(());
        }
        self.denials.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(operation = %operation, key = %key, "Write denied by access guard");
        Err(LarderError::Inventory(InventoryError::AccessDenied {
            operation,
            key: key.to_string(),
        }))
    }
}

impl<I> fmt::Debug for AccessGuard<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessGuard")
            .field("denials", &self.denials.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl<I: Inventory> Inventory for AccessGuard<I> {
    fn get(&self, key: &ResourceKey) -> LarderResult<Count> {
        self.inner.get(key)
    }

    fn increase(&self, key: &ResourceKey, qty: Quantity) -> LarderResult<()> {
        self.authorize(Operation::Increase, key)?;
        self.inner.increase(key, qty)
    }

    fn reserve(&self, key: &ResourceKey, qty: Quantity) -> LarderResult<bool> {
        self.authorize(Operation::Reserve, key)?;
        self.inner.reserve(key, qty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ResourceStore;
    use larder_core::ErrorKind;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn store(stock: u64) -> Arc<ResourceStore> {
        Arc::new(ResourceStore::with_stock([("B", stock)], Duration::ZERO))
    }

    #[test]
    fn test_denied_writes_leave_store_untouched() {
        let store = store(5);
        let guard = AccessGuard::new(Arc::clone(&store), CapabilityFlag::new(false));
        let k = ResourceKey::new("B");

        assert_eq!(guard.get(&k).unwrap(), 5);

        let err = guard.increase(&k, 3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AccessDenied);
        let err = guard.reserve(&k, 2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AccessDenied);

        assert_eq!(guard.get(&k).unwrap(), 5);
        assert_eq!(guard.denials(), 2);
        // Only the two reads reached the store.
        assert_eq!(store.read_calls(), 2);
    }

    #[test]
    fn test_allowed_writes_delegate() {
        let store = store(5);
        let guard = AccessGuard::new(Arc::clone(&store), || true);
        let k = ResourceKey::new("B");

        guard.increase(&k, 3).unwrap();
        assert!(guard.reserve(&k, 8).unwrap());
        assert_eq!(store.get(&k).unwrap(), 0);
        assert_eq!(guard.denials(), 0);
    }

    #[test]
    fn test_denial_precedes_argument_validation() {
        let guard = AccessGuard::new(store(5), || false);
        let err = guard.increase(&ResourceKey::new("B"), -1).unwrap_err();
        assert!(err.is_access_denied());
    }

    #[test]
    fn test_inner_errors_pass_through_unchanged() {
        let guard = AccessGuard::new(store(5), || true);
        let err = guard.reserve(&ResourceKey::new("B"), 0).unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_predicate_evaluated_per_write() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let guard = AccessGuard::new(store(5), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        });
        let k = ResourceKey::new("B");

        guard.get(&k).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        guard.increase(&k, 1).unwrap();
        guard.reserve(&k, 1).unwrap();
        guard.reserve(&k, 1).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_capability_change_takes_effect_between_calls() {
        let flag = CapabilityFlag::new(true);
        let guard = AccessGuard::new(store(5), flag.clone());
        let k = ResourceKey::new("B");

        guard.increase(&k, 1).unwrap();
        flag.revoke();
        assert!(guard.increase(&k, 1).unwrap_err().is_access_denied());
        flag.grant();
        guard.increase(&k, 1).unwrap();

        assert_eq!(guard.get(&k).unwrap(), 7);
    }
}
