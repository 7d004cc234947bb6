//! LARDER Storage - Resource Store and Proxy Layers
//!
//! The ground-truth [`ResourceStore`] and the three proxies that can wrap it:
//!
//! - [`LazyAccessor`] builds the store on first use, exactly once.
//! - [`AccessGuard`] rejects writes when a capability predicate is false.
//! - [`TimedCache`] answers reads from a TTL cache and evicts on writes.
//!
//! Every type implements [`larder_core::Inventory`]. [`Composer`] stacks them
//! in their fixed order from a [`larder_core::ChainConfig`].

pub mod cache;
pub mod chain;
pub mod guard;
pub mod lazy;
pub mod store;

pub use cache::{CacheEntry, CacheStats, TimedCache};
pub use chain::{Chain, Composer, DynInventory};
pub use guard::{AccessGuard, CapabilityFlag, WriteCapability};
pub use lazy::LazyAccessor;
pub use store::ResourceStore;
