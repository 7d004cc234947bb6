//! Read-through TTL cache layer.
//!
//! [`TimedCache`] sits in front of an inner [`Inventory`](larder_core::Inventory)
//! and answers `get` from memory while an entry is younger than its TTL.
//!
//! # Entry lifecycle
//!
//! ```text
//! Absent ─── get (miss) ──→ Valid ─── now >= expires_at ──→ Expired
//!   ↑                         │                               │
//!   └──── write on key ───────┘◄──── next lookup evicts ──────┘
//! ```
//!
//! Expiry is checked lazily on lookup; there is no background sweeper.
//! Writes delegate first and evict only if the inner layer succeeded.

pub mod entry;
pub mod stats;
pub mod timed;

pub use entry::CacheEntry;
pub use stats::CacheStats;
pub use timed::TimedCache;
