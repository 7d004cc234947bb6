//! LARDER Core - Inventory Types and Contracts
//!
//! Shared data types for the proxy chain. Every layer in `larder-storage`
//! implements [`Inventory`]; nothing in this crate performs I/O or sleeps.

pub mod clock;
pub mod config;
pub mod error;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ChainConfig, LayerSet, MAX_LATENCY, MIN_TTL};
pub use error::{
    CommandError, ConfigError, ErrorKind, InventoryError, LarderError, LarderResult, StorageError,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::Arc;

// ============================================================================
// SCALAR TYPES
// ============================================================================

/// Stock count held by a store. Never negative.
pub type Count = u64;

/// Requested quantity for a write. Signed so that non-positive requests can
/// be expressed and rejected.
pub type Quantity = i64;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

// ============================================================================
// RESOURCE KEY
// ============================================================================

/// Identifier naming one counted resource (a stock-keeping unit).
///
/// Keys compare and hash ASCII case-insensitively, so `"sku-1"` and `"SKU-1"`
/// address the same count and the same cache entry. `Display` keeps the
/// spelling the key was created with.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceKey(String);

impl ResourceKey {
    /// Create a key without validation.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Create a key, rejecting empty or whitespace-only input.
    pub fn parse(key: &str) -> LarderResult<Self> {
        let trimmed = key.trim();
        if trimmed.is_empty() {
            return Err(InventoryError::InvalidArgument {
                operation: None,
                reason: "resource key must not be empty".to_string(),
            }
            .into());
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The key as originally spelled.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for ResourceKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for ResourceKey {}

impl Hash for ResourceKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for byte in self.0.bytes() {
            state.write_u8(byte.to_ascii_lowercase());
        }
        state.write_u8(0xff);
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ResourceKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ============================================================================
// OPERATION ENUM
// ============================================================================

/// The three operations every inventory layer exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Get,
    Increase,
    Reserve,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Get => "get",
            Operation::Increase => "increase",
            Operation::Reserve => "reserve",
        }
    }

    /// Whether the operation mutates inventory.
    pub fn is_write(&self) -> bool {
        !matches!(self, Operation::Get)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error when parsing an invalid operation string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationParseError(pub String);

impl fmt::Display for OperationParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid operation: {}", self.0)
    }
}

impl std::error::Error for OperationParseError {}

impl FromStr for Operation {
    type Err = OperationParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "get" => Ok(Operation::Get),
            "increase" | "add" => Ok(Operation::Increase),
            "reserve" => Ok(Operation::Reserve),
            _ => Err(OperationParseError(s.to_string())),
        }
    }
}

// ============================================================================
// INVENTORY TRAIT
// ============================================================================

/// Common contract shared by the store and every proxy layer.
///
/// Each layer holds the next one as an `Inventory` and adds behaviour without
/// knowing its concrete type. Calls are synchronous and may block.
pub trait Inventory: Send + Sync {
    /// Current count for `key`. Unknown keys read as 0.
    fn get(&self, key: &ResourceKey) -> LarderResult<Count>;

    /// Add `qty` to the count for `key`, creating it at 0 first.
    ///
    /// Fails with `InvalidArgument` when `qty <= 0`.
    fn increase(&self, key: &ResourceKey, qty: Quantity) -> LarderResult<()>;

    /// Atomically take `qty` from `key` if at least `qty` is available.
    ///
    /// Returns `Ok(false)` on insufficient stock, leaving the count unchanged.
    /// Fails with `InvalidArgument` when `qty <= 0`.
    fn reserve(&self, key: &ResourceKey, qty: Quantity) -> LarderResult<bool>;
}

impl<T: Inventory + ?Sized> Inventory for Arc<T> {
    fn get(&self, key: &ResourceKey) -> LarderResult<Count> {
        (**self).get(key)
    }

    fn increase(&self, key: &ResourceKey, qty: Quantity) -> LarderResult<()> {
        (**self).increase(key, qty)
    }

    fn reserve(&self, key: &ResourceKey, qty: Quantity) -> LarderResult<bool> {
        (**self).reserve(key, qty)
    }
}

impl<T: Inventory + ?Sized> Inventory for Box<T> {
    fn get(&self, key: &ResourceKey) -> LarderResult<Count> {
        (**self).get(key)
    }

    fn increase(&self, key: &ResourceKey, qty: Quantity) -> LarderResult<()> {
        (**self).increase(key, qty)
    }

    fn reserve(&self, key: &ResourceKey, qty: Quantity) -> LarderResult<bool> {
        (**self).reserve(key, qty)
    }
}

/// Reject non-positive quantities for write operations.
pub fn validate_quantity(operation: Operation, qty: Quantity) -> LarderResult<u64> {
    if qty <= 0 {
        return Err(InventoryError::InvalidArgument {
            operation: Some(operation),
            reason: format!("quantity must be greater than 0, got {}", qty),
        }
        .into());
    }
    Ok(qty as u64)
}

// =============================================================================
// TESTS
// =============================================================================
