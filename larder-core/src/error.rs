//! Error types for LARDER operations

use crate::Operation;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised by inventory layers on bad input or missing capability.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InventoryError {
    #[error("Invalid argument{}: {reason}", for_operation(.operation))]
    InvalidArgument {
        operation: Option<Operation>,
        reason: String,
    },

    #[error("Access denied: {operation} on '{key}' requires write capability")]
    AccessDenied { operation: Operation, key: String },
}

fn for_operation(operation: &Option<Operation>) -> String {
    match operation {
        Some(op) => format!(" for {}", op),
        None => String::new(),
    }
}

/// Store internals errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Lock poisoned in {component}")]
    LockPoisoned { component: &'static str },

    #[error("Count overflow for '{key}'")]
    CountOverflow { key: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to parse {source_name}: {reason}")]
    Parse { source_name: String, reason: String },

    #[error("Failed to read {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Failed to initialize logging: {reason}")]
    Logging { reason: String },
}

/// Errors in job command input.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Key is required for {action}")]
    MissingKey { action: String },

    #[error("Unsupported action '{action}'")]
    UnsupportedAction { action: String },
}

/// Master error type for all LARDER errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LarderError {
    #[error("Inventory error: {0}")]
    Inventory(#[from] InventoryError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Command error: {0}")]
    Command(#[from] CommandError),
}

/// Result type alias for LARDER operations.
pub type LarderResult<T> = Result<T, LarderError>;

/// Coarse error category, stable enough to put in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidArgument,
    AccessDenied,
    Storage,
    Config,
    Command,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::AccessDenied => "access_denied",
            ErrorKind::Storage => "storage",
            ErrorKind::Config => "config",
            ErrorKind::Command => "command",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl LarderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LarderError::Inventory(InventoryError::InvalidArgument { .. }) => {
                ErrorKind::InvalidArgument
            }
            LarderError::Inventory(InventoryError::AccessDenied { .. }) => ErrorKind::AccessDenied,
            LarderError::Storage(_) => ErrorKind::Storage,
            LarderError::Config(_) => ErrorKind::Config,
            LarderError::Command(_) => ErrorKind::Command,
        }
    }

    pub fn is_access_denied(&self) -> bool {
        self.kind() == ErrorKind::AccessDenied
    }

    pub fn is_invalid_argument(&self) -> bool {
        self.kind() == ErrorKind::InvalidArgument
    }
}

// =============================================================================
// TESTS
// =============================================================================
