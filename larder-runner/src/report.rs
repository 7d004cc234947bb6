//! Serializable job reports.

use larder_core::{Count, ErrorKind, LarderError, Quantity, Timestamp};
use larder_storage::CacheStats;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Options a job actually ran with, after defaults were applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobOptions {
    pub use_lazy: bool,
    pub use_cache: bool,
    pub ttl_ms: u64,
    pub use_guard: bool,
    pub can_write: bool,
    pub latency_ms: u64,
}

/// What a single command produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// A `get` returned this count.
    Value { value: Count },
    /// An `increase` succeeded.
    Ok,
    /// A `reserve` completed; `false` means insufficient stock.
    Reserved { reserved: bool },
    /// A `wait` slept this long.
    Waited {
        #[serde(rename = "delayMs")]
        delay_ms: u64,
    },
    Error { kind: ErrorKind, message: String },
}

impl Outcome {
    pub fn is_error(&self) -> bool {
        matches!(self, Outcome::Error { .. })
    }
}

impl From<&LarderError> for Outcome {
    fn from(err: &LarderError) -> Self {
        Outcome::Error {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// One executed command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandLog {
    /// Normalized action name, or the raw input when it was not recognized.
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qty: Option<Quantity>,
    #[serde(flatten)]
    pub outcome: Outcome,
    pub elapsed_ms: u64,
}

/// Cache counters at the end of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheSummary {
    pub hits: u64,
    pub misses: u64,
    pub expirations: u64,
    pub evictions: u64,
    pub entries: u64,
    pub hit_rate: f64,
}

impl From<CacheStats> for CacheSummary {
    fn from(stats: CacheStats) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            hits: stats.hits,
            misses: stats.misses,
            expirations: stats.expirations,
            evictions: stats.evictions,
            entries: stats.entry_count,
        }
    }
}

/// Result of running one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReport {
    pub job_id: Uuid,
    pub started_at: Timestamp,
    pub options: JobOptions,
    pub initial_stock: BTreeMap<String, Count>,
    pub logs: Vec<CommandLog>,
    /// Count for every key a command touched, read through the chain head.
    pub final_stock: BTreeMap<String, Count>,
    /// Inner `get` calls that reached the store; absent if it was never built.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_reads: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constructions: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guard_denials: Option<u64>,
}

impl JobReport {
    pub fn error_count(&self) -> usize {
        self.logs.iter().filter(|log| log.outcome.is_error()).count()
    }
}

/// Result of running a batch of jobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub count: usize,
    pub results: Vec<JobReport>,
}

impl BatchReport {
    pub fn new(results: Vec<JobReport>) -> Self {
        Self {
            count: results.len(),
            results,
        }
    }
}
