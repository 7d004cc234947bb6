//! Job model and runner.
//!
//! A job describes one chain (initial stock plus layer options) and a list of
//! commands to run against it. Every job gets a fresh chain; nothing is
//! shared between jobs. Command failures are recorded in the report and do
//! not stop the job.

use larder_core::{
    ChainConfig, CommandError, ConfigError, Count, Inventory, LarderError, LarderResult,
    LayerSet, Operation, Quantity, ResourceKey,
};
use larder_storage::{Chain, Composer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::config::JobDefaults;
use crate::report::{BatchReport, CacheSummary, CommandLog, JobOptions, JobReport, Outcome};

/// One command within a job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryCommand {
    /// `get`, `increase` (or `add`), `reserve` or `wait`; case-insensitive.
    #[serde(default)]
    pub action: String,
    #[serde(default, alias = "sku", skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default)]
    pub qty: Quantity,
    /// Sleep duration for `wait`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<u64>,
}

impl InventoryCommand {
    pub fn get(key: impl Into<String>) -> Self {
        Self::keyed("get", key, 0)
    }

    pub fn increase(key: impl Into<String>, qty: Quantity) -> Self {
        Self::keyed("increase", key, qty)
    }

    pub fn reserve(key: impl Into<String>, qty: Quantity) -> Self {
        Self::keyed("reserve", key, qty)
    }

    pub fn wait(delay_ms: u64) -> Self {
        Self {
            action: "wait".to_string(),
            delay_ms: Some(delay_ms),
            ..Default::default()
        }
    }

    fn keyed(action: &str, key: impl Into<String>, qty: Quantity) -> Self {
        Self {
            action: action.to_string(),
            key: Some(key.into()),
            qty,
            delay_ms: None,
        }
    }
}

/// A chain description plus the commands to run against it.
///
/// Fields left out fall back to the runner's [`JobDefaults`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryJob {
    #[serde(default)]
    pub initial_stock: BTreeMap<String, Count>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_lazy: Option<bool>,
    #[serde(default, alias = "useCaching", skip_serializing_if = "Option::is_none")]
    pub use_cache: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_ms: Option<u64>,
    #[serde(default, alias = "useProtection", skip_serializing_if = "Option::is_none")]
    pub use_guard: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_write: Option<bool>,
    #[serde(default)]
    pub commands: Vec<InventoryCommand>,
}

/// Parsed command action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Inventory(Operation),
    Wait,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Inventory(op) => op.as_str(),
            Action::Wait => "wait",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("wait") {
            return Ok(Action::Wait);
        }
        s.parse::<Operation>()
            .map(Action::Inventory)
            .map_err(|_| CommandError::UnsupportedAction {
                action: s.to_string(),
            })
    }
}

/// Runs jobs against freshly composed chains.
#[derive(Debug, Clone, Default)]
pub struct JobRunner {
    defaults: JobDefaults,
}

impl JobRunner {
    pub fn new(defaults: JobDefaults) -> Self {
        Self { defaults }
    }

    pub fn defaults(&self) -> &JobDefaults {
        &self.defaults
    }

    /// Apply defaults to a job's options.
    pub fn resolve(&self, job: &InventoryJob) -> JobOptions {
        let d = &self.defaults;
        JobOptions {
            use_lazy: job.use_lazy.unwrap_or(d.use_lazy),
            use_cache: job.use_cache.unwrap_or(d.use_cache),
            ttl_ms: job.ttl_ms.unwrap_or(d.ttl_ms),
            use_guard: job.use_guard.unwrap_or(d.use_guard),
            can_write: job.can_write.unwrap_or(d.can_write),
            latency_ms: job.latency_ms.unwrap_or(d.latency_ms),
        }
    }

    /// Chain configuration for a job.
    pub fn chain_config(&self, job: &InventoryJob) -> ChainConfig {
        let options = self.resolve(job);
        ChainConfig {
            initial_stock: job.initial_stock.clone(),
            layers: LayerSet {
                lazy: options.use_lazy,
                guard: options.use_guard,
                cache: options.use_cache,
            },
            latency: Duration::from_millis(options.latency_ms),
            ttl: Duration::from_millis(options.ttl_ms),
            can_write: options.can_write,
        }
    }

    /// Run one job. Fails only if the job's chain configuration is invalid.
    pub fn run_job(&self, job: &InventoryJob) -> LarderResult<JobReport> {
        let job_id = Uuid::now_v7();
        let span = tracing::info_span!("job", job_id = %job_id);
        let _enter = span.enter();

        let started_at = chrono::Utc::now();
        let options = self.resolve(job);
        let chain = Composer::new(self.chain_config(job)).build()?;

        tracing::info!(
            commands = job.commands.len(),
            layers = ?chain.layers().enabled(),
            "Job started"
        );

        let mut touched: Vec<ResourceKey> = Vec::new();
        let logs: Vec<CommandLog> = job
            .commands
            .iter()
            .map(|command| execute(&chain, command, &mut touched))
            .collect();

        // Captured before the final-stock reads below so they are not counted.
        let store_reads = chain.store().map(|store| store.read_calls());
        let cache: Option<CacheSummary> = chain.cache_stats().map(Into::into);

        let head = chain.head();
        let mut final_stock = BTreeMap::new();
        for key in &touched {
            match head.get(key) {
                Ok(count) => {
                    final_stock.insert(key.to_string(), count);
                }
                Err(e) => tracing::warn!(key = %key, error = %e, "Final stock read failed"),
            }
        }

        let report = JobReport {
            job_id,
            started_at,
            options,
            initial_stock: job.initial_stock.clone(),
            logs,
            final_stock,
            store_reads,
            constructions: chain.constructions(),
            cache,
            guard_denials: chain.guard_denials(),
        };

        tracing::info!(
            errors = report.error_count(),
            store_reads = ?report.store_reads,
            "Job finished"
        );
        Ok(report)
    }

    /// Run a batch of jobs in order.
    pub fn run_jobs(&self, jobs: &[InventoryJob]) -> LarderResult<BatchReport> {
        let results = jobs
            .iter()
            .map(|job| self.run_job(job))
            .collect::<LarderResult<Vec<_>>>()?;
        Ok(BatchReport::new(results))
    }
}

fn execute(chain: &Chain, command: &InventoryCommand, touched: &mut Vec<ResourceKey>) -> CommandLog {
    let started = Instant::now();

    let action = match command.action.parse::<Action>() {
        Ok(action) => action,
        Err(e) => {
            tracing::warn!(action = %command.action, "Unsupported command action");
            return CommandLog {
                action: command.action.clone(),
                key: command.key.clone(),
                qty: None,
                outcome: Outcome::from(&LarderError::from(e)),
                elapsed_ms: 0,
            };
        }
    };

    let operation = match action {
        Action::Wait => {
            let delay_ms = command.delay_ms.unwrap_or(0);
            std::thread::sleep(Duration::from_millis(delay_ms));
            return CommandLog {
                action: action.to_string(),
                key: None,
                qty: None,
                outcome: Outcome::Waited { delay_ms },
                elapsed_ms: elapsed_ms(started),
            };
        }
        Action::Inventory(op) => op,
    };

    let qty = operation.is_write().then_some(command.qty);
    let key = match command.key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
        Some(key) => ResourceKey::new(key),
        None => {
            let err = LarderError::from(CommandError::MissingKey {
                action: action.to_string(),
            });
            return CommandLog {
                action: action.to_string(),
                key: None,
                qty,
                outcome: Outcome::from(&err),
                elapsed_ms: elapsed_ms(started),
            };
        }
    };

    let result = match operation {
        Operation::Get => chain.get(&key).map(|value| Outcome::Value { value }),
        Operation::Increase => chain.increase(&key, command.qty).map(|()| Outcome::Ok),
        Operation::Reserve => chain
            .reserve(&key, command.qty)
            .map(|reserved| Outcome::Reserved { reserved }),
    };

    let outcome = match result {
        Ok(outcome) => {
            if !touched.contains(&key) {
                touched.push(key.clone());
            }
            outcome
        }
        Err(e) => {
            tracing::debug!(operation = %operation, key = %key, error = %e, "Command failed");
            Outcome::from(&e)
        }
    };

    CommandLog {
        action: action.to_string(),
        key: Some(key.to_string()),
        qty,
        outcome,
        elapsed_ms: elapsed_ms(started),
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

// ============================================================================
// JOB INPUT
// ============================================================================

/// Parse a JSON array of jobs.
pub fn parse_jobs(contents: &str, source_name: &str) -> LarderResult<Vec<InventoryJob>> {
    serde_json::from_str(contents).map_err(|e| {
        LarderError::Config(ConfigError::Parse {
            source_name: source_name.to_string(),
            reason: e.to_string(),
        })
    })
}

/// Read jobs from a file, or from stdin when the path is `-`.
pub fn read_jobs(path: &Path) -> LarderResult<Vec<InventoryJob>> {
    let io_err = |e: std::io::Error| {
        LarderError::Config(ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    };

    if path == Path::new("-") {
        let mut contents = String::new();
        std::io::stdin().read_to_string(&mut contents).map_err(io_err)?;
        parse_jobs(&contents, "<stdin>")
    } else {
        let contents = std::fs::read_to_string(path).map_err(io_err)?;
        parse_jobs(&contents, &path.display().to_string())
    }
}
