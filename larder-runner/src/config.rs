//! Runner configuration loading.
//!
//! Precedence, lowest first: built-in defaults, TOML file (`--config` or
//! `LARDER_CONFIG`), then `LARDER_DEFAULT_*` environment variables.

use larder_core::{ConfigError, LarderError, LarderResult, MAX_LATENCY};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "LARDER_CONFIG";

/// Defaults applied to jobs that leave a field out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JobDefaults {
    pub latency_ms: u64,
    pub ttl_ms: u64,
    pub use_lazy: bool,
    pub use_cache: bool,
    pub use_guard: bool,
    pub can_write: bool,
}

impl Default for JobDefaults {
    fn default() -> Self {
        Self {
            latency_ms: 25,
            ttl_ms: 1500,
            use_lazy: true,
            use_cache: true,
            use_guard: false,
            can_write: true,
        }
    }
}

impl JobDefaults {
    /// Create from environment variables with fallback to defaults.
    ///
    /// Environment variables:
    /// - `LARDER_DEFAULT_LATENCY_MS`: simulated store latency (default: 25)
    /// - `LARDER_DEFAULT_TTL_MS`: cache TTL (default: 1500)
    pub fn from_env() -> Self {
        Self::default().apply_env()
    }

    /// Override fields from environment variables that are set and parse.
    pub fn apply_env(self) -> Self {
        Self {
            latency_ms: std::env::var("LARDER_DEFAULT_LATENCY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(self.latency_ms),
            ttl_ms: std::env::var("LARDER_DEFAULT_TTL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(self.ttl_ms),
            ..self
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Top-level runner configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunnerConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_filter: String,
    pub log_format: LogFormat,
    /// Pretty-print the JSON report.
    pub pretty_output: bool,
    pub defaults: JobDefaults,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            log_filter: "larder=info,warn".to_string(),
            log_format: LogFormat::Pretty,
            pretty_output: true,
            defaults: JobDefaults::default(),
        }
    }
}

impl RunnerConfig {
    /// Load from the given path, or `LARDER_CONFIG`, or defaults; then apply
    /// environment overrides and validate.
    pub fn load(path: Option<&Path>) -> LarderResult<Self> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

        let mut config = match path {
            Some(path) => Self::from_path(&path)?,
            None => Self::default(),
        };
        config.defaults = config.defaults.apply_env();
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> LarderResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            LarderError::Config(ConfigError::Io {
                path: path.display().to_string(),
                reason: e.to_string(),
            })
        })?;
        Self::from_toml(&contents, &path.display().to_string())
    }

    pub fn from_toml(contents: &str, source_name: &str) -> LarderResult<Self> {
        toml::from_str(contents).map_err(|e| {
            LarderError::Config(ConfigError::Parse {
                source_name: source_name.to_string(),
                reason: e.to_string(),
            })
        })
    }

    pub fn validate(&self) -> LarderResult<()> {
        if self.log_filter.trim().is_empty() {
            return Err(LarderError::Config(ConfigError::InvalidValue {
                field: "log_filter".to_string(),
                value: format!("{:?}", self.log_filter),
                reason: "log_filter must not be empty".to_string(),
            }));
        }

        if u128::from(self.defaults.latency_ms) > MAX_LATENCY.as_millis() {
            return Err(LarderError::Config(ConfigError::InvalidValue {
                field: "defaults.latency_ms".to_string(),
                value: self.defaults.latency_ms.to_string(),
                reason: format!("latency must not exceed {}ms", MAX_LATENCY.as_millis()),
            }));
        }

        Ok(())
    }
}
