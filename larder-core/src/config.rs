//! Chain configuration types

use crate::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Upper bound on simulated store latency.
pub const MAX_LATENCY: Duration = Duration::from_secs(60);

/// Smallest TTL a cache will run with; zero is raised to this.
pub const MIN_TTL: Duration = Duration::from_millis(1);

/// Which proxy layers wrap the store.
///
/// The relative order is fixed: store, then lazy, then guard, then cache
/// (outermost). Only presence is configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerSet {
    pub lazy: bool,
    pub guard: bool,
    pub cache: bool,
}

impl LayerSet {
    /// Bare store, no proxies.
    pub const fn none() -> Self {
        Self {
            lazy: false,
            guard: false,
            cache: false,
        }
    }

    /// Every layer enabled.
    pub const fn all() -> Self {
        Self {
            lazy: true,
            guard: true,
            cache: true,
        }
    }

    /// Names of enabled layers, innermost first.
    pub fn enabled(&self) -> Vec<&'static str> {
        let mut layers = Vec::with_capacity(3);
        if self.lazy {
            layers.push("lazy");
        }
        if self.guard {
            layers.push("guard");
        }
        if self.cache {
            layers.push("cache");
        }
        layers
    }
}

impl Default for LayerSet {
    fn default() -> Self {
        Self {
            lazy: true,
            guard: false,
            cache: true,
        }
    }
}

/// Per-session chain configuration.
///
/// Built once per job and discarded afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Initial key -> count map for the store.
    pub initial_stock: BTreeMap<String, Count>,
    /// Enabled proxy layers.
    pub layers: LayerSet,
    /// Simulated backend latency, applied to every store operation.
    #[serde(with = "duration_ms")]
    pub latency: Duration,
    /// Cache entry time-to-live.
    #[serde(with = "duration_ms")]
    pub ttl: Duration,
    /// Value of the write-capability predicate when the guard is enabled.
    pub can_write: bool,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            initial_stock: BTreeMap::new(),
            layers: LayerSet::default(),
            latency: Duration::from_millis(25),
            ttl: Duration::from_millis(1500),
            can_write: true,
        }
    }
}

impl ChainConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stock<K: Into<String>>(mut self, stock: impl IntoIterator<Item = (K, Count)>) -> Self {
        self.initial_stock = stock.into_iter().map(|(k, v)| (k.into(), v)).collect();
        self
    }

    pub fn with_layers(mut self, layers: LayerSet) -> Self {
        self.layers = layers;
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_can_write(mut self, can_write: bool) -> Self {
        self.can_write = can_write;
        self
    }

    /// TTL the cache will actually use.
    pub fn effective_ttl(&self) -> Duration {
        self.ttl.max(MIN_TTL)
    }

    /// Validate the configuration.
    ///
    /// Validates:
    /// - latency does not exceed `MAX_LATENCY`
    /// - stock keys are not blank
    pub fn validate(&self) -> LarderResult<()> {
        if self.latency > MAX_LATENCY {
            return Err(LarderError::Config(ConfigError::InvalidValue {
                field: "latency".to_string(),
                value: format!("{:?}", self.latency),
                reason: format!("latency must not exceed {:?}", MAX_LATENCY),
            }));
        }

        if let Some(key) = self.initial_stock.keys().find(|k| k.trim().is_empty()) {
            return Err(LarderError::Config(ConfigError::InvalidValue {
                field: "initial_stock".to_string(),
                value: format!("{:?}", key),
                reason: "stock keys must not be blank".to_string(),
            }));
        }

        Ok(())
    }
}

/// Serialize `Duration` as integer milliseconds.
pub mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ChainConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.layers, LayerSet::default());
        assert_eq!(config.latency, Duration::from_millis(25));
        assert_eq!(config.ttl, Duration::from_millis(1500));
    }

    #[test]
    fn test_validate_rejects_excessive_latency() {
        let config = ChainConfig::new().with_latency(Duration::from_secs(61));
        let err = config.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(format!("{}", err).contains("latency"));
    }

    #[test]
    fn test_validate_rejects_blank_key() {
        let config = ChainConfig::new().with_stock([(" ", 1)]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_effective_ttl_clamps_zero() {
        let config = ChainConfig::new().with_ttl(Duration::ZERO);
        assert_eq!(config.effective_ttl(), MIN_TTL);
        let config = ChainConfig::new().with_ttl(Duration::from_millis(10));
        assert_eq!(config.effective_ttl(), Duration::from_millis(10));
    }

    #[test]
    fn test_layer_set_enabled_order() {
        assert_eq!(LayerSet::all().enabled(), vec!["lazy", "guard", "cache"]);
        assert!(LayerSet::none().enabled().is_empty());
    }

    #[test]
    fn test_chain_config_serde_durations_in_ms() {
        let config = ChainConfig::new()
            .with_stock([("A", 10)])
            .with_latency(Duration::from_millis(400))
            .with_ttl(Duration::from_millis(1500));
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["latency"], 400);
        assert_eq!(json["ttl"], 1500);
        let back: ChainConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, config);
    }
}
