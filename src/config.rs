//! Configuration Module
//!
//! Handles loading and defaulting cache configuration.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

// == Defaults ==
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_CONCURRENCY: usize = 1;
pub const DEFAULT_EVICTION_FREQUENCY: Duration = Duration::from_secs(30);
pub const DEFAULT_EXPIRATION_FREQUENCY: Duration = Duration::from_secs(30);

// == Evict Strategy ==
/// What to do once the cache grows past its byte threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictStrategy {
    /// Never evict; the threshold is ignored.
    Disabled,
    /// Evict each shard's least recently used key until under threshold.
    #[default]
    Lru,
    /// Declared but not implemented. Selecting it aborts at startup.
    Ttl,
}

impl FromStr for EvictStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "disabled" => Ok(EvictStrategy::Disabled),
            "lru" => Ok(EvictStrategy::Lru),
            "ttl" => Ok(EvictStrategy::Ttl),
            _ => Err(ConfigError::InvalidStrategy(s.to_string())),
        }
    }
}

impl fmt::Display for EvictStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EvictStrategy::Disabled => "disabled",
            EvictStrategy::Lru => "lru",
            EvictStrategy::Ttl => "ttl",
        };
        f.write_str(name)
    }
}

// == Config ==
/// Cache configuration parameters.
///
/// Zero values are replaced with defaults by [`Config::with_defaults`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Eviction strategy applied once `db_bytes_evict_threshold` is exceeded
    pub evict_strategy: EvictStrategy,
    /// Total bytes before eviction starts (0 = eviction disabled)
    pub db_bytes_evict_threshold: i64,
    /// Deadline for each command
    pub command_timeout: Duration,
    /// Maximum shard commands in flight at once (1 = unbounded direct dispatch)
    pub max_concurrency: usize,
    /// Wait between eviction checks
    pub eviction_frequency: Duration,
    /// Wait between expiration sweeps of consecutive slots
    pub expiration_frequency: Duration,
}

impl Config {
    /// Returns the config with every unset (zero) value replaced by its default.
    pub fn with_defaults(mut self) -> Self {
        if self.command_timeout.is_zero() {
            self.command_timeout = DEFAULT_COMMAND_TIMEOUT;
        }
        if self.max_concurrency == 0 {
            self.max_concurrency = DEFAULT_MAX_CONCURRENCY;
        }
        if self.eviction_frequency.is_zero() {
            self.eviction_frequency = DEFAULT_EVICTION_FREQUENCY;
        }
        if self.expiration_frequency.is_zero() {
            self.expiration_frequency = DEFAULT_EXPIRATION_FREQUENCY;
        }
        self
    }

    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SLOTCACHE_EVICT_STRATEGY` - `disabled`, `lru` or `ttl` (default: lru)
    /// - `SLOTCACHE_EVICT_THRESHOLD_BYTES` - Eviction threshold (default: 0, disabled)
    /// - `SLOTCACHE_COMMAND_TIMEOUT_MS` - Command deadline (default: 1000)
    /// - `SLOTCACHE_MAX_CONCURRENCY` - In-flight command cap (default: 1)
    /// - `SLOTCACHE_EVICTION_FREQUENCY_MS` - Eviction check interval (default: 30000)
    /// - `SLOTCACHE_EXPIRATION_FREQUENCY_MS` - Expiration sweep interval (default: 30000)
    ///
    /// # Panics
    /// An unrecognized eviction strategy is a fatal configuration error.
    pub fn from_env() -> Self {
        let evict_strategy = match env::var("SLOTCACHE_EVICT_STRATEGY") {
            Ok(raw) => raw
                .parse()
                .unwrap_or_else(|err: ConfigError| panic!("{err}")),
            Err(_) => EvictStrategy::default(),
        };

        Self {
            evict_strategy,
            db_bytes_evict_threshold: env_parse("SLOTCACHE_EVICT_THRESHOLD_BYTES").unwrap_or(0),
            command_timeout: env_millis("SLOTCACHE_COMMAND_TIMEOUT_MS")
                .unwrap_or(DEFAULT_COMMAND_TIMEOUT),
            max_concurrency: env_parse("SLOTCACHE_MAX_CONCURRENCY")
                .unwrap_or(DEFAULT_MAX_CONCURRENCY),
            eviction_frequency: env_millis("SLOTCACHE_EVICTION_FREQUENCY_MS")
                .unwrap_or(DEFAULT_EVICTION_FREQUENCY),
            expiration_frequency: env_millis("SLOTCACHE_EXPIRATION_FREQUENCY_MS")
                .unwrap_or(DEFAULT_EXPIRATION_FREQUENCY),
        }
        .with_defaults()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            evict_strategy: EvictStrategy::default(),
            db_bytes_evict_threshold: 0,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            eviction_frequency: DEFAULT_EVICTION_FREQUENCY,
            expiration_frequency: DEFAULT_EXPIRATION_FREQUENCY,
        }
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

fn env_millis(name: &str) -> Option<Duration> {
    env_parse::<u64>(name).map(Duration::from_millis)
}
