//! Runtime configuration for the quoter binary.
//!
//! Layered lowest to highest: built-in defaults, an optional TOML file
//! (`quoter.toml` unless another path is given), then `QUOTER_*` environment
//! variables, e.g. `QUOTER_ORDERS_DB_PATH=/var/lib/quoter/orders.csv`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ::config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::persist::DEFAULT_ORDERS_DB_PATH;

pub const DEFAULT_CONFIG_FILE: &str = "quoter.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct QuoterConfig {
    pub orders_db_path: PathBuf,
    pub cache_expiration_secs: u64,
    pub log_filter: String,
    pub metrics_port: u16,
    pub run_for_secs: u64,
    pub instrument_id: String,
    pub quantity: u64,
    pub feed_min_delay_ms: u64,
    pub feed_max_delay_ms: u64,
}

impl Default for QuoterConfig {
    fn default() -> Self {
        Self {
            orders_db_path: PathBuf::from(DEFAULT_ORDERS_DB_PATH),
            cache_expiration_secs: 60 * 60,
            log_filter: "info".to_string(),
            metrics_port: 9000,
            run_for_secs: 10,
            instrument_id: "DK50782120".to_string(),
            quantity: 120,
            feed_min_delay_ms: 50,
            feed_max_delay_ms: 500,
        }
    }
}

impl QuoterConfig {
    /// Loads defaults, then `path` (or `quoter.toml` if present), then the environment.
    /// An explicitly given file must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        Config::builder()
            .add_source(file)
            .add_source(Environment::with_prefix("QUOTER").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    pub fn cache_expiration(&self) -> Duration {
        Duration::from_secs(self.cache_expiration_secs)
    }

    pub fn run_for(&self) -> Duration {
        Duration::from_secs(self.run_for_secs)
    }

    pub fn feed_delay_range(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.feed_min_delay_ms),
            Duration::from_millis(self.feed_max_delay_ms),
        )
    }
}
