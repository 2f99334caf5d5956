use formwork_core::Result;

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Row locking strategy applied before a record is modified.
///
/// Modes are ordered by strength, so the effective mode of a block is the
/// `min` of the configured mode and what its data source supports.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LockMode {
    /// Never lock
    None,

    /// Lock only when asked to explicitly; updates carry an assertion of
    /// the values last read instead
    #[default]
    Optimistic,

    /// Lock a row as soon as the user starts changing it
    Pessimistic,
}

/// Session-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Rows requested per select or fetch round trip
    pub array_fetch_size: usize,

    pub lock_mode: LockMode,

    /// How long a block waits on its previous query between checks
    pub query_poll_interval_ms: u64,

    /// Checks before a "waiting on previous query" warning is raised
    pub query_poll_limit: u32,

    /// Whether database tables run inside a backend transaction
    pub transactional: bool,
}

impl Config {
    pub fn from_json(json: &str) -> Result<Config> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn query_poll_interval(&self) -> Duration {
        Duration::from_millis(self.query_poll_interval_ms)
    }
}

impl Default for Config {
    fn default() -> Config {
        Config {
            array_fetch_size: 32,
            lock_mode: LockMode::Optimistic,
            query_poll_interval_ms: 100,
            query_poll_limit: 50,
            transactional: true,
        }
    }
}
