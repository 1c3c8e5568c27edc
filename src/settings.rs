//! Layered configuration: built-in defaults, then an optional file, then
//! `NESTSET_*` environment variables.
//!
//! ```toml
//! # nestset.toml
//! database = "trees.db"    # omit for an in-memory database
//! encoding = "dyadic"      # or "interval"
//! tree_id_attempts = 16
//! busy_timeout_ms = 5000
//! log_filter = "nestset=debug"
//! ```

use config::{Config, Environment, File};
use serde::Deserialize;
use std::time::Duration;

use crate::engine::DEFAULT_TREE_ID_ATTEMPTS;
use crate::error::Result;
use crate::persist::PersistenceMode;

pub const DEFAULT_CONFIG_FILE: &str = "nestset.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingKind {
    Interval,
    Dyadic,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database: Option<String>,
    pub encoding: EncodingKind,
    pub tree_id_attempts: u32,
    pub busy_timeout_ms: u64,
    pub log_filter: String,
}

impl Settings {
    /// Reads `path` (if it exists) on top of the defaults, then applies the
    /// environment, e.g. `NESTSET_ENCODING=dyadic`.
    pub fn load(path: &str) -> Result<Self> {
        let settings = Config::builder()
            .set_default("encoding", "interval")?
            .set_default("tree_id_attempts", DEFAULT_TREE_ID_ATTEMPTS as i64)?
            .set_default("busy_timeout_ms", 5000_i64)?
            .set_default("log_filter", "info")?
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("NESTSET"))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }
    pub fn persistence_mode(&self) -> PersistenceMode {
        match &self.database {
            Some(path) => PersistenceMode::File(path.clone()),
            None => PersistenceMode::InMemory,
        }
    }
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: None,
            encoding: EncodingKind::Interval,
            tree_id_attempts: DEFAULT_TREE_ID_ATTEMPTS,
            busy_timeout_ms: 5000,
            log_filter: "info".to_string(),
        }
    }
}
