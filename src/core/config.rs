use std::fs;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use crate::core::error::{Error, ErrorKind, Result};
use crate::storage::wal::SyncMode;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage_path: PathBuf,

    // Generation
    pub quantity_records: u64,      // Records written per run
    pub quantity_symbols: usize,    // Length of each record's data
    pub batch_size: usize,          // Records per atomic insert

    // Query boundary
    pub default_page_size: usize,
    pub max_page_size: usize,

    pub sync_mode: SyncMode,
    pub event_capacity: usize,      // Broadcast buffer for generation events
}

impl Default for Config {
    fn default() -> Self {
        Config {
            storage_path: PathBuf::from("./data"),
            quantity_records: 10_000_000,
            quantity_symbols: 100,
            batch_size: 1000,
            default_page_size: 20,
            max_page_size: 10_000,
            sync_mode: SyncMode::Batch,
            event_capacity: 1024,
        }
    }
}

impl Config {
    /// Load a JSON config file; missing fields fall back to defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = fs::read(path.as_ref())?;
        let config: Config = serde_json::from_slice(&data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_path = path.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::new(ErrorKind::InvalidArgument, "batch_size must be positive"));
        }
        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!(
                    "default_page_size must be in 1..={}, got {}",
                    self.max_page_size, self.default_page_size
                ),
            ));
        }
        if self.event_capacity == 0 {
            return Err(Error::new(ErrorKind::InvalidArgument, "event_capacity must be positive"));
        }
        Ok(())
    }
}
