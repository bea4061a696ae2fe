//! Configuration for the store, key generation, logging and the front end
//!
//! Settings are plain serde structs with defaults, so a TOML file only needs
//! the sections it wants to change.

use crate::error::{Result as StoreResult, StoreError};
use crate::keygen::{KeyGenerator, RandomKeyGenerator, SequentialKeyGenerator, DEFAULT_KEY_LENGTH};
use crate::logging::LoggingConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Store layout and retry budget
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Number of shards (power of 2)
    pub num_shards: usize,
    pub initial_capacity_per_shard: usize,
    /// Candidates tried by `put` before giving up
    pub max_attempts: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            num_shards: 16,
            initial_capacity_per_shard: 1024,
            max_attempts: 64,
        }
    }
}

impl StoreConfig {
    pub fn validate(&self) -> StoreResult<()> {
        if self.num_shards == 0 || !self.num_shards.is_power_of_two() {
            return Err(StoreError::InvalidConfig(format!(
                "num_shards must be a power of two, got {}",
                self.num_shards
            )));
        }

        if self.max_attempts == 0 {
            return Err(StoreError::InvalidConfig(
                "max_attempts cannot be 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyGenKind {
    Random,
    Sequential,
}

/// Key generator selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyGenConfig {
    pub kind: KeyGenKind,
    /// Length of random keys
    pub length: usize,
    /// First counter value for sequential keys
    pub start: u64,
}

impl Default for KeyGenConfig {
    fn default() -> Self {
        Self {
            kind: KeyGenKind::Random,
            length: DEFAULT_KEY_LENGTH,
            start: 0,
        }
    }
}

impl KeyGenConfig {
    pub fn validate(&self) -> StoreResult<()> {
        if self.kind == KeyGenKind::Random && self.length == 0 {
            return Err(StoreError::InvalidConfig(
                "random key length cannot be 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Instantiate the configured generator
    pub fn build(&self) -> Arc<dyn KeyGenerator> {
        match self.kind {
            KeyGenKind::Random => Arc::new(RandomKeyGenerator::new(self.length)),
            KeyGenKind::Sequential => Arc::new(SequentialKeyGenerator::starting_at(self.start)),
        }
    }
}

/// Front end settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Largest accepted key + value payload per request
    pub max_frame_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7878,
            max_frame_bytes: 64 * 1024,
        }
    }
}

/// Complete service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub store: StoreConfig,
    pub keygen: KeyGenConfig,
    pub logging: LoggingConfig,
    pub server: ServerSettings,
}

impl ServiceConfig {
    /// Load and validate configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: ServiceConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn validate(&self) -> StoreResult<()> {
        self.store.validate()?;
        self.keygen.validate()?;

        if self.server.max_frame_bytes == 0 {
            return Err(StoreError::InvalidConfig(
                "max_frame_bytes cannot be 0".to_string(),
            ));
        }

        Ok(())
    }
}
