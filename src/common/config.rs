//! # Configuration Utilities
//!
//! TOML configuration for the coordinator. Every field has a default, so an
//! empty file (or no file at all) yields a working setup:
//!
//! ```toml
//! [listen]
//! worker_address = "0.0.0.0:9000"
//! client_address = "0.0.0.0:8000"
//! worker_backlog = 10
//! client_backlog = 5
//!
//! [distribution]
//! task_timeout_secs = 30
//! ```

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

/// Load a TOML configuration file and deserialize it into the specified type.
///
/// # Arguments
/// - `path`: Path to the TOML configuration file
///
/// # Returns
/// - `Ok(T)`: Successfully loaded and parsed configuration
/// - `Err`: File I/O or parsing error
///
/// # Example
/// ```ignore
/// let config: CoordinatorConfig = load_config("config/coordinator.toml")?;
/// ```
pub fn load_config<T>(path: &str) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    let content = fs::read_to_string(path)?;
    let config: T = toml::from_str(&content)?;
    Ok(config)
}

/// Complete coordinator configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Listener addresses and backlogs
    pub listen: ListenConfig,
    /// Task distribution tuning
    pub distribution: DistributionConfig,
}

impl CoordinatorConfig {
    /// Load a coordinator configuration and reject unusable values.
    pub fn from_file(path: &str) -> Result<Self> {
        let config: Self = load_config(path)?;
        config.validate()?;
        Ok(config)
    }

    /// A zero task timeout would expire every task the moment it is sent.
    pub fn validate(&self) -> Result<()> {
        if self.distribution.task_timeout_secs == 0 {
            bail!("distribution.task_timeout_secs must be at least 1");
        }
        Ok(())
    }
}

/// The two TCP listeners.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenConfig {
    /// Address workers connect to (e.g., "0.0.0.0:9000")
    pub worker_address: String,
    /// Address clients connect to (e.g., "0.0.0.0:8000")
    pub client_address: String,
    /// Pending-connection backlog for the worker listener
    pub worker_backlog: u32,
    /// Pending-connection backlog for the client listener
    pub client_backlog: u32,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            worker_address: "0.0.0.0:9000".to_string(),
            client_address: "0.0.0.0:8000".to_string(),
            worker_backlog: 10,
            client_backlog: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributionConfig {
    /// How long a worker may hold one task before it is requeued (seconds)
    pub task_timeout_secs: u64,
}

impl DistributionConfig {
    pub fn task_timeout(&self) -> Duration {
        Duration::from_secs(self.task_timeout_secs)
    }
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            task_timeout_secs: 30,
        }
    }
}
