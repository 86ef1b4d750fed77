//! Service configuration

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ConfigError;
use crate::ranking::{TOP_CANDIDATES, WEEKLY_WORKLOAD_MINUTES};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub access: AccessConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP port
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Initiatives REST API root, without the `/api` suffix
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Account allowed to approve any initiative
    #[serde(default = "default_admin_email")]
    pub admin_email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Reference line drawn on Pareto charts
    #[serde(default = "default_workload_threshold")]
    pub workload_threshold_minutes: f64,

    /// Length of the automation candidates list
    #[serde(default = "default_top_candidates")]
    pub top_candidates: usize,
}

// Defaults
fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 8080 }
fn default_base_url() -> String { "http://127.0.0.1:5000".to_string() }
fn default_timeout_secs() -> u64 { 15 }
fn default_admin_email() -> String { "admin@hubai.com".to_string() }
fn default_workload_threshold() -> f64 { WEEKLY_WORKLOAD_MINUTES }
fn default_top_candidates() -> usize { TOP_CANDIDATES }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            admin_email: default_admin_email(),
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            workload_threshold_minutes: default_workload_threshold(),
            top_candidates: default_top_candidates(),
        }
    }
}

impl Config {
    /// Reads a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}
