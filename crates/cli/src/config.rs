//! Configuration management for the CLI
//!
//! Sources, lowest precedence first: built-in defaults, the TOML config
//! file, `RIGHTSIZE_*` environment variables, then command-line flags.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_GATEWAY_URL: &str = "http://localhost:8481/select/0/prometheus";
const DEFAULT_TIMEOUT_SECS: i64 = 45;
const DEFAULT_MAX_CONCURRENCY: i64 = rightsize_lib::DEFAULT_MAX_CONCURRENCY as i64;
const DEFAULT_CLUSTER_LABEL: &str = "uw_cluster";

/// CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CliConfig {
    /// Prometheus API root of the metrics backend
    pub gateway_url: String,
    /// Deadline for the whole run, in seconds
    pub timeout_secs: u64,
    /// Maximum concurrent backend queries
    pub max_concurrency: usize,
    /// Label carrying the cluster name on every series
    pub cluster_label: String,
}

impl CliConfig {
    /// Load configuration from `path` (or the default location) and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        let config = config::Config::builder()
            .set_default("gateway_url", DEFAULT_GATEWAY_URL)?
            .set_default("timeout_secs", DEFAULT_TIMEOUT_SECS)?
            .set_default("max_concurrency", DEFAULT_MAX_CONCURRENCY)?
            .set_default("cluster_label", DEFAULT_CLUSTER_LABEL)?
            .add_source(config::File::from(path.as_path()).required(false))
            .add_source(config::Environment::with_prefix("RIGHTSIZE").try_parsing(true))
            .build()
            .context("Failed to load configuration")?;

        config
            .try_deserialize()
            .with_context(|| format!("Invalid configuration (file: {})", path.display()))
    }

    /// Apply command-line overrides
    pub fn with_gateway_url(mut self, url: Option<String>) -> Self {
        if let Some(url) = url {
            self.gateway_url = url;
        }
        self
    }

    /// Get the configuration file path
    fn config_path() -> Result<PathBuf> {
        let home = dirs_next::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".config").join("rightsize").join("config.toml"))
    }
}
