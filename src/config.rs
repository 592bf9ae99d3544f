use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub lineage: LineageConfig,
    #[serde(default)]
    pub traversal: TraversalConfig,
    #[serde(default)]
    pub http_server: HttpServerConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LineageConfig {
    /// Path to the SQLite graph database.
    pub db_path: PathBuf,
    /// Path to the edge taxonomy YAML document.
    pub taxonomy_path: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Traversal limits enforced at the request boundary
#[derive(Debug, Clone, Deserialize)]
pub struct TraversalConfig {
    /// System cap on max_z_hops; requests asking for more are rejected.
    #[serde(default = "default_max_z_hops_cap")]
    pub max_z_hops_cap: u32,
    /// Value used when a request omits max_z_hops.
    #[serde(default = "default_max_z_hops")]
    pub default_max_z_hops: u32,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            max_z_hops_cap: default_max_z_hops_cap(),
            default_max_z_hops: default_max_z_hops(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HttpServerConfig {
    #[serde(default = "default_http_enabled")]
    pub enabled: bool,
    #[serde(default = "default_http_port")]
    pub port: u16,
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

fn default_http_enabled() -> bool {
    true
}

fn default_http_port() -> u16 {
    8000
}

fn default_allowed_origins() -> Vec<String> {
    // Default empty; set allowed_origins in config.toml for production
    vec![]
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_z_hops_cap() -> u32 {
    4
}

fn default_max_z_hops() -> u32 {
    1
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in LINEAGE_CONFIG environment variable
    /// 2. ./config.toml in current directory
    pub fn load() -> Result<Self> {
        // Load .env file if it exists (ignore errors - file is optional)
        let _ = dotenv::dotenv();

        let config_path = std::env::var("LINEAGE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Config = toml::from_str(&config_str)
            .context("Failed to parse config.toml")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if !self.lineage.taxonomy_path.exists() {
            anyhow::bail!(
                "taxonomy_path does not exist: {}. Set taxonomy_path in config.toml to your edge taxonomy YAML.",
                self.lineage.taxonomy_path.display()
            );
        }

        if self.traversal.max_z_hops_cap == 0 {
            anyhow::bail!("traversal.max_z_hops_cap must be greater than 0");
        }

        if self.traversal.default_max_z_hops > self.traversal.max_z_hops_cap {
            anyhow::bail!(
                "traversal.default_max_z_hops ({}) exceeds max_z_hops_cap ({})",
                self.traversal.default_max_z_hops,
                self.traversal.max_z_hops_cap
            );
        }

        Ok(())
    }

    /// Get database path
    pub fn db_path(&self) -> &Path {
        &self.lineage.db_path
    }

    /// Get the taxonomy document path
    pub fn taxonomy_path(&self) -> &Path {
        &self.lineage.taxonomy_path
    }
}
