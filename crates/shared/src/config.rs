//! Configuration for the resolver pipeline.
//!
//! Loaded from a TOML file with sensible defaults for every setting, so a
//! missing file is never fatal.

use crate::Result;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory settings
    pub data: DataConfig,

    /// Logging settings
    pub logging: LoggingConfig,

    /// Upstream content site settings
    pub upstream: UpstreamConfig,

    /// Cinemeta metadata service settings
    #[serde(default)]
    pub cinemeta: CinemetaConfig,

    /// Tiered cache settings
    pub cache: CacheConfig,
}

/// Data directory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Root data directory path
    pub root_dir: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log directory path (relative to data directory or absolute)
    pub log_dir: String,

    /// Default log level (trace, debug, info, warn, error)
    pub default_level: String,

    /// Enable console output
    pub console: bool,

    /// Enable file output
    pub file: bool,

    /// Enable JSON formatting for file logs
    pub json_format: bool,
}

/// Upstream content site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL of the content site
    pub base_url: String,

    /// User-Agent sent with every request
    pub user_agent: String,

    /// Per-request timeout in seconds
    pub timeout_seconds: u64,

    /// Number of catalog entries per page
    pub page_size: usize,

    /// Hard ceiling on listing pages scanned by the ongoing view
    pub ongoing_page_limit: u32,
}

/// Cinemeta metadata service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CinemetaConfig {
    /// Base URL of the Cinemeta API
    pub base_url: String,
}

/// Tiered cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Durable-tier directory (relative to data directory or absolute)
    pub dir: String,

    /// Entry lifetime in seconds, both tiers
    pub ttl_seconds: u64,

    /// Version string baked into durable-tier filenames; bumping it
    /// invalidates every existing entry without touching the files
    pub version: String,
}

impl Default for CinemetaConfig {
    fn default() -> Self {
        Self {
            base_url: "https://v3-cinemeta.strem.io".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data: DataConfig {
                root_dir: "data".to_string(),
            },
            logging: LoggingConfig {
                log_dir: "logs".to_string(),
                default_level: "info".to_string(),
                console: true,
                file: false,
                json_format: false,
            },
            upstream: UpstreamConfig {
                base_url: "https://voirdrama.org".to_string(),
                user_agent: "Mozilla/5.0 (Stremio Addon; +https://stremio.com)".to_string(),
                timeout_seconds: 15,
                page_size: 10,
                ongoing_page_limit: 12,
            },
            cinemeta: CinemetaConfig::default(),
            cache: CacheConfig {
                dir: "cache".to_string(),
                ttl_seconds: 15 * 60,
                version: "v2".to_string(),
            },
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// If the file doesn't exist, returns the default configuration.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Config file not found, using defaults"
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        tracing::info!(path = %path.display(), "Configuration loaded");

        Ok(config)
    }

    /// Load configuration from a TOML file or fall back to defaults
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::from_file(path).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to load config, using defaults");
            Self::default()
        })
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = toml::to_string_pretty(self)
            .context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!(path = %path.display(), "Configuration saved");

        Ok(())
    }

    /// Get the absolute path for the data directory
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data.root_dir)
    }

    /// Get the absolute path for the log directory
    pub fn log_dir(&self) -> PathBuf {
        let log_path = Path::new(&self.logging.log_dir);
        if log_path.is_absolute() {
            log_path.to_path_buf()
        } else {
            self.data_dir().join(log_path)
        }
    }

    /// Get the absolute path for the durable cache directory
    pub fn cache_dir(&self) -> PathBuf {
        let cache_path = Path::new(&self.cache.dir);
        if cache_path.is_absolute() {
            cache_path.to_path_buf()
        } else {
            self.data_dir().join(cache_path)
        }
    }
}
