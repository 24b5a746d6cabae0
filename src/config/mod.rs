//! Configuration management.
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! `RESEARCH_FINDER__SECTION__KEY` environment variables. Provider credentials
//! additionally fall back to the conventional `S2_API_KEY`, `OPENALEX_EMAIL`,
//! `CROSSREF_MAILTO` and `PUBMED_API_KEY` variables.
//!
//! # Configuration File Format
//!
//! ```toml
//! [cache]
//! enabled = true
//! directory = "/home/me/.cache/research-finder"
//! ttl_hours = 24
//!
//! [http]
//! timeout_seconds = 10
//!
//! [credentials]
//! semantic_scholar_api_key = "your-api-key"
//! openalex_email = "me@example.org"
//! crossref_mailto = "me@example.org"
//! pubmed_api_key = "your-ncbi-key"
//!
//! [search]
//! default_limit = 10
//! concurrency = 1
//! enabled_sources = "arxiv,crossref"
//!
//! [logging]
//! level = "info"
//! format = "text"
//! ```

mod validate;

pub use validate::{validate_config, ConfigReport};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "RESEARCH_FINDER";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub credentials: Credentials,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Serialize to TOML, e.g. to write a starter config file
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Fill unset credentials from the conventional environment variables
    pub fn apply_credential_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if self.credentials.semantic_scholar_api_key.is_none() {
            self.credentials.semantic_scholar_api_key = non_empty("S2_API_KEY");
        }
        if self.credentials.openalex_email.is_none() {
            self.credentials.openalex_email = non_empty("OPENALEX_EMAIL");
        }
        if self.credentials.crossref_mailto.is_none() {
            self.credentials.crossref_mailto = non_empty("CROSSREF_MAILTO");
        }
        if self.credentials.pubmed_api_key.is_none() {
            self.credentials.pubmed_api_key = non_empty("PUBMED_API_KEY");
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Cache directory; defaults to the platform cache dir
    #[serde(default)]
    pub directory: Option<PathBuf>,

    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: None,
            ttl_hours: default_ttl_hours(),
        }
    }
}

impl CacheConfig {
    /// Time-to-live of a cache entry
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_hours.saturating_mul(3600))
    }

    /// Configured directory, or the platform default
    pub fn resolved_directory(&self) -> PathBuf {
        self.directory.clone().unwrap_or_else(default_cache_dir)
    }
}

fn default_true() -> bool {
    true
}

fn default_ttl_hours() -> u64 {
    24
}

/// HTTP configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout, applied to every provider call
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

fn default_timeout_seconds() -> u64 {
    10
}

/// Provider credentials. Only used to select a provider's rate-limit interval
/// and to identify the client to the provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub semantic_scholar_api_key: Option<String>,

    #[serde(default)]
    pub openalex_email: Option<String>,

    #[serde(default)]
    pub crossref_mailto: Option<String>,

    /// NCBI E-utilities key
    #[serde(default)]
    pub pubmed_api_key: Option<String>,
}

/// Search defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// Number of sources fetched at the same time
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Only use these sources (comma-separated ids)
    #[serde(default)]
    pub enabled_sources: Option<String>,

    /// Never use these sources (comma-separated ids)
    #[serde(default)]
    pub disabled_sources: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            concurrency: default_concurrency(),
            enabled_sources: None,
            disabled_sources: None,
        }
    }
}

fn default_limit() -> usize {
    10
}

fn default_concurrency() -> usize {
    1
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Text,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Default cache directory (`<platform cache dir>/research-finder`)
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("research-finder")
}

/// Look for a config file in the working directory, then the platform config dir
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("research-finder.toml");
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("research-finder").join("config.toml"))
        .filter(|path| path.is_file())
}

/// Load configuration from defaults, an optional file, and the environment
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path).required(true));
    }

    let settings = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let mut config: Config = settings.try_deserialize()?;
    config.apply_credential_env(|name| std::env::var(name).ok());
    Ok(config)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("failed to serialize configuration: {0}")]
    Serialize(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
