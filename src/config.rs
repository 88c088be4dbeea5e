use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::collector::{CollectorOptions, PRODUCTION};
use crate::error::MetrixError;
use crate::providers::gitlab::{ClientOptions, DEFAULT_PER_PAGE};
use crate::storage::DEFAULT_DATABASE;

const CANDIDATES: [&str; 4] = ["metrix.toml", "metrix.json", "metrix.yaml", "metrix.yml"];

/// Configuration file structure for metrix.
///
/// Every value can also be supplied on the command line or through the
/// `METRIX_*` environment variables, which take precedence over the file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub gitlab: GitLabConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub collector: CollectorConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GitLabConfig {
    /// GitLab instance base URL
    #[serde(default = "default_gitlab_url")]
    pub url: String,

    /// GitLab personal access token
    pub token: Option<String>,

    /// Page size for list requests (GitLab caps this at 100)
    #[serde(default = "default_per_page")]
    pub per_page: u32,

    /// Abort a listing after this many pages
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StorageConfig {
    /// MongoDB connection string
    pub conn_string: Option<String>,

    #[serde(default = "default_database")]
    pub database: String,

    #[serde(default)]
    pub backend: StorageBackend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Mongo,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CollectorConfig {
    /// Only deployments to this environment are kept
    #[serde(default = "default_environment")]
    pub environment: String,

    #[serde(default = "default_storage_retries")]
    pub storage_retries: u32,

    #[serde(default = "default_storage_backoff_ms")]
    pub storage_backoff_ms: u64,
}

impl Default for GitLabConfig {
    fn default() -> Self {
        Self {
            url: default_gitlab_url(),
            token: None,
            per_page: default_per_page(),
            max_pages: default_max_pages(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay_secs(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            conn_string: None,
            database: default_database(),
            backend: StorageBackend::default(),
        }
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            storage_retries: default_storage_retries(),
            storage_backoff_ms: default_storage_backoff_ms(),
        }
    }
}

fn default_gitlab_url() -> String {
    "https://gitlab.com".to_string()
}

fn default_per_page() -> u32 {
    DEFAULT_PER_PAGE
}

fn default_max_pages() -> u32 {
    1000
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_secs() -> u64 {
    5
}

fn default_database() -> String {
    DEFAULT_DATABASE.to_string()
}

fn default_environment() -> String {
    PRODUCTION.to_string()
}

fn default_storage_retries() -> u32 {
    3
}

fn default_storage_backoff_ms() -> u64 {
    500
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path (must exist)
    /// 2. ./metrix.toml, ./metrix.json, ./metrix.yaml, ./metrix.yml
    /// 3. `<user config dir>/metrix/metrix.toml`
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        for candidate in &CANDIDATES {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::load_from_path(path);
            }
        }

        if let Some(user_config) = Self::user_config_path() {
            if user_config.exists() {
                return Self::load_from_path(&user_config);
            }
        }

        Ok(Self::default())
    }

    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("metrix").join("metrix.toml"))
    }

    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => toml::from_str(&contents)
                .or_else(|_| serde_json::from_str(&contents))
                .or_else(|_| serde_yaml::from_str(&contents))
                .with_context(|| format!("Failed to parse config file: {}", path.display())),
        }
    }

    /// Save configuration to a file, choosing the format from its extension.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::to_string_pretty(self)?,
            Some("yaml" | "yml") => serde_yaml::to_string(self)?,
            _ => toml::to_string_pretty(self)?,
        };

        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Checks that a collection run can be started with this configuration.
    pub fn validate(&self) -> crate::error::Result<()> {
        let url = url::Url::parse(&self.gitlab.url)
            .map_err(|e| MetrixError::Config(format!("Invalid GitLab URL '{}': {e}", self.gitlab.url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(MetrixError::Config(format!(
                "GitLab URL must use http or https, got '{}'",
                url.scheme()
            )));
        }

        if self.gitlab.token.as_deref().map_or(true, str::is_empty) {
            return Err(MetrixError::Config(
                "GitLab token is required (METRIX_GITLAB_TOKEN or --token)".to_string(),
            ));
        }

        if !(1..=100).contains(&self.gitlab.per_page) {
            return Err(MetrixError::Config(format!(
                "per-page must be between 1 and 100, got {}",
                self.gitlab.per_page
            )));
        }

        if self.gitlab.max_pages == 0 {
            return Err(MetrixError::Config("max-pages must be at least 1".to_string()));
        }

        if self.collector.environment.is_empty() {
            return Err(MetrixError::Config("environment must not be empty".to_string()));
        }

        if self.storage.backend == StorageBackend::Mongo
            && self.storage.conn_string.as_deref().map_or(true, str::is_empty)
        {
            return Err(MetrixError::Config(
                "MongoDB connection string is required (METRIX_DB_CONN_STRING or --db)".to_string(),
            ));
        }

        Ok(())
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            timeout: Duration::from_secs(self.gitlab.timeout_secs),
            max_retries: self.gitlab.max_retries,
            retry_delay: Duration::from_secs(self.gitlab.retry_delay_secs),
            max_pages: self.gitlab.max_pages,
        }
    }

    pub fn collector_options(&self, show_progress: bool) -> CollectorOptions {
        CollectorOptions {
            environment: self.collector.environment.clone(),
            per_page: self.gitlab.per_page,
            storage_retries: self.collector.storage_retries,
            storage_backoff: Duration::from_millis(self.collector.storage_backoff_ms),
            show_progress,
        }
    }
}
