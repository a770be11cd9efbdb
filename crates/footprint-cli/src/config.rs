//! Configuration loading from TOML files and the environment

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Global configuration for footprint
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub fetch: FetchSection,
    pub ingest: IngestSection,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ApiConfig {
    #[serde(deserialize_with = "deserialize_env_var")]
    pub base_url: Option<String>,
    #[serde(deserialize_with = "deserialize_env_var")]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchSection {
    pub output_dir: PathBuf,
    pub first_year: u16,
    pub last_year: u16,
    pub max_concurrent: usize,
    pub max_retries: u32,
    /// Delay before the first retry, in milliseconds
    pub initial_delay_ms: u64,
    /// Total per-request timeout, in seconds
    pub timeout: u64,
    pub seed: Option<u64>,
}

impl Default for FetchSection {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./local_storage/raw"),
            first_year: *footprint_core::config::DEFAULT_YEARS.start(),
            last_year: *footprint_core::config::DEFAULT_YEARS.end(),
            max_concurrent: footprint_core::config::DEFAULT_MAX_CONCURRENT,
            max_retries: footprint_core::config::DEFAULT_MAX_RETRIES,
            initial_delay_ms: footprint_core::config::DEFAULT_INITIAL_DELAY.as_millis() as u64,
            timeout: footprint_core::config::DEFAULT_TIMEOUT.as_secs(),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestSection {
    pub database: PathBuf,
    pub country: String,
}

impl Default for IngestSection {
    fn default() -> Self {
        Self {
            database: PathBuf::from("./local_storage/footprint.duckdb"),
            country: footprint_ingest::DEFAULT_COUNTRY.to_string(),
        }
    }
}

/// Deserialize a string that may contain environment variable reference like ${VAR}
fn deserialize_env_var<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.and_then(|s| expand_env_var(&s)))
}

/// Expand ${VAR} to environment variable value
fn expand_env_var(s: &str) -> Option<String> {
    if let Some(var_name) = s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        std::env::var(var_name).ok()
    } else {
        Some(s.to_string())
    }
}

/// Non-empty environment variable
fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./footprint.toml (current directory)
    /// 2. ~/.config/footprint/config.toml
    ///
    /// If no config file found, returns default config. `API_URL` and
    /// `API_KEY` from the environment (or `.env`) override the file.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("footprint.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "footprint") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default().with_env_overrides())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config.with_env_overrides())
    }

    fn with_env_overrides(mut self) -> Self {
        if let Some(url) = env_nonempty("API_URL") {
            self.api.base_url = Some(url);
        }
        if let Some(key) = env_nonempty("API_KEY") {
            self.api.api_key = Some(key);
        }
        self
    }
}
