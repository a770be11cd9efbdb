//! Immutable run configuration for the fetch engine

use std::ops::{Range, RangeInclusive};
use std::path::PathBuf;
use std::time::Duration;

use crate::backoff::{DEFAULT_JITTER, MAX_DELAY};
use crate::error::ConfigError;

pub const DEFAULT_MAX_CONCURRENT: usize = 2;
pub const DEFAULT_MAX_RETRIES: u32 = 5;
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_YEARS: RangeInclusive<u16> = 2000..=2024;
/// Post-success pause so a freed permit does not immediately burst the API
pub const DEFAULT_PACING: Range<Duration> = Duration::from_millis(100)..Duration::from_millis(500);

/// Run configuration. Construct with [`FetchConfig::new`], adjust fields,
/// then call [`FetchConfig::validate`] once before scheduling.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// API root, without trailing slash (e.g. `https://api.footprintnetwork.org/v1`)
    pub base_url: String,
    /// Credential attached to every request
    pub api_key: String,
    /// Directory receiving `data_all_<year>.json` artifacts
    pub output_dir: PathBuf,
    /// Gate capacity: network calls allowed in flight at once
    pub max_concurrent: usize,
    /// Attempts per unit, including the first
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound for any backoff delay
    pub max_delay: Duration,
    /// Total per-request timeout
    pub request_timeout: Duration,
    /// Backoff multiplier draw range
    pub jitter: Range<f64>,
    /// Pause after a successful fetch
    pub pacing: Range<Duration>,
    /// Seed for jitter/pacing draws; `None` draws from OS entropy
    pub seed: Option<u64>,
    /// Years to fetch, in launch order
    pub years: Vec<u16>,
}

impl FetchConfig {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            output_dir: output_dir.into(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay: DEFAULT_INITIAL_DELAY,
            max_delay: MAX_DELAY,
            request_timeout: DEFAULT_TIMEOUT,
            jitter: DEFAULT_JITTER,
            pacing: DEFAULT_PACING,
            seed: None,
            years: DEFAULT_YEARS.collect(),
        }
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.is_empty() {
            return Err(ConfigError::Missing("API_URL"));
        }
        if self.api_key.is_empty() {
            return Err(ConfigError::Missing("API_KEY"));
        }
        if self.max_concurrent == 0 {
            return Err(ConfigError::Invalid("max_concurrent must be >= 1".into()));
        }
        if self.max_retries == 0 {
            return Err(ConfigError::Invalid("max_retries must be >= 1".into()));
        }
        if self.years.is_empty() {
            return Err(ConfigError::Invalid("worklist is empty".into()));
        }
        let mut seen = std::collections::HashSet::new();
        if let Some(dup) = self.years.iter().find(|y| !seen.insert(**y)) {
            return Err(ConfigError::Invalid(format!("year {dup} listed twice")));
        }
        if self.initial_delay.is_zero() || self.initial_delay > self.max_delay {
            return Err(ConfigError::Invalid(format!(
                "initial_delay must be in (0, {:?}], got {:?}",
                self.max_delay, self.initial_delay
            )));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::Invalid("request_timeout must be > 0".into()));
        }
        if !(self.jitter.start > 0.0 && self.jitter.start < self.jitter.end) {
            return Err(ConfigError::Invalid(format!(
                "jitter range must be non-empty and positive, got {:?}",
                self.jitter
            )));
        }
        if self.pacing.start > self.pacing.end {
            return Err(ConfigError::Invalid("pacing range is inverted".into()));
        }
        Ok(())
    }
}
