use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_CONFIG_FILE: &str = "skyprune.toml";
pub const CONFIG_PATH_ENV: &str = "SKYPRUNE_CONFIG";
pub const SERVICE_URL_ENV: &str = "SKYPRUNE_SERVICE_URL";
pub const LOG_DIR_ENV: &str = "SKYPRUNE_LOG_DIR";

/// Largest page the author feed endpoint accepts.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Upper bounds that keep the backoff schedule within `Duration`.
pub const MAX_RETRY_ATTEMPTS: u32 = 10;
pub const MAX_INITIAL_DELAY_SECS: u64 = 300;
pub const MAX_BACKOFF_MULTIPLIER: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service_url: String,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    pub page_size: u32,
    pub log_dir: PathBuf,
    pub preview_sample: usize,
    pub retry: RetrySettings,
    pub pacing: PacingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_delay_secs: u64,
    pub backoff_multiplier: f64,
    pub jitter_factor: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingSettings {
    pub interval_ms: u64,
    pub progress_every: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service_url: "https://bsky.social".to_string(),
            user_agent: format!("skyprune/{}", env!("CARGO_PKG_VERSION")),
            request_timeout_secs: 30,
            page_size: MAX_PAGE_SIZE,
            log_dir: PathBuf::from("logs"),
            preview_sample: 5,
            retry: RetrySettings::default(),
            pacing: PacingSettings::default(),
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_secs: 5,
            backoff_multiplier: 2.0,
            jitter_factor: 0.0,
        }
    }
}

impl Default for PacingSettings {
    fn default() -> Self {
        Self {
            interval_ms: 500,
            progress_every: 10,
        }
    }
}

impl AppConfig {
    /// Load from `SKYPRUNE_CONFIG`, else `./skyprune.toml` when it exists,
    /// else defaults; then apply environment overrides and validate.
    pub fn load() -> Result<Self, ConfigError> {
        let explicit = std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
        let mut config = match explicit {
            Some(path) => Self::from_file(&path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                    Self::default()
                }
            }
        };

        config.apply_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;
        let config = Self::from_toml_str(&contents)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Apply environment-style overrides through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(SERVICE_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.service_url = url.trim().to_string();
        }
        if let Some(dir) = lookup(LOG_DIR_ENV).filter(|v| !v.trim().is_empty()) {
            self.log_dir = PathBuf::from(dir.trim());
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.service_url.starts_with("https://") || self.service_url.starts_with("http://"))
        {
            return Err(ConfigError::InvalidValue {
                field: "service_url".to_string(),
                value: self.service_url.clone(),
            });
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::ValidationFailed {
                reason: format!("page_size must be between 1 and {}", MAX_PAGE_SIZE),
            });
        }
        if self.retry.max_attempts == 0 || self.retry.max_attempts > MAX_RETRY_ATTEMPTS {
            return Err(ConfigError::ValidationFailed {
                reason: format!(
                    "retry.max_attempts must be between 1 and {}",
                    MAX_RETRY_ATTEMPTS
                ),
            });
        }
        if self.retry.initial_delay_secs > MAX_INITIAL_DELAY_SECS {
            return Err(ConfigError::ValidationFailed {
                reason: format!(
                    "retry.initial_delay_secs must be at most {}",
                    MAX_INITIAL_DELAY_SECS
                ),
            });
        }
        // NaN fails both comparisons, so test for the valid range.
        if !(self.retry.backoff_multiplier.is_finite()
            && (1.0..=MAX_BACKOFF_MULTIPLIER).contains(&self.retry.backoff_multiplier))
        {
            return Err(ConfigError::ValidationFailed {
                reason: format!(
                    "retry.backoff_multiplier must be between 1.0 and {}",
                    MAX_BACKOFF_MULTIPLIER
                ),
            });
        }
        if !(0.0..=1.0).contains(&self.retry.jitter_factor) {
            return Err(ConfigError::ValidationFailed {
                reason: "retry.jitter_factor must be between 0.0 and 1.0".to_string(),
            });
        }
        if self.pacing.progress_every == 0 {
            return Err(ConfigError::ValidationFailed {
                reason: "pacing.progress_every must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
