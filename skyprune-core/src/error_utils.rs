use crate::error::*;
use std::time::Duration;
use tracing::{error, info};

pub trait ErrorExt {
    fn log_error(&self) -> &Self;
    fn is_rate_limited(&self) -> bool;
    fn retry_after(&self) -> Option<Duration>;
    fn user_friendly_message(&self) -> String;
    fn error_code(&self) -> String;
}

impl ErrorExt for CoreError {
    fn log_error(&self) -> &Self {
        error!("CoreError: {}", self);
        match self {
            CoreError::BlueskyApi(e) => {
                error!("Bluesky API error details: {:?}", e);
            }
            CoreError::Config(e) => {
                error!("Configuration error details: {:?}", e);
            }
            CoreError::Audit(e) => {
                error!("Audit log error details: {:?}", e);
            }
            _ => {}
        }
        self
    }

    fn is_rate_limited(&self) -> bool {
        match self {
            CoreError::BlueskyApi(e) => e.is_rate_limited(),
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            CoreError::BlueskyApi(e) => e.retry_after(),
            _ => None,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CoreError::BlueskyApi(e) => e.user_friendly_message(),
            CoreError::Config(e) => e.user_friendly_message(),
            CoreError::Input(e) => e.to_string(),
            CoreError::Audit(e) => format!("Could not write the run log: {}", e),
            CoreError::Network(_) => {
                "Network connection error. Please check your internet connection.".to_string()
            }
            _ => "An unexpected error occurred. Please try again later.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            CoreError::BlueskyApi(_) => "BLUESKY_API".to_string(),
            CoreError::Config(_) => "CONFIG".to_string(),
            CoreError::Input(_) => "INPUT".to_string(),
            CoreError::Audit(_) => "AUDIT".to_string(),
            CoreError::Io(_) => "IO".to_string(),
            CoreError::Serialization(_) => "SERIALIZATION".to_string(),
            CoreError::Network(_) => "NETWORK".to_string(),
            CoreError::Internal { .. } => "INTERNAL".to_string(),
        }
    }
}

impl ErrorExt for BlueskyApiError {
    fn log_error(&self) -> &Self {
        error!("BlueskyApiError: {}", self);
        self
    }

    fn is_rate_limited(&self) -> bool {
        matches!(self, BlueskyApiError::RateLimitExceeded { .. })
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            BlueskyApiError::RateLimitExceeded {
                retry_after: Some(seconds),
            } => Some(Duration::from_secs(*seconds)),
            _ => None,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            BlueskyApiError::AuthenticationFailed { reason } => format!(
                "Bluesky authentication failed ({}). Please check your handle and app password.",
                reason
            ),
            BlueskyApiError::RateLimitExceeded { .. } => {
                "Too many requests. Please wait before trying again.".to_string()
            }
            BlueskyApiError::ExpiredToken => {
                "Your Bluesky session expired. Please run the tool again.".to_string()
            }
            BlueskyApiError::NotAuthenticated => {
                "Not signed in to Bluesky. Authenticate first.".to_string()
            }
            BlueskyApiError::RequestTimeout => {
                "Request to Bluesky timed out. Please try again.".to_string()
            }
            _ => "Bluesky API error occurred. Please try again later.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            BlueskyApiError::AuthenticationFailed { .. } => "BSKY_AUTH_FAILED".to_string(),
            BlueskyApiError::RateLimitExceeded { .. } => "BSKY_RATE_LIMIT".to_string(),
            BlueskyApiError::ExpiredToken => "BSKY_EXPIRED_TOKEN".to_string(),
            BlueskyApiError::NotAuthenticated => "BSKY_NOT_AUTHENTICATED".to_string(),
            BlueskyApiError::MalformedUri { .. } => "BSKY_MALFORMED_URI".to_string(),
            BlueskyApiError::RequestTimeout => "BSKY_TIMEOUT".to_string(),
            BlueskyApiError::InvalidResponse { .. } => "BSKY_INVALID_RESPONSE".to_string(),
            BlueskyApiError::Xrpc { .. } => "BSKY_XRPC".to_string(),
            BlueskyApiError::ServerError { .. } => "BSKY_SERVER_ERROR".to_string(),
        }
    }
}

impl ErrorExt for ConfigError {
    fn log_error(&self) -> &Self {
        error!("ConfigError: {}", self);
        self
    }

    fn is_rate_limited(&self) -> bool {
        false
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ConfigError::FileNotFound { path } => {
                format!("Configuration file '{}' could not be read.", path)
            }
            ConfigError::InvalidValue { field, .. } => {
                format!("Invalid value for configuration field '{}'.", field)
            }
            ConfigError::ValidationFailed { reason } => {
                format!("Configuration is invalid: {}.", reason)
            }
            ConfigError::Parse(_) => {
                "Configuration file format is invalid. Please check the settings.".to_string()
            }
        }
    }

    fn error_code(&self) -> String {
        match self {
            ConfigError::FileNotFound { .. } => "CONFIG_FILE_NOT_FOUND".to_string(),
            ConfigError::InvalidValue { .. } => "CONFIG_INVALID_VALUE".to_string(),
            ConfigError::ValidationFailed { .. } => "CONFIG_VALIDATION_FAILED".to_string(),
            ConfigError::Parse(_) => "CONFIG_PARSE_ERROR".to_string(),
        }
    }
}

/// Writes the full diagnostic trail for a failure through `tracing`.
#[derive(Debug, Default)]
pub struct ErrorReporter;

impl ErrorReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn report_error(&self, error: &CoreError) {
        error.log_error();
        info!("Error code: {}", error.error_code());
        info!("User message: {}", error.user_friendly_message());
        if let Some(retry_after) = error.retry_after() {
            info!("Server asked to retry after {:?}", retry_after);
        }
    }
}
