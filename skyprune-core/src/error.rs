use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Bluesky API error: {0}")]
    BlueskyApi(#[from] BlueskyApiError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Input error: {0}")]
    Input(#[from] InputError),

    #[error("Audit log error: {0}")]
    Audit(#[from] AuditError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BlueskyApiError {
    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    #[error("Rate limit exceeded")]
    RateLimitExceeded { retry_after: Option<u64> },

    #[error("Session token expired")]
    ExpiredToken,

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Malformed post URI: {uri}")]
    MalformedUri { uri: String },

    #[error("Request timeout")]
    RequestTimeout,

    #[error("Invalid API response: {details}")]
    InvalidResponse { details: String },

    #[error("XRPC error {error} (HTTP {status_code}): {message}")]
    Xrpc {
        status_code: u16,
        error: String,
        message: String,
    },

    #[error("Server error: {status_code}")]
    ServerError { status_code: u16 },
}

/// Malformed operator input. Recovered by asking again, except where the
/// prompt cannot continue (empty credentials, closed input).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("Please enter a valid number.")]
    NotANumber { input: String },

    #[error("{field} must be a positive number.")]
    Negative { field: String },

    #[error("Please enter 'y' or 'n'.")]
    NotYesNo { input: String },

    #[error("Invalid input. Type 'DELETE' to confirm or 'no' to cancel.")]
    NotConfirmation { input: String },

    #[error("{field} cannot be empty.")]
    Empty { field: String },

    #[error("Input closed before {field} was provided")]
    Closed { field: String },
}

/// A post's creation timestamp that could not be read.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Could not parse date '{raw}': {reason}")]
pub struct DateParseError {
    pub raw: String,
    pub reason: String,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Configuration validation failed: {reason}")]
    ValidationFailed { reason: String },

    #[error("Configuration parsing error: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Could not create log directory {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not open log file {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not write to log file: {0}")]
    Write(#[source] std::io::Error),
}
