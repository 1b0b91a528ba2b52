use thiserror::Error;

/// Main error type for the supervisor
#[derive(Error, Debug)]
pub enum SentinelError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Startup identity errors
    #[error("Local IP detection failed: {0}")]
    LocalIp(String),

    // Launch errors
    #[error("Executable not found for {service}: {path}")]
    ExecutableMissing { service: String, path: String },

    #[error("Spawn failed for {service}: {reason}")]
    SpawnFailed { service: String, reason: String },

    // Network errors
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Webhook rejected alert: code {code}, message {message}")]
    WebhookRejected { code: i64, message: String },

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl SentinelError {
    /// Errors that must terminate the supervisor instead of being
    /// absorbed by the per-service isolation in the tick loop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SentinelError::ExecutableMissing { .. })
    }
}

/// Result type alias for SentinelError
pub type Result<T> = std::result::Result<T, SentinelError>;
