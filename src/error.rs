//! Error types for the vital-sign monitoring engine.

use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for monitoring engine operations
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or missing settings (e.g. a non-positive alert interval)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Key-value store could not be read or written
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// A notification channel failed to deliver
    #[error("Notification channel error: {0}")]
    Channel(#[from] ChannelError),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the error should keep the monitoring loop alive.
    ///
    /// Only configuration errors are surfaced to the caller of `start`;
    /// everything else is logged and swallowed by the engine.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Error::Configuration(_))
    }
}

/// Notification channel errors
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Email delivery failed
    #[error("email delivery to {contact} failed: {reason}")]
    Email { contact: String, reason: String },

    /// SMS delivery failed
    #[error("SMS delivery failed: {0}")]
    Sms(String),

    /// Channel is not reachable at all
    #[error("channel unavailable: {0}")]
    Unavailable(String),
}
