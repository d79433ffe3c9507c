//! Error types for the DDK system
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for DDK operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the DDK system
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required `api_param` key is absent
    #[error("missing required api_param: {0}")]
    MissingParameter(String),

    /// An `api_param` key is present but has the wrong shape
    #[error("invalid api_param {key}: {reason}")]
    InvalidParameter {
        /// Parameter key
        key: String,
        /// What was wrong with the value
        reason: String,
    },

    /// The IP probe failed or produced something that is not an address
    #[error("IP resolution failed: {0}")]
    Resolution(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Network failures, timeouts, throttling and provider-side outages
    #[error("Transient error: {0}")]
    Transient(String),

    /// Provider-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A command could not be run at all
    #[error("Command error: {0}")]
    Command(String),

    /// A command ran and exited unsuccessfully
    #[error("Command `{command}` exited with {status}: {output}")]
    CommandFailed {
        /// The command line as given
        command: String,
        /// Exit status description
        status: String,
        /// Combined stdout and stderr, trimmed
        output: String,
    },

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a missing parameter error
    pub fn missing_param(key: impl Into<String>) -> Self {
        Self::MissingParameter(key.into())
    }

    /// Create an invalid parameter error
    pub fn invalid_param(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create a resolution error
    pub fn resolution(msg: impl Into<String>) -> Self {
        Self::Resolution(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a transient error
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a command error
    pub fn command(msg: impl Into<String>) -> Self {
        Self::Command(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Whether this error belongs to the configuration family
    ///
    /// Configuration errors are fatal to the one record they concern and
    /// never to the process.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::MissingParameter(_) | Self::InvalidParameter { .. }
        )
    }

    /// Whether the next tick may reasonably succeed without operator action
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Io(_))
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
