//! Error types for Jellycord
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Jellycord operations
///
/// This enum encompasses all possible errors that can occur during
/// configuration loading, media-server polling, Discord API calls,
/// and the reconciliation loop.
#[derive(Error, Debug)]
pub enum JellycordError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Media server unreachable or rejected the request (network/auth)
    ///
    /// A pass that hits this error is skipped for the current tick and
    /// retried on the next one.
    #[error("Media server unavailable: {0}")]
    SourceUnavailable(String),

    /// Discord API call failed
    ///
    /// `retryable` decides whether the feature keeps ticking (rate limits,
    /// server errors) or is suspended for the session (permission errors,
    /// bad token).
    #[error("Discord API error: status={status}, {message}")]
    ChatApi {
        /// HTTP status code returned by Discord (0 for transport errors)
        status: u16,
        /// Whether the operation is worth retrying on a later tick
        retryable: bool,
        /// Additional message explaining the failure
        message: String,
    },

    /// A Discord resource referenced by a display record no longer exists
    ///
    /// Treated as absence by the reconciliation passes: the resource is
    /// recreated and the record rebound, never surfaced to the user.
    #[error("Stale Discord resource: {0}")]
    StaleResource(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl JellycordError {
    /// Whether the error should suspend the feature that produced it
    /// for the rest of the session
    pub fn is_fatal_for_feature(&self) -> bool {
        matches!(
            self,
            JellycordError::ChatApi {
                retryable: false,
                ..
            }
        )
    }

    /// Process exit code for startup failures
    ///
    /// Mirrors the error classes that can abort startup: configuration
    /// problems, failed Discord authentication, and everything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            JellycordError::Config(_) => 2,
            JellycordError::ChatApi { status: 401, .. } => 101,
            JellycordError::ChatApi { status: 403, .. } => 102,
            _ => 1,
        }
    }
}

/// Result type alias for Jellycord operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;
