//! Error types for the AdGuard DNS provider
//!
//! This module defines all error types used throughout the crate.
//!
//! Rule classification outcomes (`Unmanaged`, `Artificial`) are not errors;
//! see [`crate::rule::ParsedRule`].

use thiserror::Error;

/// Result type alias for provider operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the AdGuard DNS provider
#[derive(Error, Debug)]
pub enum Error {
    /// A rule carries our managed-by tag but does not follow the rule grammar
    #[error("invalid rule '{rule}': {reason}")]
    InvalidRule {
        /// The raw rule line as stored remotely
        rule: String,
        /// What was wrong with it
        reason: String,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP transport errors (connection failures, unexpected status codes)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limiting errors
    #[error("Rate limited: {0}")]
    RateLimited(String),
}

impl Error {
    /// Create an invalid rule error
    pub fn invalid_rule(rule: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRule {
            rule: rule.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }
}
