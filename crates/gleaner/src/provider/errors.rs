use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::feed::FeedError;

/// Errors that can occur when fetching from a content provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Credentials missing, expired or rejected.
    #[error("Authentication required")]
    AuthRequired,

    /// Rate limit exceeded.
    #[error("Rate limit exceeded. Resets at {reset_at}")]
    RateLimited { reset_at: DateTime<Utc> },

    /// Resource not found (channel, show, account).
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    /// Network or connection error.
    #[error("Network error: {message}")]
    Network { message: String },

    /// The provider answered with an error.
    #[error("API error: {message}")]
    Api { message: String },

    /// A feed could not be fetched or parsed.
    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    /// Unexpected/internal error.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ProviderError {
    /// Create an API error.
    #[inline]
    pub fn api(message: impl Into<String>) -> Self {
        Self::Api {
            message: message.into(),
        }
    }

    /// Create a not found error.
    #[inline]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Create a network error.
    #[inline]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create an internal error.
    #[inline]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Check if this error is a rate limit error.
    #[inline]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Whether a later attempt may succeed without any change on our side.
    #[inline]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Network { .. } => true,
            Self::Feed(feed) => feed.is_transient(),
            _ => false,
        }
    }
}

/// Extract a short error message suitable for log lines.
///
/// Takes the first line of an error message, which keeps multi-line provider
/// responses from flooding the log.
#[inline]
pub fn short_error_message(e: &impl std::error::Error) -> String {
    let full = e.to_string();
    full.lines().next().unwrap_or(&full).to_string()
}

/// Result type for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;
