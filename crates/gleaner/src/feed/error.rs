use thiserror::Error;

use crate::http::HttpError;

/// Errors produced while fetching or parsing a feed document.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The document is not well-formed XML.
    #[error("Invalid feed: {message}")]
    InvalidFeed { message: String },

    /// Well-formed XML, but neither RSS nor Atom.
    #[error("Unsupported feed format: root element <{root}>")]
    UnsupportedFormat { root: String },

    /// The feed URL answered 404.
    #[error("Feed not found: {url}")]
    NotFound { url: String },

    /// Any other non-2xx status.
    #[error("HTTP {status} fetching {url}")]
    Http { status: u16, url: String },

    /// The request never produced a response.
    #[error("Transport error: {0}")]
    Transport(#[from] HttpError),
}

impl FeedError {
    /// Create an InvalidFeed error.
    #[inline]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidFeed {
            message: message.into(),
        }
    }

    /// Whether retrying the fetch may succeed.
    #[inline]
    pub fn is_transient(&self) -> bool {
        match self {
            FeedError::Transport(_) => true,
            FeedError::Http { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Result type for feed operations.
pub type Result<T> = std::result::Result<T, FeedError>;
