use thiserror::Error;

use super::model::EventKind;

/// Errors raised by an event bus or its handlers.
#[derive(Debug, Error)]
pub enum EventBusError {
    /// The bus was stopped; no more events are accepted.
    #[error("event bus is closed")]
    Closed,

    /// `start` was called on a bus that is already running.
    #[error("event bus is already started")]
    AlreadyStarted,

    /// A handler failed to process an event.
    #[error("handler {handler} failed on {kind}: {message}")]
    Handler {
        handler: String,
        kind: EventKind,
        message: String,
    },

    /// An event could not be encoded or decoded.
    #[error("event serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EventBusError {
    /// Create a handler error.
    pub fn handler(handler: impl Into<String>, kind: EventKind, message: impl Into<String>) -> Self {
        Self::Handler {
            handler: handler.into(),
            kind,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EventBusError>;
