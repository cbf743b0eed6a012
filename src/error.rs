//! Error types for the relay, stream consumer, reducer and stores

use thiserror::Error;

/// Failures talking to the generation provider
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Provider reported error: {0}")]
    Remote(String),

    #[error("Malformed stream payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Client-side stream failures. Decode faults are never raised here,
/// they are dropped and logged.
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Relay returned status {0}")]
    Status(u16),
}

impl From<reqwest::Error> for StreamError {
    fn from(e: reqwest::Error) -> Self {
        StreamError::Transport(e.to_string())
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ReducerError {
    #[error("A turn is already in progress")]
    TurnInProgress,

    #[error("No open assistant message to extend")]
    NoOpenSlot,

    #[error("Message is empty")]
    EmptyMessage,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Persistence failures are reported, never raised to the chat.
pub type PersistenceError = StoreError;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
