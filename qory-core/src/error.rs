//! Error types for qory

use thiserror::Error;

/// The main error type for qory operations
#[derive(Error, Debug)]
pub enum Error {
    /// Session ID does not match the allowed pattern
    #[error("invalid session id '{0}': IDs may include letters [a-zA-Z], numbers [0-9], dashes and underscores")]
    InvalidId(String),

    /// Session ID is valid but nothing is stored under it
    #[error("unknown session id '{0}'")]
    NotFound(String),

    /// The session store holds no sessions
    #[error("no sessions")]
    NoSessions,

    /// A stored session has no user message to preview
    #[error("session '{0}' has no user content")]
    NoUserContent(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Provider (LLM) errors
    #[error("Provider error: {0}")]
    Provider(String),
}

impl Error {
    /// Whether this is the expected "nothing stored yet" condition
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

/// A specialized Result type for qory operations
pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
