//! Base trait for completion providers

use async_trait::async_trait;
use futures::Stream;
use qory_core::session::{Message, Role};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use thiserror::Error;

/// Error type for provider operations
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Human-readable message extracted from a structured provider error
    #[error("{0}")]
    ApiError(String),

    /// Non-success HTTP status whose body carried no structured error
    #[error("HTTP {status}: {body}")]
    StatusError { status: u16, body: String },

    #[error("Stream error: {0}")]
    StreamError(String),

    #[error("Output error: {0}")]
    OutputError(#[from] std::io::Error),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

pub type ProviderEventStream = Pin<Box<dyn Stream<Item = ProviderResult<StreamEvent>> + Send>>;

impl From<ProviderError> for qory_core::Error {
    fn from(e: ProviderError) -> Self {
        match e {
            // Writing the answer failed; the provider itself was fine
            ProviderError::OutputError(e) => qory_core::Error::Io(e),
            e => qory_core::Error::Provider(e.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorObject,
}

/// Error object as returned by OpenAI-compatible APIs
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorObject {
    pub message: String,
}

impl ProviderError {
    /// Build an error from a failed response, unwrapping `{"error":{"message":..}}`
    /// bodies into their message and keeping anything else verbatim.
    pub fn from_error_body(status: u16, body: &str) -> Self {
        match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(envelope) => ProviderError::ApiError(envelope.error.message),
            Err(_) => ProviderError::StatusError {
                status,
                body: body.to_string(),
            },
        }
    }
}

/// Token accounting reported at the end of a stream
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: i64,
    #[serde(default)]
    pub completion_tokens: i64,
    #[serde(default)]
    pub total_tokens: i64,
}

/// Streaming event emitted by completion providers
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Incremental assistant text output
    TextDelta(String),
    /// End of the response
    Finished {
        finish_reason: Option<String>,
        usage: Option<Usage>,
    },
}

/// A message in the provider's wire format
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

/// Translate a stored message into the provider's representation
pub fn translate_message(message: &Message) -> ChatMessage {
    let role = match message.role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
    };

    ChatMessage {
        role,
        content: message.content.clone(),
    }
}

/// Trait for completion providers
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Send a streaming chat completion request
    async fn chat_stream(
        &self,
        model: &str,
        messages: Vec<ChatMessage>,
    ) -> ProviderResult<ProviderEventStream>;

    /// List the model identifiers offered by the provider
    async fn list_models(&self) -> ProviderResult<Vec<String>>;
}
