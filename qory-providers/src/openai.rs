//! OpenAI-compatible HTTP client implementation

use async_trait::async_trait;
use eventsource_stream::{EventStreamError, Eventsource};
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::base::{
    ChatMessage, CompletionProvider, ErrorObject, ProviderError, ProviderEventStream,
    ProviderResult, StreamEvent, Usage,
};

/// Endpoint used when no base URL is configured
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1/";

const DONE_MARKER: &str = "[DONE]";

/// Chat completion request format
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    usage: Option<Usage>,
    #[serde(default)]
    error: Option<ErrorObject>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    data: Vec<ModelObject>,
}

#[derive(Debug, Deserialize)]
struct ModelObject {
    id: String,
}

/// Outcome of decoding one SSE payload
#[derive(Debug, PartialEq)]
enum Payload {
    Event(StreamEvent),
    Skip,
    Done,
}

/// Accumulated end-of-stream metadata
#[derive(Debug, Default)]
struct StreamState {
    finish_reason: Option<String>,
    usage: Option<Usage>,
}

impl StreamState {
    fn finish(&mut self) -> StreamEvent {
        StreamEvent::Finished {
            finish_reason: self.finish_reason.take(),
            usage: self.usage.take(),
        }
    }
}

/// Client for OpenAI-compatible chat completion APIs
pub struct OpenAIClient {
    client: Client,
    api_base: String,
    api_key: Option<String>,
}

impl OpenAIClient {
    /// Create a new client; a blank or missing base falls back to [`DEFAULT_API_BASE`]
    pub fn new(api_key: Option<String>, api_base: Option<String>) -> Self {
        let api_base = api_base
            .filter(|base| !base.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let api_key = api_key.filter(|key| !key.trim().is_empty());

        Self {
            client: Client::new(),
            api_base,
            api_key,
        }
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base.trim_end_matches('/'), path)
    }

    fn apply_headers(&self, mut req_builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(api_key) = &self.api_key {
            req_builder = req_builder.header("Authorization", format!("Bearer {}", api_key));
        }
        req_builder
    }

    async fn send(&self, req_builder: reqwest::RequestBuilder) -> ProviderResult<reqwest::Response> {
        let response = self.apply_headers(req_builder).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProviderError::from_error_body(status, &error_text));
        }

        Ok(response)
    }

    fn parse_payload(data: &str, state: &mut StreamState) -> ProviderResult<Payload> {
        let data = data.trim();
        if data == DONE_MARKER {
            return Ok(Payload::Done);
        }
        if data.is_empty() {
            return Ok(Payload::Skip);
        }

        let chunk: StreamChunk = serde_json::from_str(data)?;
        if let Some(error) = chunk.error {
            return Err(ProviderError::ApiError(error.message));
        }
        if chunk.usage.is_some() {
            state.usage = chunk.usage;
        }

        let Some(choice) = chunk.choices.into_iter().next() else {
            return Ok(Payload::Skip);
        };
        if choice.finish_reason.is_some() {
            state.finish_reason = choice.finish_reason;
        }

        match choice.delta.content {
            Some(content) if !content.is_empty() => Ok(Payload::Event(StreamEvent::TextDelta(content))),
            _ => Ok(Payload::Skip),
        }
    }
}

fn map_stream_error(err: EventStreamError<reqwest::Error>) -> ProviderError {
    match err {
        EventStreamError::Transport(e) => ProviderError::HttpError(e),
        other => ProviderError::StreamError(other.to_string()),
    }
}

#[async_trait]
impl CompletionProvider for OpenAIClient {
    async fn chat_stream(
        &self,
        model: &str,
        messages: Vec<ChatMessage>,
    ) -> ProviderResult<ProviderEventStream> {
        let request = ChatCompletionRequest {
            model,
            messages,
            stream: true,
        };

        debug!(
            "Sending streaming chat request to {} with model {}",
            self.api_base, model
        );

        let url = self.endpoint("chat/completions");
        let response = self.send(self.client.post(&url).json(&request)).await?;
        let events = Box::pin(response.bytes_stream().eventsource());

        let stream = futures::stream::unfold(
            Some((events, StreamState::default())),
            |state| async move {
                let (mut events, mut state) = state?;
                loop {
                    let event = match events.next().await {
                        Some(Ok(event)) => event,
                        Some(Err(err)) => return Some((Err(map_stream_error(err)), None)),
                        // Connection closed without a [DONE] marker
                        None => return Some((Ok(state.finish()), None)),
                    };

                    match Self::parse_payload(&event.data, &mut state) {
                        Ok(Payload::Event(ev)) => return Some((Ok(ev), Some((events, state)))),
                        Ok(Payload::Skip) => continue,
                        Ok(Payload::Done) => return Some((Ok(state.finish()), None)),
                        Err(err) => return Some((Err(err), None)),
                    }
                }
            },
        );

        Ok(Box::pin(stream))
    }

    async fn list_models(&self) -> ProviderResult<Vec<String>> {
        let url = self.endpoint("models");
        debug!("Listing models from {}", url);

        let response = self.send(self.client.get(&url)).await?;
        let models: ModelList = response.json().await?;
        Ok(models.data.into_iter().map(|m| m.id).collect())
    }
}
