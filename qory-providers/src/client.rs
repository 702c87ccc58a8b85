//! Streaming completion client that renders responses as they arrive

use std::io::Write;
use std::sync::Arc;

use futures::StreamExt;
use qory_core::session::Message;
use tracing::{debug, error};

use crate::base::{
    translate_message, CompletionProvider, ProviderError, ProviderResult, StreamEvent,
};

/// Drives a [`CompletionProvider`] and writes its output to a sink
#[derive(Clone)]
pub struct CompletionClient {
    provider: Arc<dyn CompletionProvider>,
}

impl CompletionClient {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }

    /// Stream a completion for `messages` into `sink`.
    ///
    /// Each fragment is written and flushed as soon as it arrives. On success a
    /// trailing newline is written and the full text returned. On provider
    /// failure the partial text is discarded and `Provider error: <msg>` is
    /// written instead. A failing sink is returned as
    /// [`ProviderError::OutputError`] without writing anything more.
    pub async fn query<W: Write + ?Sized>(
        &self,
        model: &str,
        messages: &[Message],
        sink: &mut W,
    ) -> ProviderResult<String> {
        let wire = messages.iter().map(translate_message).collect();

        match self.stream_into(model, wire, sink).await {
            Ok(text) => {
                writeln!(sink)?;
                sink.flush()?;
                Ok(text)
            }
            // The sink itself is broken, so there is nowhere to report to
            Err(e @ ProviderError::OutputError(_)) => Err(e),
            Err(e) => {
                error!("Completion failed: {}", e);
                // Best effort; the provider error is what gets returned
                let _ = writeln!(sink, "Provider error: {}", e);
                let _ = sink.flush();
                Err(e)
            }
        }
    }

    async fn stream_into<W: Write + ?Sized>(
        &self,
        model: &str,
        messages: Vec<crate::base::ChatMessage>,
        sink: &mut W,
    ) -> ProviderResult<String> {
        let mut stream = self.provider.chat_stream(model, messages).await?;
        let mut text = String::new();

        while let Some(event) = stream.next().await {
            match event? {
                StreamEvent::TextDelta(delta) => {
                    sink.write_all(delta.as_bytes())?;
                    sink.flush()?;
                    text.push_str(&delta);
                }
                StreamEvent::Finished {
                    finish_reason,
                    usage,
                } => {
                    debug!(
                        "Completion finished (reason: {:?}, usage: {:?})",
                        finish_reason, usage
                    );
                    break;
                }
            }
        }

        Ok(text)
    }

    /// Model identifiers offered by the provider, sorted and deduplicated
    pub async fn available_models(&self) -> ProviderResult<Vec<String>> {
        let mut models = self.provider.list_models().await?;
        models.sort();
        models.dedup();
        Ok(models)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::{ChatMessage, ProviderEventStream};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replays a fixed script of events and records the request it saw
    struct ScriptedProvider {
        script: Mutex<Option<Vec<ProviderResult<StreamEvent>>>>,
        seen: Mutex<Vec<ChatMessage>>,
        models: Vec<String>,
    }

    impl ScriptedProvider {
        fn new(script: Vec<ProviderResult<StreamEvent>>) -> Self {
            Self {
                script: Mutex::new(Some(script)),
                seen: Mutex::new(Vec::new()),
                models: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl CompletionProvider for ScriptedProvider {
        async fn chat_stream(
            &self,
            _model: &str,
            messages: Vec<ChatMessage>,
        ) -> ProviderResult<ProviderEventStream> {
            *self.seen.lock().unwrap() = messages;
            let script = self.script.lock().unwrap().take().unwrap_or_default();
            Ok(Box::pin(futures::stream::iter(script)))
        }

        async fn list_models(&self) -> ProviderResult<Vec<String>> {
            Ok(self.models.clone())
        }
    }

    fn delta(s: &str) -> ProviderResult<StreamEvent> {
        Ok(StreamEvent::TextDelta(s.to_string()))
    }

    fn finished() -> ProviderResult<StreamEvent> {
        Ok(StreamEvent::Finished {
            finish_reason: Some("stop".to_string()),
            usage: None,
        })
    }

    #[tokio::test]
    async fn test_query_streams_and_returns_text() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            delta("Hello"),
            delta(", "),
            delta("world"),
            finished(),
        ]));
        let client = CompletionClient::new(provider.clone());

        let mut out = Vec::new();
        let text = client
            .query("m", &[Message::system("be brief"), Message::user("hi")], &mut out)
            .await
            .unwrap();

        assert_eq!(text, "Hello, world");
        assert_eq!(String::from_utf8(out).unwrap(), "Hello, world\n");

        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].role, "system");
        assert_eq!(seen[1].content, "hi");
    }

    #[tokio::test]
    async fn test_query_failure_discards_partial_text() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            delta("partial "),
            Err(ProviderError::ApiError("rate limited".to_string())),
            delta("never seen"),
        ]));
        let client = CompletionClient::new(provider);

        let mut out = Vec::new();
        let err = client
            .query("m", &[Message::user("hi")], &mut out)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "rate limited");
        let printed = String::from_utf8(out).unwrap();
        assert_eq!(printed, "partial Provider error: rate limited\n");
    }

    /// Accepts `capacity` bytes, then fails like a closed pipe
    struct ClosedPipe {
        written: Vec<u8>,
        capacity: usize,
    }

    impl Write for ClosedPipe {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.written.len() + buf.len() > self.capacity {
                return Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"));
            }
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_query_sink_failure_is_output_error() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            delta("fits"),
            delta(" but this does not"),
            finished(),
        ]));
        let client = CompletionClient::new(provider);

        let mut sink = ClosedPipe {
            written: Vec::new(),
            capacity: 4,
        };
        let err = client
            .query("m", &[Message::user("hi")], &mut sink)
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::OutputError(_)));
        assert_eq!(sink.written, b"fits");

        let err: qory_core::Error = err.into();
        assert!(matches!(err, qory_core::Error::Io(_)));
    }

    #[tokio::test]
    async fn test_query_empty_response() {
        let provider = Arc::new(ScriptedProvider::new(vec![finished()]));
        let client = CompletionClient::new(provider);

        let mut out = Vec::new();
        let text = client.query("m", &[Message::user("hi")], &mut out).await.unwrap();
        assert_eq!(text, "");
        assert_eq!(out, b"\n");
    }

    #[tokio::test]
    async fn test_available_models_sorted_and_unique() {
        let mut provider = ScriptedProvider::new(Vec::new());
        provider.models = vec![
            "openai/gpt-4o".to_string(),
            "anthropic/claude".to_string(),
            "openai/gpt-4o".to_string(),
        ];
        let client = CompletionClient::new(Arc::new(provider));

        let models = client.available_models().await.unwrap();
        assert_eq!(models, vec!["anthropic/claude", "openai/gpt-4o"]);
    }
}
