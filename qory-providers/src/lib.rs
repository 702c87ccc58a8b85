//! Completion provider integrations for qory
//!
//! This crate provides the provider abstraction, an OpenAI-compatible HTTP
//! implementation and the [`CompletionClient`] that streams answers to the
//! terminal while collecting them.

pub mod base;
pub mod client;
pub mod openai;

pub use base::{
    translate_message, ChatMessage, CompletionProvider, ProviderError, ProviderEventStream,
    ProviderResult, StreamEvent, Usage,
};
pub use client::CompletionClient;
pub use openai::{OpenAIClient, DEFAULT_API_BASE};
