//! Service layer for model-server integrations
//!
//! - [`ollama`]: the Ollama chat adapter
//! - [`transport`]: HTTP transport the adapter drives
//! - [`adapters`]: message format converters
//! - [`streaming`]: response normalization
//! - [`retry`]: retry policy for non-streaming calls

pub mod adapters;
pub mod ollama;
pub mod retry;
pub mod streaming;
pub mod transport;
pub mod wire;

use std::pin::Pin;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};

use crate::{config::models::ModelDescriptor, error::Result, messages::Message};

/// Token usage statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl Usage {
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}

/// One normalized unit of a model response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamChunk {
    /// Text fragment
    Text { text: String },

    /// Token counters reported by the server
    Usage(Usage),
}

impl StreamChunk {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    #[must_use]
    pub const fn usage(input_tokens: u32, output_tokens: u32) -> Self {
        Self::Usage(Usage {
            input_tokens,
            output_tokens,
        })
    }
}

/// Lazy, finite stream of chunks for a single call
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamChunk>> + Send>>;

/// Text and usage accumulated from a [`ChunkStream`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    /// Sum of every usage chunk seen, `None` if the server reported none
    pub usage: Option<Usage>,
}

impl Completion {
    /// Fold one chunk into the running totals
    pub fn push(&mut self, chunk: &StreamChunk) {
        match chunk {
            StreamChunk::Text { text } => self.text.push_str(text),
            StreamChunk::Usage(usage) => {
                let total = self.usage.get_or_insert_with(Usage::default);
                total.input_tokens = total.input_tokens.saturating_add(usage.input_tokens);
                total.output_tokens = total.output_tokens.saturating_add(usage.output_tokens);
            }
        }
    }

    /// Drain a stream to completion
    ///
    /// # Errors
    ///
    /// Returns the first error the stream yields
    pub async fn collect(mut stream: ChunkStream) -> Result<Self> {
        let mut completion = Self::default();
        while let Some(chunk) = stream.next().await {
            completion.push(&chunk?);
        }
        Ok(completion)
    }
}

/// Core trait for chat adapters
///
/// An adapter turns a system prompt plus conversation history into a
/// normalized chunk stream, and describes the model it talks to.
#[async_trait]
pub trait ChatAdapter: Send + Sync {
    /// Get the provider name (e.g., "ollama")
    fn provider(&self) -> &str;

    /// Send a chat request and stream back normalized chunks
    async fn create_message(
        &self,
        system_prompt: &str,
        messages: &[Message],
    ) -> Result<ChunkStream>;

    /// Describe the configured model
    fn get_model(&self) -> ModelDescriptor;
}

#[cfg(test)]
mod tests {
    use futures::stream;
    use serde_json::json;

    use super::*;
    use crate::error::AdapterError;

    #[test]
    fn test_chunk_wire_shape() {
        assert_eq!(
            serde_json::to_value(StreamChunk::text("hi")).unwrap(),
            json!({"type": "text", "text": "hi"})
        );
        assert_eq!(
            serde_json::to_value(StreamChunk::usage(5, 3)).unwrap(),
            json!({"type": "usage", "inputTokens": 5, "outputTokens": 3})
        );
    }

    #[tokio::test]
    async fn test_completion_accumulates() {
        let chunks: ChunkStream = Box::pin(stream::iter(vec![
            Ok(StreamChunk::text("Hel")),
            Ok(StreamChunk::text("lo")),
            Ok(StreamChunk::usage(10, 2)),
            Ok(StreamChunk::usage(0, 1)),
        ]));

        let completion = Completion::collect(chunks).await.unwrap();
        assert_eq!(completion.text, "Hello");
        assert_eq!(
            completion.usage,
            Some(Usage {
                input_tokens: 10,
                output_tokens: 3
            })
        );
        assert_eq!(completion.usage.unwrap().total(), 13);
    }

    #[tokio::test]
    async fn test_completion_surfaces_errors() {
        let chunks: ChunkStream = Box::pin(stream::iter(vec![
            Ok(StreamChunk::text("partial")),
            Err(AdapterError::StreamProcessing("reset".into())),
        ]));

        let err = Completion::collect(chunks).await.unwrap_err();
        assert!(matches!(err, AdapterError::StreamProcessing(_)));
    }
}
