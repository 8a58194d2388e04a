//! Ollama chat adapter
//!
//! Sends a system prompt plus conversation history to `POST /api/chat` and
//! streams the reply back as normalized [`StreamChunk`](super::StreamChunk)s.
//!
//! Every call races the request against `timeout_ms`. When the deadline wins
//! the request is cancelled, not just abandoned: the request future is dropped
//! and the call's [`CancellationToken`] fires so the transport stops reading.
//!
//! Each call is a single attempt. Callers that want retries wrap
//! [`ChatAdapter::create_message`] in [`with_retry`](super::retry::with_retry).

use std::{
    future::Future,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use futures::stream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    config::{
        models::{parse_context_window, ModelDescriptor, ModelInfo},
        OllamaOptions,
    },
    error::{AdapterError, Result},
    messages::Message,
};

use super::{
    adapters::convert_to_ollama_messages,
    streaming::{normalize_stream, piece_chunks},
    transport::{ChatTransport, HttpTransport, TransportError},
    wire::{ChatRequest, ModelOptions, OllamaMessage},
    ChatAdapter, ChunkStream,
};

/// Ollama chat adapter
pub struct OllamaAdapter {
    transport: Arc<dyn ChatTransport>,
    options: OllamaOptions,
    /// Parent of every in-flight call's token; replaced by [`Self::abort_all`]
    calls: Mutex<CancellationToken>,
}

impl std::fmt::Debug for OllamaAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OllamaAdapter")
            .field("base_url", &self.transport.base_url())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl OllamaAdapter {
    /// Create an adapter with its own HTTP transport
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built
    pub fn new(options: OllamaOptions) -> Result<Self> {
        let transport = HttpTransport::new(options.base_url.clone())?;
        Ok(Self::with_transport(options, Arc::new(transport)))
    }

    /// Create an adapter over an existing transport
    #[must_use]
    pub fn with_transport(options: OllamaOptions, transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            transport,
            options,
            calls: Mutex::new(CancellationToken::new()),
        }
    }

    /// Options this adapter was built with
    #[must_use]
    pub fn options(&self) -> &OllamaOptions {
        &self.options
    }

    /// Cancel every call currently in flight. Later calls are unaffected.
    pub fn abort_all(&self) {
        let previous = {
            let mut calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *calls, CancellationToken::new())
        };
        info!("Aborting in-flight Ollama requests");
        previous.cancel();
    }

    /// Names of the models installed on the server
    ///
    /// # Errors
    ///
    /// Fails with the same classification as [`ChatAdapter::create_message`]
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let cancel = self.call_token();
        self.within_deadline(self.transport.list_models(cancel.clone()), &cancel)
            .await
    }

    fn call_token(&self) -> CancellationToken {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .child_token()
    }

    fn model_id(&self) -> Result<&str> {
        self.options
            .model_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                AdapterError::Configuration("Ollama model ID is not configured".to_string())
            })
    }

    fn build_request(&self, model: &str, system_prompt: &str, messages: &[Message]) -> ChatRequest {
        let mut wire_messages = Vec::with_capacity(messages.len() + 1);
        wire_messages.push(OllamaMessage::new("system", system_prompt));
        wire_messages.extend(convert_to_ollama_messages(messages));

        let options = self
            .options
            .api_options_ctx_num
            .as_deref()
            .and_then(parse_context_window)
            .map(|num_ctx| ModelOptions {
                num_ctx: Some(num_ctx),
            });

        ChatRequest {
            model: model.to_string(),
            messages: wire_messages,
            stream: self.options.streaming_enabled,
            options,
        }
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(self.options.timeout_ms)
    }

    /// Race `request` against the deadline, cancelling `cancel` if it loses
    async fn within_deadline<T, F>(&self, request: F, cancel: &CancellationToken) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, TransportError>>,
    {
        match tokio::time::timeout(self.timeout(), request).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => {
                let err = self.classify(err);
                warn!("Ollama request failed: {err}");
                Err(err)
            }
            Err(_) => {
                cancel.cancel();
                warn!(
                    "Ollama request to {} timed out after {}ms",
                    self.transport.base_url(),
                    self.options.timeout_ms
                );
                Err(AdapterError::Timeout {
                    timeout_ms: self.options.timeout_ms,
                })
            }
        }
    }

    /// Map a transport failure onto the adapter's error taxonomy
    fn classify(&self, err: TransportError) -> AdapterError {
        match err {
            TransportError::Connect { code, .. } => AdapterError::Connectivity {
                host: self.transport.base_url().to_string(),
                code,
            },
            TransportError::Status { status, message } => AdapterError::Api { status, message },
            TransportError::Server(message) | TransportError::Other(message) => {
                AdapterError::Api {
                    status: None,
                    message,
                }
            }
            TransportError::Decode(message) => AdapterError::StreamProcessing(message),
            TransportError::Cancelled => AdapterError::Cancelled,
        }
    }

    async fn create_streaming(&self, request: ChatRequest) -> Result<ChunkStream> {
        let cancel = self.call_token();
        let pieces = self
            .within_deadline(self.transport.chat_stream(request, cancel.clone()), &cancel)
            .await?;

        debug!("Ollama stream established");
        Ok(normalize_stream(pieces, cancel))
    }

    async fn create_single(&self, request: ChatRequest) -> Result<ChunkStream> {
        let cancel = self.call_token();
        let response = self
            .within_deadline(self.transport.chat(request, cancel.clone()), &cancel)
            .await?;

        let chunks = piece_chunks(&response);
        debug!("Ollama response received ({} chunks)", chunks.len());
        Ok(Box::pin(stream::iter(chunks.into_iter().map(Ok))))
    }
}

#[async_trait]
impl ChatAdapter for OllamaAdapter {
    fn provider(&self) -> &str {
        "ollama"
    }

    async fn create_message(
        &self,
        system_prompt: &str,
        messages: &[Message],
    ) -> Result<ChunkStream> {
        let model_id = self.model_id()?;
        let request = self.build_request(model_id, system_prompt, messages);

        info!(
            "Connecting to Ollama at {} (model: {}, stream: {})",
            self.transport.base_url(),
            model_id,
            request.stream
        );

        if request.stream {
            self.create_streaming(request).await
        } else {
            self.create_single(request).await
        }
    }

    fn get_model(&self) -> ModelDescriptor {
        ModelDescriptor {
            id: self.options.model_id.clone().unwrap_or_default(),
            info: ModelInfo::with_context_override(self.options.api_options_ctx_num.as_deref()),
        }
    }
}
