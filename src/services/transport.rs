//! HTTP transport for the Ollama chat API
//!
//! Each adapter owns its own [`HttpTransport`] and therefore its own
//! `reqwest::Client`. The client is built without request or read timeouts;
//! the adapter's deadline is the only time limit applied to a call.

use std::{io, pin::Pin};

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::{Client, Response};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{
    streaming::NdjsonParser,
    wire::{ChatRequest, ChatResponse, ErrorBody, TagsResponse},
};
use crate::error::Result;

/// Partial responses of a streamed chat call
pub type PieceStream =
    Pin<Box<dyn Stream<Item = std::result::Result<ChatResponse, TransportError>> + Send>>;

/// Failures reported by a transport, before the adapter classifies them
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection could not be established or was lost
    #[error("{message}")]
    Connect { code: String, message: String },

    /// Non-success HTTP status
    #[error("HTTP {}: {message}", .status.map_or_else(String::new, |s| s.to_string()))]
    Status { status: Option<u16>, message: String },

    /// Server reported an error inside a response body
    #[error("{0}")]
    Server(String),

    /// Response body could not be decoded
    #[error("invalid response: {0}")]
    Decode(String),

    /// Cancelled through the call's token
    #[error("request cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            return Self::Connect {
                code: connect_code(&err),
                message: err.to_string(),
            };
        }
        if let Some(status) = err.status() {
            return Self::Status {
                status: Some(status.as_u16()),
                message: err.to_string(),
            };
        }
        if err.is_decode() || err.is_body() {
            return Self::Decode(err.to_string());
        }
        if let Some(code) = io_code_in_chain(&err) {
            return Self::Connect {
                code: code.to_string(),
                message: err.to_string(),
            };
        }
        Self::Other(err.to_string())
    }
}

/// Errno-style code for a connection failure, e.g. `ECONNREFUSED`
fn connect_code(err: &reqwest::Error) -> String {
    if let Some(code) = io_code_in_chain(err) {
        return code.to_string();
    }
    if err.is_timeout() {
        return "ETIMEDOUT".to_string();
    }

    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        if inner.to_string().to_lowercase().contains("dns error") {
            return "ENOTFOUND".to_string();
        }
        source = inner.source();
    }
    "ECONNECT".to_string()
}

fn io_code_in_chain(err: &reqwest::Error) -> Option<&'static str> {
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        if let Some(io_err) = inner.downcast_ref::<io::Error>() {
            if let Some(code) = io_error_code(io_err.kind()) {
                return Some(code);
            }
        }
        source = inner.source();
    }
    None
}

fn io_error_code(kind: io::ErrorKind) -> Option<&'static str> {
    match kind {
        io::ErrorKind::ConnectionRefused => Some("ECONNREFUSED"),
        io::ErrorKind::ConnectionReset => Some("ECONNRESET"),
        io::ErrorKind::ConnectionAborted => Some("ECONNABORTED"),
        io::ErrorKind::NotConnected => Some("ENOTCONN"),
        io::ErrorKind::AddrNotAvailable => Some("EADDRNOTAVAIL"),
        io::ErrorKind::BrokenPipe => Some("EPIPE"),
        io::ErrorKind::TimedOut => Some("ETIMEDOUT"),
        _ => None,
    }
}

/// Transport contract the adapter relies on
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Server the transport talks to (used in error messages)
    fn base_url(&self) -> &str;

    /// Send a chat request and wait for the complete response
    async fn chat(
        &self,
        request: ChatRequest,
        cancel: CancellationToken,
    ) -> std::result::Result<ChatResponse, TransportError>;

    /// Send a chat request and return its partial responses as they arrive
    async fn chat_stream(
        &self,
        request: ChatRequest,
        cancel: CancellationToken,
    ) -> std::result::Result<PieceStream, TransportError>;

    /// Names of the models installed on the server
    async fn list_models(
        &self,
        cancel: CancellationToken,
    ) -> std::result::Result<Vec<String>, TransportError>;
}

/// `reqwest`-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    /// Create a transport with its own HTTP client
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("ollama-chat/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn post_chat(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
    ) -> std::result::Result<Response, TransportError> {
        let url = self.endpoint("api/chat");
        debug!(
            "POST {} (model: {}, stream: {})",
            url, request.model, request.stream
        );

        let send = self.client.post(&url).json(request).send();
        let response = tokio::select! {
            () = cancel.cancelled() => return Err(TransportError::Cancelled),
            result = send => result?,
        };

        Self::check_status(response).await
    }

    async fn check_status(response: Response) -> std::result::Result<Response, TransportError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ErrorBody>(&body) {
            Ok(parsed) => parsed.error,
            Err(_) if body.trim().is_empty() => status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string(),
            Err(_) => body,
        };

        Err(TransportError::Status {
            status: Some(status.as_u16()),
            message,
        })
    }
}

/// Decode one NDJSON line into a response piece
fn parse_piece(line: &str) -> std::result::Result<ChatResponse, TransportError> {
    let mut piece: ChatResponse = serde_json::from_str(line)
        .map_err(|e| TransportError::Decode(format!("{e} in line: {line}")))?;
    if let Some(message) = piece.error.take() {
        return Err(TransportError::Server(message));
    }
    Ok(piece)
}

#[async_trait]
impl ChatTransport for HttpTransport {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn chat(
        &self,
        request: ChatRequest,
        cancel: CancellationToken,
    ) -> std::result::Result<ChatResponse, TransportError> {
        let response = self.post_chat(&request, &cancel).await?;

        let body = tokio::select! {
            () = cancel.cancelled() => return Err(TransportError::Cancelled),
            body = response.text() => body?,
        };

        parse_piece(body.trim())
    }

    async fn chat_stream(
        &self,
        request: ChatRequest,
        cancel: CancellationToken,
    ) -> std::result::Result<PieceStream, TransportError> {
        let response = self.post_chat(&request, &cancel).await?;
        let byte_stream = response.bytes_stream();

        let stream = async_stream::stream! {
            let mut parser = NdjsonParser::new();
            let mut byte_stream = Box::pin(byte_stream);

            loop {
                let next = tokio::select! {
                    () = cancel.cancelled() => None,
                    item = byte_stream.next() => Some(item),
                };

                let Some(item) = next else {
                    yield Err(TransportError::Cancelled);
                    break;
                };

                match item {
                    Some(Ok(bytes)) => match parser.parse_chunk(&bytes) {
                        Ok(lines) => {
                            for line in lines {
                                yield parse_piece(&line);
                            }
                        }
                        Err(e) => {
                            yield Err(TransportError::Decode(format!("invalid UTF-8 in stream: {e}")));
                            break;
                        }
                    },
                    Some(Err(e)) => {
                        yield Err(TransportError::from(e));
                        break;
                    }
                    None => {
                        match parser.flush() {
                            Ok(Some(line)) => {
                                yield parse_piece(&line);
                            }
                            Ok(None) => {}
                            Err(e) => {
                                yield Err(TransportError::Decode(format!("invalid UTF-8 in stream: {e}")));
                            }
                        }
                        break;
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }

    async fn list_models(
        &self,
        cancel: CancellationToken,
    ) -> std::result::Result<Vec<String>, TransportError> {
        let url = self.endpoint("api/tags");
        debug!("GET {}", url);

        let fetch = async {
            let response = self.client.get(&url).send().await?;
            let response = Self::check_status(response).await?;
            response
                .json::<TagsResponse>()
                .await
                .map_err(|e| TransportError::Decode(e.to_string()))
        };
        let tags = tokio::select! {
            () = cancel.cancelled() => return Err(TransportError::Cancelled),
            tags = fetch => tags?,
        };

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_endpoint_joins_paths() {
        let transport = HttpTransport::new("http://localhost:11434/").unwrap();
        assert_eq!(
            transport.endpoint("api/chat"),
            "http://localhost:11434/api/chat"
        );

        let transport = HttpTransport::new("http://gpu-box:8080").unwrap();
        assert_eq!(transport.endpoint("api/tags"), "http://gpu-box:8080/api/tags");
    }

    #[test]
    fn test_parse_piece() {
        let piece = parse_piece(r#"{"message":{"role":"assistant","content":"a"},"done":false}"#)
            .unwrap();
        assert_eq!(piece.content(), Some("a"));

        let err = parse_piece(r#"{"error":"out of memory"}"#).unwrap_err();
        assert!(matches!(err, TransportError::Server(ref m) if m == "out of memory"));

        let err = parse_piece("{not json").unwrap_err();
        assert!(matches!(err, TransportError::Decode(_)));
    }

    #[test]
    fn test_io_error_codes() {
        assert_eq!(
            io_error_code(io::ErrorKind::ConnectionRefused),
            Some("ECONNREFUSED")
        );
        assert_eq!(io_error_code(io::ErrorKind::ConnectionReset), Some("ECONNRESET"));
        assert_eq!(io_error_code(io::ErrorKind::NotFound), None);
    }

    #[tokio::test]
    async fn test_refused_connection_is_classified() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let transport = HttpTransport::new(format!("http://127.0.0.1:{port}")).unwrap();
        let err = transport
            .list_models(CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Connect { .. }), "got {err:?}");
    }
}
