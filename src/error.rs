//! Error types for ollama-chat

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using [`AdapterError`]
pub type Result<T> = std::result::Result<T, AdapterError>;

/// Main error type for ollama-chat
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Adapter is missing required configuration (e.g. model id)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Model server could not be reached
    #[error("Cannot connect to Ollama at {host} ({code}). Is the Ollama server running?")]
    Connectivity { host: String, code: String },

    /// Model server rejected the request
    #[error("Ollama API error (status {}): {message}", status_label(.status))]
    Api { status: Option<u16>, message: String },

    /// Request did not settle within the configured budget
    #[error("Ollama request timed out after {} seconds", format_seconds(.timeout_ms))]
    Timeout { timeout_ms: u64 },

    /// Failure after the response stream started
    #[error("Error processing Ollama stream: {0}")]
    StreamProcessing(String),

    /// Operation cancelled before completion
    #[error("Operation cancelled")]
    Cancelled,

    /// Configuration parse error
    #[error("Failed to parse config at {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client error outside of a chat request (e.g. client construction)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AdapterError {
    /// Whether repeating the same request could succeed.
    ///
    /// A timeout has already spent the call's budget and is final.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connectivity { .. } => true,
            Self::Api { status, .. } => {
                matches!(status, Some(408 | 429) | Some(500..=599))
            }
            _ => false,
        }
    }
}

fn status_label(status: &Option<u16>) -> String {
    status.map_or_else(|| "unknown".to_string(), |s| s.to_string())
}

/// Render a millisecond budget as seconds, dropping a trailing `.0`.
#[allow(clippy::cast_precision_loss, clippy::trivially_copy_pass_by_ref)]
fn format_seconds(ms: &u64) -> String {
    format!("{}", *ms as f64 / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_states_seconds() {
        let err = AdapterError::Timeout { timeout_ms: 30_000 };
        assert_eq!(err.to_string(), "Ollama request timed out after 30 seconds");

        let err = AdapterError::Timeout { timeout_ms: 1_500 };
        assert_eq!(err.to_string(), "Ollama request timed out after 1.5 seconds");
    }

    #[test]
    fn test_api_error_unknown_status() {
        let err = AdapterError::Api {
            status: None,
            message: "boom".into(),
        };
        assert_eq!(err.to_string(), "Ollama API error (status unknown): boom");

        let err = AdapterError::Api {
            status: Some(404),
            message: "model not found".into(),
        };
        assert!(err.to_string().contains("status 404"));
    }

    #[test]
    fn test_connectivity_names_host_and_code() {
        let err = AdapterError::Connectivity {
            host: "http://localhost:11434".into(),
            code: "ECONNREFUSED".into(),
        };
        let text = err.to_string();
        assert!(text.contains("http://localhost:11434"));
        assert!(text.contains("ECONNREFUSED"));
    }

    #[test]
    fn test_retryable_classes() {
        assert!(!AdapterError::Timeout { timeout_ms: 1 }.is_retryable());
        assert!(AdapterError::Connectivity {
            host: "h".into(),
            code: "c".into()
        }
        .is_retryable());
        assert!(AdapterError::Api {
            status: Some(503),
            message: String::new()
        }
        .is_retryable());
        assert!(!AdapterError::Api {
            status: Some(400),
            message: String::new()
        }
        .is_retryable());
        assert!(!AdapterError::Configuration("x".into()).is_retryable());
        assert!(!AdapterError::StreamProcessing("x".into()).is_retryable());
    }
}
