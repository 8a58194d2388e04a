//! Ollama chat API types
//!
//! Request and response bodies of `POST /api/chat` and `GET /api/tags`.

use serde::{Deserialize, Serialize};

/// Chat request body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<OllamaMessage>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<ModelOptions>,
}

/// Per-request model options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_ctx: Option<u32>,
}

/// A message in Ollama's chat format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OllamaMessage {
    pub role: String,
    #[serde(default)]
    pub content: String,
    /// Base64 image payloads
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<OllamaToolCall>,
}

impl OllamaMessage {
    #[must_use]
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            images: Vec::new(),
            tool_calls: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OllamaToolCall {
    pub function: OllamaFunctionCall,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OllamaFunctionCall {
    pub name: String,
    pub arguments: serde_json::Value,
}

/// A complete response, or one piece of a streamed response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Server timestamp, kept verbatim; compatible servers vary in format
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<OllamaMessage>,
    #[serde(default)]
    pub done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done_reason: Option<String>,
    /// Input tokens evaluated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_eval_count: Option<u32>,
    /// Output tokens generated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_count: Option<u32>,
    /// Present when the server fails mid-stream
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChatResponse {
    /// Message text, if any
    #[must_use]
    pub fn content(&self) -> Option<&str> {
        self.message.as_ref().map(|m| m.content.as_str())
    }
}

/// `GET /api/tags` body
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TagsResponse {
    #[serde(default)]
    pub models: Vec<TagEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TagEntry {
    pub name: String,
}

/// Error body returned with non-2xx statuses
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_request_omits_unset_options() {
        let request = ChatRequest {
            model: "llama3.2".into(),
            messages: vec![OllamaMessage::new("user", "hi")],
            stream: true,
            options: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "model": "llama3.2",
                "messages": [{"role": "user", "content": "hi"}],
                "stream": true
            })
        );
    }

    #[test]
    fn test_final_piece_parses_counters() {
        let line = r#"{"model":"llama3.2","created_at":"2023-08-04T19:22:45.499127Z","message":{"role":"assistant","content":""},"done":true,"done_reason":"stop","total_duration":4883583458,"prompt_eval_count":26,"eval_count":282}"#;
        let piece: ChatResponse = serde_json::from_str(line).unwrap();
        assert!(piece.done);
        assert_eq!(piece.prompt_eval_count, Some(26));
        assert_eq!(piece.eval_count, Some(282));
        assert_eq!(piece.content(), Some(""));
        assert_eq!(
            piece.created_at.as_deref(),
            Some("2023-08-04T19:22:45.499127Z")
        );
    }

    #[test]
    fn test_loose_timestamps_parse() {
        for created_at in ["", "2024-07-22 20:33:28", "1721680408"] {
            let line = json!({
                "created_at": created_at,
                "message": {"role": "assistant", "content": "hi"},
                "done": false
            });
            let piece: ChatResponse = serde_json::from_value(line).unwrap();
            assert_eq!(piece.content(), Some("hi"));
            assert_eq!(piece.created_at.as_deref(), Some(created_at));
        }
    }

    #[test]
    fn test_error_piece() {
        let piece: ChatResponse = serde_json::from_str(r#"{"error":"model crashed"}"#).unwrap();
        assert_eq!(piece.error.as_deref(), Some("model crashed"));
        assert!(piece.message.is_none());
    }
}
