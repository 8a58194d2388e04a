//! Model metadata and descriptors

use serde::{Deserialize, Serialize};

/// Context window assumed when no override is configured
pub const DEFAULT_CONTEXT_WINDOW: u32 = 128_000;

/// Metadata describing a model's limits and pricing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    /// Maximum output tokens (`None` means the server decides)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Context window size
    pub context_window: u32,

    pub supports_images: bool,

    pub supports_prompt_cache: bool,

    /// Price per million input tokens
    pub input_price: f64,

    /// Price per million output tokens
    pub output_price: f64,
}

impl Default for ModelInfo {
    fn default() -> Self {
        Self {
            max_tokens: None,
            context_window: DEFAULT_CONTEXT_WINDOW,
            supports_images: true,
            supports_prompt_cache: false,
            input_price: 0.0,
            output_price: 0.0,
        }
    }
}

impl ModelInfo {
    /// Default metadata with the context window replaced by `override_value`
    /// when it parses to a positive integer.
    #[must_use]
    pub fn with_context_override(override_value: Option<&str>) -> Self {
        let mut info = Self::default();
        if let Some(window) = override_value.and_then(parse_context_window) {
            info.context_window = window;
        }
        info
    }
}

/// Parse a context-size override. Returns `None` unless the value is a positive integer.
#[must_use]
pub fn parse_context_window(value: &str) -> Option<u32> {
    value.trim().parse::<u32>().ok().filter(|n| *n > 0)
}

/// Resolved model id plus its metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub id: String,
    pub info: ModelInfo,
}
