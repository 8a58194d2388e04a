//! Settings files and resolved adapter options

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    error::{AdapterError, Result},
    services::retry::RetryPolicy,
};

/// Default Ollama endpoint
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Default per-request budget in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// One configuration layer (global file, project file, environment, CLI).
///
/// Every field is optional so layers can be merged; [`SettingsFile::resolve`]
/// fills in defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsFile {
    /// Server base URL
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "ollamaBaseUrl")]
    pub base_url: Option<String>,

    /// Model identifier, e.g. `llama3.2`
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "ollamaModelId")]
    pub model_id: Option<String>,

    /// Context window override, kept as text as users enter it
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        alias = "ollamaApiOptionsCtxNum"
    )]
    pub api_options_ctx_num: Option<String>,

    /// Per-request timeout in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "requestTimeoutMs")]
    pub timeout_ms: Option<u64>,

    /// Request streamed responses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub streaming_enabled: Option<bool>,

    /// Retry policy for non-streaming requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryPolicy>,
}

impl SettingsFile {
    /// Load a settings layer from a specific path
    ///
    /// A missing file is an empty layer.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|e| AdapterError::ConfigParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        serde_json::from_str(&contents).map_err(|e| AdapterError::ConfigParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Save this layer to a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Read the `OLLAMA_*` environment variables
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a layer from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let timeout_ms = non_empty("OLLAMA_TIMEOUT_MS").and_then(|raw| {
            raw.trim()
                .parse::<u64>()
                .map_err(|_| warn!("Ignoring invalid OLLAMA_TIMEOUT_MS value: {raw}"))
                .ok()
        });

        let streaming_enabled =
            non_empty("OLLAMA_STREAM").and_then(|raw| match raw.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Some(true),
                "0" | "false" | "no" | "off" => Some(false),
                _ => {
                    warn!("Ignoring invalid OLLAMA_STREAM value: {raw}");
                    None
                }
            });

        Self {
            base_url: non_empty("OLLAMA_BASE_URL"),
            model_id: non_empty("OLLAMA_MODEL"),
            api_options_ctx_num: non_empty("OLLAMA_NUM_CTX"),
            timeout_ms,
            streaming_enabled,
            retry: None,
        }
    }

    /// Overlay `other` on top of `self`; fields set in `other` win.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            base_url: other.base_url.or(self.base_url),
            model_id: other.model_id.or(self.model_id),
            api_options_ctx_num: other.api_options_ctx_num.or(self.api_options_ctx_num),
            timeout_ms: other.timeout_ms.or(self.timeout_ms),
            streaming_enabled: other.streaming_enabled.or(self.streaming_enabled),
            retry: other.retry.or(self.retry),
        }
    }

    /// Fill in defaults for every unset field
    #[must_use]
    pub fn resolve(self) -> OllamaOptions {
        OllamaOptions {
            base_url: self
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model_id: self.model_id,
            api_options_ctx_num: self.api_options_ctx_num,
            timeout_ms: self.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS),
            streaming_enabled: self.streaming_enabled.unwrap_or(true),
            retry: self.retry.unwrap_or_default(),
        }
    }
}

/// Options an adapter is constructed with. Immutable for the adapter's lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OllamaOptions {
    pub base_url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_options_ctx_num: Option<String>,

    pub timeout_ms: u64,

    pub streaming_enabled: bool,

    /// Policy for callers wrapping non-streaming calls in `with_retry`.
    /// The adapter itself makes one attempt per call.
    pub retry: RetryPolicy,
}

impl Default for OllamaOptions {
    fn default() -> Self {
        SettingsFile::default().resolve()
    }
}

impl OllamaOptions {
    /// Default options for the given model
    #[must_use]
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: Some(model_id.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_context_window(mut self, ctx_num: impl Into<String>) -> Self {
        self.api_options_ctx_num = Some(ctx_num.into());
        self
    }

    #[must_use]
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    #[must_use]
    pub fn with_streaming(mut self, enabled: bool) -> Self {
        self.streaming_enabled = enabled;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}
