//! Configuration management for ollama-chat
//!
//! Implements a hierarchical configuration system:
//! 1. Global config (`<config dir>/ollama-chat/config.json`)
//! 2. Project config (`./.ollama-chat.json`)
//! 3. Environment variables (`OLLAMA_*`)
//! 4. CLI parameters (highest priority)

pub mod models;
pub mod settings;

use std::path::{Path, PathBuf};

pub use self::{
    models::{ModelDescriptor, ModelInfo, DEFAULT_CONTEXT_WINDOW},
    settings::{OllamaOptions, SettingsFile, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_MS},
};
use crate::error::Result;

/// Configuration files on disk
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Global configuration
    pub global: SettingsFile,

    /// Project-specific configuration
    pub project: SettingsFile,
}

impl Config {
    /// Load configuration from the default global and project paths
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::global_config_path(), &Self::project_config_path())
    }

    /// Load configuration from explicit paths
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed
    pub fn load_from(global_path: &Path, project_path: &Path) -> Result<Self> {
        let global = SettingsFile::load_from_path(global_path)?;
        let project = SettingsFile::load_from_path(project_path)?;

        Ok(Self { global, project })
    }

    /// Get the configuration directory path
    #[must_use]
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ollama-chat")
    }

    /// Get the global config file path
    #[must_use]
    pub fn global_config_path() -> PathBuf {
        Self::config_dir().join("config.json")
    }

    /// Get the project config file path in the current directory
    #[must_use]
    pub fn project_config_path() -> PathBuf {
        PathBuf::from(".ollama-chat.json")
    }

    /// Files merged in priority order (project over global)
    #[must_use]
    pub fn file_layers(&self) -> SettingsFile {
        self.global.clone().merge(self.project.clone())
    }

    /// Resolve options from files, the given environment layer, then CLI overrides
    #[must_use]
    pub fn resolve(&self, env: SettingsFile, overrides: SettingsFile) -> OllamaOptions {
        self.file_layers().merge(env).merge(overrides).resolve()
    }
}
