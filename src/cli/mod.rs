//! CLI argument parsing and command routing

use clap::{Parser, Subcommand};

use crate::config::SettingsFile;

/// ollama-chat: chat with a model served by Ollama
#[derive(Debug, Parser)]
#[command(name = "ollama-chat")]
#[command(about = "Stream chat completions from an Ollama server", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Ollama server base URL
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Model identifier, e.g. `llama3.2`
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// Context window override sent as `options.num_ctx`
    #[arg(long, global = true, value_name = "TOKENS")]
    pub num_ctx: Option<String>,

    /// Per-request timeout in milliseconds
    #[arg(long, global = true, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Request a single complete response instead of a stream
    #[arg(long, global = true)]
    pub no_stream: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Send a prompt and print the reply as it streams in
    Chat {
        /// The user message
        prompt: String,

        /// System prompt
        #[arg(short, long, default_value = "You are a helpful assistant.")]
        system: String,
    },

    /// Describe the configured model
    Model,

    /// List models installed on the server
    Models,

    /// Show the resolved configuration
    Config {
        /// Write the command-line overrides to a config file
        #[arg(long)]
        save: bool,

        /// Use global config instead of project config
        #[arg(long, requires = "save")]
        global: bool,
    },
}

impl Cli {
    /// Parse CLI arguments from environment
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Settings layer formed by the command-line flags
    #[must_use]
    pub fn overrides(&self) -> SettingsFile {
        SettingsFile {
            base_url: self.base_url.clone(),
            model_id: self.model.clone(),
            api_options_ctx_num: self.num_ctx.clone(),
            timeout_ms: self.timeout_ms,
            streaming_enabled: self.no_stream.then_some(false),
            retry: None,
        }
    }
}
