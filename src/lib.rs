//! ollama-chat: streaming chat adapter for Ollama model servers
//!
//! This library turns a system prompt plus conversation history into a
//! normalized stream of text and token-usage chunks, talking to a local or
//! remote Ollama server over its NDJSON chat API.

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::too_many_lines)]

pub mod cli;
pub mod config;
pub mod error;
pub mod messages;
pub mod services;

// Re-exports for convenience
pub use error::{AdapterError, Result};
pub use services::{ollama::OllamaAdapter, ChatAdapter, ChunkStream, Completion, StreamChunk, Usage};
