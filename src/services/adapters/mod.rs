//! Message converters for different API formats
//!
//! This module translates the crate's provider-neutral messages into
//! provider-specific request shapes. Converters are pure functions.

mod ollama_format;

pub use ollama_format::convert_to_ollama_messages;
