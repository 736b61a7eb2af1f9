//! Prompt classification and the Ollama streaming relay.

pub mod ollama;
pub mod prompt;
pub mod stream;
