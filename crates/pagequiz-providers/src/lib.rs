//! pagequiz-providers: generative-text provider integrations.
//!
//! Implements the `LlmProvider` trait for Gemini, Anthropic and
//! OpenAI-compatible APIs, and turns a `pagequiz.toml` into a ready
//! `GenerationClient`.

pub mod anthropic;
pub mod config;
pub mod gemini;
mod http;
pub mod mock;
pub mod openai;

pub use config::{create_provider, load_config, load_config_from, PagequizConfig, ProviderConfig};
pub use pagequiz_core::error::ProviderError;
