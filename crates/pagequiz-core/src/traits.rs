//! Collaborator trait definitions: the document being examined and the
//! generative-text providers that write questions about it.
//!
//! Providers are implemented by the `pagequiz-providers` crate. Documents are
//! supplied by the host; [`crate::document::TextDocument`] is the in-memory
//! implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Document trait
// ---------------------------------------------------------------------------

/// An entry of a document's structural outline (bookmarks, table of contents).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineEntry {
    pub title: String,
    /// Opaque destination, resolved through [`Document::resolve_destination`].
    pub destination: String,
}

/// A paginated text document. Page numbers are 1-based.
#[async_trait]
pub trait Document: Send + Sync {
    /// Number of pages.
    async fn page_count(&self) -> anyhow::Result<u32>;

    /// Plain text of one page.
    async fn page_text(&self, page: u32) -> anyhow::Result<String>;

    /// The structural outline, if the document carries one.
    async fn outline(&self) -> anyhow::Result<Option<Vec<OutlineEntry>>>;

    /// Resolve an outline destination to a page number.
    async fn resolve_destination(&self, destination: &str) -> anyhow::Result<Option<u32>>;
}

// ---------------------------------------------------------------------------
// LLM Provider trait
// ---------------------------------------------------------------------------

/// Trait for generative-text backends that write exam questions.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g. "gemini").
    fn name(&self) -> &str;

    /// Generate text from a prompt.
    ///
    /// Failures should be [`crate::error::ProviderError`] values wrapped in
    /// `anyhow::Error` so callers can classify them.
    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse>;

    /// List well-known models for this provider.
    fn available_models(&self) -> Vec<ModelInfo>;
}

/// Request to generate text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// Model identifier (e.g. "gemini-2.0-flash").
    pub model: String,
    /// The main prompt.
    pub prompt: String,
    /// Optional system prompt override.
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
}

/// Response from a generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    /// The raw response text.
    pub content: String,
    /// Model that actually generated the response.
    pub model: String,
    /// Latency in milliseconds.
    pub latency_ms: u64,
}

/// Information about an available model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model identifier.
    pub id: String,
    /// Human-readable model name.
    pub name: String,
    /// Provider name.
    pub provider: String,
    /// Maximum context window size in tokens.
    pub max_context: u32,
}

/// Default system prompt for question generation.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an exam writer. Respond ONLY with the questions in the exact plain-text format requested. Do not use markdown, headings, or any commentary before or after the questions.";
