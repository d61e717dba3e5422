//! Question generation with an ordered provider fallback chain.
//!
//! Providers are tried strictly in order. The first one whose output parses
//! into at least one question wins. When every provider fails the
//! rule-based generator takes over.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{ExamError, ProviderError};
use crate::fallback::{try_in_order, Disposition};
use crate::heuristic::RuleBasedGenerator;
use crate::model::{Difficulty, ExamType, Question};
use crate::parser::parse_response;
use crate::prompt::build_prompt;
use crate::traits::{GenerateRequest, LlmProvider, DEFAULT_SYSTEM_PROMPT};

/// One link of the fallback chain: a configured provider and a model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Provider name (e.g. "gemini").
    pub provider: String,
    /// Model identifier (e.g. "gemini-2.0-flash").
    pub model: String,
}

impl ModelSpec {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
        }
    }
}

impl fmt::Display for ModelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider, self.model)
    }
}

impl FromStr for ModelSpec {
    type Err = String;

    /// Parses `provider/model`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once('/') {
            Some((provider, model)) if !provider.is_empty() && !model.is_empty() => {
                Ok(ModelSpec::new(provider, model))
            }
            _ => Err(format!("expected provider/model, got '{s}'")),
        }
    }
}

/// Fixed sampling parameters sent with every request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 4096,
        }
    }
}

/// Configuration for the generation client.
#[derive(Debug, Clone, Default)]
pub struct GenerationConfig {
    /// Providers to try, in order.
    pub chain: Vec<ModelSpec>,
    pub sampling: SamplingParams,
    /// Upper bound on a single provider call. `None` leaves timeouts to the transport.
    pub attempt_timeout: Option<Duration>,
    /// Optional system prompt override.
    pub system_prompt_override: Option<String>,
}

/// Where a question set came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum QuestionSource {
    Provider { provider: String, model: String },
    Heuristic,
}

impl fmt::Display for QuestionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionSource::Provider { provider, model } => write!(f, "{provider}/{model}"),
            QuestionSource::Heuristic => write!(f, "rule-based generator"),
        }
    }
}

/// Why a single provider attempt failed.
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("provider '{0}' is not configured")]
    UnknownProvider(String),

    #[error(transparent)]
    Provider(ProviderError),

    #[error("{0:#}")]
    Other(anyhow::Error),

    #[error("attempt timed out after {0:?}")]
    TimedOut(Duration),

    #[error("response contained no parseable questions")]
    NoQuestions,
}

impl From<anyhow::Error> for AttemptError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<ProviderError>() {
            Ok(provider_err) => AttemptError::Provider(provider_err),
            Err(other) => AttemptError::Other(other),
        }
    }
}

/// Every provider failure advances the chain.
pub fn classify_attempt(error: &AttemptError) -> Disposition {
    match error {
        AttemptError::Provider(ProviderError::RateLimited { .. })
        | AttemptError::Provider(ProviderError::ModelNotFound(_))
        | AttemptError::Provider(ProviderError::MalformedResponse(_))
        | AttemptError::Provider(ProviderError::NetworkError(_))
        | AttemptError::Provider(ProviderError::Timeout(_))
        | AttemptError::Provider(ProviderError::ApiError { .. })
        | AttemptError::Provider(ProviderError::AuthenticationFailed(_))
        | AttemptError::Other(_)
        | AttemptError::TimedOut(_)
        | AttemptError::UnknownProvider(_)
        | AttemptError::NoQuestions => Disposition::Retryable,
    }
}

/// A failed provider attempt, kept for diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedAttempt {
    pub spec: ModelSpec,
    pub error: String,
}

/// The result of question generation.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    /// At most the requested number of questions, never empty.
    pub questions: Vec<Question>,
    pub source: QuestionSource,
    pub failures: Vec<FailedAttempt>,
}

/// Generates questions through the provider chain with a rule-based fallback.
pub struct GenerationClient {
    providers: HashMap<String, Arc<dyn LlmProvider>>,
    config: GenerationConfig,
    heuristic: RuleBasedGenerator,
}

impl GenerationClient {
    pub fn new(providers: HashMap<String, Arc<dyn LlmProvider>>, config: GenerationConfig) -> Self {
        Self {
            providers,
            config,
            heuristic: RuleBasedGenerator,
        }
    }

    /// A client with no providers; every exam uses the rule-based generator.
    pub fn heuristic_only() -> Self {
        Self::new(HashMap::new(), GenerationConfig::default())
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Names of the configured providers, sorted.
    pub fn provider_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Generate up to `count` questions of `exam_type` about `text`.
    pub async fn generate(
        &self,
        exam_type: ExamType,
        count: usize,
        difficulty: Difficulty,
        text: &str,
    ) -> Result<GenerationOutcome, ExamError> {
        let prompt = build_prompt(exam_type, count, difficulty, text);

        let result = try_in_order(
            self.config.chain.iter().cloned(),
            |spec| self.attempt(spec.clone(), &prompt, exam_type, count),
            classify_attempt,
        )
        .await;

        let (questions, source, failures) = match result {
            Ok(success) => {
                tracing::info!(
                    provider = %success.candidate.provider,
                    model = %success.candidate.model,
                    questions = success.value.len(),
                    "questions generated"
                );
                let source = QuestionSource::Provider {
                    provider: success.candidate.provider,
                    model: success.candidate.model,
                };
                (success.value, source, success.failures)
            }
            Err(failures) => {
                if !self.config.chain.is_empty() {
                    tracing::warn!(
                        attempts = failures.len(),
                        "all providers failed, using rule-based generator"
                    );
                }
                let questions = self.heuristic.generate(text, exam_type, count);
                if questions.is_empty() {
                    return Err(ExamError::GenerationExhausted {
                        attempts: failures.len(),
                    });
                }
                (questions, QuestionSource::Heuristic, failures)
            }
        };

        Ok(GenerationOutcome {
            questions,
            source,
            failures: failures
                .into_iter()
                .map(|f| FailedAttempt {
                    spec: f.candidate,
                    error: f.error.to_string(),
                })
                .collect(),
        })
    }

    async fn attempt(
        &self,
        spec: ModelSpec,
        prompt: &str,
        exam_type: ExamType,
        count: usize,
    ) -> Result<Vec<Question>, AttemptError> {
        let result = self.call_provider(&spec, prompt, exam_type, count).await;
        if let Err(e) = &result {
            tracing::warn!(provider = %spec.provider, model = %spec.model, "attempt failed: {e}");
        }
        result
    }

    async fn call_provider(
        &self,
        spec: &ModelSpec,
        prompt: &str,
        exam_type: ExamType,
        count: usize,
    ) -> Result<Vec<Question>, AttemptError> {
        let provider = self
            .providers
            .get(&spec.provider)
            .ok_or_else(|| AttemptError::UnknownProvider(spec.provider.clone()))?;

        let request = GenerateRequest {
            model: spec.model.clone(),
            prompt: prompt.to_string(),
            system_prompt: Some(
                self.config
                    .system_prompt_override
                    .clone()
                    .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            ),
            max_tokens: self.config.sampling.max_tokens,
            temperature: self.config.sampling.temperature,
        };

        let call = provider.generate(&request);
        let response = match self.config.attempt_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| AttemptError::TimedOut(limit))?,
            None => call.await,
        }?;

        let mut questions = parse_response(&response.content, exam_type);
        if questions.is_empty() {
            return Err(AttemptError::NoQuestions);
        }
        questions.truncate(count);
        tracing::debug!(
            provider = %spec.provider,
            latency_ms = response.latency_ms,
            parsed = questions.len(),
            "provider response parsed"
        );
        Ok(questions)
    }
}

impl fmt::Debug for GenerationClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationClient")
            .field("providers", &self.provider_names())
            .field("config", &self.config)
            .finish()
    }
}
