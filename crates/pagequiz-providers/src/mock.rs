//! Mock provider for testing.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use pagequiz_core::error::ProviderError;
use pagequiz_core::traits::{GenerateRequest, GenerateResponse, LlmProvider, ModelInfo};

/// One scripted reply.
#[derive(Debug)]
pub enum MockOutcome {
    Respond(String),
    Fail(ProviderError),
}

/// A mock provider for exercising generation without real API calls.
///
/// Scripted outcomes are consumed one per call. Once the script runs out,
/// responses are chosen by prompt-substring matching, then the default.
pub struct MockProvider {
    script: Mutex<VecDeque<MockOutcome>>,
    /// Map of prompt substring → response text.
    responses: HashMap<String, String>,
    default_response: String,
    call_count: AtomicU32,
    last_request: Mutex<Option<GenerateRequest>>,
}

impl MockProvider {
    /// Create a mock provider with the given prompt→response mappings.
    pub fn new(responses: HashMap<String, String>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            responses,
            default_response: String::new(),
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Create a mock that always returns the same response.
    pub fn with_fixed_response(response: &str) -> Self {
        Self {
            default_response: response.to_string(),
            ..Self::new(HashMap::new())
        }
    }

    /// Create a mock that plays `outcomes` in order.
    pub fn with_script(outcomes: Vec<MockOutcome>) -> Self {
        Self {
            script: Mutex::new(outcomes.into()),
            ..Self::new(HashMap::new())
        }
    }

    /// Create a mock whose first `calls` calls fail with `error()`.
    pub fn failing(error: fn() -> ProviderError, calls: usize) -> Self {
        Self::with_script((0..calls).map(|_| MockOutcome::Fail(error())).collect())
    }

    /// Get the number of calls made to this provider.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Get the last request made to this provider.
    pub fn last_request(&self) -> Option<GenerateRequest> {
        self.last_request
            .lock()
            .ok()
            .and_then(|last| last.clone())
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(request.clone());
        }

        let scripted = self.script.lock().ok().and_then(|mut s| s.pop_front());
        let content = match scripted {
            Some(MockOutcome::Fail(error)) => return Err(error.into()),
            Some(MockOutcome::Respond(content)) => content,
            None => self
                .responses
                .iter()
                .find(|(key, _)| request.prompt.contains(key.as_str()))
                .map(|(_, v)| v.clone())
                .unwrap_or_else(|| self.default_response.clone()),
        };

        Ok(GenerateResponse {
            content,
            model: request.model.clone(),
            latency_ms: 1,
        })
    }

    fn available_models(&self) -> Vec<ModelInfo> {
        vec![ModelInfo {
            id: "mock-model".into(),
            name: "Mock Model".into(),
            provider: "mock".into(),
            max_context: 100_000,
        }]
    }
}
