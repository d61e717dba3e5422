//! Provider configuration and factory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use pagequiz_core::generation::{GenerationClient, GenerationConfig, ModelSpec, SamplingParams};
use pagequiz_core::traits::LlmProvider;

use crate::anthropic::AnthropicProvider;
use crate::gemini::GeminiProvider;
use crate::openai::OpenAiProvider;

const LOCAL_CONFIG: &str = "pagequiz.toml";

/// Configuration for a single provider.
///
/// Note: Custom Debug impl masks API keys to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    OpenAI {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        org_id: Option<String>,
    },
    Anthropic {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
    },
    Gemini {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
    },
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::OpenAI {
                api_key: _,
                base_url,
                org_id,
            } => f
                .debug_struct("OpenAI")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .field("org_id", org_id)
                .finish(),
            ProviderConfig::Anthropic {
                api_key: _,
                base_url,
            } => f
                .debug_struct("Anthropic")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .finish(),
            ProviderConfig::Gemini {
                api_key: _,
                base_url,
            } => f
                .debug_struct("Gemini")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .finish(),
        }
    }
}

impl ProviderConfig {
    fn api_key(&self) -> &str {
        match self {
            ProviderConfig::OpenAI { api_key, .. }
            | ProviderConfig::Anthropic { api_key, .. }
            | ProviderConfig::Gemini { api_key, .. } => api_key,
        }
    }

    fn api_key_mut(&mut self) -> &mut String {
        match self {
            ProviderConfig::OpenAI { api_key, .. }
            | ProviderConfig::Anthropic { api_key, .. }
            | ProviderConfig::Gemini { api_key, .. } => api_key,
        }
    }

    /// The model used when the chain is derived from the configured providers.
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderConfig::OpenAI { .. } => "gpt-4.1-mini",
            ProviderConfig::Anthropic { .. } => "claude-sonnet-4-20250514",
            ProviderConfig::Gemini { .. } => "gemini-2.0-flash",
        }
    }
}

/// Top-level pagequiz configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagequizConfig {
    /// Provider configurations keyed by name.
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    /// `provider/model` entries tried in order.
    #[serde(default)]
    pub fallback_chain: Vec<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Upper bound on one provider call; unset leaves it to the HTTP timeout.
    #[serde(default)]
    pub attempt_timeout_secs: Option<u64>,
}

fn default_temperature() -> f64 {
    SamplingParams::default().temperature
}
fn default_max_tokens() -> u32 {
    SamplingParams::default().max_tokens
}

impl Default for PagequizConfig {
    fn default() -> Self {
        Self {
            providers: HashMap::new(),
            fallback_chain: Vec::new(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            attempt_timeout_secs: None,
        }
    }
}

/// Providers in the order a derived chain tries them.
const DERIVED_CHAIN_ORDER: [&str; 3] = ["gemini", "anthropic", "openai"];

impl PagequizConfig {
    /// The fallback chain, or one entry per configured provider when none is set.
    pub fn chain(&self) -> Result<Vec<ModelSpec>> {
        if !self.fallback_chain.is_empty() {
            return self
                .fallback_chain
                .iter()
                .map(|entry| {
                    entry
                        .parse::<ModelSpec>()
                        .map_err(anyhow::Error::msg)
                        .with_context(|| format!("invalid fallback_chain entry '{entry}'"))
                })
                .collect();
        }

        let mut names: Vec<&String> = self.providers.keys().collect();
        names.sort_by_key(|name| {
            let rank = DERIVED_CHAIN_ORDER
                .iter()
                .position(|n| *n == name.as_str())
                .unwrap_or(DERIVED_CHAIN_ORDER.len());
            (rank, (*name).clone())
        });
        Ok(names
            .into_iter()
            .filter_map(|name| {
                self.providers
                    .get(name)
                    .map(|p| ModelSpec::new(name.clone(), p.default_model()))
            })
            .collect())
    }

    pub fn generation_config(&self) -> Result<GenerationConfig> {
        Ok(GenerationConfig {
            chain: self.chain()?,
            sampling: SamplingParams {
                temperature: self.temperature,
                max_tokens: self.max_tokens,
            },
            attempt_timeout: self.attempt_timeout_secs.map(Duration::from_secs),
            system_prompt_override: None,
        })
    }

    /// Instantiate every usable provider and wrap them in a [`GenerationClient`].
    ///
    /// Providers whose API key is empty are skipped; chain entries naming
    /// them fail over like any other unconfigured provider.
    pub fn build_client(&self) -> Result<GenerationClient> {
        let mut providers: HashMap<String, Arc<dyn LlmProvider>> = HashMap::new();
        for (name, config) in &self.providers {
            if config.api_key().trim().is_empty() {
                tracing::warn!(provider = %name, "skipping provider with empty API key");
                continue;
            }
            providers.insert(name.clone(), Arc::from(create_provider(name, config)?));
        }
        Ok(GenerationClient::new(providers, self.generation_config()?))
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    expand_vars(s, |name| std::env::var(name).ok())
}

/// Substitute `${NAME}` references once each. Unknown names expand to nothing;
/// substituted values are never rescanned.
fn expand_vars(s: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start + 2..].find('}') else {
            break;
        };
        result.push_str(&rest[..start]);
        result.push_str(&lookup(&rest[start + 2..start + 2 + len]).unwrap_or_default());
        rest = &rest[start + 2 + len + 1..];
    }
    result.push_str(rest);
    result
}

/// Resolve env vars in a provider config.
fn resolve_provider_config(config: &ProviderConfig) -> ProviderConfig {
    match config {
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => ProviderConfig::OpenAI {
            api_key: resolve_env_vars(api_key),
            base_url: base_url.as_ref().map(|u| resolve_env_vars(u)),
            org_id: org_id.as_ref().map(|o| resolve_env_vars(o)),
        },
        ProviderConfig::Anthropic { api_key, base_url } => ProviderConfig::Anthropic {
            api_key: resolve_env_vars(api_key),
            base_url: base_url.as_ref().map(|u| resolve_env_vars(u)),
        },
        ProviderConfig::Gemini { api_key, base_url } => ProviderConfig::Gemini {
            api_key: resolve_env_vars(api_key),
            base_url: base_url.as_ref().map(|u| resolve_env_vars(u)),
        },
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `pagequiz.toml` in the current directory
/// 2. `~/.config/pagequiz/config.toml`
///
/// Environment variable overrides: `PAGEQUIZ_GEMINI_KEY`,
/// `PAGEQUIZ_ANTHROPIC_KEY`, `PAGEQUIZ_OPENAI_KEY`.
pub fn load_config() -> Result<PagequizConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<PagequizConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from(LOCAL_CONFIG);
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config");
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<PagequizConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => PagequizConfig::default(),
    };

    apply_env_overrides(&mut config, |var| std::env::var(var).ok());

    // Resolve env vars in all provider configs
    config.providers = config
        .providers
        .iter()
        .map(|(k, v)| (k.clone(), resolve_provider_config(v)))
        .collect();

    Ok(config)
}

/// Set API keys from `PAGEQUIZ_<PROVIDER>_KEY`, adding the provider if absent.
fn apply_env_overrides(config: &mut PagequizConfig, lookup: impl Fn(&str) -> Option<String>) {
    let overrides: [(&str, &str, fn() -> ProviderConfig); 3] = [
        ("PAGEQUIZ_GEMINI_KEY", "gemini", || ProviderConfig::Gemini {
            api_key: String::new(),
            base_url: None,
        }),
        ("PAGEQUIZ_ANTHROPIC_KEY", "anthropic", || {
            ProviderConfig::Anthropic {
                api_key: String::new(),
                base_url: None,
            }
        }),
        ("PAGEQUIZ_OPENAI_KEY", "openai", || ProviderConfig::OpenAI {
            api_key: String::new(),
            base_url: None,
            org_id: None,
        }),
    ];

    for (var, name, empty) in overrides {
        if let Some(key) = lookup(var) {
            *config
                .providers
                .entry(name.to_string())
                .or_insert_with(empty)
                .api_key_mut() = key;
        }
    }
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("pagequiz"))
}

/// Create a provider instance from its configuration.
pub fn create_provider(name: &str, config: &ProviderConfig) -> Result<Box<dyn LlmProvider>> {
    tracing::debug!(provider = %name, ?config, "creating provider");
    match config {
        ProviderConfig::Anthropic { api_key, base_url } => {
            Ok(Box::new(AnthropicProvider::new(api_key, base_url.clone())))
        }
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => Ok(Box::new(OpenAiProvider::new(
            api_key,
            base_url.clone(),
            org_id.clone(),
        ))),
        ProviderConfig::Gemini { api_key, base_url } => {
            Ok(Box::new(GeminiProvider::new(api_key, base_url.clone())))
        }
    }
}
