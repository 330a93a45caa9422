//! Generative-text provider boundary.
//!
//! The orchestrator only needs one capability from a provider: "given a model
//! id and a prompt, return text or a classified error". [`TextGenerator`] is
//! that seam. [`EdgequakeGenerator`] implements it on top of
//! `edgequake_llm::ProviderFactory`, building one provider per model id so a
//! single chain can walk several models of the same vendor.
//!
//! Tests substitute scripted generators through
//! [`crate::config::FormatterConfigBuilder::generator`].

use crate::config::FormatterConfig;
use crate::error::{ProviderError, ProviderErrorKind};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ProviderFactory};
use tracing::debug;

/// Anything that can turn `(model, prompt)` into generated text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate_text(&self, model: &str, prompt: &str) -> Result<String, ProviderError>;
}

/// [`TextGenerator`] backed by an edgequake-llm provider family.
#[derive(Debug, Clone)]
pub struct EdgequakeGenerator {
    provider_name: String,
    temperature: f32,
    max_tokens: usize,
}

impl EdgequakeGenerator {
    pub fn new(provider_name: impl Into<String>) -> Self {
        Self {
            provider_name: provider_name.into(),
            temperature: 0.2,
            max_tokens: 8192,
        }
    }

    pub fn from_config(config: &FormatterConfig) -> Self {
        Self {
            provider_name: config.provider_name.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    fn build_options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        }
    }
}

#[async_trait]
impl TextGenerator for EdgequakeGenerator {
    async fn generate_text(&self, model: &str, prompt: &str) -> Result<String, ProviderError> {
        // A missing or malformed credential fails here, once per model, and
        // the chain treats it like any other fatal attempt.
        let provider = ProviderFactory::create_llm_provider(&self.provider_name, model)
            .map_err(|e| {
                ProviderError::fatal(
                    model,
                    format!("provider '{}' is not configured: {e}", self.provider_name),
                )
            })?;

        let messages = vec![ChatMessage::user(prompt)];
        let options = self.build_options();

        let response = provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| classify(model, &e.to_string()))?;

        debug!(
            "{}: {} input tokens, {} output tokens",
            model, response.prompt_tokens, response.completion_tokens
        );

        if response.content.trim().is_empty() {
            return Err(ProviderError::transient(model, "empty response"));
        }
        Ok(response.content)
    }
}

/// Classify a provider error message.
///
/// Vendors disagree on error shapes, so classification works on the rendered
/// message: status codes and the phrases Gemini, OpenAI and Anthropic use for
/// throttling and outages.
pub fn classify(model: &str, message: &str) -> ProviderError {
    ProviderError::new(model, classify_kind(message), message)
}

fn classify_kind(message: &str) -> ProviderErrorKind {
    let m = message.to_lowercase();

    const RATE_LIMITED: &[&str] = &[
        "429",
        "rate limit",
        "rate-limit",
        "ratelimit",
        "too many requests",
        "resource_exhausted",
        "resource exhausted",
        "quota",
    ];
    const TRANSIENT: &[&str] = &[
        "timeout",
        "timed out",
        "500",
        "502",
        "503",
        "504",
        "unavailable",
        "overloaded",
        "connection",
        "network",
    ];

    if RATE_LIMITED.iter().any(|p| m.contains(p)) {
        ProviderErrorKind::RateLimited
    } else if TRANSIENT.iter().any(|p| m.contains(p)) {
        ProviderErrorKind::Transient
    } else {
        ProviderErrorKind::Fatal
    }
}
