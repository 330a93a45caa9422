//! Model fallback chain: try each model in priority order until one answers.
//!
//! ## Policy
//!
//! * Models are attempted strictly in [`ModelChain`] order; no model is
//!   skipped and none is revisited.
//! * A model whose descriptor carries [`RetryPolicy::OnceOnRateLimit`] (by
//!   default only the priority-1 model) gets exactly one extra attempt after
//!   the configured backoff, and only when the failure was a rate limit.
//! * Every other failure (transient, fatal, timeout, empty answer) moves on
//!   to the next model immediately.
//! * When the chain is exhausted, [`crate::pipeline::fallback::synthesize`]
//!   builds the document from the extracted text alone.
//!
//! The walk is an explicit state machine ([`ChainState`]) so each transition
//! is visible in one `match`.
//!
//! The shared [`ModelStatus`] slot is written before every attempt and set
//! to [`FALLBACK_MODEL_ID`] when the fallback runs. It is diagnostic only:
//! callers read [`GenerationOutcome::model_used`] for the authoritative answer.

use crate::config::{FormatterConfig, ModelChain, ModelDescriptor, RetryPolicy};
use crate::error::{ProviderError, ProviderErrorKind};
use crate::pipeline::fallback;
use crate::pipeline::postprocess::clean_html_response;
use crate::progress::{NoopProgressCallback, ProgressCallback};
use crate::prompts::build_generation_prompt;
use crate::provider::{EdgequakeGenerator, TextGenerator};
use crate::status::{ModelStatus, FALLBACK_MODEL_ID};
use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, info, warn};

/// Result of one generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GenerationOutcome {
    /// A model produced the document.
    Success { html: String, model_used: String },
    /// Every model failed; the text-based fallback produced the document.
    FallbackUsed { html: String },
    /// Even the fallback could not produce a document.
    Failure { reason: String },
}

impl GenerationOutcome {
    /// Model that produced the HTML, or [`FALLBACK_MODEL_ID`].
    pub fn model_used(&self) -> Option<&str> {
        match self {
            Self::Success { model_used, .. } => Some(model_used),
            Self::FallbackUsed { .. } => Some(FALLBACK_MODEL_ID),
            Self::Failure { .. } => None,
        }
    }

    pub fn html(&self) -> Option<&str> {
        match self {
            Self::Success { html, .. } | Self::FallbackUsed { html } => Some(html),
            Self::Failure { .. } => None,
        }
    }

    pub fn into_html(self) -> Option<String> {
        match self {
            Self::Success { html, .. } | Self::FallbackUsed { html } => Some(html),
            Self::Failure { .. } => None,
        }
    }

    pub fn used_fallback(&self) -> bool {
        matches!(self, Self::FallbackUsed { .. })
    }
}

/// One provider call made while walking the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub model: String,
    pub priority: u32,
    /// 1 for the first call, 2 for the rate-limit retry.
    pub attempt: u32,
    pub duration_ms: u64,
    /// `None` when this attempt produced the final document.
    pub error: Option<AttemptError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptError {
    pub kind: ProviderErrorKind,
    pub message: String,
}

/// Outcome plus the attempts that led to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationReport {
    pub outcome: GenerationOutcome,
    pub attempts: Vec<AttemptRecord>,
    pub duration_ms: u64,
}

/// Walk position. Terminal states end the loop.
#[derive(Debug)]
enum ChainState {
    /// First call to the model at this chain index.
    Trying(usize),
    /// The one-time rate-limit retry of the model at this index.
    RetryingOnce(usize),
    Succeeded { index: usize, html: String },
    ExhaustedFallback,
}

/// Walks a [`ModelChain`] with one [`TextGenerator`].
pub struct Orchestrator {
    generator: Arc<dyn TextGenerator>,
    chain: ModelChain,
    attempt_timeout: Duration,
    status: Arc<ModelStatus>,
    progress: ProgressCallback,
}

impl Orchestrator {
    /// New orchestrator reporting to the process-wide [`ModelStatus`], with a
    /// 60 s per-attempt timeout and no progress callback.
    pub fn new(generator: Arc<dyn TextGenerator>, chain: ModelChain) -> Self {
        Self {
            generator,
            chain,
            attempt_timeout: Duration::from_secs(60),
            status: ModelStatus::global(),
            progress: Arc::new(NoopProgressCallback),
        }
    }

    /// Orchestrator for a formatter config. Uses the configured generator if
    /// present, otherwise an [`EdgequakeGenerator`] for `provider_name`.
    pub fn from_config(config: &FormatterConfig) -> Self {
        let generator = config
            .generator
            .clone()
            .unwrap_or_else(|| Arc::new(EdgequakeGenerator::from_config(config)));
        let mut orchestrator = Self::new(generator, config.chain.clone())
            .with_timeout(Duration::from_secs(config.api_timeout_secs));
        if let Some(cb) = &config.progress_callback {
            orchestrator = orchestrator.with_progress(Arc::clone(cb));
        }
        orchestrator
    }

    pub fn with_timeout(mut self, attempt_timeout: Duration) -> Self {
        self.attempt_timeout = attempt_timeout;
        self
    }

    /// Report to a private status slot instead of the global one.
    pub fn with_status(mut self, status: Arc<ModelStatus>) -> Self {
        self.status = status;
        self
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = progress;
        self
    }

    pub fn chain(&self) -> &ModelChain {
        &self.chain
    }

    /// Produce an HTML document for `extracted_text` shaped by `template`.
    pub async fn generate(&self, extracted_text: &str, template: &str) -> GenerationOutcome {
        self.run(extracted_text, template).await.outcome
    }

    /// Like [`generate`](Self::generate), also returning every attempt made.
    pub async fn run(&self, extracted_text: &str, template: &str) -> GenerationReport {
        let start = Instant::now();
        let prompt = build_generation_prompt(extracted_text, template);
        let descriptors = self.chain.descriptors();
        let mut attempts: Vec<AttemptRecord> = Vec::new();

        let mut state = if descriptors.is_empty() {
            ChainState::ExhaustedFallback
        } else {
            ChainState::Trying(0)
        };

        let outcome = loop {
            state = match state {
                ChainState::Trying(index) => {
                    self.step(index, false, &prompt, &mut attempts).await
                }
                ChainState::RetryingOnce(index) => {
                    self.step(index, true, &prompt, &mut attempts).await
                }
                ChainState::Succeeded { index, html } => {
                    let model_used = descriptors[index].identifier.clone();
                    info!("Model {} produced {} bytes of HTML", model_used, html.len());
                    self.progress.on_generation_complete(&model_used, html.len());
                    break GenerationOutcome::Success { html, model_used };
                }
                ChainState::ExhaustedFallback => {
                    warn!(
                        "All {} models failed; using text-based fallback",
                        descriptors.len()
                    );
                    self.status.record(FALLBACK_MODEL_ID);
                    self.progress.on_fallback(descriptors.len());
                    break run_fallback(extracted_text, template);
                }
            };
        };

        GenerationReport {
            outcome,
            attempts,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// Call the model at `index` once and pick the next state.
    async fn step(
        &self,
        index: usize,
        retrying: bool,
        prompt: &str,
        attempts: &mut Vec<AttemptRecord>,
    ) -> ChainState {
        let descriptor = &self.chain.descriptors()[index];
        let attempt = if retrying { 2 } else { 1 };

        self.status.record(&descriptor.identifier);
        self.progress
            .on_model_attempt(&descriptor.identifier, descriptor.priority, attempt);
        info!(
            "Trying model {} (priority {}, attempt {})",
            descriptor.identifier, descriptor.priority, attempt
        );

        let attempt_start = Instant::now();
        let result = self.attempt(descriptor, prompt).await;
        let mut record = AttemptRecord {
            model: descriptor.identifier.clone(),
            priority: descriptor.priority,
            attempt,
            duration_ms: attempt_start.elapsed().as_millis() as u64,
            error: None,
        };

        match result {
            Ok(html) => {
                attempts.push(record);
                ChainState::Succeeded { index, html }
            }
            Err(e) => {
                warn!("Model {} failed: {:?}: {}", e.model, e.kind, e.message);
                self.progress.on_model_failed(&e.model, e.kind, &e.message);
                record.error = Some(AttemptError {
                    kind: e.kind,
                    message: e.message.clone(),
                });
                attempts.push(record);
                self.after_failure(index, descriptor, &e, retrying).await
            }
        }
    }

    /// Decide the next state after a failed attempt at `index`.
    async fn after_failure(
        &self,
        index: usize,
        descriptor: &ModelDescriptor,
        error: &ProviderError,
        retrying: bool,
    ) -> ChainState {
        if let RetryPolicy::OnceOnRateLimit { backoff_ms } = descriptor.retry {
            if error.is_rate_limited() && !retrying {
                info!(
                    "Model {} rate limited; retrying once after {}ms",
                    descriptor.identifier, backoff_ms
                );
                self.progress
                    .on_rate_limit_backoff(&descriptor.identifier, backoff_ms);
                sleep(Duration::from_millis(backoff_ms)).await;
                return ChainState::RetryingOnce(index);
            }
        }
        if index + 1 < self.chain.len() {
            ChainState::Trying(index + 1)
        } else {
            ChainState::ExhaustedFallback
        }
    }

    /// One bounded provider call, with the answer cleaned up.
    async fn attempt(&self, descriptor: &ModelDescriptor, prompt: &str) -> Result<String, ProviderError> {
        let model = descriptor.identifier.as_str();
        let raw = match timeout(self.attempt_timeout, self.generator.generate_text(model, prompt)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(ProviderError::transient(
                    model,
                    format!("timed out after {:?}", self.attempt_timeout),
                ))
            }
        };

        let html = clean_html_response(&raw);
        if html.is_empty() {
            return Err(ProviderError::transient(model, "empty response after cleanup"));
        }
        debug!("Model {}: {} raw bytes, {} after cleanup", model, raw.len(), html.len());
        Ok(html)
    }
}

fn run_fallback(extracted_text: &str, template: &str) -> GenerationOutcome {
    match catch_unwind(AssertUnwindSafe(|| fallback::synthesize(extracted_text, template))) {
        Ok(html) => GenerationOutcome::FallbackUsed { html },
        Err(_) => GenerationOutcome::Failure {
            reason: "text-based fallback could not build a document".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Fails every model except `winner`.
    struct OnlyModel {
        winner: &'static str,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TextGenerator for OnlyModel {
        async fn generate_text(&self, model: &str, _prompt: &str) -> Result<String, ProviderError> {
            self.calls.lock().unwrap().push(model.to_string());
            if model == self.winner {
                Ok(format!("```html\n<html><body>{model}</body></html>\n```"))
            } else {
                Err(ProviderError::fatal(model, "unknown model"))
            }
        }
    }

    fn orchestrator(winner: &'static str, ids: &[&str]) -> (Orchestrator, Arc<OnlyModel>, Arc<ModelStatus>) {
        let generator = Arc::new(OnlyModel {
            winner,
            calls: Mutex::new(Vec::new()),
        });
        let status = Arc::new(ModelStatus::new("unset"));
        let chain = ModelChain::from_identifiers(ids.iter().copied(), 1).unwrap();
        let o = Orchestrator::new(generator.clone(), chain).with_status(status.clone());
        (o, generator, status)
    }

    #[tokio::test]
    async fn first_success_wins_and_is_cleaned() {
        let (o, generator, status) = orchestrator("b", &["a", "b", "c"]);
        let outcome = o.generate("text", "").await;
        assert_eq!(
            outcome,
            GenerationOutcome::Success {
                html: "<html><body>b</body></html>".into(),
                model_used: "b".into()
            }
        );
        assert_eq!(*generator.calls.lock().unwrap(), vec!["a", "b"]);
        assert_eq!(status.current(), "b");
    }

    #[tokio::test]
    async fn empty_chain_goes_straight_to_fallback() {
        let (o, generator, status) = orchestrator("x", &[]);
        let report = o.run("HEADING\nbody line", "").await;
        assert!(report.outcome.used_fallback());
        assert!(report.attempts.is_empty());
        assert!(generator.calls.lock().unwrap().is_empty());
        assert_eq!(status.current(), FALLBACK_MODEL_ID);
    }

    #[test]
    fn outcome_accessors() {
        let fallback = GenerationOutcome::FallbackUsed { html: "h".into() };
        assert_eq!(fallback.model_used(), Some(FALLBACK_MODEL_ID));
        assert_eq!(fallback.html(), Some("h"));
        let failure = GenerationOutcome::Failure { reason: "r".into() };
        assert_eq!(failure.model_used(), None);
        assert_eq!(failure.into_html(), None);
    }
}
