//! Configuration types for document-to-HTML formatting.
//!
//! All formatting behaviour is controlled through [`FormatterConfig`], built
//! via its [`FormatterConfigBuilder`]. The model fallback chain lives here as
//! an explicit policy object ([`ModelChain`]) rather than as an inline list in
//! the orchestrator, so the "retry once, only on the primary model" rule is a
//! field that tests can inspect and callers can change.

use crate::error::FormatterError;
use crate::pipeline::extract::TextExtractor;
use crate::progress::ProgressCallback;
use crate::provider::TextGenerator;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default model identifiers, cheapest/fastest first.
pub const DEFAULT_MODELS: &[&str] = &[
    "gemini-2.5-flash-lite",
    "gemini-2.5-flash",
    "gemini-3-flash",
    "gemini-robotics-er-1.5-preview",
    "gemma-3-12b",
    "gemma-3-1b",
    "gemma-3-27b",
    "gemma-3-2b",
    "gemma-3-4b",
];

/// Backoff before the one-time retry of a rate-limited primary model.
pub const DEFAULT_RATE_LIMIT_BACKOFF_MS: u64 = 2000;

// ── Model chain ──────────────────────────────────────────────────────────

/// What to do when a model call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// Move straight on to the next model. (default)
    #[default]
    None,
    /// On a rate-limit error, wait `backoff_ms` and retry this model exactly once.
    OnceOnRateLimit { backoff_ms: u64 },
}

/// One entry of the fallback chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub identifier: String,
    /// 1 = tried first.
    pub priority: u32,
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl ModelDescriptor {
    pub fn new(identifier: impl Into<String>, priority: u32) -> Self {
        Self {
            identifier: identifier.into(),
            priority,
            retry: RetryPolicy::None,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Priority-ordered, validated sequence of [`ModelDescriptor`]s.
///
/// Invariants (checked by [`ModelChain::new`]): priorities strictly increase
/// along the sequence and identifiers are unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelChain {
    descriptors: Vec<ModelDescriptor>,
}

impl ModelChain {
    pub fn new(descriptors: Vec<ModelDescriptor>) -> Result<Self, FormatterError> {
        let mut seen = HashSet::new();
        for pair in descriptors.windows(2) {
            if pair[1].priority <= pair[0].priority {
                return Err(FormatterError::InvalidConfig(format!(
                    "model priorities must strictly increase: '{}' ({}) is followed by '{}' ({})",
                    pair[0].identifier, pair[0].priority, pair[1].identifier, pair[1].priority
                )));
            }
        }
        for d in &descriptors {
            if d.identifier.trim().is_empty() {
                return Err(FormatterError::InvalidConfig(
                    "model identifier must not be empty".into(),
                ));
            }
            if !seen.insert(d.identifier.as_str()) {
                return Err(FormatterError::InvalidConfig(format!(
                    "duplicate model identifier '{}'",
                    d.identifier
                )));
            }
        }
        Ok(Self { descriptors })
    }

    /// Build a chain from bare identifiers: priorities 1..=n, and the
    /// priority-1 model gets a one-time rate-limit retry after `backoff_ms`.
    pub fn from_identifiers<I, S>(ids: I, backoff_ms: u64) -> Result<Self, FormatterError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let descriptors = ids
            .into_iter()
            .enumerate()
            .map(|(i, id)| {
                let d = ModelDescriptor::new(id, i as u32 + 1);
                if i == 0 {
                    d.with_retry(RetryPolicy::OnceOnRateLimit { backoff_ms })
                } else {
                    d
                }
            })
            .collect();
        Self::new(descriptors)
    }

    pub fn descriptors(&self) -> &[ModelDescriptor] {
        &self.descriptors
    }

    pub fn first(&self) -> Option<&ModelDescriptor> {
        self.descriptors.first()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl Default for ModelChain {
    fn default() -> Self {
        let descriptors = DEFAULT_MODELS
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let d = ModelDescriptor::new(*id, i as u32 + 1);
                if i == 0 {
                    d.with_retry(RetryPolicy::OnceOnRateLimit {
                        backoff_ms: DEFAULT_RATE_LIMIT_BACKOFF_MS,
                    })
                } else {
                    d
                }
            })
            .collect();
        Self { descriptors }
    }
}

// ── Formatter config ─────────────────────────────────────────────────────

/// Configuration for a formatting request.
///
/// Built via [`FormatterConfig::builder()`] or using
/// [`FormatterConfig::default()`].
///
/// # Example
/// ```rust
/// use doc2html::FormatterConfig;
///
/// let config = FormatterConfig::builder()
///     .models(["gemini-2.5-flash", "gemma-3-27b"])
///     .api_timeout_secs(30)
///     .build()
///     .unwrap();
/// assert_eq!(config.chain.len(), 2);
/// ```
#[derive(Clone)]
pub struct FormatterConfig {
    /// Ordered fallback chain. Default: the Gemini/Gemma chain in [`DEFAULT_MODELS`].
    pub chain: ModelChain,

    /// edgequake-llm provider name used to build one provider per model. Default: "gemini".
    pub provider_name: String,

    /// Pre-constructed generator. Takes precedence over `provider_name`.
    pub generator: Option<Arc<dyn TextGenerator>>,

    /// Pre-constructed extractor. Default: [`crate::pipeline::extract::FileExtractor`].
    pub extractor: Option<Arc<dyn TextExtractor>>,

    /// Sampling temperature. Default: 0.2.
    ///
    /// Low enough that the model reorganises rather than embellishes the
    /// extracted content.
    pub temperature: f32,

    /// Maximum tokens generated per attempt. Default: 8192.
    ///
    /// A full HTML document with an embedded stylesheet routinely exceeds
    /// 4 000 tokens; truncation leaves an unterminated `</html>`.
    pub max_tokens: usize,

    /// Per-attempt provider timeout in seconds. Default: 60.
    ///
    /// A timed-out attempt is treated as a transient failure and the chain
    /// moves on to the next model.
    pub api_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Directory generated files are written to. Default: `outputs`.
    pub output_dir: PathBuf,

    /// Number of extracted characters echoed back in the summary. Default: 500.
    pub preview_chars: usize,

    /// Optional progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            chain: ModelChain::default(),
            provider_name: "gemini".to_string(),
            generator: None,
            extractor: None,
            temperature: 0.2,
            max_tokens: 8192,
            api_timeout_secs: 60,
            download_timeout_secs: 120,
            output_dir: PathBuf::from("outputs"),
            preview_chars: 500,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for FormatterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatterConfig")
            .field("chain", &self.chain)
            .field("provider_name", &self.provider_name)
            .field("generator", &self.generator.as_ref().map(|_| "<dyn TextGenerator>"))
            .field("extractor", &self.extractor.as_ref().map(|_| "<dyn TextExtractor>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("output_dir", &self.output_dir)
            .field("preview_chars", &self.preview_chars)
            .finish()
    }
}

impl FormatterConfig {
    /// Create a new builder for `FormatterConfig`.
    pub fn builder() -> FormatterConfigBuilder {
        FormatterConfigBuilder {
            config: Self::default(),
            models: None,
            backoff_ms: DEFAULT_RATE_LIMIT_BACKOFF_MS,
        }
    }
}

/// Builder for [`FormatterConfig`].
pub struct FormatterConfigBuilder {
    config: FormatterConfig,
    models: Option<Vec<String>>,
    backoff_ms: u64,
}

impl fmt::Debug for FormatterConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatterConfigBuilder")
            .field("config", &self.config)
            .field("models", &self.models)
            .field("backoff_ms", &self.backoff_ms)
            .finish()
    }
}

impl FormatterConfigBuilder {
    /// Replace the chain with these identifiers, in priority order.
    pub fn models<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.models = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    /// Replace the chain wholesale.
    pub fn chain(mut self, chain: ModelChain) -> Self {
        self.config.chain = chain;
        self.models = None;
        self
    }

    /// Backoff before the primary model's one-time rate-limit retry.
    pub fn rate_limit_backoff_ms(mut self, ms: u64) -> Self {
        self.backoff_ms = ms;
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = name.into();
        self
    }

    pub fn generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.config.generator = Some(generator);
        self
    }

    pub fn extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.config.extractor = Some(extractor);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn preview_chars(mut self, n: usize) -> Self {
        self.config.preview_chars = n;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(mut self) -> Result<FormatterConfig, FormatterError> {
        if let Some(ids) = self.models.take() {
            self.config.chain = ModelChain::from_identifiers(ids, self.backoff_ms)?;
        } else if self.backoff_ms != DEFAULT_RATE_LIMIT_BACKOFF_MS {
            // Re-apply a custom backoff to whichever descriptors retry.
            let descriptors = self
                .config
                .chain
                .descriptors()
                .iter()
                .cloned()
                .map(|d| match d.retry {
                    RetryPolicy::OnceOnRateLimit { .. } => d.with_retry(RetryPolicy::OnceOnRateLimit {
                        backoff_ms: self.backoff_ms,
                    }),
                    RetryPolicy::None => d,
                })
                .collect();
            self.config.chain = ModelChain::new(descriptors)?;
        }

        let c = &self.config;
        if c.provider_name.trim().is_empty() && c.generator.is_none() {
            return Err(FormatterError::InvalidConfig(
                "provider name must not be empty".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(FormatterError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(FormatterError::InvalidConfig(
                "max tokens must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}
