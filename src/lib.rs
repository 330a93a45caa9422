//! # doc2html
//!
//! Turn unstructured documents (PDF, Word, spreadsheets, plain text) into a
//! polished HTML document shaped by a template or a short format description.
//!
//! Generation is delegated to a chain of generative models tried in
//! priority order. When every model fails the crate still answers: a
//! text-based fallback fills the template from cues in the text (or lays the
//! text out by inferred sections), so a request with valid input always
//! produces a document.
//!
//! ## Pipeline Overview
//!
//! ```text
//! documents / text
//!  │
//!  ├─ 1. Input    resolve local files or download URLs
//!  ├─ 2. Extract  pdfium / docx / calamine / UTF-8 (spawn_blocking)
//!  ├─ 3. Target   template HTML, catalog id, template file or description
//!  ├─ 4. Chain    gemini-2.5-flash-lite → … → gemma-3-4b
//!  │              (primary retries once after a rate limit)
//!  ├─ 5. Fallback text-based synthesis when every model failed
//!  └─ 6. Output   formatted_<millis>.html + summary
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use doc2html::{format, FormatRequest, FormatterConfig, TemplateSpec};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider credentials come from GEMINI_API_KEY
//!     let config = FormatterConfig::default();
//!     let request = FormatRequest::from_documents(["report.pdf"])
//!         .with_target(TemplateSpec::Catalog("professional-report".into()));
//!     let output = format(&request, &config).await?;
//!     eprintln!("model: {}  file: {:?}", output.model_used, output.file_name);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `doc2html` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! doc2html = { version = "0.1", default-features = false }
//! ```
//!
//! ## Diagnostics
//!
//! [`current_model`] reports the model most recently attempted by any
//! request in the process, and [`model_limits`] its published rate limits.
//! Both are advisory; the authoritative per-request answer is
//! [`FormatOutput::model_used`].

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod provider;
pub mod status;
pub mod templates;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    FormatterConfig, FormatterConfigBuilder, ModelChain, ModelDescriptor, RetryPolicy,
    DEFAULT_MODELS,
};
pub use convert::{format, format_sync, generate_html, persist_html, FormatRequest, TemplateSpec};
pub use error::{ExtractionError, FormatterError, ProviderError, ProviderErrorKind};
pub use output::{FormatOutput, FormatStats};
pub use pipeline::extract::{FileExtractor, InputFile, TextExtractor};
pub use pipeline::fallback::{infer_sections, synthesize, Section};
pub use pipeline::orchestrate::{GenerationOutcome, GenerationReport, Orchestrator};
pub use progress::{FormatProgressCallback, NoopProgressCallback, ProgressCallback};
pub use provider::{EdgequakeGenerator, TextGenerator};
pub use status::{current_model, model_limits, ModelLimits, ModelStatus, FALLBACK_MODEL_ID};
