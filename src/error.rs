//! Error types for the doc2html library.
//!
//! Three error types reflect three distinct failure modes:
//!
//! * [`FormatterError`] (**Fatal**): the request cannot proceed at all
//!   (no input, no output shape, unreadable file, unwritable output).
//!   Returned as `Err(FormatterError)` from the top-level `format*` functions.
//!
//! * [`ExtractionError`] (**Per-file**): one document could not be turned
//!   into text. A single-document request surfaces it as
//!   [`FormatterError::Extraction`]; a multi-document request inlines an
//!   error marker for that file and carries on.
//!
//! * [`ProviderError`] (**Per-attempt**): one model call failed. Never leaves
//!   the orchestrator; its [`ProviderErrorKind`] only decides between
//!   "retry once" and "move on to the next model".

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the doc2html library.
#[derive(Debug, Error)]
pub enum FormatterError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Neither pasted text nor any document was supplied.
    #[error("Either provide documents or paste text input")]
    MissingInput,

    /// Input was supplied but contained no text after extraction and trimming.
    #[error("No text content provided")]
    EmptyText,

    /// No template, template file, catalog id or format description was given.
    #[error("Either provide an HTML template or describe the output format")]
    MissingTarget,

    /// The requested catalog template does not exist.
    #[error("Unknown template '{id}'\nRun with --list-templates to see available ids.")]
    UnknownTemplate { id: String },

    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// Text extraction failed for the only document in the request.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output HTML file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Text extraction failed for one document.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
#[error("File extraction failed for '{name}': {reason}")]
pub struct ExtractionError {
    /// Original (user-facing) file name.
    pub name: String,
    /// Human-readable cause.
    pub reason: String,
}

impl ExtractionError {
    pub fn new(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// How a failed model call should be treated by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ProviderErrorKind {
    /// HTTP 429 / quota exhausted. Eligible for the one-time retry.
    RateLimited,
    /// Timeouts, 5xx, connection resets.
    Transient,
    /// Bad credentials, unknown model, malformed request, missing configuration.
    Fatal,
}

/// A single failed provider call, tagged with the model that raised it.
#[derive(Debug, Clone, Error)]
#[error("{model}: {kind:?}: {message}")]
pub struct ProviderError {
    pub model: String,
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(model: impl Into<String>, kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            kind,
            message: message.into(),
        }
    }

    pub fn rate_limited(model: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(model, ProviderErrorKind::RateLimited, message)
    }

    pub fn transient(model: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(model, ProviderErrorKind::Transient, message)
    }

    pub fn fatal(model: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(model, ProviderErrorKind::Fatal, message)
    }

    pub fn is_rate_limited(&self) -> bool {
        self.kind == ProviderErrorKind::RateLimited
    }
}
