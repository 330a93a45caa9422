//! Request-level entry points: validate, extract, generate, persist.
//!
//! [`format`] is the one-call API. The steps run in a fixed order so that a
//! malformed request is rejected before any file is read or any model is
//! called:
//!
//! 1. validate that there is input (text or documents) and a target shape
//! 2. resolve and extract documents, or take the pasted text
//! 3. resolve the target to template HTML
//! 4. walk the model chain ([`Orchestrator`]), falling back to text-based
//!    synthesis
//! 5. persist the document as `formatted_<millis>.html` (atomic rename)

use crate::config::FormatterConfig;
use crate::error::FormatterError;
use crate::output::{preview, FormatOutput, FormatStats};
use crate::pipeline::extract::{extract_many, FileExtractor, InputFile, TextExtractor};
use crate::pipeline::input;
use crate::pipeline::orchestrate::{GenerationOutcome, GenerationReport, Orchestrator};
use crate::templates;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Desired output shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSpec {
    /// Complete template HTML.
    Html(String),
    /// Id of a built-in template (see [`templates::catalog`]).
    Catalog(String),
    /// Path to a template HTML file.
    File(PathBuf),
    /// Free-text description such as "candidate profile".
    Description(String),
}

/// What to format and how it should look.
#[derive(Debug, Clone, Default)]
pub struct FormatRequest {
    /// Pasted text. Ignored when documents are present.
    pub text: Option<String>,
    /// Local paths or HTTP(S) URLs.
    pub documents: Vec<String>,
    /// Files already on disk under a user-facing name (e.g. uploads).
    pub uploads: Vec<InputFile>,
    pub target: Option<TemplateSpec>,
    /// Values for `{{key}}` / `[KEY]` placeholders, applied before generation.
    pub placeholders: BTreeMap<String, String>,
}

impl FormatRequest {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn from_documents<I, S>(documents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            documents: documents.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_upload(mut self, file: InputFile) -> Self {
        self.uploads.push(file);
        self
    }

    pub fn with_target(mut self, target: TemplateSpec) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_placeholder(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.placeholders.insert(key.into(), value.into());
        self
    }

    fn document_count(&self) -> usize {
        self.documents.len() + self.uploads.len()
    }

    /// Reject requests with no input or no target shape.
    pub fn validate(&self) -> Result<(), FormatterError> {
        let has_text = self.text.as_deref().is_some_and(|t| !t.is_empty());
        if self.document_count() == 0 && !has_text {
            return Err(FormatterError::MissingInput);
        }
        if self.document_count() == 0 && self.text.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(FormatterError::EmptyText);
        }
        let has_target = match &self.target {
            None => false,
            Some(TemplateSpec::Html(h)) => !h.trim().is_empty(),
            Some(TemplateSpec::Description(d)) => !d.trim().is_empty(),
            Some(TemplateSpec::Catalog(id)) => !id.trim().is_empty(),
            Some(TemplateSpec::File(_)) => true,
        };
        if !has_target {
            return Err(FormatterError::MissingTarget);
        }
        Ok(())
    }
}

/// Format a request into an HTML document and persist it.
///
/// # Errors
/// Returns `Err(FormatterError)` only for fatal errors:
/// - no input or no target shape
/// - a missing/unreadable input or template file, or a failed download
/// - the only document could not be extracted
/// - the output file could not be written
///
/// Model failures are never errors: the chain falls back to text-based
/// synthesis and `output.used_fallback` is set.
pub async fn format(
    request: &FormatRequest,
    config: &FormatterConfig,
) -> Result<FormatOutput, FormatterError> {
    let total_start = Instant::now();
    request.validate()?;

    // ── Step 1: Target shape ─────────────────────────────────────────────
    // Resolved before extraction so a bad template id fails fast.
    let template = resolve_template(request)?;

    // ── Step 2: Extraction ───────────────────────────────────────────────
    let extraction_start = Instant::now();
    let extracted = extract_request(request, config).await?;
    let extraction_duration_ms = extraction_start.elapsed().as_millis() as u64;

    let text = extracted.text.trim();
    if text.is_empty() {
        return Err(FormatterError::EmptyText);
    }
    info!(
        "Extracted {} chars from {} document(s) in {}ms",
        text.chars().count(),
        request.document_count(),
        extraction_duration_ms
    );

    // ── Step 3: Generation ───────────────────────────────────────────────
    let report = generate_html(text, &template, config).await;
    let GenerationReport {
        outcome,
        attempts,
        duration_ms: generation_duration_ms,
    } = report;

    let model_used = outcome.model_used().unwrap_or_default().to_string();
    let used_fallback = outcome.used_fallback();
    let html = match outcome {
        GenerationOutcome::Success { html, .. } | GenerationOutcome::FallbackUsed { html } => html,
        GenerationOutcome::Failure { reason } => return Err(FormatterError::Internal(reason)),
    };

    // ── Step 4: Persist ──────────────────────────────────────────────────
    let output_path = persist_html(&html, &config.output_dir).await?;
    let file_name = output_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned());

    let models_tried = attempts
        .iter()
        .map(|a| a.model.as_str())
        .collect::<HashSet<_>>()
        .len();
    let stats = FormatStats {
        documents: request.document_count(),
        documents_extracted: extracted.documents_extracted,
        models_tried,
        model_attempts: attempts.len(),
        html_bytes: html.len(),
        extraction_duration_ms,
        generation_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Formatted with {} in {}ms → {}",
        model_used,
        stats.total_duration_ms,
        output_path.display()
    );

    Ok(FormatOutput {
        html,
        model_used,
        used_fallback,
        extracted_preview: preview(text, config.preview_chars),
        extracted_chars: text.chars().count(),
        file_name,
        output_path: Some(output_path),
        extraction_failures: extracted.failures,
        attempts,
        stats,
    })
}

/// Synchronous wrapper around [`format`].
///
/// Creates a temporary tokio runtime internally.
pub fn format_sync(
    request: &FormatRequest,
    config: &FormatterConfig,
) -> Result<FormatOutput, FormatterError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| FormatterError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(format(request, config))
}

/// Run the model chain (and fallback) on already-extracted text.
///
/// Does not touch the file system.
pub async fn generate_html(
    extracted_text: &str,
    template: &str,
    config: &FormatterConfig,
) -> GenerationReport {
    Orchestrator::from_config(config)
        .run(extracted_text, template)
        .await
}

/// Write `html` to `<dir>/formatted_<unix millis>.html`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn persist_html(html: &str, dir: &Path) -> Result<PathBuf, FormatterError> {
    let write_err = |path: &Path, e: std::io::Error| FormatterError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| write_err(dir, e))?;

    let path = dir.join(format!(
        "formatted_{}.html",
        chrono::Utc::now().timestamp_millis()
    ));
    let tmp_path = path.with_extension("html.tmp");

    tokio::fs::write(&tmp_path, html)
        .await
        .map_err(|e| write_err(&path, e))?;
    tokio::fs::rename(&tmp_path, &path)
        .await
        .map_err(|e| write_err(&path, e))?;

    debug!("Wrote {} bytes to {}", html.len(), path.display());
    Ok(path)
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Template HTML for the request's target, with caller placeholders applied.
fn resolve_template(request: &FormatRequest) -> Result<String, FormatterError> {
    let html = match &request.target {
        Some(TemplateSpec::Html(html)) => html.clone(),
        Some(TemplateSpec::Catalog(id)) => templates::find(id.trim())
            .map(|t| t.html.clone())
            .ok_or_else(|| FormatterError::UnknownTemplate { id: id.clone() })?,
        Some(TemplateSpec::File(path)) => read_template_file(path)?,
        Some(TemplateSpec::Description(d)) => templates::template_for_description(d),
        None => return Err(FormatterError::MissingTarget),
    };
    if html.trim().is_empty() {
        return Err(FormatterError::MissingTarget);
    }
    Ok(templates::fill_placeholders(&html, &request.placeholders))
}

fn read_template_file(path: &Path) -> Result<String, FormatterError> {
    std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => FormatterError::PermissionDenied {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::NotFound => FormatterError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => FormatterError::Internal(format!(
            "could not read template '{}': {e}",
            path.display()
        )),
    })
}

struct Extracted {
    text: String,
    documents_extracted: usize,
    failures: Vec<crate::error::ExtractionError>,
}

/// Pasted text, the text of a single document, or the delimited text of many.
async fn extract_request(
    request: &FormatRequest,
    config: &FormatterConfig,
) -> Result<Extracted, FormatterError> {
    if request.document_count() == 0 {
        return Ok(Extracted {
            text: request.text.clone().unwrap_or_default(),
            documents_extracted: 0,
            failures: Vec::new(),
        });
    }

    // Downloads must stay alive until extraction finishes.
    let resolved = input::resolve_inputs(&request.documents, config.download_timeout_secs).await?;
    let files: Vec<InputFile> = resolved
        .iter()
        .map(|r| r.file.clone())
        .chain(request.uploads.iter().cloned())
        .collect();

    let extractor: Arc<dyn TextExtractor> = config
        .extractor
        .clone()
        .unwrap_or_else(|| Arc::new(FileExtractor::from_env()));
    let progress = config.progress_callback.as_deref();

    if let [file] = files.as_slice() {
        if let Some(cb) = progress {
            cb.on_extraction_start(1);
        }
        let text = extractor.extract(file).await?;
        if let Some(cb) = progress {
            cb.on_file_extracted(1, &file.name, text.chars().count());
        }
        return Ok(Extracted {
            text,
            documents_extracted: 1,
            failures: Vec::new(),
        });
    }

    let combined = extract_many(extractor.as_ref(), &files, progress).await;
    if !combined.failures.is_empty() {
        warn!(
            "{} of {} documents could not be extracted",
            combined.failures.len(),
            files.len()
        );
    }
    Ok(Extracted {
        text: combined.text,
        documents_extracted: combined.extracted,
        failures: combined.failures,
    })
}
