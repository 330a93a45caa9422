//! Result types returned by the formatting entry points.

use crate::error::ExtractionError;
use crate::pipeline::orchestrate::AttemptRecord;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Outcome of one formatting request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatOutput {
    /// The generated HTML document.
    pub html: String,
    /// Model that produced `html`, or `text-based-fallback`.
    pub model_used: String,
    /// `true` when every model failed and the text-based fallback ran.
    pub used_fallback: bool,
    /// First characters of the extracted text, with `...` when truncated.
    pub extracted_preview: String,
    /// Character count of the full extracted text.
    pub extracted_chars: usize,
    /// File name of the persisted document inside the output directory.
    pub file_name: Option<String>,
    /// Full path of the persisted document.
    pub output_path: Option<PathBuf>,
    /// Documents that could not be extracted (multi-document requests only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extraction_failures: Vec<ExtractionError>,
    /// Every model call made, in order.
    pub attempts: Vec<AttemptRecord>,
    pub stats: FormatStats,
}

/// Timing and counts for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatStats {
    /// Documents supplied (0 for pasted text).
    pub documents: usize,
    /// Documents whose text was extracted.
    pub documents_extracted: usize,
    /// Distinct models called.
    pub models_tried: usize,
    /// Provider calls made, retries included.
    pub model_attempts: usize,
    pub html_bytes: usize,
    pub extraction_duration_ms: u64,
    pub generation_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// First `max_chars` characters of `text`, with `...` appended when cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}
