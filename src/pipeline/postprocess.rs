//! Post-processing: deterministic cleanup of model-generated HTML.
//!
//! Models are told not to wrap their answer in a code fence, and
//! occasionally do anyway (` ```html … ``` ` or a bare ` ``` … ``` `). Only a
//! *leading* fence counts: a response that does not start with one is
//! returned as-is, so fences that legitimately appear inside the document
//! (e.g. a `<pre>` code sample) are never touched.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_LEADING_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^```(?i:html)?\s*").unwrap());

static RE_TRAILING_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*```\s*$").unwrap());

static RE_DOC_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(?:<!doctype\s+html|<html)").unwrap());

static RE_DOC_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</html>\s*$").unwrap());

/// Strip an outer code fence from a model response.
///
/// The response is trimmed first. If it then starts with ` ``` ` (optionally
/// labelled `html`), that opening marker and a closing ` ``` ` at the very
/// end are removed; the content in between is left unchanged.
pub fn clean_html_response(raw: &str) -> String {
    let trimmed = raw.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }
    let without_open = RE_LEADING_FENCE.replace(trimmed, "");
    RE_TRAILING_FENCE.replace(&without_open, "").into_owned()
}

/// `true` when `html` opens with a doctype/`<html>` tag and closes with `</html>`.
pub fn is_html_document(html: &str) -> bool {
    RE_DOC_START.is_match(html) && RE_DOC_END.is_match(html)
}
