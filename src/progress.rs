//! Progress-callback trait for formatting events.
//!
//! Inject an [`Arc<dyn FormatProgressCallback>`] via
//! [`crate::config::FormatterConfigBuilder::progress_callback`] to observe a
//! request as it moves through extraction and the model chain. The CLI
//! drives its spinner from these events; a server could forward them to a
//! channel or a WebSocket instead.
//!
//! # Example
//!
//! ```rust
//! use doc2html::{FormatProgressCallback, FormatterConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct AttemptCounter {
//!     attempts: AtomicUsize,
//! }
//!
//! impl FormatProgressCallback for AttemptCounter {
//!     fn on_model_attempt(&self, model: &str, priority: u32, attempt: u32) {
//!         self.attempts.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("trying {model} (priority {priority}, attempt {attempt})");
//!     }
//! }
//!
//! let counter = Arc::new(AttemptCounter { attempts: AtomicUsize::new(0) });
//!
//! let config = FormatterConfig::builder()
//!     .progress_callback(counter as Arc<dyn FormatProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::error::ProviderErrorKind;
use std::sync::Arc;

/// Called by the formatter as a request is processed.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Events for one request arrive in order; events from
/// concurrent requests may interleave.
pub trait FormatProgressCallback: Send + Sync {
    /// Called once before any document is extracted.
    ///
    /// # Arguments
    /// * `total_files` : number of uploaded documents (0 for raw text)
    fn on_extraction_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// Called when one document has been turned into text.
    fn on_file_extracted(&self, file_num: usize, name: &str, chars: usize) {
        let _ = (file_num, name, chars);
    }

    /// Called when one document could not be read. The request continues.
    fn on_file_error(&self, file_num: usize, name: &str, error: &str) {
        let _ = (file_num, name, error);
    }

    /// Called just before a model is asked to generate.
    ///
    /// # Arguments
    /// * `model`    : model identifier
    /// * `priority` : 1 for the primary model
    /// * `attempt`  : 1 for the first call, 2 for the rate-limit retry
    fn on_model_attempt(&self, model: &str, priority: u32, attempt: u32) {
        let _ = (model, priority, attempt);
    }

    /// Called when an attempt fails, before the chain moves on.
    fn on_model_failed(&self, model: &str, kind: ProviderErrorKind, error: &str) {
        let _ = (model, kind, error);
    }

    /// Called before sleeping ahead of the one-time rate-limit retry.
    fn on_rate_limit_backoff(&self, model: &str, backoff_ms: u64) {
        let _ = (model, backoff_ms);
    }

    /// Called when a model produced the final document.
    fn on_generation_complete(&self, model: &str, html_len: usize) {
        let _ = (model, html_len);
    }

    /// Called when every model failed and the text-based fallback ran.
    fn on_fallback(&self, models_tried: usize) {
        let _ = models_tried;
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgressCallback;

impl FormatProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::FormatterConfig`].
pub type ProgressCallback = Arc<dyn FormatProgressCallback>;
