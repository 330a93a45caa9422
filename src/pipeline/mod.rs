//! Pipeline stages for document-to-HTML formatting.
//!
//! Each submodule implements exactly one step and is testable on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ orchestrate ──▶ postprocess
//! (URL/path)  (text)    (model chain)    (cleanup)
//!                            │
//!                            └──▶ fallback (all models failed)
//! ```
//!
//! 1. [`input`]        canonicalise user-supplied paths or URLs to local files
//! 2. [`extract`]      PDF / DOCX / spreadsheet / text to plain text; blocking
//!    backends run in `spawn_blocking`
//! 3. [`orchestrate`]  walk the model chain with the primary-only
//!    rate-limit retry; the only stage with network I/O
//! 4. [`postprocess`]  strip a wrapping code fence from model output
//! 5. [`fallback`]     template filling or freeform rendering without a model

pub mod extract;
pub mod fallback;
pub mod input;
pub mod orchestrate;
pub mod postprocess;
