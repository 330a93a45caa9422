//! Advisory "what is the system doing right now" diagnostics.
//!
//! [`ModelStatus`] holds the identifier of the model most recently attempted
//! by *any* request in the process. Concurrent requests overwrite each other,
//! so the value is eventually consistent and must never drive a decision.
//! The authoritative per-request answer is
//! [`crate::pipeline::orchestrate::GenerationOutcome::model_used`].

use crate::config::DEFAULT_MODELS;
use arc_swap::ArcSwap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Reported model id when the text-based fallback produced the output.
pub const FALLBACK_MODEL_ID: &str = "text-based-fallback";

static GLOBAL: Lazy<Arc<ModelStatus>> = Lazy::new(|| {
    Arc::new(ModelStatus::new(
        DEFAULT_MODELS.first().copied().unwrap_or(FALLBACK_MODEL_ID),
    ))
});

/// Lock-free single-slot holder for the current model id.
#[derive(Debug)]
pub struct ModelStatus {
    current: ArcSwap<String>,
}

impl ModelStatus {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            current: ArcSwap::from_pointee(initial.into()),
        }
    }

    /// The process-wide instance read by [`current_model`].
    pub fn global() -> Arc<ModelStatus> {
        Arc::clone(&GLOBAL)
    }

    pub fn record(&self, model: &str) {
        self.current.store(Arc::new(model.to_string()));
    }

    pub fn current(&self) -> String {
        self.current.load().as_ref().clone()
    }

    pub fn limits(&self) -> ModelLimitsReport {
        let model = self.current();
        let limits = limits_for(&model);
        ModelLimitsReport { model, limits }
    }
}

/// Published free-tier rate limits for one model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelLimits {
    /// Requests per minute.
    pub rpm: String,
    /// Tokens per minute.
    pub tpm: String,
    /// Requests per day.
    pub rpd: String,
}

impl ModelLimits {
    fn new(rpm: &str, tpm: &str, rpd: &str) -> Self {
        Self {
            rpm: rpm.to_string(),
            tpm: tpm.to_string(),
            rpd: rpd.to_string(),
        }
    }

    /// Placeholder for models missing from the table.
    pub fn unknown() -> Self {
        Self::new("N/A", "N/A", "N/A")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelLimitsReport {
    pub model: String,
    pub limits: ModelLimits,
}

/// Look up the static limits table; unknown ids get [`ModelLimits::unknown`].
pub fn limits_for(model: &str) -> ModelLimits {
    match model {
        "gemini-2.5-flash-lite" => ModelLimits::new("10", "250K", "20"),
        "gemini-2.5-flash" | "gemini-3-flash" => ModelLimits::new("5", "250K", "20"),
        "gemini-robotics-er-1.5-preview" => ModelLimits::new("10", "250K", "20"),
        "gemma-3-12b" | "gemma-3-1b" | "gemma-3-27b" | "gemma-3-2b" | "gemma-3-4b" => {
            ModelLimits::new("30", "15K", "14.4K")
        }
        _ => ModelLimits::unknown(),
    }
}

/// Most recently attempted model id, process-wide.
pub fn current_model() -> String {
    ModelStatus::global().current()
}

/// Limits of [`current_model`].
pub fn model_limits() -> ModelLimitsReport {
    ModelStatus::global().limits()
}
