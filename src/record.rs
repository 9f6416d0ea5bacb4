//! # Call Records and Metric Assembly
//!
//! This module defines [`CallRecord`], the unit of telemetry produced for each
//! completed backend invocation, and [`MetricsBuilder`], which assembles one
//! deterministically from the call inputs, the measured latency, and the
//! token estimator.
//!
//! ## Core Components
//!
//! - **[`CallRecord`]**: An immutable, fully-populated metrics record. Every
//!   field is always present; a failure during assembly produces an error,
//!   never a partial record.
//! - **[`Scorers`]**: Optional injected functions producing the auxiliary
//!   hallucination/cost/quality metrics. When a slot is absent the record
//!   carries the [`DEFAULT_SCORE`] sentinel instead.
//! - **[`MetricsBuilder`]**: The single assembly point enforcing the record
//!   invariants (token sum, non-negative latency, prompt truncation).
//!
//! ## Truncation
//!
//! The stored `prompt` field is truncated to [`PROMPT_STORED_MAX_CHARS`]
//! characters to bound record size. Truncation is lossy and applies only to
//! storage: token estimation always runs on the full untruncated text first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::error::{Result, TelemetryError};
use crate::tokens;

/// Maximum number of characters of the prompt retained in a stored record.
pub const PROMPT_STORED_MAX_CHARS: usize = 200;

/// Sentinel value recorded when no scorer is configured for a slot.
pub const DEFAULT_SCORE: f64 = 0.0;

/// A pluggable scorer: `(prompt, response) -> score`.
///
/// Scores are expected in `[0, 1]` for hallucination/quality and `[0, ∞)` for
/// cost; the builder does not clamp, it records what the scorer returns.
pub type ScorerFn = Arc<dyn Fn(&str, &str) -> f64 + Send + Sync>;

/// Optional scorer slots applied while building a record.
///
/// Each absent slot yields [`DEFAULT_SCORE`] in the corresponding field.
#[derive(Clone, Default)]
pub struct Scorers {
    pub hallucination: Option<ScorerFn>,
    pub cost: Option<ScorerFn>,
    pub quality: Option<ScorerFn>,
}

impl Scorers {
    /// No scorers configured; every score field gets [`DEFAULT_SCORE`].
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_hallucination<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &str) -> f64 + Send + Sync + 'static,
    {
        self.hallucination = Some(Arc::new(f));
        self
    }

    pub fn with_cost<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &str) -> f64 + Send + Sync + 'static,
    {
        self.cost = Some(Arc::new(f));
        self
    }

    pub fn with_quality<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &str) -> f64 + Send + Sync + 'static,
    {
        self.quality = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for Scorers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scorers")
            .field("hallucination", &self.hallucination.is_some())
            .field("cost", &self.cost.is_some())
            .field("quality", &self.quality.is_some())
            .finish()
    }
}

/// Builds a cost scorer from a flat $/1K-tokens rate.
///
/// Uses the same token heuristic as the record itself, so the recorded cost
/// is consistent with the recorded token counts. Prices per 1K tokens mirror
/// how model providers quote them.
pub fn per_token_cost(rate_per_1k: f64) -> ScorerFn {
    Arc::new(move |prompt, response| {
        let total = tokens::estimate(prompt) + tokens::estimate(response);
        (total as f64 / 1000.0) * rate_per_1k
    })
}

/// One structured telemetry entry for a single completed backend invocation.
///
/// Immutable once built. Serializes to a single flat JSON object; timestamps
/// are UTC ISO-8601.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallRecord {
    /// Correlation id for this call, unique per record.
    pub call_id: Uuid,

    /// Instant the call completed, UTC.
    pub timestamp: DateTime<Utc>,

    /// Identifier of the backend variant invoked.
    pub model: String,

    /// The prompt as stored: truncated to [`PROMPT_STORED_MAX_CHARS`] chars.
    pub prompt: String,

    /// The full response text.
    pub response: String,

    /// Estimated tokens in the full (untruncated) prompt.
    pub prompt_tokens: usize,

    /// Estimated tokens in the response.
    pub completion_tokens: usize,

    /// Always `prompt_tokens + completion_tokens`.
    pub total_tokens: usize,

    /// Backend call duration in seconds, rounded to 4 decimal places.
    ///
    /// Measured monotonically around the backend call only; the metric
    /// assembly and sink writes are not included in this interval.
    pub latency_seconds: f64,

    /// Output of the hallucination scorer, or [`DEFAULT_SCORE`].
    pub hallucination_score: f64,

    /// Output of the cost scorer in USD, or [`DEFAULT_SCORE`].
    pub cost_usd: f64,

    /// Output of the quality scorer, or [`DEFAULT_SCORE`].
    pub quality_score: f64,
}

impl CallRecord {
    /// Whether every floating-point field is finite.
    ///
    /// serde_json renders non-finite floats as `null`, which would silently
    /// break the line schema; sinks check this before serializing.
    pub fn has_finite_metrics(&self) -> bool {
        self.latency_seconds.is_finite()
            && self.hallucination_score.is_finite()
            && self.cost_usd.is_finite()
            && self.quality_score.is_finite()
    }
}

/// Assembles [`CallRecord`]s from call inputs, timing, and scorers.
pub struct MetricsBuilder;

impl MetricsBuilder {
    /// Builds a fully-populated record, or fails atomically.
    ///
    /// Fails with [`TelemetryError::InvalidTiming`] if `elapsed_seconds` is
    /// negative or non-finite (zero is valid), and with
    /// [`TelemetryError::InvalidConfig`] if `model` is empty. Token counts
    /// are estimated on the full prompt before the stored copy is truncated.
    pub fn build(
        prompt: &str,
        response: &str,
        model: &str,
        elapsed_seconds: f64,
        scorers: &Scorers,
    ) -> Result<CallRecord> {
        if !elapsed_seconds.is_finite() || elapsed_seconds < 0.0 {
            return Err(TelemetryError::InvalidTiming {
                seconds: elapsed_seconds,
            });
        }
        if model.is_empty() {
            return Err(TelemetryError::InvalidConfig {
                message: "model identifier must be non-empty".to_string(),
            });
        }

        // Estimation first, truncation after: counts reflect the full text.
        let prompt_tokens = tokens::estimate(prompt);
        let completion_tokens = tokens::estimate(response);
        let stored_prompt: String = prompt.chars().take(PROMPT_STORED_MAX_CHARS).collect();

        let apply = |slot: &Option<ScorerFn>| {
            slot.as_ref()
                .map(|f| f(prompt, response))
                .unwrap_or(DEFAULT_SCORE)
        };

        let record = CallRecord {
            call_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            model: model.to_string(),
            prompt: stored_prompt,
            response: response.to_string(),
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
            latency_seconds: round_latency(elapsed_seconds),
            hallucination_score: apply(&scorers.hallucination),
            cost_usd: apply(&scorers.cost),
            quality_score: apply(&scorers.quality),
        };

        debug!(
            call_id = %record.call_id,
            total_tokens = record.total_tokens,
            latency_seconds = record.latency_seconds,
            "call record built"
        );

        Ok(record)
    }
}

fn round_latency(seconds: f64) -> f64 {
    (seconds * 10_000.0).round() / 10_000.0
}
