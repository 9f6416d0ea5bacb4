//! # LLM Call Telemetry
//!
//! An observability shim that wraps calls to a language-model inference
//! backend and emits structured per-call telemetry: latency, estimated token
//! counts, and pluggable quality/cost scores. Each completed call produces
//! one immutable [`CallRecord`], fanned out to a human-readable console sink
//! and a durable JSON Lines file with size-based rotation.
//!
//! ## Core Concepts
//!
//! - **[`CallRecorder`]**: Orchestrates one logged call: times the backend
//!   with a monotonic clock, builds the record, writes it to every sink.
//! - **[`Backend`]**: The opaque inference function `(prompt) -> response`,
//!   injected by the host. A plain async closure works.
//! - **[`Sink`]**: A record destination. [`ConsoleSink`] prints one summary
//!   line; [`JsonlSink`] appends durable JSON Lines with rotation and
//!   bounded backlog retention. Sinks fail independently: a broken file sink
//!   never blocks the console line, and vice versa.
//! - **[`Scorers`]**: Optional injected `(prompt, response) -> f64` functions
//!   for hallucination, cost, and quality. Absent scorers record a `0.0`
//!   sentinel.
//!
//! Token counts come from a documented heuristic ([`tokens::estimate`]), not
//! a tokenizer; treat them as approximations.
//!
//! ## Getting Started
//!
//! ```rust,no_run
//! use llm_telemetry::{BoxError, CallRecorder};
//!
//! # async fn example() -> llm_telemetry::Result<()> {
//! let recorder = CallRecorder::builder()
//!     .model("mock-llama3.2")
//!     .console()
//!     .jsonl("logs/llm_calls.jsonl")
//!     .build();
//!
//! let backend = |prompt: String| async move {
//!     // Reach a real model here; the recorder only sees text in, text out.
//!     Ok::<_, BoxError>(format!("Mock answer to: {prompt}"))
//! };
//!
//! let outcome = recorder
//!     .record("Explain MLOps in one sentence", &backend)
//!     .await?;
//!
//! println!("{}", outcome.response);
//! assert_eq!(
//!     outcome.record.total_tokens,
//!     outcome.record.prompt_tokens + outcome.record.completion_tokens
//! );
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod jsonl_sink;
pub mod record;
pub mod recorder;
pub mod sink;
pub mod tokens;

// Public re-exports for convenience
pub use clock::CallTimer;
pub use config::{RecorderConfig, RecorderConfigBuilder};
pub use error::{BoxError, Result, TelemetryError};
pub use jsonl_sink::{JsonlSink, DEFAULT_BACKUP_COUNT, DEFAULT_MAX_BYTES};
pub use record::{
    per_token_cost, CallRecord, MetricsBuilder, ScorerFn, Scorers, DEFAULT_SCORE,
    PROMPT_STORED_MAX_CHARS,
};
pub use recorder::{Backend, CallRecorder, CallRecorderBuilder, MockBackend, Recorded};
pub use sink::{ConsoleSink, Sink};
