//! # Call Recording Orchestration
//!
//! [`CallRecorder`] wraps one backend invocation end to end: it starts a
//! monotonic timer, awaits the injected [`Backend`], builds a [`CallRecord`]
//! from the result, and fans the record out to every configured sink.
//!
//! ## Failure isolation
//!
//! Errors split into two classes:
//!
//! - Errors that prevent a well-formed record from existing (backend failure,
//!   timer contract violation) abort the whole call: `record` returns the
//!   error and **no** telemetry is produced, since there is no record for a
//!   call that never completed.
//! - Errors that occur only while *persisting* an already-valid record are
//!   isolated per sink. Every sink still receives the record, the call still
//!   succeeds, and the failures come back in [`Recorded::diagnostics`]
//!   (mirrored as `tracing::warn!` events, so nothing is silently swallowed).
//!
//! The recorder imposes no timeout on the backend; a host that wants one
//! wraps its backend in `tokio::time::timeout` and the resulting elapsed
//! error is surfaced as [`TelemetryError::BackendTimeout`].

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::clock::CallTimer;
use crate::config::RecorderConfig;
use crate::error::{BoxError, Result, TelemetryError};
use crate::jsonl_sink::JsonlSink;
use crate::record::{CallRecord, MetricsBuilder, Scorers};
use crate::sink::{ConsoleSink, Sink};

/// The opaque inference backend: `prompt -> response text`.
///
/// Injected by the host; this crate has no knowledge of how the backend is
/// reached (local model, remote API, mock). Blanket-implemented for async
/// closures, so a plain function works:
///
/// ```rust
/// use llm_telemetry::BoxError;
///
/// let backend = |prompt: String| async move {
///     Ok::<_, BoxError>(format!("Mock answer to: {prompt}"))
/// };
/// # let _ = backend;
/// ```
#[async_trait]
pub trait Backend: Send + Sync {
    async fn complete(&self, prompt: &str) -> std::result::Result<String, BoxError>;
}

#[async_trait]
impl<F, Fut> Backend for F
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = std::result::Result<String, BoxError>> + Send + 'static,
{
    async fn complete(&self, prompt: &str) -> std::result::Result<String, BoxError> {
        (self)(prompt.to_string()).await
    }
}

/// The outcome of one successfully recorded call.
#[derive(Debug)]
pub struct Recorded {
    /// The backend's response text, returned to the caller unchanged.
    pub response: String,

    /// The telemetry record that was fanned out to the sinks.
    pub record: CallRecord,

    /// Per-sink persistence failures. Empty when every sink accepted the
    /// record; a non-empty list means the record is missing from at least
    /// one destination.
    pub diagnostics: Vec<TelemetryError>,
}

impl Recorded {
    /// Whether every configured sink persisted the record.
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Records telemetry for backend calls.
///
/// Constructed once with its sinks and shared across tasks (`record` takes
/// `&self`); nothing here is global. Concurrent calls each time their own
/// interval and serialize only at the sink boundary.
pub struct CallRecorder {
    model: String,
    scorers: Scorers,
    sinks: Vec<Arc<dyn Sink>>,
}

impl CallRecorder {
    /// Starts building a recorder.
    pub fn builder() -> CallRecorderBuilder {
        CallRecorderBuilder::new()
    }

    /// Builds a recorder from a validated [`RecorderConfig`]: a JSONL sink at
    /// the configured path, plus a console sink unless disabled.
    pub fn from_config(config: &RecorderConfig) -> Result<Self> {
        config.validate()?;

        let mut builder = Self::builder().model(&config.default_model).sink(Arc::new(
            JsonlSink::new(&config.log_path)
                .max_bytes(config.max_bytes)
                .backup_count(config.backup_count),
        ));
        if config.console {
            builder = builder.console();
        }
        Ok(builder.build())
    }

    /// Records one call using the recorder's configured model and scorers.
    pub async fn record(&self, prompt: &str, backend: &dyn Backend) -> Result<Recorded> {
        let model = self.model.clone();
        let scorers = self.scorers.clone();
        self.record_with(prompt, backend, &model, &scorers).await
    }

    /// Records one call with an explicit model identifier and scorer set.
    ///
    /// Steps: start the clock, await the backend (its failure propagates and
    /// produces no telemetry), stop the clock, build the record, then write
    /// it to every sink independently. Latency covers the backend call only.
    pub async fn record_with(
        &self,
        prompt: &str,
        backend: &dyn Backend,
        model: &str,
        scorers: &Scorers,
    ) -> Result<Recorded> {
        let timer = CallTimer::start();
        let response = match backend.complete(prompt).await {
            Ok(text) => text,
            Err(err) => {
                warn!(model, error = %err, "backend call failed; no telemetry recorded");
                return Err(backend_error(err));
            }
        };
        let elapsed = timer.stop();

        let record = MetricsBuilder::build(prompt, &response, model, elapsed, scorers)?;
        debug!(
            call_id = %record.call_id,
            model,
            latency_seconds = record.latency_seconds,
            "backend call recorded"
        );

        let mut diagnostics = Vec::new();
        for sink in &self.sinks {
            if let Err(err) = sink.write(&record) {
                warn!(sink = sink.name(), error = %err, "sink rejected record");
                diagnostics.push(err);
            }
        }

        Ok(Recorded {
            response,
            record,
            diagnostics,
        })
    }
}

fn backend_error(err: BoxError) -> TelemetryError {
    if err.downcast_ref::<tokio::time::error::Elapsed>().is_some() {
        TelemetryError::BackendTimeout {
            message: err.to_string(),
        }
    } else {
        TelemetryError::Backend {
            message: err.to_string(),
        }
    }
}

/// Builder for [`CallRecorder`].
pub struct CallRecorderBuilder {
    model: String,
    scorers: Scorers,
    sinks: Vec<Arc<dyn Sink>>,
}

impl CallRecorderBuilder {
    fn new() -> Self {
        Self {
            model: RecorderConfig::default().default_model,
            scorers: Scorers::none(),
            sinks: Vec::new(),
        }
    }

    /// Sets the model identifier stamped on records from [`CallRecorder::record`].
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the default scorer set.
    pub fn scorers(mut self, scorers: Scorers) -> Self {
        self.scorers = scorers;
        self
    }

    /// Adds a sink. Sinks receive records in the order they were added.
    pub fn sink(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Adds a [`ConsoleSink`].
    pub fn console(self) -> Self {
        self.sink(Arc::new(ConsoleSink::new()))
    }

    /// Adds a [`JsonlSink`] at `path` with default rotation settings.
    pub fn jsonl(self, path: impl Into<std::path::PathBuf>) -> Self {
        self.sink(Arc::new(JsonlSink::new(path)))
    }

    pub fn build(self) -> CallRecorder {
        CallRecorder {
            model: self.model,
            scorers: self.scorers,
            sinks: self.sinks,
        }
    }
}

impl Default for CallRecorderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Deterministic backend double for tests and examples.
///
/// Returns canned responses in order, falling back to a fixed default when
/// the queue is empty. An optional fixed delay stands in for network and
/// inference latency without the jitter of a real backend.
pub struct MockBackend {
    responses: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Queues a canned response.
    pub fn with_response(self, response: impl Into<String>) -> Self {
        self.responses.lock().unwrap().push(response.into());
        self
    }

    /// Adds a fixed artificial delay before each response.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn complete(&self, prompt: &str) -> std::result::Result<String, BoxError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Ok(format!("Mock answer to: {prompt}"));
        }
        Ok(responses.remove(0))
    }
}
