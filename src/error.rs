//! Error types for the telemetry pipeline

use thiserror::Error;

/// Result type alias for the telemetry pipeline
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Boxed error type used at the backend seam.
///
/// The injected backend is opaque to this crate, so its failures arrive as a
/// type-erased error and are converted into [`TelemetryError::Backend`] or
/// [`TelemetryError::BackendTimeout`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for the telemetry pipeline
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The clock produced a negative or non-finite duration.
    ///
    /// This is a programming-contract violation (a timer bug upstream), not a
    /// property of the call being recorded. No record is built.
    #[error("invalid timing: clock reported {seconds} seconds")]
    InvalidTiming { seconds: f64 },

    /// The injected backend call failed; no record is produced or persisted.
    #[error("backend error: {message}")]
    Backend { message: String },

    /// The injected backend call exceeded a host-imposed deadline.
    #[error("backend timeout: {message}")]
    BackendTimeout { message: String },

    /// A sink could not persist an already-valid record.
    ///
    /// Isolated per sink: other sinks still receive the record and the overall
    /// call still succeeds, with this error surfaced as a diagnostic.
    #[error("sink '{sink}' unavailable: {source}")]
    SinkUnavailable {
        sink: String,
        #[source]
        source: std::io::Error,
    },

    /// A record could not be serialized to a sink's wire format.
    ///
    /// Same per-sink isolation as [`TelemetryError::SinkUnavailable`].
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error outside the per-sink write path (e.g. rotation plumbing).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },
}
