//! Sink seam and the console sink
//!
//! A [`Sink`] is a destination that persists or displays a [`CallRecord`].
//! Sinks are constructed explicitly with their configuration and handed to
//! the recorder; there is no ambient global logging state. The recorder
//! treats sinks as independent: one sink failing never prevents another from
//! receiving the record.

use chrono::SecondsFormat;
use tracing::warn;

use crate::error::Result;
use crate::record::CallRecord;

/// A destination for completed call records.
pub trait Sink: Send + Sync {
    /// Short name used in diagnostics and log events.
    fn name(&self) -> &str;

    /// Persists one record. Must be safe to call concurrently.
    fn write(&self, record: &CallRecord) -> Result<()>;
}

/// Human-readable sink writing one line per call to standard output.
///
/// Line format: `<ISO-8601 UTC> [INFO] <serialized metrics>`. This sink never
/// fails: if the record cannot be serialized, it degrades to printing the raw
/// debug form instead of returning an error.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl ConsoleSink {
    pub fn new() -> Self {
        Self
    }
}

impl Sink for ConsoleSink {
    fn name(&self) -> &str {
        "console"
    }

    fn write(&self, record: &CallRecord) -> Result<()> {
        let timestamp = record.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true);
        match serde_json::to_string(record) {
            Ok(json) => println!("{timestamp} [INFO] {json}"),
            Err(err) => {
                warn!(error = %err, "console sink fell back to debug formatting");
                println!("{timestamp} [WARN] {record:?}");
            }
        }
        Ok(())
    }
}
