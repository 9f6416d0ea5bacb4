//! # Durable JSON Lines Sink with Rotation
//!
//! [`JsonlSink`] appends each [`CallRecord`] as one JSON object per line to an
//! active log file, flushing before `write` returns so a process crash right
//! after a successful write cannot lose the line.
//!
//! ## Rotation and retention
//!
//! Before a write that would push the active file over `max_bytes`, the sink
//! closes the active file, shifts existing backups up one slot
//! (`calls.jsonl.1` → `calls.jsonl.2`, …), discards anything beyond
//! `backup_count`, renames the active file into slot `.1`, and opens a fresh
//! active file. The shift is a sequence of renames, so a reader never
//! observes a truncated file mid-swap. With `backup_count == 0` the active
//! file is truncated in place instead of being preserved.
//!
//! ## Concurrency
//!
//! All mutable state (file handle, byte counter) lives behind a [`Mutex`]:
//! concurrent writers serialize at the sink boundary, lines never interleave,
//! and a writer that arrives during rotation simply appends to the freshly
//! opened file once it acquires the lock.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::ser::Error as _;
use tracing::debug;

use crate::error::{Result, TelemetryError};
use crate::record::CallRecord;
use crate::sink::Sink;

/// Default rotation threshold: 10 MiB.
pub const DEFAULT_MAX_BYTES: u64 = 10 * 1024 * 1024;

/// Default number of rotated files retained.
pub const DEFAULT_BACKUP_COUNT: usize = 5;

struct ActiveFile {
    writer: BufWriter<File>,
    bytes: u64,
}

/// Append-only JSON Lines sink with size-based rotation.
///
/// The file is opened lazily on the first write, so constructing the sink
/// never touches the filesystem; an unwritable destination surfaces as
/// [`TelemetryError::SinkUnavailable`] from `write`.
pub struct JsonlSink {
    path: PathBuf,
    max_bytes: u64,
    backup_count: usize,
    active: Mutex<Option<ActiveFile>>,
}

impl JsonlSink {
    /// Creates a sink at `path` with default rotation settings.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_bytes: DEFAULT_MAX_BYTES,
            backup_count: DEFAULT_BACKUP_COUNT,
            active: Mutex::new(None),
        }
    }

    /// Sets the rotation threshold in bytes.
    pub fn max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Sets how many rotated files are retained.
    pub fn backup_count(mut self, backup_count: usize) -> Self {
        self.backup_count = backup_count;
        self
    }

    /// The active log file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn unavailable(&self, source: std::io::Error) -> TelemetryError {
        TelemetryError::SinkUnavailable {
            sink: self.name().to_string(),
            source,
        }
    }

    fn backup_path(&self, index: usize) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(format!(".{index}"));
        PathBuf::from(name)
    }

    fn open_active(&self) -> std::io::Result<ActiveFile> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        // Resume the byte counter if the file already has content, so a
        // restarted process still rotates at the right size.
        let bytes = file.metadata()?.len();
        Ok(ActiveFile {
            writer: BufWriter::new(file),
            bytes,
        })
    }

    /// Shifts backups up one slot and reopens a fresh active file.
    fn rotate(&self) -> std::io::Result<ActiveFile> {
        if self.backup_count == 0 {
            // No retention configured: truncate in place.
            let file = File::create(&self.path)?;
            return Ok(ActiveFile {
                writer: BufWriter::new(file),
                bytes: 0,
            });
        }

        let oldest = self.backup_path(self.backup_count);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        for index in (1..self.backup_count).rev() {
            let from = self.backup_path(index);
            if from.exists() {
                fs::rename(&from, self.backup_path(index + 1))?;
            }
        }
        fs::rename(&self.path, self.backup_path(1))?;

        debug!(path = %self.path.display(), "rotated telemetry log");
        self.open_active()
    }
}

impl Sink for JsonlSink {
    fn name(&self) -> &str {
        "jsonl"
    }

    /// Serializes `record` to one line and appends it durably.
    ///
    /// Rotation, if needed, happens before the append, so each line lands in
    /// exactly one file. The user-space buffer is flushed to the OS before
    /// returning; that is the durability guarantee against a process crash.
    fn write(&self, record: &CallRecord) -> Result<()> {
        if !record.has_finite_metrics() {
            // serde_json would render these as null and corrupt the schema.
            return Err(TelemetryError::Serialization(serde_json::Error::custom(
                "record contains a non-finite float",
            )));
        }

        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        let line_len = line.len() as u64;

        let mut guard = self.active.lock().unwrap();
        if guard.is_none() {
            *guard = Some(self.open_active().map_err(|e| self.unavailable(e))?);
        }

        let needs_rotation = guard
            .as_ref()
            .map(|a| a.bytes > 0 && a.bytes + line_len > self.max_bytes)
            .unwrap_or(false);
        if needs_rotation {
            // Drop the old handle before renaming the file underneath it.
            guard.take();
            *guard = Some(self.rotate().map_err(|e| self.unavailable(e))?);
        }

        let active = guard.as_mut().expect("active file opened above");
        active
            .writer
            .write_all(line.as_bytes())
            .map_err(|e| self.unavailable(e))?;
        active.writer.flush().map_err(|e| self.unavailable(e))?;
        active.bytes += line_len;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{MetricsBuilder, Scorers};

    fn record(prompt: &str) -> CallRecord {
        MetricsBuilder::build(prompt, "response", "mock-v1", 0.01, &Scorers::none()).unwrap()
    }

    fn lines(path: &Path) -> Vec<String> {
        fs::read_to_string(path)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_write_appends_one_line() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonlSink::new(dir.path().join("calls.jsonl"));

        sink.write(&record("first")).unwrap();
        sink.write(&record("second")).unwrap();

        let lines = lines(sink.path());
        assert_eq!(lines.len(), 2);
        let parsed: CallRecord = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(parsed.prompt, "first");
    }

    #[test]
    fn test_rotation_retains_bounded_backups() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calls.jsonl");
        // Every line exceeds the threshold, so each write rotates.
        let sink = JsonlSink::new(&path).max_bytes(16).backup_count(3);

        for i in 0..6 {
            sink.write(&record(&format!("call-{i}"))).unwrap();
        }

        // min(N, backup_count) backups plus one active file.
        for i in 1..=3 {
            assert!(sink.backup_path(i).exists(), "missing backup .{i}");
        }
        assert!(!sink.backup_path(4).exists());

        // Newest first: active = call-5, .1 = call-4, .2 = call-3, .3 = call-2.
        let active: CallRecord = serde_json::from_str(&lines(&path)[0]).unwrap();
        assert_eq!(active.prompt, "call-5");
        let oldest: CallRecord =
            serde_json::from_str(&lines(&sink.backup_path(3))[0]).unwrap();
        assert_eq!(oldest.prompt, "call-2");
    }

    #[test]
    fn test_no_record_lost_across_rotation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calls.jsonl");
        let sink = JsonlSink::new(&path).max_bytes(16).backup_count(5);

        for i in 0..4 {
            sink.write(&record(&format!("call-{i}"))).unwrap();
        }

        // Read oldest backup to active: every record exactly once, in order.
        let mut seen = Vec::new();
        for i in (1..=3).rev() {
            for line in lines(&sink.backup_path(i)) {
                let r: CallRecord = serde_json::from_str(&line).unwrap();
                seen.push(r.prompt);
            }
        }
        for line in lines(&path) {
            let r: CallRecord = serde_json::from_str(&line).unwrap();
            seen.push(r.prompt);
        }
        assert_eq!(seen, vec!["call-0", "call-1", "call-2", "call-3"]);
    }

    #[test]
    fn test_no_rotation_below_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonlSink::new(dir.path().join("calls.jsonl"));

        for i in 0..10 {
            sink.write(&record(&format!("call-{i}"))).unwrap();
        }

        assert_eq!(lines(sink.path()).len(), 10);
        assert!(!sink.backup_path(1).exists());
    }

    #[test]
    fn test_zero_backup_count_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonlSink::new(dir.path().join("calls.jsonl"))
            .max_bytes(16)
            .backup_count(0);

        sink.write(&record("call-0")).unwrap();
        sink.write(&record("call-1")).unwrap();

        let lines = lines(sink.path());
        assert_eq!(lines.len(), 1);
        assert!(!sink.backup_path(1).exists());
    }

    #[test]
    fn test_missing_directory_is_sink_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonlSink::new(dir.path().join("no-such-dir").join("calls.jsonl"));

        let err = sink.write(&record("p")).unwrap_err();
        assert!(matches!(err, TelemetryError::SinkUnavailable { .. }));
    }

    #[test]
    fn test_non_finite_score_is_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonlSink::new(dir.path().join("calls.jsonl"));

        let mut bad = record("p");
        bad.cost_usd = f64::INFINITY;
        let err = sink.write(&bad).unwrap_err();
        assert!(matches!(err, TelemetryError::Serialization(_)));

        // Nothing was appended.
        assert!(lines(sink.path()).is_empty());
    }

    #[test]
    fn test_byte_counter_resumes_after_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calls.jsonl");

        {
            let sink = JsonlSink::new(&path).max_bytes(16).backup_count(2);
            sink.write(&record("call-0")).unwrap();
        }
        // A fresh sink over the same path sees the existing bytes and rotates.
        let sink = JsonlSink::new(&path).max_bytes(16).backup_count(2);
        sink.write(&record("call-1")).unwrap();

        assert!(sink.backup_path(1).exists());
        let active: CallRecord = serde_json::from_str(&lines(&path)[0]).unwrap();
        assert_eq!(active.prompt, "call-1");
    }
}
