//! JSONL activity log: one self-contained JSON object per line.
//!
//! Lines are assembled in memory and written with a single `write_all`, so a
//! concurrent `tail -f` never sees a partial line.
//!
//! Degradation chain:
//! 1. Log file (rotated at `max_size_bytes`)
//! 2. stderr with `[CCM-JSONL]` prefix
//! 3. Silent discard (the monitor never stops for logging failures)

#![allow(missing_docs)]

use std::fs::{self, File, OpenOptions, rename};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use crate::core::config::Config;
use crate::core::errors::{CcmError, Result};

/// Severity level for log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// Event types written to the activity log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    MonitorStart,
    MonitorStop,
    Refresh,
    RefreshFailed,
    DisplayChange,
    Error,
}

/// A single JSONL log entry. Only `ts`, `event` and `severity` are always present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// ISO 8601 UTC timestamp.
    pub ts: String,
    pub event: EventType,
    pub severity: Severity,
    /// Status string published for this refresh.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Token ceiling usage at refresh time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_percent: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_minutes: Option<u32>,
    /// Data source description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Display option key affected by a change.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub option: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orientation: Option<String>,
    /// Wall time of the fetch in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ok: Option<bool>,
    /// CCM error code if the action failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Freeform details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl LogEntry {
    /// Create a new entry stamped with the current UTC time.
    pub fn new(event: EventType, severity: Severity) -> Self {
        Self {
            ts: format_utc_now(),
            event,
            severity,
            status: None,
            used_percent: None,
            remaining_minutes: None,
            source: None,
            option: None,
            enabled: None,
            orientation: None,
            duration_ms: None,
            ok: None,
            error_code: None,
            error_message: None,
            details: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Normal,
    Stderr,
    Discard,
}

/// Configuration for the JSONL writer.
#[derive(Debug, Clone)]
pub struct JsonlConfig {
    pub path: PathBuf,
    /// Rotate once the file would exceed this many bytes.
    pub max_size_bytes: u64,
    /// Number of rotated files to keep.
    pub max_rotated_files: u32,
    /// Seconds between forced fsync calls.
    pub fsync_interval_secs: u64,
}

impl JsonlConfig {
    /// Writer settings from the `[logging]` and `[paths]` config sections.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            path: config.paths.jsonl_log.clone(),
            max_size_bytes: config.logging.max_size_bytes,
            max_rotated_files: config.logging.max_rotated_files,
            fsync_interval_secs: 10,
        }
    }
}

/// Append-only JSONL log writer with rotation and stderr fallback.
pub struct JsonlWriter {
    config: JsonlConfig,
    writer: Option<BufWriter<File>>,
    state: WriterState,
    bytes_written: u64,
    last_fsync: SystemTime,
}

impl JsonlWriter {
    /// Open the log file, degrading to stderr if that fails.
    pub fn open(config: JsonlConfig) -> Self {
        let mut w = Self {
            config,
            writer: None,
            state: WriterState::Discard,
            bytes_written: 0,
            last_fsync: SystemTime::now(),
        };
        w.try_open();
        w
    }

    /// Write a single log entry as one JSONL line.
    pub fn write_entry(&mut self, entry: &LogEntry) {
        let line = match serde_json::to_string(entry) {
            Ok(json) => format!("{json}\n"),
            Err(e) => {
                let _ = writeln!(io::stderr(), "[CCM-JSONL] serialize error: {e}");
                return;
            }
        };
        self.write_line(&line);
    }

    pub fn flush(&mut self) {
        if let Some(w) = self.writer.as_mut() {
            let _ = w.flush();
        }
    }

    pub fn fsync(&mut self) {
        if let Some(w) = self.writer.as_mut() {
            let _ = w.flush();
            let _ = w.get_ref().sync_data();
            self.last_fsync = SystemTime::now();
        }
    }

    /// Current degradation state.
    pub fn state(&self) -> &str {
        match self.state {
            WriterState::Normal => "normal",
            WriterState::Stderr => "stderr",
            WriterState::Discard => "discard",
        }
    }

    // ──────────────────────── internals ────────────────────────

    fn write_line(&mut self, line: &str) {
        if self.state == WriterState::Normal
            && self.bytes_written + line.len() as u64 > self.config.max_size_bytes
        {
            self.rotate();
        }

        match self.state {
            WriterState::Normal => {
                if let Some(w) = self.writer.as_mut() {
                    if w.write_all(line.as_bytes()).is_err() {
                        self.degrade();
                        self.write_line(line);
                        return;
                    }
                    self.bytes_written += line.len() as u64;
                    self.maybe_fsync();
                } else {
                    self.degrade();
                    self.write_line(line);
                }
            }
            WriterState::Stderr => {
                if write!(io::stderr(), "[CCM-JSONL] {line}").is_err() {
                    self.degrade();
                }
            }
            WriterState::Discard => {}
        }
    }

    fn maybe_fsync(&mut self) {
        let elapsed = SystemTime::now()
            .duration_since(self.last_fsync)
            .unwrap_or(Duration::ZERO);
        if elapsed.as_secs() >= self.config.fsync_interval_secs {
            self.fsync();
        }
    }

    fn try_open(&mut self) {
        match open_append(&self.config.path) {
            Ok((file, size)) => {
                self.writer = Some(BufWriter::with_capacity(16 * 1024, file));
                self.state = WriterState::Normal;
                self.bytes_written = size;
            }
            Err(e) => {
                self.state = WriterState::Stderr;
                let _ = writeln!(io::stderr(), "[CCM-JSONL] {e}; logging to stderr");
            }
        }
    }

    fn degrade(&mut self) {
        self.writer = None;
        match self.state {
            WriterState::Normal => {
                self.state = WriterState::Stderr;
                let _ = writeln!(io::stderr(), "[CCM-JSONL] log write failed, using stderr");
            }
            WriterState::Stderr => self.state = WriterState::Discard,
            WriterState::Discard => {}
        }
    }

    fn rotate(&mut self) {
        if let Some(w) = self.writer.as_mut() {
            let _ = w.flush();
        }
        self.writer = None;
        let base = self.config.path.clone();

        // .N is dropped, .N-1 → .N, ..., current → .1
        let _ = fs::remove_file(rotated_name(&base, self.config.max_rotated_files));
        for i in (1..self.config.max_rotated_files).rev() {
            let _ = rename(rotated_name(&base, i), rotated_name(&base, i + 1));
        }
        let _ = rename(&base, rotated_name(&base, 1));

        match open_append(&base) {
            Ok((file, _)) => {
                self.writer = Some(BufWriter::with_capacity(16 * 1024, file));
                self.bytes_written = 0;
            }
            Err(_) => self.degrade(),
        }
    }
}

// ──────────────────────── helpers ────────────────────────

/// Open or create a file for appending. Returns `(File, current_size)`.
fn open_append(path: &Path) -> Result<(File, u64)> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| CcmError::io(parent, source))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| CcmError::io(path, source))?;
    let size = file.metadata().map(|m| m.len()).unwrap_or(0);
    Ok((file, size))
}

/// `activity.jsonl` → `activity.jsonl.3`.
fn rotated_name(base: &Path, index: u32) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(format!(".{index}"));
    PathBuf::from(name)
}

fn format_utc_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

// ──────────────────────── tests ────────────────────────
