//! Activity logger: a dedicated thread owning the [`JsonlWriter`].
//!
//! Other threads send [`ActivityEvent`]s through a bounded crossbeam channel.
//! `send()` uses `try_send()`, so a slow disk never stalls the control thread.

#![allow(missing_docs)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};

use crate::core::config::Config;
use crate::core::errors::{CcmError, Result};
use crate::display::state::ConfigChange;
use crate::logger::jsonl::{EventType, JsonlConfig, JsonlWriter, LogEntry, Severity};

// ──────────────────── channel capacity ────────────────────

const CHANNEL_CAPACITY: usize = 256;

// ──────────────────── public event type ────────────────────

/// Events recorded in the activity log.
#[derive(Debug, Clone)]
pub enum ActivityEvent {
    MonitorStarted {
        version: String,
        config_hash: String,
        source: String,
        interval_secs: u64,
    },
    MonitorStopped {
        reason: String,
        uptime_secs: u64,
        refreshes: u64,
    },
    Refreshed {
        status: String,
        used_percent: u32,
        remaining_minutes: u32,
        duration_ms: u64,
    },
    RefreshFailed {
        code: String,
        message: String,
        duration_ms: u64,
    },
    DisplayChanged(ConfigChange),
    Error {
        code: String,
        message: String,
    },
    /// Sentinel asking the logger thread to flush and exit.
    Shutdown,
}

// ──────────────────── public handle ────────────────────

/// Cloneable handle for sending log events. Never blocks.
#[derive(Clone)]
pub struct ActivityLoggerHandle {
    tx: Option<Sender<ActivityEvent>>,
    dropped_events: Arc<AtomicU64>,
}

impl ActivityLoggerHandle {
    /// A handle that discards everything (logging disabled).
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            tx: None,
            dropped_events: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Send an event to the logger thread. A full channel drops the event
    /// and bumps the dropped counter.
    pub fn send(&self, event: ActivityEvent) {
        let Some(tx) = &self.tx else {
            return;
        };
        if let Err(TrySendError::Full(_)) = tx.try_send(event) {
            self.dropped_events.fetch_add(1, Ordering::Relaxed);
        }
        // Disconnected is fine during shutdown.
    }

    /// Events dropped due to back-pressure and not yet reported.
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    /// Ask the logger thread to flush and stop.
    pub fn shutdown(&self) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(ActivityEvent::Shutdown);
        }
    }
}

impl std::fmt::Debug for ActivityLoggerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityLoggerHandle")
            .field("enabled", &self.tx.is_some())
            .field("dropped_events", &self.dropped_events())
            .finish()
    }
}

// ──────────────────── spawn ────────────────────

/// Spawn the logger thread and return its handle plus join handle.
pub fn spawn_logger(
    config: JsonlConfig,
    channel_capacity: usize,
) -> Result<(ActivityLoggerHandle, thread::JoinHandle<()>)> {
    let (tx, rx) = bounded::<ActivityEvent>(channel_capacity.max(1));
    let dropped = Arc::new(AtomicU64::new(0));
    let dropped_clone = Arc::clone(&dropped);

    let handle = ActivityLoggerHandle {
        tx: Some(tx),
        dropped_events: dropped,
    };

    let join = thread::Builder::new()
        .name("ccmon-logger".to_string())
        .spawn(move || logger_thread_main(&rx, config, &dropped_clone))
        .map_err(|e| CcmError::Runtime {
            details: format!("failed to spawn logger thread: {e}"),
        })?;

    Ok((handle, join))
}

/// Logger for a loaded config: spawned when `[logging] enabled`, disabled
/// otherwise. A spawn failure degrades to the disabled handle.
pub fn logger_for(config: &Config) -> (ActivityLoggerHandle, Option<thread::JoinHandle<()>>) {
    if !config.logging.enabled {
        return (ActivityLoggerHandle::disabled(), None);
    }
    match spawn_logger(JsonlConfig::from_config(config), CHANNEL_CAPACITY) {
        Ok((handle, join)) => (handle, Some(join)),
        Err(e) => {
            eprintln!("[CCM-JSONL] activity log disabled: {e}");
            (ActivityLoggerHandle::disabled(), None)
        }
    }
}

// ──────────────────── logger thread ────────────────────

fn logger_thread_main(rx: &Receiver<ActivityEvent>, config: JsonlConfig, dropped: &AtomicU64) {
    let mut jsonl = JsonlWriter::open(config);

    while let Ok(event) = rx.recv() {
        let d = dropped.swap(0, Ordering::Relaxed);
        if d > 0 {
            let mut warn = LogEntry::new(EventType::Error, Severity::Warning);
            warn.details = Some(format!("{d} log events dropped due to back-pressure"));
            jsonl.write_entry(&warn);
        }

        if matches!(event, ActivityEvent::Shutdown) {
            break;
        }
        jsonl.write_entry(&event_to_log_entry(&event));
        jsonl.flush();
    }

    jsonl.flush();
    jsonl.fsync();
}

// ──────────────────── event conversion ────────────────────

fn event_to_log_entry(event: &ActivityEvent) -> LogEntry {
    match event {
        ActivityEvent::MonitorStarted {
            version,
            config_hash,
            source,
            interval_secs,
        } => {
            let mut e = LogEntry::new(EventType::MonitorStart, Severity::Info);
            e.source = Some(source.clone());
            e.details = Some(format!(
                "version={version} config_hash={config_hash} interval={interval_secs}s"
            ));
            e.ok = Some(true);
            e
        }
        ActivityEvent::MonitorStopped {
            reason,
            uptime_secs,
            refreshes,
        } => {
            let mut e = LogEntry::new(EventType::MonitorStop, Severity::Info);
            e.details = Some(format!(
                "reason={reason} uptime={uptime_secs}s refreshes={refreshes}"
            ));
            e.ok = Some(true);
            e
        }
        ActivityEvent::Refreshed {
            status,
            used_percent,
            remaining_minutes,
            duration_ms,
        } => {
            let mut e = LogEntry::new(EventType::Refresh, Severity::Info);
            e.status = Some(status.clone());
            e.used_percent = Some(*used_percent);
            e.remaining_minutes = Some(*remaining_minutes);
            e.duration_ms = Some(*duration_ms);
            e.ok = Some(true);
            e
        }
        ActivityEvent::RefreshFailed {
            code,
            message,
            duration_ms,
        } => {
            let mut e = LogEntry::new(EventType::RefreshFailed, Severity::Warning);
            e.error_code = Some(code.clone());
            e.error_message = Some(message.clone());
            e.duration_ms = Some(*duration_ms);
            e.ok = Some(false);
            e
        }
        ActivityEvent::DisplayChanged(change) => {
            let mut e = LogEntry::new(EventType::DisplayChange, Severity::Info);
            match change {
                ConfigChange::OptionToggled { option, enabled } => {
                    e.option = Some(option.key().to_string());
                    e.enabled = Some(*enabled);
                }
                ConfigChange::OrientationChanged {
                    orientation,
                    money_forced_off,
                } => {
                    e.orientation = Some(orientation.to_string());
                    if *money_forced_off {
                        e.details = Some("money switched off".to_string());
                    }
                }
            }
            e
        }
        ActivityEvent::Error { code, message } => {
            let mut e = LogEntry::new(EventType::Error, Severity::Critical);
            e.error_code = Some(code.clone());
            e.error_message = Some(message.clone());
            e
        }
        ActivityEvent::Shutdown => LogEntry::new(EventType::MonitorStop, Severity::Info),
    }
}
