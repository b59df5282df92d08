//! Usage data sources: the ccusage subprocess plus file and scripted stand-ins.
//!
//! A source returns the raw report text; parsing happens on the control
//! thread. Sources are shared with worker threads, hence `Send + Sync`.

pub mod ccusage;

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::core::errors::{CcmError, Result};

pub use ccusage::{CcusageCommand, SourceSelector};

/// Something that can produce one raw usage report per call.
pub trait UsageSource: Send + Sync {
    /// Fetch the raw report. Blocking; may be slow.
    fn fetch(&self) -> Result<String>;

    /// Short description for logs.
    fn describe(&self) -> String;
}

/// Reads the report from a file on every fetch.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    /// Source backed by `path`.
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl UsageSource for FileSource {
    fn fetch(&self) -> Result<String> {
        let raw = fs::read_to_string(&self.path).map_err(|e| CcmError::DataSourceUnavailable {
            details: format!("cannot read {}: {e}", self.path.display()),
        })?;
        if raw.trim().is_empty() {
            return Err(CcmError::DataSourceUnavailable {
                details: format!("{} is empty", self.path.display()),
            });
        }
        Ok(raw)
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}

/// Replays a fixed queue of outcomes; the last one repeats once the queue drains.
#[derive(Debug)]
pub struct ScriptedSource {
    queue: Mutex<VecDeque<std::result::Result<String, String>>>,
    last: Mutex<Option<std::result::Result<String, String>>>,
}

impl ScriptedSource {
    /// Build from outcomes: `Ok(report)` or `Err(details)` for an unavailable source.
    #[must_use]
    pub fn new(outcomes: Vec<std::result::Result<String, String>>) -> Self {
        Self {
            queue: Mutex::new(outcomes.into()),
            last: Mutex::new(None),
        }
    }

    /// A source that always returns `report`.
    #[must_use]
    pub fn always(report: impl Into<String>) -> Self {
        Self::new(vec![Ok(report.into())])
    }
}

impl UsageSource for ScriptedSource {
    fn fetch(&self) -> Result<String> {
        let next = self.queue.lock().pop_front();
        let outcome = match next {
            Some(outcome) => {
                *self.last.lock() = Some(outcome.clone());
                outcome
            }
            None => self
                .last
                .lock()
                .clone()
                .unwrap_or_else(|| Err("script exhausted".to_string())),
        };
        outcome.map_err(|details| CcmError::DataSourceUnavailable { details })
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}
