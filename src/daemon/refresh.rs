//! Refresh controller: one cycle of Data Source → Parser → Formatter → Presenter.
//!
//! The cycle is split so the slow part can leave the control thread:
//! [`acquire`] runs anywhere (a worker thread in the monitor loop), while
//! [`RefreshController::complete`] parses, formats and publishes and must run
//! on the thread that owns the presenter. [`RefreshController::refresh_cycle`]
//! chains both synchronously.

#![allow(missing_docs)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Local;

use crate::core::errors::{CcmError, Result};
use crate::display::menu::MenuDescription;
use crate::display::options::{DisplayConfig, DisplayOption};
use crate::display::state::{ConfigChange, DisplayStateMachine};
use crate::logger::activity::{ActivityEvent, ActivityLoggerHandle};
use crate::present::Presenter;
use crate::source::UsageSource;
use crate::usage::format::{LOADING, NO_DATA, PENDING, status_line};
use crate::usage::snapshot::{UsageSnapshot, parse_report};

/// Raw result of one data-source call.
#[derive(Debug)]
pub struct Acquired {
    pub raw: Result<String>,
    /// Wall time spent in the data source.
    pub duration: Duration,
}

/// Call the data source once. Blocking.
pub fn acquire(source: &dyn UsageSource) -> Acquired {
    let started = Instant::now();
    let raw = source.fetch();
    Acquired {
        raw,
        duration: started.elapsed(),
    }
}

/// What a completed cycle published.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// A snapshot was parsed and its status line published.
    Updated {
        status: String,
        snapshot: UsageSnapshot,
    },
    /// Acquisition or parsing failed; `"No data"` was published.
    NoData { code: &'static str, message: String },
}

impl RefreshOutcome {
    /// The status string that was published.
    #[must_use]
    pub fn status(&self) -> &str {
        match self {
            Self::Updated { status, .. } => status,
            Self::NoData { .. } => NO_DATA,
        }
    }
}

/// Counters kept across cycles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshStats {
    pub updated: u64,
    pub failed: u64,
    /// Acquisitions started but not yet completed.
    pub in_flight: u32,
}

/// Drives refresh cycles and owns the display state.
pub struct RefreshController {
    source: Arc<dyn UsageSource>,
    display: DisplayStateMachine,
    last_snapshot: Option<UsageSnapshot>,
    last_status: String,
    stats: RefreshStats,
    logger: ActivityLoggerHandle,
}

impl RefreshController {
    pub fn new(
        source: Arc<dyn UsageSource>,
        display: DisplayStateMachine,
        logger: ActivityLoggerHandle,
    ) -> Self {
        Self {
            source,
            display,
            last_snapshot: None,
            last_status: LOADING.to_string(),
            stats: RefreshStats::default(),
            logger,
        }
    }

    /// Shared handle to the data source, for worker threads.
    #[must_use]
    pub fn source(&self) -> Arc<dyn UsageSource> {
        Arc::clone(&self.source)
    }

    #[must_use]
    pub fn current_config(&self) -> DisplayConfig {
        self.display.current_config()
    }

    /// Snapshot from the most recent successful cycle, if the latest cycle succeeded.
    #[must_use]
    pub fn last_snapshot(&self) -> Option<&UsageSnapshot> {
        self.last_snapshot.as_ref()
    }

    #[must_use]
    pub fn last_status(&self) -> &str {
        &self.last_status
    }

    #[must_use]
    pub fn stats(&self) -> RefreshStats {
        self.stats
    }

    /// Menu for the current configuration and latest snapshot.
    #[must_use]
    pub fn menu(&self) -> MenuDescription {
        MenuDescription::build(&self.display.current_config(), self.last_snapshot.as_ref())
    }

    /// Mutable access for subscribing to change events.
    pub fn display_mut(&mut self) -> &mut DisplayStateMachine {
        &mut self.display
    }

    /// Publish the initial `"Loading..."` status.
    pub fn publish_loading(&mut self, presenter: &mut dyn Presenter) {
        self.publish(presenter, LOADING.to_string());
    }

    // ──────────────────── cycle ────────────────────

    /// Mark an acquisition as started. Pair with [`Self::complete`].
    pub fn begin(&mut self) -> Arc<dyn UsageSource> {
        self.stats.in_flight = self.stats.in_flight.saturating_add(1);
        self.source()
    }

    /// Parse, format and publish an acquisition result.
    pub fn complete(&mut self, acquired: Acquired, presenter: &mut dyn Presenter) -> RefreshOutcome {
        self.stats.in_flight = self.stats.in_flight.saturating_sub(1);
        let duration_ms = u64::try_from(acquired.duration.as_millis()).unwrap_or(u64::MAX);

        let parsed = acquired
            .raw
            .and_then(|raw| parse_report(&raw, Local::now()));
        match parsed {
            Ok(snapshot) => {
                let status = status_line(&snapshot, &self.display.current_config());
                self.stats.updated += 1;
                self.logger.send(ActivityEvent::Refreshed {
                    status: status.clone(),
                    used_percent: snapshot.used_percent,
                    remaining_minutes: snapshot.remaining_minutes,
                    duration_ms,
                });
                self.last_snapshot = Some(snapshot.clone());
                self.publish(presenter, status.clone());
                RefreshOutcome::Updated { status, snapshot }
            }
            Err(e) => self.fail(&e, duration_ms, presenter),
        }
    }

    /// Full synchronous cycle on the calling thread.
    pub fn refresh_cycle(&mut self, presenter: &mut dyn Presenter) -> RefreshOutcome {
        let source = self.begin();
        let acquired = acquire(source.as_ref());
        self.complete(acquired, presenter)
    }

    fn fail(
        &mut self,
        err: &CcmError,
        duration_ms: u64,
        presenter: &mut dyn Presenter,
    ) -> RefreshOutcome {
        self.stats.failed += 1;
        if !err.is_no_data() {
            eprintln!("[CCM-MONITOR] refresh failed: {err}");
        }
        self.logger.send(ActivityEvent::RefreshFailed {
            code: err.code().to_string(),
            message: err.to_string(),
            duration_ms,
        });
        self.last_snapshot = None;
        self.publish(presenter, NO_DATA.to_string());
        RefreshOutcome::NoData {
            code: err.code(),
            message: err.to_string(),
        }
    }

    // ──────────────────── display changes ────────────────────

    /// Toggle an option. Returns `None` when the option is unavailable.
    pub fn toggle(&mut self, option: DisplayOption) -> Option<ConfigChange> {
        self.display.toggle(option)
    }

    /// Flip the orientation.
    pub fn toggle_orientation(&mut self) -> ConfigChange {
        self.display.toggle_orientation()
    }

    /// React to an accepted change: log it and publish `"..."` with the
    /// rebuilt menu. The caller schedules the follow-up refresh.
    pub fn on_config_change(&mut self, change: ConfigChange, presenter: &mut dyn Presenter) {
        self.logger.send(ActivityEvent::DisplayChanged(change));
        self.publish(presenter, PENDING.to_string());
    }

    /// Toggle, then refresh synchronously when the toggle was accepted.
    pub fn toggle_and_refresh(
        &mut self,
        option: DisplayOption,
        presenter: &mut dyn Presenter,
    ) -> Option<RefreshOutcome> {
        let change = self.toggle(option)?;
        self.on_config_change(change, presenter);
        Some(self.refresh_cycle(presenter))
    }

    /// Flip orientation, then refresh synchronously.
    pub fn orientation_and_refresh(&mut self, presenter: &mut dyn Presenter) -> RefreshOutcome {
        let change = self.toggle_orientation();
        self.on_config_change(change, presenter);
        self.refresh_cycle(presenter)
    }

    fn publish(&mut self, presenter: &mut dyn Presenter, status: String) {
        let menu = self.menu();
        presenter.publish(&status, &menu);
        self.last_status = status;
    }
}
