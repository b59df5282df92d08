//! Monitor loop: the control thread that owns the display state and the
//! presenter.
//!
//! Each iteration polls the signal flags, then waits on whichever comes first:
//! the refresh ticker, a finished data-source call, a display change event, or
//! a user command. Data-source calls run on short-lived `ccmon-source` worker
//! threads and report back over a bounded channel; overlapping calls are
//! allowed and each result is published as it arrives.

#![allow(missing_docs)]

use std::fmt;
use std::io::BufRead;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, bounded, never, select, tick};

use crate::core::config::Config;
use crate::core::errors::{CcmError, Result};
use crate::daemon::refresh::{Acquired, RefreshController, acquire};
use crate::daemon::signals::SignalHandler;
use crate::display::options::DisplayOption;
use crate::display::state::ConfigChange;
use crate::logger::activity::{ActivityEvent, ActivityLoggerHandle};
use crate::present::Presenter;

/// Bounded capacity for the worker→monitor results channel.
const RESULT_CHANNEL_CAP: usize = 16;
/// Bounded capacity for display change events.
const CHANGE_CHANNEL_CAP: usize = 16;
/// Upper bound on how long a signal can go unnoticed.
const SIGNAL_POLL: Duration = Duration::from_millis(100);

// ──────────────────── user commands ────────────────────

/// Interactive commands accepted on stdin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserCommand {
    Refresh,
    Toggle(DisplayOption),
    Orientation,
    ShowMenu,
    Quit,
}

impl UserCommand {
    /// Parse one input line: `r`, `1`-`4` or an option key, `o`, `m`, `q`.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let word = line.trim();
        match word.to_ascii_lowercase().as_str() {
            "" => None,
            "r" | "refresh" => Some(Self::Refresh),
            "o" | "orientation" => Some(Self::Orientation),
            "m" | "menu" => Some(Self::ShowMenu),
            "q" | "quit" => Some(Self::Quit),
            _ => word
                .parse::<u8>()
                .ok()
                .and_then(DisplayOption::from_number)
                .or_else(|| DisplayOption::from_key(word))
                .map(Self::Toggle),
        }
    }
}

/// Forward parsed stdin lines to `tx` until EOF or until the monitor is gone.
pub fn spawn_stdin_reader(tx: Sender<UserCommand>) -> Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("ccmon-stdin".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                match UserCommand::parse(&line) {
                    Some(cmd) => {
                        if tx.send(cmd).is_err() {
                            break;
                        }
                    }
                    None if line.trim().is_empty() => {}
                    None => eprintln!(
                        "[CCM-MONITOR] unknown command {:?} (r, 1-4, o, m, q)",
                        line.trim()
                    ),
                }
            }
        })
        .map_err(|e| CcmError::Runtime {
            details: format!("failed to spawn stdin reader: {e}"),
        })
}

// ──────────────────── monitor ────────────────────

/// Why the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Quit,
    Signal,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Quit => write!(f, "quit"),
            Self::Signal => write!(f, "signal"),
        }
    }
}

/// Loop settings.
#[derive(Debug, Clone)]
pub struct MonitorArgs {
    pub interval: Duration,
    /// Source description for the start event.
    pub source_label: String,
    pub config_hash: String,
}

impl MonitorArgs {
    #[must_use]
    pub fn from_config(config: &Config, source_label: String) -> Self {
        Self {
            interval: Duration::from_secs(config.refresh.interval_secs.max(1)),
            source_label,
            config_hash: config.stable_hash().unwrap_or_default(),
        }
    }
}

/// Summary returned when the loop exits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorSummary {
    pub reason: StopReason,
    pub uptime: Duration,
    pub refreshes: u64,
    pub failures: u64,
    /// Worker calls still running at exit; they are abandoned.
    pub abandoned: u32,
}

/// The UI-owning control loop.
pub struct Monitor<P: Presenter> {
    controller: RefreshController,
    presenter: P,
    signals: SignalHandler,
    logger: ActivityLoggerHandle,
    args: MonitorArgs,
}

impl<P: Presenter> Monitor<P> {
    pub fn new(
        controller: RefreshController,
        presenter: P,
        signals: SignalHandler,
        logger: ActivityLoggerHandle,
        args: MonitorArgs,
    ) -> Self {
        Self {
            controller,
            presenter,
            signals,
            logger,
            args,
        }
    }

    /// Run until a quit command or a shutdown signal.
    pub fn run(&mut self, commands: Receiver<UserCommand>) -> MonitorSummary {
        let started = Instant::now();
        self.logger.send(ActivityEvent::MonitorStarted {
            version: env!("CARGO_PKG_VERSION").to_string(),
            config_hash: self.args.config_hash.clone(),
            source: self.args.source_label.clone(),
            interval_secs: self.args.interval.as_secs(),
        });

        let (change_tx, change_rx) = bounded::<ConfigChange>(CHANGE_CHANNEL_CAP);
        self.controller.display_mut().subscribe(change_tx);
        let (result_tx, result_rx) = bounded::<Acquired>(RESULT_CHANNEL_CAP);
        let ticker = tick(self.args.interval);
        let mut commands = commands;
        let mut input_closed = false;

        self.controller.publish_loading(&mut self.presenter);
        self.spawn_refresh(&result_tx);

        // ──────── main loop ────────
        let reason = loop {
            if input_closed {
                // Input closed: keep running on the timer alone.
                commands = never();
                input_closed = false;
            }
            if self.signals.should_shutdown() {
                eprintln!("[CCM-MONITOR] shutdown requested");
                break StopReason::Signal;
            }
            if self.signals.should_refresh() {
                eprintln!("[CCM-MONITOR] refresh requested (SIGUSR1)");
                self.spawn_refresh(&result_tx);
            }

            select! {
                recv(ticker) -> _ => self.spawn_refresh(&result_tx),
                recv(result_rx) -> msg => {
                    if let Ok(acquired) = msg {
                        self.controller.complete(acquired, &mut self.presenter);
                    }
                }
                recv(change_rx) -> msg => {
                    if let Ok(change) = msg {
                        self.controller.on_config_change(change, &mut self.presenter);
                        self.spawn_refresh(&result_tx);
                    }
                }
                recv(commands) -> msg => match msg {
                    Ok(UserCommand::Quit) => break StopReason::Quit,
                    Ok(cmd) => self.handle_command(cmd, &result_tx),
                    Err(_) => input_closed = true,
                },
                default(SIGNAL_POLL) => {}
            }
        };

        let stats = self.controller.stats();
        let summary = MonitorSummary {
            reason,
            uptime: started.elapsed(),
            refreshes: stats.updated,
            failures: stats.failed,
            abandoned: stats.in_flight,
        };
        self.logger.send(ActivityEvent::MonitorStopped {
            reason: reason.to_string(),
            uptime_secs: summary.uptime.as_secs(),
            refreshes: summary.refreshes,
        });
        summary
    }

    /// Latest published status.
    #[must_use]
    pub fn status(&self) -> &str {
        self.controller.last_status()
    }

    pub fn into_presenter(self) -> P {
        self.presenter
    }

    fn handle_command(&mut self, cmd: UserCommand, result_tx: &Sender<Acquired>) {
        match cmd {
            UserCommand::Refresh => self.spawn_refresh(result_tx),
            UserCommand::Toggle(option) => {
                // Accepted toggles come back through the change channel.
                if self.controller.toggle(option).is_none() {
                    eprintln!(
                        "[CCM-MONITOR] {} is unavailable while showing what is left",
                        option.label()
                    );
                }
            }
            UserCommand::Orientation => {
                self.controller.toggle_orientation();
            }
            UserCommand::ShowMenu => self.presenter.show_menu(),
            UserCommand::Quit => {}
        }
    }

    fn spawn_refresh(&mut self, result_tx: &Sender<Acquired>) {
        let source = self.controller.begin();
        let tx = result_tx.clone();
        let spawned = thread::Builder::new()
            .name("ccmon-source".to_string())
            .spawn(move || {
                // The monitor may have exited; the result is then discarded.
                let _ = tx.send(acquire(source.as_ref()));
            });
        if let Err(e) = spawned {
            let failed = Acquired {
                raw: Err(CcmError::Runtime {
                    details: format!("failed to spawn source worker: {e}"),
                }),
                duration: Duration::ZERO,
            };
            self.logger.send(ActivityEvent::Error {
                code: "CCM-3900".to_string(),
                message: "failed to spawn source worker".to_string(),
            });
            self.controller.complete(failed, &mut self.presenter);
        }
    }
}
