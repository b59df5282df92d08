#![forbid(unsafe_code)]

//! ccusage-monitor: periodically queries `ccusage blocks --active --json`,
//! derives usage figures for the current five-hour accounting block, and
//! renders them as a compact, user-configurable status line with a menu of
//! display toggles.
//!
//! Layers, leaf first:
//! 1. [`usage`]: snapshot parsing and metric formatting (pure)
//! 2. [`display`]: display options, the toggle state machine, menu description
//! 3. [`source`] / [`present`]: data-source and presentation adapters
//! 4. [`daemon`]: refresh controller and the control loop
//!
//! # Library usage
//!
//! ```rust,no_run
//! use ccusage_monitor::prelude::*;
//! use std::sync::Arc;
//!
//! let source = Arc::new(FileSource::new("report.json"));
//! let mut controller = RefreshController::new(
//!     source,
//!     DisplayStateMachine::new(),
//!     ActivityLoggerHandle::disabled(),
//! );
//! let mut presenter = RecordingPresenter::new();
//! let outcome = controller.refresh_cycle(&mut presenter);
//! println!("{}", outcome.status());
//! ```

pub mod prelude;

pub mod core;
pub mod daemon;
pub mod display;
pub mod logger;
pub mod present;
pub mod source;
pub mod usage;
