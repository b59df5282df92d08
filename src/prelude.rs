//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use ccusage_monitor::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{CcmError, Result};

// Usage
pub use crate::usage::format::{format_metrics, format_reset_label, format_tokens, status_line};
pub use crate::usage::snapshot::{UsageSnapshot, parse_report};

// Display
pub use crate::display::menu::MenuDescription;
pub use crate::display::options::{DisplayConfig, DisplayOption, Orientation};
pub use crate::display::state::{ConfigChange, DisplayStateMachine};

// Adapters
pub use crate::logger::activity::ActivityLoggerHandle;
pub use crate::present::{Presenter, RecordingPresenter, TerminalPresenter};
pub use crate::source::{CcusageCommand, FileSource, ScriptedSource, UsageSource};

// Runtime
pub use crate::daemon::refresh::{RefreshController, RefreshOutcome};
