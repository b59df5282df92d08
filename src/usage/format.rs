//! Metric formatter: snapshot + display config → short status tokens.

#![allow(clippy::cast_precision_loss)]

use crate::display::options::{DisplayConfig, DisplayOption, Orientation};
use crate::usage::snapshot::UsageSnapshot;

/// Separator between status tokens.
pub const SEPARATOR: &str = " | ";
/// Status shown when every option is disabled.
pub const NO_METRICS: &str = "No metrics";
/// Status shown when no snapshot could be obtained.
pub const NO_DATA: &str = "No data";
/// Status shown before the first cycle completes.
pub const LOADING: &str = "Loading...";
/// Status shown while a toggle-triggered refresh is pending.
pub const PENDING: &str = "...";

/// Render one token per enabled option, in declaration order.
#[must_use]
pub fn format_metrics(snapshot: &UsageSnapshot, config: &DisplayConfig) -> Vec<String> {
    let used = config.orientation() == Orientation::Used;
    config
        .enabled_options()
        .filter_map(|option| match option {
            DisplayOption::Percentage => {
                let pct = if used {
                    snapshot.used_percent
                } else {
                    snapshot.left_percent
                };
                Some(format!("{pct}%"))
            }
            DisplayOption::TimeLeft => {
                let m = if used {
                    snapshot.elapsed_minutes
                } else {
                    snapshot.remaining_minutes
                };
                Some(format!("{}h {}m", m / 60, m % 60))
            }
            DisplayOption::Tokens => {
                let t = if used {
                    snapshot.total_tokens_used
                } else {
                    snapshot.tokens_left
                };
                Some(format!("{}t", format_tokens(t)))
            }
            // Cost remaining is not shown; money only renders from the used side.
            DisplayOption::Money => used.then(|| format!("${:.2}", snapshot.cost_used_usd)),
        })
        .collect()
}

/// Join the metric tokens into the status line, or [`NO_METRICS`] when empty.
#[must_use]
pub fn status_line(snapshot: &UsageSnapshot, config: &DisplayConfig) -> String {
    let tokens = format_metrics(snapshot, config);
    if tokens.is_empty() {
        NO_METRICS.to_string()
    } else {
        tokens.join(SEPARATOR)
    }
}

/// Compact token count: `1.5M`, `2.5K`, or the plain integer.
#[must_use]
pub fn format_tokens(tokens: u64) -> String {
    if tokens >= 1_000_000 {
        format!("{:.1}M", tokens as f64 / 1_000_000.0)
    } else if tokens >= 1_000 {
        format!("{:.1}K", tokens as f64 / 1_000.0)
    } else {
        tokens.to_string()
    }
}

/// Local reset time as "month day, hour:minute AM/PM", e.g. `Mar 4, 3:07 PM`.
#[must_use]
pub fn format_reset_label(snapshot: &UsageSnapshot) -> String {
    snapshot.reset_at.format("%b %-d, %-I:%M %p").to_string()
}
