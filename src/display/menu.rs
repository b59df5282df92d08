//! Structured menu description handed to the presentation layer.

#![allow(missing_docs)]

use serde::Serialize;

use super::options::{DisplayConfig, DisplayOption, Orientation};
use crate::usage::format::format_reset_label;
use crate::usage::snapshot::UsageSnapshot;

/// One toggle entry per display option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToggleItem {
    pub option: DisplayOption,
    pub label: &'static str,
    /// Checkmark state.
    pub checked: bool,
    /// False when the entry is greyed out (money under `Left`).
    pub enabled: bool,
}

/// Everything the presentation layer needs to render the menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuDescription {
    /// Informational, non-interactive header (`Next reset: ...`).
    pub header: Option<String>,
    pub refresh_label: &'static str,
    pub toggles: Vec<ToggleItem>,
    pub orientation_label: &'static str,
    pub quit_label: &'static str,
}

impl MenuDescription {
    /// Build the menu for `config`, with a reset header when a snapshot exists.
    #[must_use]
    pub fn build(config: &DisplayConfig, snapshot: Option<&UsageSnapshot>) -> Self {
        let toggles = DisplayOption::ALL
            .into_iter()
            .map(|option| {
                let enabled = config.is_available(option);
                ToggleItem {
                    option,
                    label: option.label(),
                    checked: enabled && config.is_enabled(option),
                    enabled,
                }
            })
            .collect();

        Self {
            header: snapshot.map(|s| format!("Next reset: {}", format_reset_label(s))),
            refresh_label: "Refresh",
            toggles,
            orientation_label: orientation_label(config.orientation()),
            quit_label: "Quit",
        }
    }

    /// Toggle entry for `option`.
    #[must_use]
    pub fn toggle(&self, option: DisplayOption) -> Option<&ToggleItem> {
        self.toggles.iter().find(|t| t.option == option)
    }
}

/// Label of the orientation entry: it names the switch it performs.
#[must_use]
pub const fn orientation_label(orientation: Orientation) -> &'static str {
    match orientation {
        Orientation::Used => "Show left instead of used",
        Orientation::Left => "Show used instead of left",
    }
}
