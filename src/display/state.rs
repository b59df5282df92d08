//! Display option state machine.
//!
//! Owns the single [`DisplayConfig`] of the process. Every mutation goes
//! through [`DisplayStateMachine::toggle`] or
//! [`DisplayStateMachine::toggle_orientation`], which enforce the money/left
//! dependency at toggle time and emit a [`ConfigChange`] for each accepted
//! mutation. Runs on the control thread only; no interior locking.

use crossbeam_channel::Sender;
use serde::Serialize;

use super::options::{DisplayConfig, DisplayOption, Orientation};

/// A change accepted by the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConfigChange {
    /// An option was switched on or off.
    OptionToggled {
        option: DisplayOption,
        enabled: bool,
    },
    /// Orientation flipped. `money_forced_off` is set when entering `Left`
    /// switched an enabled money option off.
    OrientationChanged {
        orientation: Orientation,
        money_forced_off: bool,
    },
}

/// State machine over the enabled-option set and the orientation flag.
#[derive(Debug, Default)]
pub struct DisplayStateMachine {
    config: DisplayConfig,
    subscriber: Option<Sender<ConfigChange>>,
}

impl DisplayStateMachine {
    /// Start from the fixed default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an explicit configuration (normalized on construction).
    #[must_use]
    pub fn with_config(config: DisplayConfig) -> Self {
        Self {
            config,
            subscriber: None,
        }
    }

    /// Deliver every future change event to `tx` as well as returning it.
    pub fn subscribe(&mut self, tx: Sender<ConfigChange>) {
        self.subscriber = Some(tx);
    }

    /// Read-only copy of the current configuration.
    #[must_use]
    pub fn current_config(&self) -> DisplayConfig {
        self.config
    }

    /// Whether `option` can currently be toggled.
    #[must_use]
    pub fn is_available(&self, option: DisplayOption) -> bool {
        self.config.is_available(option)
    }

    /// Flip `option`. Money under `Left` is rejected silently: no state
    /// change, no event, `None` returned.
    pub fn toggle(&mut self, option: DisplayOption) -> Option<ConfigChange> {
        if !self.config.is_available(option) {
            return None;
        }
        self.config.flip(option);
        let change = ConfigChange::OptionToggled {
            option,
            enabled: self.config.is_enabled(option),
        };
        self.emit(change);
        Some(change)
    }

    /// Flip between `Used` and `Left`. Entering `Left` forces money off.
    pub fn toggle_orientation(&mut self) -> ConfigChange {
        let had_money = self.config.is_enabled(DisplayOption::Money);
        let orientation = self.config.orientation().flipped();
        self.config.set_orientation(orientation);
        let change = ConfigChange::OrientationChanged {
            orientation,
            money_forced_off: had_money && !self.config.is_enabled(DisplayOption::Money),
        };
        self.emit(change);
        change
    }

    fn emit(&self, change: ConfigChange) {
        if let Some(tx) = &self.subscriber {
            // Full: a refresh is already queued and will read the latest config.
            // Disconnected: nobody is listening any more.
            let _ = tx.try_send(change);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    #[test]
    fn toggle_flips_and_reports() {
        let mut sm = DisplayStateMachine::new();
        let change = sm.toggle(DisplayOption::Tokens);
        assert_eq!(
            change,
            Some(ConfigChange::OptionToggled {
                option: DisplayOption::Tokens,
                enabled: true
            })
        );
        assert!(sm.current_config().is_enabled(DisplayOption::Tokens));

        sm.toggle(DisplayOption::Tokens);
        assert!(!sm.current_config().is_enabled(DisplayOption::Tokens));
    }

    #[test]
    fn money_toggle_rejected_under_left() {
        let mut sm = DisplayStateMachine::new();
        sm.toggle_orientation();
        let before = sm.current_config();
        assert_eq!(sm.toggle(DisplayOption::Money), None);
        assert_eq!(sm.current_config(), before);
        assert!(!sm.current_config().is_enabled(DisplayOption::Money));
        assert!(!sm.is_available(DisplayOption::Money));
    }

    #[test]
    fn entering_left_forces_money_off() {
        let mut sm = DisplayStateMachine::new();
        sm.toggle(DisplayOption::Money);
        assert!(sm.current_config().is_enabled(DisplayOption::Money));

        let change = sm.toggle_orientation();
        assert_eq!(
            change,
            ConfigChange::OrientationChanged {
                orientation: Orientation::Left,
                money_forced_off: true
            }
        );
        assert!(!sm.current_config().is_enabled(DisplayOption::Money));
    }

    #[test]
    fn returning_to_used_does_not_restore_money() {
        let mut sm = DisplayStateMachine::new();
        sm.toggle(DisplayOption::Money);
        sm.toggle_orientation();
        let change = sm.toggle_orientation();
        assert_eq!(
            change,
            ConfigChange::OrientationChanged {
                orientation: Orientation::Used,
                money_forced_off: false
            }
        );
        assert!(!sm.current_config().is_enabled(DisplayOption::Money));
        assert!(sm.is_available(DisplayOption::Money));
        assert!(sm.toggle(DisplayOption::Money).is_some());
    }

    #[test]
    fn other_options_survive_orientation_changes() {
        let mut sm = DisplayStateMachine::new();
        sm.toggle(DisplayOption::Tokens);
        sm.toggle_orientation();
        let cfg = sm.current_config();
        assert!(cfg.is_enabled(DisplayOption::Percentage));
        assert!(cfg.is_enabled(DisplayOption::TimeLeft));
        assert!(cfg.is_enabled(DisplayOption::Tokens));
        assert_eq!(cfg.orientation(), Orientation::Left);
    }

    #[test]
    fn subscriber_receives_accepted_changes_only() {
        let (tx, rx) = bounded(8);
        let mut sm = DisplayStateMachine::new();
        sm.subscribe(tx);

        sm.toggle(DisplayOption::Tokens);
        sm.toggle_orientation();
        sm.toggle(DisplayOption::Money);

        let events: Vec<ConfigChange> = rx.try_iter().collect();
        assert_eq!(events.len(), 2, "rejected money toggle must not emit");
        assert!(matches!(events[0], ConfigChange::OptionToggled { .. }));
        assert!(matches!(events[1], ConfigChange::OrientationChanged { .. }));
    }

    #[test]
    fn full_subscriber_channel_does_not_block_toggles() {
        let (tx, rx) = bounded(1);
        let mut sm = DisplayStateMachine::new();
        sm.subscribe(tx);
        for _ in 0..5 {
            sm.toggle(DisplayOption::Tokens);
        }
        assert_eq!(rx.try_iter().count(), 1);
        assert!(sm.current_config().is_enabled(DisplayOption::Tokens));
    }
}
