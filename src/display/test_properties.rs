//! Property-based tests for the display option state machine.
//!
//! Arbitrary sequences of option toggles and orientation flips must keep the
//! money/left rule, emit exactly one event per accepted change, and keep the
//! menu description consistent with the configuration.

use crossbeam_channel::unbounded;
use proptest::prelude::*;

use super::menu::{MenuDescription, orientation_label};
use super::options::{DisplayOption, Orientation};
use super::state::{ConfigChange, DisplayStateMachine};

#[derive(Debug, Clone, Copy)]
enum Action {
    Toggle(DisplayOption),
    Orientation,
}

fn arb_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        4 => prop::sample::select(DisplayOption::ALL.to_vec()).prop_map(Action::Toggle),
        1 => Just(Action::Orientation),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Money is never enabled while showing what is left.
    #[test]
    fn money_never_enabled_under_left(actions in prop::collection::vec(arb_action(), 1..60)) {
        let mut machine = DisplayStateMachine::new();
        for action in actions {
            match action {
                Action::Toggle(option) => { machine.toggle(option); }
                Action::Orientation => { machine.toggle_orientation(); }
            }
            let cfg = machine.current_config();
            if cfg.orientation() == Orientation::Left {
                prop_assert!(!cfg.is_enabled(DisplayOption::Money));
                prop_assert!(!machine.is_available(DisplayOption::Money));
            }
        }
    }

    /// Each accepted mutation reaches the subscriber exactly once, and a
    /// rejected toggle changes nothing.
    #[test]
    fn one_event_per_accepted_change(actions in prop::collection::vec(arb_action(), 1..60)) {
        let (tx, rx) = unbounded::<ConfigChange>();
        let mut machine = DisplayStateMachine::new();
        machine.subscribe(tx);
        let mut accepted = 0usize;
        for action in actions {
            let before = machine.current_config();
            match action {
                Action::Toggle(option) => match machine.toggle(option) {
                    Some(ConfigChange::OptionToggled { option: o, enabled }) => {
                        accepted += 1;
                        prop_assert_eq!(o, option);
                        prop_assert_eq!(enabled, machine.current_config().is_enabled(option));
                    }
                    Some(other) => prop_assert!(false, "unexpected change {:?}", other),
                    None => prop_assert_eq!(before, machine.current_config()),
                },
                Action::Orientation => {
                    machine.toggle_orientation();
                    accepted += 1;
                    prop_assert_eq!(
                        machine.current_config().orientation(),
                        before.orientation().flipped()
                    );
                }
            }
        }
        prop_assert_eq!(rx.try_iter().count(), accepted);
    }

    /// The menu mirrors the configuration it was built from.
    #[test]
    fn menu_matches_config(actions in prop::collection::vec(arb_action(), 0..40)) {
        let mut machine = DisplayStateMachine::new();
        for action in actions {
            match action {
                Action::Toggle(option) => { machine.toggle(option); }
                Action::Orientation => { machine.toggle_orientation(); }
            }
        }
        let cfg = machine.current_config();
        let menu = MenuDescription::build(&cfg, None);
        prop_assert_eq!(menu.toggles.len(), DisplayOption::ALL.len());
        for item in &menu.toggles {
            prop_assert_eq!(item.checked, cfg.is_enabled(item.option));
            prop_assert_eq!(item.enabled, cfg.is_available(item.option));
        }
        prop_assert_eq!(menu.orientation_label, orientation_label(cfg.orientation()));
    }
}
