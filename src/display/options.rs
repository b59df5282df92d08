//! Display options, orientation, and the display configuration value.

use std::fmt;

use serde::Serialize;

/// One figure that can appear in the status line.
///
/// Declaration order is display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DisplayOption {
    /// Percentage of the token ceiling.
    Percentage,
    /// Block time (elapsed or remaining).
    TimeLeft,
    /// Token count (used or left).
    Tokens,
    /// Accrued cost in USD.
    Money,
}

impl DisplayOption {
    /// Every option, in display order.
    pub const ALL: [Self; 4] = [Self::Percentage, Self::TimeLeft, Self::Tokens, Self::Money];

    /// Stable machine key.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Percentage => "percentage",
            Self::TimeLeft => "timeLeft",
            Self::Tokens => "tokens",
            Self::Money => "money",
        }
    }

    /// Human-readable menu label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Percentage => "Show Percentage",
            Self::TimeLeft => "Show Time",
            Self::Tokens => "Show Tokens",
            Self::Money => "Show Money",
        }
    }

    /// Look up an option by its machine key (case-insensitive).
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|opt| opt.key().eq_ignore_ascii_case(key.trim()))
    }

    /// 1-based menu position, matching [`DisplayOption::ALL`].
    #[must_use]
    pub fn from_number(n: u8) -> Option<Self> {
        Self::ALL.get(usize::from(n).checked_sub(1)?).copied()
    }

    const fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for DisplayOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Whether figures are reported as consumed or remaining.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Amount consumed.
    #[default]
    Used,
    /// Amount remaining.
    Left,
}

impl Orientation {
    /// The other orientation.
    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            Self::Used => Self::Left,
            Self::Left => Self::Used,
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Used => write!(f, "used"),
            Self::Left => write!(f, "left"),
        }
    }
}

/// Which options are enabled, and the orientation they are reported in.
///
/// Invariant: under [`Orientation::Left`] money is never enabled. The only
/// mutation paths are crate-internal and go through the display state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayConfig {
    enabled: u8,
    orientation: Orientation,
}

impl DisplayConfig {
    /// Build a config from an explicit option set, dropping money under `Left`.
    #[must_use]
    pub fn new(options: &[DisplayOption], orientation: Orientation) -> Self {
        let mut cfg = Self {
            enabled: options.iter().fold(0, |acc, opt| acc | opt.bit()),
            orientation,
        };
        cfg.normalize();
        cfg
    }

    /// Whether `option` is currently enabled.
    #[must_use]
    pub const fn is_enabled(&self, option: DisplayOption) -> bool {
        self.enabled & option.bit() != 0
    }

    /// Current orientation.
    #[must_use]
    pub const fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Enabled options in display order.
    pub fn enabled_options(&self) -> impl Iterator<Item = DisplayOption> + '_ {
        DisplayOption::ALL
            .into_iter()
            .filter(|opt| self.is_enabled(*opt))
    }

    /// Whether `option` may be enabled under the current orientation.
    #[must_use]
    pub fn is_available(&self, option: DisplayOption) -> bool {
        !(option == DisplayOption::Money && self.orientation == Orientation::Left)
    }

    pub(crate) fn flip(&mut self, option: DisplayOption) {
        self.enabled ^= option.bit();
    }

    pub(crate) fn set_orientation(&mut self, orientation: Orientation) {
        self.orientation = orientation;
        self.normalize();
    }

    fn normalize(&mut self) {
        if self.orientation == Orientation::Left {
            self.enabled &= !DisplayOption::Money.bit();
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self::new(
            &[DisplayOption::Percentage, DisplayOption::TimeLeft],
            Orientation::Used,
        )
    }
}

impl Serialize for DisplayConfig {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let enabled: Vec<&str> = self.enabled_options().map(DisplayOption::key).collect();
        let mut state = serializer.serialize_struct("DisplayConfig", 2)?;
        state.serialize_field("enabled", &enabled)?;
        state.serialize_field("orientation", &self.orientation)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_enables_percentage_and_time() {
        let cfg = DisplayConfig::default();
        let enabled: Vec<_> = cfg.enabled_options().collect();
        assert_eq!(
            enabled,
            vec![DisplayOption::Percentage, DisplayOption::TimeLeft]
        );
        assert_eq!(cfg.orientation(), Orientation::Used);
    }

    #[test]
    fn enabled_options_follow_declaration_order() {
        let cfg = DisplayConfig::new(
            &[
                DisplayOption::Money,
                DisplayOption::Percentage,
                DisplayOption::Tokens,
            ],
            Orientation::Used,
        );
        let enabled: Vec<_> = cfg.enabled_options().collect();
        assert_eq!(
            enabled,
            vec![
                DisplayOption::Percentage,
                DisplayOption::Tokens,
                DisplayOption::Money
            ]
        );
    }

    #[test]
    fn constructing_money_under_left_drops_it() {
        let cfg = DisplayConfig::new(&[DisplayOption::Money], Orientation::Left);
        assert!(!cfg.is_enabled(DisplayOption::Money));
        assert_eq!(cfg.enabled_options().count(), 0);
        assert!(!cfg.is_available(DisplayOption::Money));
        assert!(cfg.is_available(DisplayOption::Tokens));
    }

    #[test]
    fn keys_and_numbers_round_trip() {
        for (idx, opt) in DisplayOption::ALL.into_iter().enumerate() {
            assert_eq!(DisplayOption::from_key(opt.key()), Some(opt));
            let n = u8::try_from(idx + 1).expect("small index");
            assert_eq!(DisplayOption::from_number(n), Some(opt));
        }
        assert_eq!(
            DisplayOption::from_key("TIMELEFT"),
            Some(DisplayOption::TimeLeft)
        );
        assert_eq!(DisplayOption::from_key("cost"), None);
        assert_eq!(DisplayOption::from_number(0), None);
        assert_eq!(DisplayOption::from_number(5), None);
    }

    #[test]
    fn serializes_as_keys() {
        let cfg = DisplayConfig::new(&[DisplayOption::Tokens], Orientation::Left);
        let json = serde_json::to_value(cfg).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({ "enabled": ["tokens"], "orientation": "left" })
        );
    }
}
