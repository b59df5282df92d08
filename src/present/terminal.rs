//! Terminal presenter: one status line per publication, numbered menu on demand.

use std::io::{self, Write};

use super::Presenter;
use crate::display::menu::MenuDescription;

/// Writes status updates to a terminal (or any writer).
pub struct TerminalPresenter<W: Write> {
    out: W,
    #[cfg_attr(not(feature = "cli"), allow(dead_code))]
    color: bool,
    menu_on_change: bool,
    last_status: Option<String>,
    last_menu: Option<MenuDescription>,
}

impl TerminalPresenter<io::Stdout> {
    /// Presenter on stdout.
    #[must_use]
    pub fn stdout(color: bool, menu_on_change: bool) -> Self {
        Self::new(io::stdout(), color, menu_on_change)
    }
}

impl<W: Write> TerminalPresenter<W> {
    /// Presenter on `out`. With `menu_on_change`, the menu is reprinted
    /// whenever its content differs from the last one printed.
    pub fn new(out: W, color: bool, menu_on_change: bool) -> Self {
        Self {
            out,
            color,
            menu_on_change,
            last_status: None,
            last_menu: None,
        }
    }

    /// Print the most recent menu (the `m` command).
    pub fn print_menu(&mut self) {
        if let Some(menu) = self.last_menu.clone() {
            self.write_menu(&menu);
        }
    }

    /// Most recently published status.
    #[must_use]
    pub fn last_status(&self) -> Option<&str> {
        self.last_status.as_deref()
    }

    /// Consume the presenter and return the writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_menu(&mut self, menu: &MenuDescription) {
        let text = render_menu(menu);
        // Terminal output failures are not actionable here.
        let _ = self.out.write_all(text.as_bytes());
        let _ = self.out.flush();
    }

    fn styled_status(&self, status: &str) -> String {
        #[cfg(feature = "cli")]
        if self.color {
            use colored::Colorize;
            return status.bold().to_string();
        }
        status.to_string()
    }
}

impl<W: Write> Presenter for TerminalPresenter<W> {
    fn publish(&mut self, status: &str, menu: &MenuDescription) {
        let ts = chrono::Local::now().format("%H:%M:%S");
        let line = format!("[{ts}] {}\n", self.styled_status(status));
        let _ = self.out.write_all(line.as_bytes());
        let _ = self.out.flush();

        let menu_changed = self.last_menu.as_ref() != Some(menu);
        if self.menu_on_change && menu_changed {
            self.write_menu(menu);
        }
        self.last_status = Some(status.to_string());
        self.last_menu = Some(menu.clone());
    }

    fn show_menu(&mut self) {
        self.print_menu();
    }
}

/// Plain-text menu. Toggle entries are numbered 1-4, matching the
/// interactive commands.
#[must_use]
pub fn render_menu(menu: &MenuDescription) -> String {
    let mut out = String::new();
    if let Some(header) = &menu.header {
        out.push_str(&format!("  {header}\n"));
        out.push_str("  ----\n");
    }
    out.push_str(&format!("  [r] {}\n", menu.refresh_label));
    for (idx, item) in menu.toggles.iter().enumerate() {
        let mark = if item.checked { "x" } else { " " };
        let suffix = if item.enabled { "" } else { " (unavailable)" };
        out.push_str(&format!(
            "  [{}] [{mark}] {}{suffix}\n",
            idx + 1,
            item.label
        ));
    }
    out.push_str(&format!("  [o] {}\n", menu.orientation_label));
    out.push_str(&format!("  [q] {}\n", menu.quit_label));
    out
}
