//! Presentation adapters: where status strings and menu descriptions go.
//!
//! The core only ever calls [`Presenter::publish`], and only from the
//! control thread.

pub mod terminal;

use std::sync::Arc;

use parking_lot::Mutex;

use crate::display::menu::MenuDescription;

pub use terminal::TerminalPresenter;

/// Receives every status update together with the matching menu.
pub trait Presenter {
    /// Show `status` persistently and replace the menu with `menu`.
    fn publish(&mut self, status: &str, menu: &MenuDescription);

    /// Explicit request to display the current menu again.
    fn show_menu(&mut self) {}
}

/// One recorded publication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    /// Status string as published.
    pub status: String,
    /// Menu published alongside it.
    pub menu: MenuDescription,
}

/// Records publications in memory. Clones share the same log, so a test can
/// keep one handle while the monitor owns the other.
#[derive(Debug, Clone, Default)]
pub struct RecordingPresenter {
    log: Arc<Mutex<Vec<Publication>>>,
}

impl RecordingPresenter {
    /// Empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every publication so far, oldest first.
    #[must_use]
    pub fn publications(&self) -> Vec<Publication> {
        self.log.lock().clone()
    }

    /// Status strings only.
    #[must_use]
    pub fn statuses(&self) -> Vec<String> {
        self.log.lock().iter().map(|p| p.status.clone()).collect()
    }

    /// Most recent publication.
    #[must_use]
    pub fn last(&self) -> Option<Publication> {
        self.log.lock().last().cloned()
    }
}

impl Presenter for RecordingPresenter {
    fn publish(&mut self, status: &str, menu: &MenuDescription) {
        self.log.lock().push(Publication {
            status: status.to_string(),
            menu: menu.clone(),
        });
    }
}
