//! Signal handling: SIGTERM/SIGINT graceful shutdown, SIGUSR1 immediate refresh.
//!
//! Uses the `signal-hook` crate for safe signal registration. The monitor
//! loop polls `SignalHandler` flags each iteration rather than blocking on
//! signals.

#![allow(missing_docs)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use signal_hook::consts::{SIGINT, SIGTERM};

/// Signal state shared between the OS hooks and the monitor loop.
///
/// Flags use `Ordering::Relaxed`: the loop polls them every iteration and
/// no other memory is published through them.
#[derive(Clone)]
pub struct SignalHandler {
    shutdown_flag: Arc<AtomicBool>,
    refresh_flag: Arc<AtomicBool>,
}

impl SignalHandler {
    /// Create a handler and register OS signal hooks.
    ///
    /// Registration is best-effort; failures are reported on stderr.
    pub fn new() -> Self {
        let handler = Self::unregistered();
        handler.register_signals();
        handler
    }

    /// A handler driven only by the `request_*` methods.
    pub fn unregistered() -> Self {
        Self {
            shutdown_flag: Arc::new(AtomicBool::new(false)),
            refresh_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn should_shutdown(&self) -> bool {
        self.shutdown_flag.load(Ordering::Relaxed)
    }

    /// Check (and clear) whether an immediate refresh has been requested.
    pub fn should_refresh(&self) -> bool {
        self.refresh_flag.swap(false, Ordering::Relaxed)
    }

    pub fn request_shutdown(&self) {
        self.shutdown_flag.store(true, Ordering::Relaxed);
    }

    pub fn request_refresh(&self) {
        self.refresh_flag.store(true, Ordering::Relaxed);
    }

    fn register_signals(&self) {
        if let Err(e) = signal_hook::flag::register(SIGTERM, Arc::clone(&self.shutdown_flag)) {
            eprintln!("[CCM-SIGNAL] failed to register SIGTERM: {e}");
        }
        if let Err(e) = signal_hook::flag::register(SIGINT, Arc::clone(&self.shutdown_flag)) {
            eprintln!("[CCM-SIGNAL] failed to register SIGINT: {e}");
        }

        #[cfg(unix)]
        {
            use signal_hook::consts::SIGUSR1;
            if let Err(e) = signal_hook::flag::register(SIGUSR1, Arc::clone(&self.refresh_flag)) {
                eprintln!("[CCM-SIGNAL] failed to register SIGUSR1: {e}");
            }
        }
    }
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new()
    }
}
