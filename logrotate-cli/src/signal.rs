//! Ctrl+C handling for the stdin pump.
//!
//! SIGINT does not kill the process: it sets a [`ShutdownFlag`] that the pump
//! checks between lines, so the writer still drains and closes its last file.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Polled by the pump between lines.
pub trait ShutdownCheck: Send + Sync {
    /// Returns true once shutdown has been requested.
    fn should_stop(&self) -> bool;
}

/// Flag that flips to true on SIGINT.
#[derive(Debug, Clone)]
pub struct ShutdownFlag {
    flag: Arc<AtomicBool>,
}

impl Default for ShutdownFlag {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownFlag {
    /// Create a flag and register it as the process's Ctrl+C handler.
    ///
    /// Registration fails if a handler is already installed; the flag is
    /// still usable through [`trigger`](ShutdownFlag::trigger).
    pub fn new() -> Self {
        let flag = Self::manual();
        let handler_flag = Arc::clone(&flag.flag);

        let _ = ctrlc::set_handler(move || {
            handler_flag.store(true, Ordering::SeqCst);
        });

        flag
    }

    /// Create a flag without touching signal handlers.
    pub fn manual() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request shutdown.
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }
}

impl ShutdownCheck for ShutdownFlag {
    fn should_stop(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Never requests shutdown; the pump runs until EOF.
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverShutdown;

impl ShutdownCheck for NeverShutdown {
    fn should_stop(&self) -> bool {
        false
    }
}

/// Requests shutdown after a fixed number of checks.
#[derive(Debug)]
pub struct StopAfter {
    remaining: AtomicUsize,
}

impl StopAfter {
    /// Allow `checks` calls to `should_stop` to return false.
    pub fn new(checks: usize) -> Self {
        Self {
            remaining: AtomicUsize::new(checks),
        }
    }
}

impl ShutdownCheck for StopAfter {
    fn should_stop(&self) -> bool {
        self.remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_err()
    }
}
