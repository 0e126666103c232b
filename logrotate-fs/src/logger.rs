//! Diagnostic logging for the writer.
//!
//! Failures that happen after a payload was accepted cannot be returned to the
//! caller of `write`, so they are reported through this trait instead. No
//! global logger and no external log crate: the writer is handed its logger at
//! construction, and tests swap in [`MockLogger`] to assert on diagnostics.

use std::io::Write;
use std::sync::{Arc, RwLock};

use chrono::{SecondsFormat, Utc};

/// Verbosity level for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    /// Failures (always shown)
    Normal,
    /// File opens and rotations (-v flag)
    Verbose,
    /// Drain loop lifecycle (-vv flag)
    Debug,
}

impl Verbosity {
    /// Create verbosity from CLI flag count.
    pub fn from_count(count: u8) -> Self {
        match count {
            0 => Verbosity::Normal,
            1 => Verbosity::Verbose,
            _ => Verbosity::Debug,
        }
    }
}

/// Trait for diagnostic output.
///
/// Called from the drain thread as well as producer threads, so
/// implementations must be thread-safe.
pub trait Logger: Send + Sync {
    /// Log a message at the given verbosity level.
    fn log(&self, level: Verbosity, message: &str);

    /// Log at normal level (always visible).
    fn info(&self, message: &str) {
        self.log(Verbosity::Normal, message);
    }

    /// Log at verbose level (requires -v).
    fn verbose(&self, message: &str) {
        self.log(Verbosity::Verbose, message);
    }

    /// Log at debug level (requires -vv).
    fn debug(&self, message: &str) {
        self.log(Verbosity::Debug, message);
    }
}

impl<L: Logger + ?Sized> Logger for Arc<L> {
    fn log(&self, level: Verbosity, message: &str) {
        (**self).log(level, message);
    }
}

/// Logger that writes timestamped lines to stderr.
#[derive(Debug)]
pub struct StderrLogger {
    level: Verbosity,
}

impl StderrLogger {
    /// Create a new stderr logger with the given verbosity level.
    pub fn new(level: Verbosity) -> Self {
        Self { level }
    }

    /// Create a logger that only shows failures.
    pub fn normal() -> Self {
        Self::new(Verbosity::Normal)
    }
}

impl Default for StderrLogger {
    fn default() -> Self {
        Self::normal()
    }
}

impl Logger for StderrLogger {
    fn log(&self, level: Verbosity, message: &str) {
        if level <= self.level {
            let ts = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
            let _ = writeln!(std::io::stderr(), "{} logrotate: {}", ts, message);
        }
    }
}

/// A captured log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: Verbosity,
    pub message: String,
}

/// Mock logger for testing that captures all messages.
/// Cloning creates a new handle to the same captured entries.
#[derive(Debug, Clone, Default)]
pub struct MockLogger {
    messages: Arc<RwLock<Vec<LogEntry>>>,
}

impl MockLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all captured log entries.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.messages.read().unwrap().clone()
    }

    /// Get all captured messages (just the text).
    pub fn messages(&self) -> Vec<String> {
        self.entries().into_iter().map(|e| e.message).collect()
    }

    /// Get messages at a specific level.
    pub fn messages_at_level(&self, level: Verbosity) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|e| e.level == level)
            .map(|e| e.message)
            .collect()
    }

    /// Check if any message contains the given substring.
    pub fn contains(&self, substring: &str) -> bool {
        self.count_containing(substring) > 0
    }

    /// Count messages containing the given substring.
    pub fn count_containing(&self, substring: &str) -> usize {
        self.messages
            .read()
            .unwrap()
            .iter()
            .filter(|e| e.message.contains(substring))
            .count()
    }
}

impl Logger for MockLogger {
    fn log(&self, level: Verbosity, message: &str) {
        // Capture regardless of level so tests see everything that would be logged
        self.messages.write().unwrap().push(LogEntry {
            level,
            message: message.to_string(),
        });
    }
}

/// A no-op logger that discards all messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn log(&self, _level: Verbosity, _message: &str) {}
}
