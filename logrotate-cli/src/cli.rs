//! CLI argument parsing for `logrotate-pipe`.
//!
//! Maps command-line flags onto a [`WriterConfig`].

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser, ValueEnum};
use logrotate_fs::{SequenceNamer, Verbosity, WriterConfig, DEFAULT_QUEUE_CAPACITY};
use thiserror::Error;

/// Default directory for rotated files.
pub const DEFAULT_DIR: &str = "./logs";

/// Default idle lifetime check in milliseconds.
pub const DEFAULT_CHECK_INTERVAL_MS: u64 = 100;

/// Prefix used by the sequence naming scheme.
pub const SEQUENCE_PREFIX: &str = "log";

/// Errors from CLI argument validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CliError {
    #[error("queue-capacity must be at least 1, got {0}")]
    InvalidQueueCapacity(usize),

    #[error("check-interval-ms must be at least 1, got {0}")]
    InvalidCheckInterval(u64),

    #[error("dir must not be empty")]
    EmptyDirectory,
}

/// How new files are named.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Naming {
    /// RFC3339 UTC timestamp plus a random suffix.
    #[default]
    Timestamp,
    /// Zero-padded counter: log-000001.log, log-000002.log, ...
    Sequence,
}

/// Pipe stdin into size- and time-rotated log files.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "logrotate-pipe")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Directory that receives the files. Created if missing.
    #[arg(short, long, default_value = DEFAULT_DIR)]
    pub dir: PathBuf,

    /// Maximum bytes per file. 0 disables size rotation.
    #[arg(long, default_value_t = 0)]
    pub max_size: u64,

    /// Maximum milliseconds a file stays open. 0 disables lifetime rotation.
    #[arg(long, default_value_t = 0)]
    pub max_lifetime_ms: u64,

    /// Lines buffered before reading stdin blocks.
    #[arg(long, default_value_t = DEFAULT_QUEUE_CAPACITY)]
    pub queue_capacity: usize,

    /// How often an idle writer checks the file lifetime, in milliseconds.
    #[arg(long, default_value_t = DEFAULT_CHECK_INTERVAL_MS)]
    pub check_interval_ms: u64,

    /// File naming scheme.
    #[arg(long, value_enum, default_value_t = Naming::Timestamp)]
    pub naming: Naming,

    /// Increase diagnostic output (-v, -vv).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Validate the arguments.
    pub fn validate(&self) -> Result<(), CliError> {
        if self.dir.as_os_str().is_empty() {
            return Err(CliError::EmptyDirectory);
        }
        if self.queue_capacity == 0 {
            return Err(CliError::InvalidQueueCapacity(self.queue_capacity));
        }
        if self.check_interval_ms == 0 {
            return Err(CliError::InvalidCheckInterval(self.check_interval_ms));
        }
        Ok(())
    }

    /// Verbosity selected by the `-v` count.
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_count(self.verbose)
    }

    /// Build the writer configuration.
    pub fn to_writer_config(&self) -> WriterConfig {
        let config = WriterConfig::new(&self.dir)
            .with_max_file_size(self.max_size)
            .with_max_lifetime(Duration::from_millis(self.max_lifetime_ms))
            .with_queue_capacity(self.queue_capacity)
            .with_check_interval(Duration::from_millis(self.check_interval_ms));

        match self.naming {
            Naming::Timestamp => config,
            Naming::Sequence => config.with_namer(SequenceNamer::new(SEQUENCE_PREFIX)),
        }
    }
}

/// Parse CLI arguments from an iterator of strings.
/// Useful for testing.
pub fn parse_from<I, T>(iter: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(iter)
}
