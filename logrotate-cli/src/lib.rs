//! `logrotate-pipe` CLI.
//!
//! This crate provides the command-line front end of the rotating writer: it
//! parses arguments, pumps stdin into a `logrotate_fs::Writer`, and maps
//! failures to exit codes.

pub mod cli;
pub mod exit;
pub mod pump;
pub mod signal;

pub use cli::{parse_from, Cli, CliError, Naming, DEFAULT_CHECK_INTERVAL_MS, DEFAULT_DIR};
pub use pump::{execute_pump, pump_lines, CommandError, PumpStats};
pub use signal::{NeverShutdown, ShutdownCheck, ShutdownFlag, StopAfter};
