//! `logrotate-pipe` binary.
//!
//! Reads stdin line by line into size- and time-rotated files.

use std::io;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use logrotate_cli::exit::{codes, exit_code};
use logrotate_cli::{execute_pump, Cli, ShutdownFlag};
use logrotate_fs::StderrLogger;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Ctrl+C stops reading; the writer still drains and closes.
    let shutdown = ShutdownFlag::new();
    let logger = Arc::new(StderrLogger::new(cli.verbosity()));

    let stdin = io::stdin();
    match execute_pump(&cli, stdin.lock(), logger, &shutdown) {
        Ok(stats) => {
            println!(
                "Wrote {} lines ({} bytes) to {}{}",
                stats.lines,
                stats.bytes,
                cli.dir.display(),
                if stats.interrupted { ", interrupted" } else { "" }
            );
            ExitCode::from(codes::SUCCESS as u8)
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(exit_code(&e) as u8)
        }
    }
}
