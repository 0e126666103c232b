//! Copy input lines into a rotating [`Writer`].

use std::io::{self, BufRead};
use std::sync::Arc;

use logrotate_fs::{Logger, Writer, WriterError};
use thiserror::Error;

use crate::cli::{Cli, CliError};
use crate::signal::ShutdownCheck;

/// Errors from running the pump.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("invalid argument: {0}")]
    InvalidArgument(#[from] CliError),

    #[error("failed to read input: {0}")]
    Read(#[source] io::Error),

    #[error("writer error: {0}")]
    Writer(#[from] WriterError),
}

/// What the pump moved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpStats {
    /// Lines accepted by the writer, including a final unterminated one.
    pub lines: u64,
    /// Bytes accepted by the writer, newlines included.
    pub bytes: u64,
    /// Stopped by a shutdown request rather than end of input.
    pub interrupted: bool,
}

/// Write every line of `input` to `writer` until EOF or shutdown.
///
/// Lines keep their trailing newline and are not required to be UTF-8.
/// Shutdown is checked between lines, so a blocked read delays it.
pub fn pump_lines<R: BufRead>(
    mut input: R,
    writer: &Writer,
    shutdown: &dyn ShutdownCheck,
) -> Result<PumpStats, CommandError> {
    let mut stats = PumpStats::default();
    let mut line = Vec::new();

    loop {
        if shutdown.should_stop() {
            stats.interrupted = true;
            break;
        }

        line.clear();
        let n = match input.read_until(b'\n', &mut line) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(CommandError::Read(e)),
        };

        writer.write(&line)?;
        stats.lines += 1;
        stats.bytes += n as u64;
    }

    Ok(stats)
}

/// Validate `cli`, pump `input` through a new writer, and close it.
///
/// The writer is closed even when pumping fails; the pump error wins.
pub fn execute_pump<R: BufRead>(
    cli: &Cli,
    input: R,
    logger: Arc<dyn Logger>,
    shutdown: &dyn ShutdownCheck,
) -> Result<PumpStats, CommandError> {
    cli.validate()?;

    let config = cli.to_writer_config();
    logger.verbose(&format!(
        "writing to {} (max size {} bytes, max lifetime {} ms, naming {:?})",
        config.directory.display(),
        cli.max_size,
        cli.max_lifetime_ms,
        cli.naming
    ));

    let writer = Writer::with_logger(config, Arc::clone(&logger))?;
    let pumped = pump_lines(input, &writer, shutdown);
    let closed = writer.close();

    let stats = pumped?;
    closed?;

    if stats.interrupted {
        logger.info("interrupted, writer drained and closed");
    }
    Ok(stats)
}
