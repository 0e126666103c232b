//! Exit codes for `logrotate-pipe`.
//!
//! Following Unix conventions for exit codes.

use logrotate_fs::WriterError;

use crate::pump::CommandError;

/// Exit code constants.
pub mod codes {
    /// Successful execution, including a clean stop on SIGINT.
    pub const SUCCESS: i32 = 0;
    /// Invalid arguments.
    pub const INVALID_ARGS: i32 = 1;
    /// IO error (reading input, creating the directory).
    pub const IO_ERROR: i32 = 2;
    /// The writer failed to accept or persist data.
    pub const WRITER_ERROR: i32 = 3;
}

/// Map a CommandError to an exit code.
pub fn exit_code(error: &CommandError) -> i32 {
    match error {
        CommandError::InvalidArgument(_) => codes::INVALID_ARGS,
        CommandError::Read(_) => codes::IO_ERROR,
        CommandError::Writer(WriterError::Config(_)) => codes::INVALID_ARGS,
        CommandError::Writer(WriterError::CreateDirectory { .. }) => codes::IO_ERROR,
        CommandError::Writer(_) => codes::WRITER_ERROR,
    }
}
