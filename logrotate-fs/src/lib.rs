//! Application-side rotating file writer.
//!
//! This crate provides:
//! - [`Writer`], a concurrency-safe sink whose payloads are appended to files
//!   in a directory, rotated by size and by lifetime
//! - Filesystem trait so the drain thread can run against a mock in tests
//! - File naming schemes (timestamped or sequential)
//! - Pure rotation decision logic
//!
//! ```no_run
//! use std::time::Duration;
//! use logrotate_fs::{Writer, WriterConfig};
//!
//! let writer = Writer::new(
//!     WriterConfig::new("/var/log/app")
//!         .with_max_file_size(64 * 1024 * 1024)
//!         .with_max_lifetime(Duration::from_secs(3600)),
//! )?;
//! writer.write(b"hello\n")?;
//! writer.close()?;
//! # Ok::<(), logrotate_fs::WriterError>(())
//! ```

pub mod config;
pub mod drain;
pub mod error;
pub mod filesystem;
pub mod logger;
pub mod naming;
pub mod rotation;
pub mod writer;

pub use config::{WriterConfig, DEFAULT_CHECK_INTERVAL, DEFAULT_QUEUE_CAPACITY};
pub use error::{ConfigError, FsError, WriterError};
pub use filesystem::{Filesystem, LogFile, MockFilesystem, RealFilesystem};
pub use logger::{LogEntry, Logger, MockLogger, NullLogger, StderrLogger, Verbosity};
pub use naming::{
    parse_timestamp_filename, timestamp_filename, FileNamer, SequenceNamer, TimestampNamer,
};
pub use rotation::{RotationDecision, RotationPolicy, RotationReason};
pub use writer::Writer;
