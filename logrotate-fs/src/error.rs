//! Error types for the rotating writer.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors from filesystem operations.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("file already exists: {}", .0.display())]
    AlreadyExists(PathBuf),
}

/// Errors from validating a [`WriterConfig`](crate::WriterConfig).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("directory must not be empty")]
    EmptyDirectory,

    #[error("queue capacity must be at least 1")]
    ZeroQueueCapacity,

    #[error("rotation check interval must be greater than zero")]
    ZeroCheckInterval,
}

/// Errors returned to callers of [`Writer`](crate::Writer).
///
/// Failures that happen after a payload has been accepted are never returned
/// here; they only reach the writer's [`Logger`](crate::Logger).
#[derive(Debug, Error)]
pub enum WriterError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to create directory {}: {source}", .path.display())]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: FsError,
    },

    #[error("failed to start drain thread: {0}")]
    Spawn(#[source] io::Error),

    #[error("writer is closing")]
    Closing,

    #[error("drain thread is gone")]
    ConsumerGone,

    #[error("drain thread panicked")]
    ConsumerPanicked,

    #[error("failed to sync file {}: {source}", .path.display())]
    Sync {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Closing the last file failed.
    ///
    /// Only reported by filesystems that can observe close failures;
    /// [`RealFilesystem`](crate::RealFilesystem) surfaces them through
    /// [`WriterError::Sync`] instead.
    #[error("failed to close file {}: {source}", .path.display())]
    Close {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl From<WriterError> for io::Error {
    fn from(err: WriterError) -> Self {
        match err {
            WriterError::Closing | WriterError::ConsumerGone => {
                io::Error::new(io::ErrorKind::BrokenPipe, err)
            }
            WriterError::Sync { source, .. } | WriterError::Close { source, .. } => source,
            other => io::Error::new(io::ErrorKind::Other, other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fs_error_already_exists_display() {
        let err = FsError::AlreadyExists(PathBuf::from("/tmp/logs/a.log"));
        assert_eq!(err.to_string(), "file already exists: /tmp/logs/a.log");
    }

    #[test]
    fn test_writer_error_sync_and_close_are_distinct() {
        let sync = WriterError::Sync {
            path: PathBuf::from("a.log"),
            source: io::Error::new(io::ErrorKind::Other, "disk gone"),
        };
        let close = WriterError::Close {
            path: PathBuf::from("a.log"),
            source: io::Error::new(io::ErrorKind::Other, "disk gone"),
        };

        assert_eq!(sync.to_string(), "failed to sync file a.log: disk gone");
        assert_eq!(close.to_string(), "failed to close file a.log: disk gone");
    }

    #[test]
    fn test_closing_maps_to_broken_pipe() {
        let err: io::Error = WriterError::Closing.into();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert!(err.to_string().contains("writer is closing"));
    }

    #[test]
    fn test_config_error_converts() {
        let err: WriterError = ConfigError::ZeroQueueCapacity.into();
        assert!(matches!(err, WriterError::Config(ConfigError::ZeroQueueCapacity)));
        assert_eq!(
            err.to_string(),
            "invalid configuration: queue capacity must be at least 1"
        );
    }
}
