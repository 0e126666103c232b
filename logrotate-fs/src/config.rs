//! Writer configuration.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use logrotate_clock::SystemClock;

use crate::error::ConfigError;
use crate::naming::{FileNamer, TimestampNamer};
use crate::rotation::RotationPolicy;

/// Default number of payloads the queue holds before producers block.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Default cadence of the idle lifetime check.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_millis(100);

/// Configuration for a [`Writer`](crate::Writer).
#[derive(Clone)]
pub struct WriterConfig {
    /// Directory that receives the files. Created if absent.
    pub directory: PathBuf,

    /// Maximum bytes per file. 0 = unbounded.
    pub max_file_size: u64,

    /// Maximum time a file stays the write target. Zero disables it.
    pub max_lifetime: Duration,

    /// Generates the name of each new file.
    pub namer: Arc<dyn FileNamer>,

    /// Payloads buffered between producers and the drain thread.
    pub queue_capacity: usize,

    /// How often an idle drain thread checks the lifetime.
    pub check_interval: Duration,
}

impl WriterConfig {
    /// Config with no rotation thresholds and the default namer.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            max_file_size: 0,
            max_lifetime: Duration::ZERO,
            namer: Arc::new(TimestampNamer::new(SystemClock)),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            check_interval: DEFAULT_CHECK_INTERVAL,
        }
    }

    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    pub fn with_max_lifetime(mut self, lifetime: Duration) -> Self {
        self.max_lifetime = lifetime;
        self
    }

    pub fn with_namer(mut self, namer: impl FileNamer + 'static) -> Self {
        self.namer = Arc::new(namer);
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// The rotation thresholds of this config.
    pub fn policy(&self) -> RotationPolicy {
        RotationPolicy::new(self.max_file_size, self.max_lifetime)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.directory.as_os_str().is_empty() {
            return Err(ConfigError::EmptyDirectory);
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::ZeroQueueCapacity);
        }
        if self.check_interval.is_zero() {
            return Err(ConfigError::ZeroCheckInterval);
        }
        Ok(())
    }
}

impl fmt::Debug for WriterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriterConfig")
            .field("directory", &self.directory)
            .field("max_file_size", &self.max_file_size)
            .field("max_lifetime", &self.max_lifetime)
            .field("queue_capacity", &self.queue_capacity)
            .field("check_interval", &self.check_interval)
            .finish_non_exhaustive()
    }
}
