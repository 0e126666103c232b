//! File naming strategies.
//!
//! A [`FileNamer`] produces the file name (not the full path) for each new
//! file the writer opens. Names must never repeat within one writer; the
//! drain loop additionally refuses to reuse an existing path.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, SecondsFormat, Utc};
use logrotate_clock::{Clock, SystemClock};
use uuid::Uuid;

/// Length of the random suffix in default file names.
pub const SUFFIX_LEN: usize = 8;

/// Extension used by the built-in namers.
pub const LOG_EXTENSION: &str = "log";

/// Generates the name of the next file to open.
pub trait FileNamer: Send + Sync {
    fn next_name(&self) -> String;
}

impl<F> FileNamer for F
where
    F: Fn() -> String + Send + Sync,
{
    fn next_name(&self) -> String {
        self()
    }
}

/// Default namer: `<UTC RFC3339 timestamp>-<random suffix>.log`.
///
/// Timestamps carry nanoseconds and the suffix is drawn from a v4 UUID, so
/// names stay distinct even when files rotate many times per second.
#[derive(Debug, Default, Clone)]
pub struct TimestampNamer<C: Clock = SystemClock> {
    clock: C,
}

impl<C: Clock> TimestampNamer<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> FileNamer for TimestampNamer<C> {
    fn next_name(&self) -> String {
        timestamp_filename(self.clock.now_utc(), &random_suffix())
    }
}

/// Format a default file name from its parts.
pub fn timestamp_filename(ts: DateTime<Utc>, suffix: &str) -> String {
    format!(
        "{}-{}.{}",
        ts.to_rfc3339_opts(SecondsFormat::Nanos, true),
        suffix,
        LOG_EXTENSION
    )
}

fn random_suffix() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(SUFFIX_LEN);
    id
}

/// Parse the timestamp out of a default file name.
/// Expected format: `<RFC3339>-<suffix>.log`
pub fn parse_timestamp_filename(path: &Path) -> Option<DateTime<Utc>> {
    if path.extension()? != LOG_EXTENSION {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let (ts, suffix) = stem.rsplit_once('-')?;
    if suffix.len() != SUFFIX_LEN || !suffix.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }

    DateTime::parse_from_rfc3339(ts)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Namer producing `<prefix>-000001.log`, `<prefix>-000002.log`, ...
///
/// Names sort in creation order, which the timestamp namer only guarantees
/// at nanosecond resolution.
#[derive(Debug)]
pub struct SequenceNamer {
    prefix: String,
    next: AtomicU64,
}

impl SequenceNamer {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl FileNamer for SequenceNamer {
    fn next_name(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{:06}.{}", self.prefix, n, LOG_EXTENSION)
    }
}
