//! The rotating writer.
//!
//! Producers on any number of threads call [`Writer::write`]; payloads go
//! through a bounded queue to a single drain thread (see [`crate::drain`])
//! which owns every file handle. [`Writer::close`] runs the shutdown protocol:
//!
//! 1. flag the writer as closing, so new writes fail fast;
//! 2. wait for writes already past that check to finish queuing;
//! 3. close the queue and wait for the drain thread to empty it;
//! 4. sync and close the last file, reporting failures to the caller.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, SyncSender};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use logrotate_clock::{Clock, SystemClock};

use crate::config::WriterConfig;
use crate::drain::{ActiveFile, DrainLoop};
use crate::error::WriterError;
use crate::filesystem::{Filesystem, RealFilesystem};
use crate::logger::{Logger, StderrLogger};

/// Name of the drain thread.
pub const DRAIN_THREAD_NAME: &str = "logrotate-drain";

/// Front-door state shared by producers and the shutdown path.
struct Gate {
    closing: bool,
    in_flight: usize,
    queue: Option<SyncSender<Vec<u8>>>,
}

/// Concurrency-safe sink that writes payloads to size- and time-rotated files.
///
/// `write` only queues; persistence happens on a background thread. Failures
/// after a payload was queued are reported to the writer's [`Logger`], not to
/// the caller. Call [`close`](Writer::close) to flush everything to disk.
pub struct Writer {
    gate: Mutex<Gate>,
    settled: Condvar,
    drain: Mutex<Option<JoinHandle<Option<ActiveFile>>>>,
    directory: PathBuf,
    logger: Arc<dyn Logger>,
}

impl Writer {
    /// Create a writer on the real filesystem, logging to stderr.
    pub fn new(config: WriterConfig) -> Result<Self, WriterError> {
        Self::with_logger(config, Arc::new(StderrLogger::normal()))
    }

    /// Create a writer on the real filesystem with a custom diagnostic sink.
    pub fn with_logger(config: WriterConfig, logger: Arc<dyn Logger>) -> Result<Self, WriterError> {
        Self::with_parts(config, RealFilesystem, SystemClock, logger)
    }

    /// Create a writer from explicit collaborators.
    ///
    /// Validates the config, creates the directory and starts the drain
    /// thread. No file is created until the first payload arrives.
    pub fn with_parts<F, C>(
        config: WriterConfig,
        fs: F,
        clock: C,
        logger: Arc<dyn Logger>,
    ) -> Result<Self, WriterError>
    where
        F: Filesystem + 'static,
        C: Clock + 'static,
    {
        config.validate()?;

        fs.create_dir_all(&config.directory)
            .map_err(|source| WriterError::CreateDirectory {
                path: config.directory.clone(),
                source,
            })?;

        let (sender, receiver) = mpsc::sync_channel(config.queue_capacity);
        let drain = DrainLoop::new(
            fs,
            clock,
            Arc::clone(&config.namer),
            config.directory.clone(),
            config.policy(),
            config.check_interval,
            Arc::clone(&logger),
        );
        let handle = thread::Builder::new()
            .name(DRAIN_THREAD_NAME.to_string())
            .spawn(move || drain.run(receiver))
            .map_err(WriterError::Spawn)?;

        logger.debug(&format!("writer started: {:?}", config));

        Ok(Self {
            gate: Mutex::new(Gate {
                closing: false,
                in_flight: 0,
                queue: Some(sender),
            }),
            settled: Condvar::new(),
            drain: Mutex::new(Some(handle)),
            directory: config.directory,
            logger,
        })
    }

    /// Directory receiving the files.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Whether [`close`](Writer::close) has begun.
    pub fn is_closing(&self) -> bool {
        self.lock_gate().closing
    }

    /// Queue `payload` for writing and return its length.
    ///
    /// Blocks while the queue is full. Fails with [`WriterError::Closing`]
    /// once shutdown has begun; in that case nothing is written. A successful
    /// return guarantees the payload reaches the drain thread before `close`
    /// completes.
    pub fn write(&self, payload: &[u8]) -> Result<usize, WriterError> {
        let (queue, _in_flight) = {
            let mut gate = self.lock_gate();
            if gate.closing {
                return Err(WriterError::Closing);
            }
            let Some(queue) = gate.queue.clone() else {
                return Err(WriterError::Closing);
            };
            gate.in_flight += 1;
            (queue, InFlight { writer: self })
        };

        // The sender clone must be gone before the in-flight count drops, so
        // that close() leaves no live sender behind once the count hits zero.
        let sent = queue.send(payload.to_vec());
        drop(queue);

        sent.map(|()| payload.len())
            .map_err(|_| WriterError::ConsumerGone)
    }

    /// Stop accepting payloads, drain the queue, and make the last file durable.
    ///
    /// Blocks until every payload accepted by [`write`](Writer::write) has
    /// been written. Returns [`WriterError::Sync`] or [`WriterError::Close`]
    /// if finishing the last file fails.
    ///
    /// # Panics
    ///
    /// Panics if called more than once on the same writer.
    pub fn close(&self) -> Result<(), WriterError> {
        let drain = {
            let mut gate = self.lock_gate();
            assert!(!gate.closing, "Writer::close called more than once");
            gate.closing = true;

            while gate.in_flight > 0 {
                gate = self
                    .settled
                    .wait(gate)
                    .unwrap_or_else(PoisonError::into_inner);
            }

            // Dropping the last sender closes the queue.
            gate.queue = None;
            self.drain
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take()
        };

        let last = match drain {
            Some(handle) => handle.join().map_err(|_| WriterError::ConsumerPanicked)?,
            None => None,
        };

        match last {
            Some(file) => {
                self.logger.verbose(&format!(
                    "closing {} ({} bytes)",
                    file.path().display(),
                    file.status().written
                ));
                file.finish()
            }
            None => Ok(()),
        }
    }

    fn lock_gate(&self) -> MutexGuard<'_, Gate> {
        self.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Registration of one in-flight `write`; deregisters on drop.
struct InFlight<'a> {
    writer: &'a Writer,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut gate = self.writer.lock_gate();
        gate.in_flight -= 1;
        if gate.in_flight == 0 {
            self.writer.settled.notify_all();
        }
    }
}

impl Drop for Writer {
    fn drop(&mut self) {
        if self.is_closing() {
            return;
        }
        if let Err(e) = self.close() {
            self.logger.info(&format!("failed to close writer on drop: {}", e));
        }
    }
}

impl io::Write for &Writer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Writer::write(self, buf).map_err(io::Error::from)
    }

    /// Durability comes from [`Writer::close`]; there is nothing to flush here.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl io::Write for Writer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Writer::write(self, buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::MockFilesystem;
    use crate::logger::{MockLogger, Verbosity};
    use crate::naming::SequenceNamer;
    use logrotate_clock::MockClock;
    use std::io::Write;
    use std::time::Duration;

    fn mock_writer(config: WriterConfig) -> (Writer, MockFilesystem, MockLogger) {
        let fs = MockFilesystem::new();
        let logger = MockLogger::new();
        let writer = Writer::with_parts(
            config.with_namer(SequenceNamer::new("test")),
            fs.clone(),
            MockClock::default(),
            Arc::new(logger.clone()),
        )
        .expect("construct writer");
        (writer, fs, logger)
    }

    fn path(n: usize) -> PathBuf {
        PathBuf::from(format!("/logs/test-{:06}.log", n))
    }

    // ===========================================
    // Construction
    // ===========================================

    #[test]
    fn test_new_creates_directory() {
        let (writer, fs, _) = mock_writer(WriterConfig::new("/logs"));
        assert!(fs.exists(Path::new("/logs")));
        assert_eq!(writer.directory(), Path::new("/logs"));
        writer.close().expect("close");
    }

    #[test]
    fn test_new_fails_when_directory_cannot_be_created() {
        let fs = MockFilesystem::new();
        fs.fail_create_dir();

        let err = Writer::with_parts(
            WriterConfig::new("/logs"),
            fs,
            MockClock::default(),
            Arc::new(MockLogger::new()),
        )
        .err()
        .expect("must fail");

        assert!(matches!(err, WriterError::CreateDirectory { .. }));
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let err = Writer::with_parts(
            WriterConfig::new("/logs").with_queue_capacity(0),
            MockFilesystem::new(),
            MockClock::default(),
            Arc::new(MockLogger::new()),
        )
        .err()
        .expect("must fail");

        assert!(matches!(err, WriterError::Config(_)));
    }

    // ===========================================
    // Front door
    // ===========================================

    #[test]
    fn test_write_returns_payload_length() {
        let (writer, fs, _) = mock_writer(WriterConfig::new("/logs"));

        assert_eq!(writer.write(b"message").expect("write"), 7);
        assert_eq!(writer.write(b"").expect("empty write"), 0);
        writer.close().expect("close");

        assert_eq!(fs.get_file(&path(1)), Some(b"message".to_vec()));
    }

    #[test]
    fn test_write_after_close_fails_and_is_not_written() {
        let (writer, fs, _) = mock_writer(WriterConfig::new("/logs"));
        writer.write(b"before").expect("write");
        writer.close().expect("close");

        assert!(writer.is_closing());
        assert!(matches!(writer.write(b"after"), Err(WriterError::Closing)));
        assert_eq!(fs.contents_in_creation_order(), vec![b"before".to_vec()]);
    }

    #[test]
    fn test_io_write_adapter() {
        let (writer, fs, _) = mock_writer(WriterConfig::new("/logs"));

        writeln!(&writer, "line {}", 1).expect("write");
        (&writer).flush().expect("flush");
        writer.close().expect("close");

        assert_eq!(fs.get_file(&path(1)), Some(b"line 1\n".to_vec()));
        let err = (&writer).write_all(b"late").err().expect("must fail");
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_backpressure_with_tiny_queue_keeps_order() {
        let (writer, fs, _) = mock_writer(WriterConfig::new("/logs").with_queue_capacity(1));

        for i in 0..500u32 {
            writer.write(format!("{},", i).as_bytes()).expect("write");
        }
        writer.close().expect("close");

        let expected: String = (0..500u32).map(|i| format!("{},", i)).collect();
        assert_eq!(fs.get_file(&path(1)), Some(expected.into_bytes()));
    }

    // ===========================================
    // Shutdown
    // ===========================================

    #[test]
    fn test_close_without_writes_creates_nothing() {
        let (writer, fs, _) = mock_writer(WriterConfig::new("/logs"));
        writer.close().expect("close");
        assert!(fs.created().is_empty());
    }

    #[test]
    fn test_close_syncs_and_closes_last_file() {
        let (writer, fs, logger) = mock_writer(WriterConfig::new("/logs"));
        writer.write(b"message").expect("write");
        writer.close().expect("close");

        assert_eq!(fs.sync_count(&path(1)), 1);
        assert!(fs.is_closed(&path(1)));
        assert!(logger.contains("closing /logs/test-000001.log (7 bytes)"));
    }

    #[test]
    fn test_close_reports_sync_failure() {
        let (writer, fs, _) = mock_writer(WriterConfig::new("/logs"));
        fs.fail_sync();
        writer.write(b"message").expect("write");

        let err = writer.close().err().expect("must fail");
        assert!(matches!(err, WriterError::Sync { path: ref p, .. } if *p == path(1)));
    }

    #[test]
    fn test_close_reports_close_failure() {
        let (writer, fs, _) = mock_writer(WriterConfig::new("/logs"));
        fs.fail_close();
        writer.write(b"message").expect("write");

        let err = writer.close().err().expect("must fail");
        assert!(matches!(err, WriterError::Close { .. }));
    }

    #[test]
    #[should_panic(expected = "Writer::close called more than once")]
    fn test_double_close_panics() {
        let (writer, _, _) = mock_writer(WriterConfig::new("/logs"));
        writer.close().expect("first close");
        let _ = writer.close();
    }

    #[test]
    fn test_drop_closes_writer() {
        let (writer, fs, _) = mock_writer(WriterConfig::new("/logs"));
        writer.write(b"dropped, not lost").expect("write");
        drop(writer);

        assert_eq!(fs.get_file(&path(1)), Some(b"dropped, not lost".to_vec()));
        assert!(fs.is_closed(&path(1)));
    }

    #[test]
    fn test_drop_logs_close_failure() {
        let (writer, fs, logger) = mock_writer(WriterConfig::new("/logs"));
        fs.fail_sync();
        writer.write(b"x").expect("write");
        drop(writer);

        assert!(logger.contains("failed to close writer on drop"));
    }

    // ===========================================
    // Drain thread failure
    // ===========================================

    /// Panics on the drain thread as soon as the first file is opened.
    struct PanicOnOpen;

    impl Logger for PanicOnOpen {
        fn log(&self, _level: Verbosity, message: &str) {
            if message.starts_with("opened") {
                panic!("diagnostic sink failed");
            }
        }
    }

    fn panicking_writer() -> Writer {
        Writer::with_parts(
            WriterConfig::new("/logs").with_namer(SequenceNamer::new("test")),
            MockFilesystem::new(),
            MockClock::default(),
            Arc::new(PanicOnOpen),
        )
        .expect("construct writer")
    }

    #[test]
    fn test_write_after_drain_thread_died_fails() {
        let writer = panicking_writer();
        writer.write(b"first").expect("accepted before the drain thread dies");

        let err = (0..400)
            .find_map(|_| {
                thread::sleep(Duration::from_millis(5));
                writer.write(b"later").err()
            })
            .expect("writes keep succeeding after the drain thread died");

        assert!(matches!(err, WriterError::ConsumerGone));
        assert_eq!(io::Error::from(err).kind(), io::ErrorKind::BrokenPipe);
        assert!(matches!(writer.close(), Err(WriterError::ConsumerPanicked)));
    }

    #[test]
    fn test_close_reports_drain_thread_panic() {
        let writer = panicking_writer();
        writer.write(b"first").expect("write");

        assert!(matches!(writer.close(), Err(WriterError::ConsumerPanicked)));
        assert!(writer.is_closing());
        assert!(matches!(writer.write(b"late"), Err(WriterError::Closing)));
    }

    #[test]
    fn test_post_acceptance_failures_only_reach_logger() {
        let (writer, fs, logger) = mock_writer(WriterConfig::new("/logs"));
        fs.fail_next_creates(1);

        // Accepted even though the file cannot be created
        assert_eq!(writer.write(b"lost").expect("write"), 4);
        writer.write(b"kept").expect("write");
        writer.close().expect("close");

        assert!(logger.contains("failed to create file at /logs/test-000001.log"));
        assert_eq!(fs.contents_in_creation_order(), vec![b"kept".to_vec()]);
    }

    #[test]
    fn test_concurrent_writers_then_close() {
        let (writer, fs, _) = mock_writer(WriterConfig::new("/logs").with_queue_capacity(8));
        let writer = Arc::new(writer);

        let producers: Vec<_> = (0..4u8)
            .map(|id| {
                let writer = Arc::clone(&writer);
                thread::spawn(move || {
                    for _ in 0..250 {
                        writer.write(&[b'a' + id; 4]).expect("write");
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.join().expect("producer");
        }
        writer.close().expect("close");

        let data = fs.get_file(&path(1)).expect("file");
        assert_eq!(data.len(), 4 * 250 * 4);
        for chunk in data.chunks(4) {
            assert!(chunk.iter().all(|b| *b == chunk[0]), "payload torn: {:?}", chunk);
        }
    }

    #[test]
    fn test_close_waits_for_blocked_producers() {
        let (writer, fs, _) = mock_writer(
            WriterConfig::new("/logs")
                .with_queue_capacity(1)
                .with_max_lifetime(Duration::from_secs(3600)),
        );
        let writer = Arc::new(writer);

        let producer = {
            let writer = Arc::clone(&writer);
            thread::spawn(move || {
                let mut accepted = 0u64;
                while writer.write(b"0123456789").is_ok() {
                    accepted += 1;
                }
                accepted
            })
        };
        thread::sleep(Duration::from_millis(20));
        writer.close().expect("close");
        let accepted = producer.join().expect("producer");

        let written = fs.get_file(&path(1)).map_or(0, |d| d.len() as u64);
        assert_eq!(written, accepted * 10);
    }
}
