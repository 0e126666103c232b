//! The drain loop: the only code that touches log files.
//!
//! Runs on a dedicated thread. Receives payloads from the bounded queue in
//! FIFO order, consults the [`RotationPolicy`] before every write and on an
//! idle cadence, and writes each payload in full. I/O failures are reported
//! to the [`Logger`] and never stop the loop.
//!
//! When every sender is gone and the queue is empty the loop is drained; the
//! still-open file is handed back to the caller, which owns the final
//! sync and close.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use logrotate_clock::Clock;

use crate::error::{FsError, WriterError};
use crate::filesystem::{Filesystem, LogFile};
use crate::logger::Logger;
use crate::naming::FileNamer;
use crate::rotation::{FileStatus, RotationDecision, RotationPolicy};

/// Attempts at finding an unused file name before giving up on a payload.
pub const MAX_NAME_ATTEMPTS: usize = 8;

/// The file currently receiving payloads.
pub struct ActiveFile {
    path: PathBuf,
    handle: Box<dyn LogFile>,
    status: FileStatus,
}

impl ActiveFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn status(&self) -> &FileStatus {
        &self.status
    }

    /// Sync to stable storage, then close.
    ///
    /// Close is attempted even when sync fails; the first failure wins.
    pub fn finish(mut self) -> Result<(), WriterError> {
        let synced = self.handle.sync();
        let closed = self.handle.close();

        synced.map_err(|source| WriterError::Sync {
            path: self.path.clone(),
            source,
        })?;
        closed.map_err(|source| WriterError::Close {
            path: self.path,
            source,
        })
    }
}

/// Where the loop is after one step.
///
/// Writing and rotating happen inside a single step
/// ([`DrainLoop::handle_payload`]), so they are never observed from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainState {
    WaitingForPayload,
    Drained,
}

/// Consumer side of the writer. Owns all file state.
pub struct DrainLoop<F: Filesystem, C: Clock> {
    fs: F,
    clock: C,
    namer: Arc<dyn FileNamer>,
    directory: PathBuf,
    policy: RotationPolicy,
    check_interval: Duration,
    logger: Arc<dyn Logger>,
    current: Option<ActiveFile>,
}

impl<F: Filesystem, C: Clock> DrainLoop<F, C> {
    pub fn new(
        fs: F,
        clock: C,
        namer: Arc<dyn FileNamer>,
        directory: PathBuf,
        policy: RotationPolicy,
        check_interval: Duration,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            fs,
            clock,
            namer,
            directory,
            policy,
            check_interval,
            logger,
            current: None,
        }
    }

    /// The file currently being written, if any.
    pub fn current(&self) -> Option<&ActiveFile> {
        self.current.as_ref()
    }

    /// Run until the queue is closed and empty, then hand back the open file.
    pub fn run(mut self, queue: Receiver<Vec<u8>>) -> Option<ActiveFile> {
        while self.step(&queue) != DrainState::Drained {}

        self.logger.debug("drain loop finished: queue closed and empty");
        self.current.take()
    }

    /// Wait for one payload (or one check interval) and act on it.
    pub fn step(&mut self, queue: &Receiver<Vec<u8>>) -> DrainState {
        let next = if self.policy.lifetime_enabled() {
            queue.recv_timeout(self.check_interval)
        } else {
            queue.recv().map_err(|_| RecvTimeoutError::Disconnected)
        };

        match next {
            Ok(payload) => self.handle_payload(&payload),
            Err(RecvTimeoutError::Timeout) => self.check_lifetime(),
            Err(RecvTimeoutError::Disconnected) => return DrainState::Drained,
        }
        DrainState::WaitingForPayload
    }

    /// Rotate if needed, then write the whole payload.
    pub fn handle_payload(&mut self, payload: &[u8]) {
        let now = self.clock.now();
        let status = self.current.as_ref().map(|f| &f.status);

        match self.policy.before_write(status, payload.len(), now) {
            RotationDecision::Keep => {}
            RotationDecision::Open => self.open_next(),
            RotationDecision::Rotate(reason) => {
                if let Some(file) = &self.current {
                    self.logger.verbose(&format!(
                        "rotating {} ({:?}, {} bytes)",
                        file.path.display(),
                        reason,
                        file.status.written
                    ));
                }
                self.close_current();
                self.open_next();
            }
        }

        match self.current.as_mut() {
            Some(file) => write_fully(file, payload, self.logger.as_ref()),
            None => self.logger.info(&format!(
                "failed to write to file: no file open, dropped {} bytes",
                payload.len()
            )),
        }
    }

    /// Close the current file if it outlived its lifetime.
    ///
    /// The replacement is opened by the next payload.
    pub fn check_lifetime(&mut self) {
        let now = self.clock.now();
        let status = self.current.as_ref().map(|f| &f.status);

        if let RotationDecision::Rotate(_) = self.policy.on_tick(status, now) {
            if let Some(file) = &self.current {
                self.logger
                    .verbose(&format!("closing idle {} after lifetime", file.path.display()));
            }
            self.close_current();
        }
    }

    fn open_next(&mut self) {
        let mut path = PathBuf::new();
        for _ in 0..MAX_NAME_ATTEMPTS {
            path = self.directory.join(self.namer.next_name());
            match self.fs.create_file(&path) {
                Ok(handle) => {
                    self.logger.verbose(&format!("opened {}", path.display()));
                    self.current = Some(ActiveFile {
                        path,
                        handle,
                        status: FileStatus::opened(self.clock.now()),
                    });
                    return;
                }
                Err(FsError::AlreadyExists(_)) => {
                    self.logger
                        .verbose(&format!("{} already exists, asking for another name", path.display()));
                }
                Err(e) => {
                    self.logger
                        .info(&format!("failed to create file at {}: {}", path.display(), e));
                    return;
                }
            }
        }

        self.logger.info(&format!(
            "failed to create file at {}: {} attempts produced existing names",
            path.display(),
            MAX_NAME_ATTEMPTS
        ));
    }

    fn close_current(&mut self) {
        if let Some(file) = self.current.take() {
            if let Err(e) = file.finish() {
                self.logger.info(&e.to_string());
            }
        }
    }
}

/// Write all of `payload`, resuming after short writes.
///
/// Gives up on the remainder at the first error other than `Interrupted`.
fn write_fully(file: &mut ActiveFile, payload: &[u8], logger: &dyn Logger) {
    let mut remaining = payload;
    while !remaining.is_empty() {
        match file.handle.write(remaining) {
            Ok(0) => {
                logger.info(&format!(
                    "failed to write to file: {}: wrote 0 bytes, dropped {} bytes",
                    file.path.display(),
                    remaining.len()
                ));
                return;
            }
            Ok(n) => {
                file.status.written += n as u64;
                remaining = &remaining[n..];
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => {
                logger.info(&format!(
                    "failed to write to file: {}: {}, dropped {} bytes",
                    file.path.display(),
                    e,
                    remaining.len()
                ));
                return;
            }
        }
    }
}
