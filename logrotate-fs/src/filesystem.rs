//! Filesystem abstraction for the rotating writer.
//!
//! Provides traits and implementations for creating append-only log files,
//! so the drain loop can be exercised against an in-memory filesystem with
//! injected failures.

use std::collections::{HashMap, HashSet};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::error::FsError;

/// An open, append-only log file.
///
/// Owned by exactly one thread at a time (the drain loop, then the shutdown
/// path), hence `Send` but not `Sync`.
pub trait LogFile: Send {
    /// Write some prefix of `buf`, returning how many bytes were written.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Flush written bytes to stable storage.
    fn sync(&mut self) -> io::Result<()>;

    /// Release the handle.
    fn close(self: Box<Self>) -> io::Result<()>;
}

/// Trait for filesystem operations.
/// Abstracted for testing with mock implementations.
pub trait Filesystem: Send + Sync {
    /// Create directory and parents if needed.
    fn create_dir_all(&self, path: &Path) -> Result<(), FsError>;

    /// Create a new file for appending.
    ///
    /// Fails with [`FsError::AlreadyExists`] if anything already lives at `path`.
    fn create_file(&self, path: &Path) -> Result<Box<dyn LogFile>, FsError>;
}

/// Real filesystem implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFilesystem;

/// Log file backed by a `std::fs::File`.
#[derive(Debug)]
pub struct RealLogFile {
    file: File,
}

impl LogFile for RealLogFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.file.sync_all()
    }

    fn close(self: Box<Self>) -> io::Result<()> {
        // std reports close(2) errors nowhere; sync_all has already surfaced
        // anything the kernel knew about.
        drop(self.file);
        Ok(())
    }
}

impl Filesystem for RealFilesystem {
    fn create_dir_all(&self, path: &Path) -> Result<(), FsError> {
        fs::create_dir_all(path)?;
        Ok(())
    }

    fn create_file(&self, path: &Path) -> Result<Box<dyn LogFile>, FsError> {
        let file = OpenOptions::new()
            .append(true)
            .create_new(true)
            .open(path)
            .map_err(|e| match e.kind() {
                io::ErrorKind::AlreadyExists => FsError::AlreadyExists(path.to_path_buf()),
                _ => FsError::Io(e),
            })?;

        Ok(Box::new(RealLogFile { file }))
    }
}

/// Failures to inject into a [`MockFilesystem`].
#[derive(Debug, Default, Clone)]
struct MockFaults {
    fail_create_dir: bool,
    failing_creates: usize,
    failing_writes: usize,
    write_chunk: Option<usize>,
    fail_sync: bool,
    fail_close: bool,
}

#[derive(Debug, Default)]
struct MockState {
    files: HashMap<PathBuf, Vec<u8>>,
    created: Vec<PathBuf>,
    dirs: HashSet<PathBuf>,
    synced: HashMap<PathBuf, usize>,
    closed: HashSet<PathBuf>,
    faults: MockFaults,
}

/// Mock filesystem for testing.
/// Cloning creates a new handle to the same underlying data.
#[derive(Debug, Clone, Default)]
pub struct MockFilesystem {
    state: Arc<RwLock<MockState>>,
}

impl MockFilesystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get content of a specific file.
    pub fn get_file(&self, path: &Path) -> Option<Vec<u8>> {
        self.state.read().unwrap().files.get(path).cloned()
    }

    /// Paths of all created files, in creation order.
    pub fn created(&self) -> Vec<PathBuf> {
        self.state.read().unwrap().created.clone()
    }

    /// Contents of all created files, in creation order.
    pub fn contents_in_creation_order(&self) -> Vec<Vec<u8>> {
        let state = self.state.read().unwrap();
        state
            .created
            .iter()
            .map(|path| state.files.get(path).cloned().unwrap_or_default())
            .collect()
    }

    /// Add a file directly (for test setup).
    pub fn add_file(&self, path: PathBuf, data: Vec<u8>) {
        self.state.write().unwrap().files.insert(path, data);
    }

    /// Check if a file or directory exists.
    pub fn exists(&self, path: &Path) -> bool {
        let state = self.state.read().unwrap();
        state.files.contains_key(path) || state.dirs.contains(path)
    }

    /// Number of times the file at `path` was synced.
    pub fn sync_count(&self, path: &Path) -> usize {
        self.state.read().unwrap().synced.get(path).copied().unwrap_or(0)
    }

    /// Whether the file at `path` has been closed.
    pub fn is_closed(&self, path: &Path) -> bool {
        self.state.read().unwrap().closed.contains(path)
    }

    /// Make `create_dir_all` fail.
    pub fn fail_create_dir(&self) {
        self.state.write().unwrap().faults.fail_create_dir = true;
    }

    /// Make the next `count` calls to `create_file` fail.
    pub fn fail_next_creates(&self, count: usize) {
        self.state.write().unwrap().faults.failing_creates = count;
    }

    /// Make the next `count` file writes fail.
    pub fn fail_next_writes(&self, count: usize) {
        self.state.write().unwrap().faults.failing_writes = count;
    }

    /// Accept at most `chunk` bytes per write call (short writes).
    pub fn limit_write_chunk(&self, chunk: usize) {
        self.state.write().unwrap().faults.write_chunk = Some(chunk);
    }

    /// Make every sync fail.
    pub fn fail_sync(&self) {
        self.state.write().unwrap().faults.fail_sync = true;
    }

    /// Make every close fail.
    pub fn fail_close(&self) {
        self.state.write().unwrap().faults.fail_close = true;
    }
}

fn injected(kind: io::ErrorKind, what: &str) -> io::Error {
    io::Error::new(kind, format!("injected {} failure", what))
}

/// Handle to a file inside a [`MockFilesystem`].
#[derive(Debug)]
pub struct MockLogFile {
    path: PathBuf,
    state: Arc<RwLock<MockState>>,
}

impl LogFile for MockLogFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.state.write().unwrap();
        if state.faults.failing_writes > 0 {
            state.faults.failing_writes -= 1;
            return Err(injected(io::ErrorKind::Other, "write"));
        }

        let n = state.faults.write_chunk.map_or(buf.len(), |c| c.min(buf.len()));
        state
            .files
            .entry(self.path.clone())
            .or_default()
            .extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn sync(&mut self) -> io::Result<()> {
        let mut state = self.state.write().unwrap();
        if state.faults.fail_sync {
            return Err(injected(io::ErrorKind::Other, "sync"));
        }
        *state.synced.entry(self.path.clone()).or_insert(0) += 1;
        Ok(())
    }

    fn close(self: Box<Self>) -> io::Result<()> {
        let mut state = self.state.write().unwrap();
        state.closed.insert(self.path.clone());
        if state.faults.fail_close {
            return Err(injected(io::ErrorKind::Other, "close"));
        }
        Ok(())
    }
}

impl Filesystem for MockFilesystem {
    fn create_dir_all(&self, path: &Path) -> Result<(), FsError> {
        let mut state = self.state.write().unwrap();
        if state.faults.fail_create_dir {
            return Err(FsError::Io(injected(io::ErrorKind::PermissionDenied, "mkdir")));
        }
        state.dirs.insert(path.to_path_buf());
        Ok(())
    }

    fn create_file(&self, path: &Path) -> Result<Box<dyn LogFile>, FsError> {
        let mut state = self.state.write().unwrap();
        if state.files.contains_key(path) {
            return Err(FsError::AlreadyExists(path.to_path_buf()));
        }
        if state.faults.failing_creates > 0 {
            state.faults.failing_creates -= 1;
            return Err(FsError::Io(injected(io::ErrorKind::PermissionDenied, "create")));
        }

        state.files.insert(path.to_path_buf(), Vec::new());
        state.created.push(path.to_path_buf());

        Ok(Box::new(MockLogFile {
            path: path.to_path_buf(),
            state: Arc::clone(&self.state),
        }))
    }
}
