//! File rotation decision logic.
//!
//! Provides rotation policies based on:
//! - Maximum size of a file
//! - Maximum lifetime of a file
//!
//! Everything here is pure: the drain loop feeds in the current file's
//! status and the clock reading, and acts on the returned decision.

use std::time::{Duration, Instant};

/// Thresholds that trigger a rotation. Zero disables a threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RotationPolicy {
    /// Maximum bytes per file.
    pub max_file_size: u64,

    /// Maximum time a file stays the write target.
    pub max_lifetime: Duration,
}

/// What the drain loop knows about the file it is writing to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStatus {
    /// Bytes written to the file so far.
    pub written: u64,

    /// When the file was opened.
    pub opened_at: Instant,
}

impl FileStatus {
    /// Status of a freshly opened, empty file.
    pub fn opened(at: Instant) -> Self {
        Self {
            written: 0,
            opened_at: at,
        }
    }
}

/// Why a file is being rotated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationReason {
    Size,
    Lifetime,
    /// Both thresholds tripped at once; still a single rotation.
    SizeAndLifetime,
}

/// Outcome of consulting the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationDecision {
    /// No file is open; open one.
    Open,
    /// Keep writing to the current file.
    Keep,
    /// Close the current file first.
    Rotate(RotationReason),
}

impl RotationPolicy {
    /// Create a new rotation policy.
    pub fn new(max_file_size: u64, max_lifetime: Duration) -> Self {
        Self {
            max_file_size,
            max_lifetime,
        }
    }

    pub fn size_enabled(&self) -> bool {
        self.max_file_size > 0
    }

    pub fn lifetime_enabled(&self) -> bool {
        !self.max_lifetime.is_zero()
    }

    /// Would writing `incoming` more bytes push the file past the size limit?
    ///
    /// An empty file never counts as full, so an oversized payload lands whole
    /// in a file of its own instead of being split.
    pub fn exceeds_size(&self, status: &FileStatus, incoming: usize) -> bool {
        self.size_enabled()
            && status.written > 0
            && status.written.saturating_add(incoming as u64) > self.max_file_size
    }

    /// Has the file been open for longer than the lifetime?
    pub fn expired(&self, status: &FileStatus, now: Instant) -> bool {
        self.lifetime_enabled() && now.saturating_duration_since(status.opened_at) > self.max_lifetime
    }

    /// Decide what to do before writing `incoming` bytes.
    pub fn before_write(
        &self,
        current: Option<&FileStatus>,
        incoming: usize,
        now: Instant,
    ) -> RotationDecision {
        let Some(status) = current else {
            return RotationDecision::Open;
        };

        match (self.exceeds_size(status, incoming), self.expired(status, now)) {
            (false, false) => RotationDecision::Keep,
            (true, false) => RotationDecision::Rotate(RotationReason::Size),
            (false, true) => RotationDecision::Rotate(RotationReason::Lifetime),
            (true, true) => RotationDecision::Rotate(RotationReason::SizeAndLifetime),
        }
    }

    /// Decide what to do on a periodic check with no payload in hand.
    ///
    /// Never returns [`RotationDecision::Open`]: idle writers do not create
    /// empty files.
    pub fn on_tick(&self, current: Option<&FileStatus>, now: Instant) -> RotationDecision {
        match current {
            Some(status) if self.expired(status, now) => {
                RotationDecision::Rotate(RotationReason::Lifetime)
            }
            _ => RotationDecision::Keep,
        }
    }
}
