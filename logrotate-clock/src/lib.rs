//! Clock abstraction for the rotating writer.
//!
//! Provides a trait for reading the current time, with both real and mock implementations
//! so that lifetime-based rotation can be tested deterministically.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

/// Trait for reading the current time.
pub trait Clock: Send + Sync {
    /// Monotonic instant, used for measuring file age.
    fn now(&self) -> Instant;

    /// Wall-clock time in UTC, used for naming files.
    fn now_utc(&self) -> DateTime<Utc>;
}

/// Real system clock implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Mock clock for testing that only moves when told to.
///
/// Cloning creates a new handle to the same underlying time, so a test can
/// hand one clone to a writer and advance another.
#[derive(Debug, Clone)]
pub struct MockClock {
    base: Instant,
    base_utc: DateTime<Utc>,
    offset_nanos: Arc<AtomicU64>,
}

impl MockClock {
    /// Create a mock clock frozen at the given wall-clock time.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            base: Instant::now(),
            base_utc: start,
            offset_nanos: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Move time forward by `by`.
    pub fn advance(&self, by: Duration) {
        let nanos = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        self.offset_nanos.fetch_add(nanos, Ordering::SeqCst);
    }

    /// Total time advanced since creation.
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.offset_nanos.load(Ordering::SeqCst))
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new(DateTime::<Utc>::from(std::time::UNIX_EPOCH))
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.base + self.elapsed()
    }

    fn now_utc(&self) -> DateTime<Utc> {
        let nanos = self.offset_nanos.load(Ordering::SeqCst);
        self.base_utc + chrono::Duration::nanoseconds(i64::try_from(nanos).unwrap_or(i64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        // 2024-01-01 00:00:00 UTC
        Utc.timestamp_opt(1704067200, 0).unwrap()
    }

    #[test]
    fn test_mock_clock_is_frozen() {
        let clock = MockClock::new(start());
        let t1 = clock.now();
        let t2 = clock.now();
        assert_eq!(t1, t2);
        assert_eq!(clock.now_utc(), start());
    }

    #[test]
    fn test_mock_clock_advance() {
        let clock = MockClock::new(start());
        let before = clock.now();

        clock.advance(Duration::from_millis(1500));

        assert_eq!(clock.now() - before, Duration::from_millis(1500));
        assert_eq!(clock.now_utc().timestamp_millis(), 1704067201500);
        assert_eq!(clock.elapsed(), Duration::from_millis(1500));
    }

    #[test]
    fn test_mock_clock_clone_shares_time() {
        let clock = MockClock::new(start());
        let handle = clock.clone();

        clock.advance(Duration::from_secs(10));

        assert_eq!(handle.elapsed(), Duration::from_secs(10));
        assert_eq!(handle.now(), clock.now());
    }

    #[test]
    fn test_mock_clock_default_starts_at_epoch() {
        let clock = MockClock::default();
        assert_eq!(clock.now_utc().timestamp(), 0);
    }

    #[test]
    fn test_system_clock_returns_reasonable_time() {
        let clock = SystemClock;
        let now = clock.now_utc().timestamp();

        // Should be after 2020-01-01 (1577836800)
        assert!(now > 1577836800);

        // Should be before 2100-01-01 (4102444800)
        assert!(now < 4102444800);
    }

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock;
        let t1 = clock.now();
        let t2 = clock.now();
        assert!(t2 >= t1);
    }

    #[test]
    fn test_clock_trait_object() {
        let mock: Box<dyn Clock> = Box::new(MockClock::new(start()));
        assert_eq!(mock.now_utc(), start());

        let system: Box<dyn Clock> = Box::new(SystemClock);
        assert!(system.now_utc().timestamp() > 1577836800);
    }

    #[test]
    fn test_mock_clock_debug() {
        let clock = MockClock::default();
        let debug = format!("{:?}", clock);
        assert!(debug.contains("MockClock"));
    }
}
