//! Time sources
//!
//! Components that need "now" take an `Arc<dyn Clock>` at construction. Production
//! code uses [`SystemClock`]; tests and replays drive a [`ManualClock`].

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// A source of the current instant
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Virtual clock with millisecond resolution.
///
/// Clones share the same underlying instant, so a test can keep one handle and
/// hand another to the component under test.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now_ms: Arc<AtomicI64>,
}

impl ManualClock {
    /// Create a clock frozen at `start`
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now_ms: Arc::new(AtomicI64::new(start.timestamp_millis())),
        }
    }

    /// Create a clock frozen at the Unix epoch
    pub fn at_epoch() -> Self {
        Self {
            now_ms: Arc::new(AtomicI64::new(0)),
        }
    }

    /// Jump to an absolute instant
    pub fn set(&self, instant: DateTime<Utc>) {
        self.now_ms
            .store(instant.timestamp_millis(), Ordering::SeqCst);
    }

    /// Move the clock forward (or backward, for a negative duration)
    pub fn advance(&self, by: Duration) {
        self.now_ms
            .fetch_add(by.num_milliseconds(), Ordering::SeqCst);
    }

    /// Move the clock forward by `ms` milliseconds
    pub fn advance_ms(&self, ms: i64) {
        self.now_ms.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let ms = self.now_ms.load(Ordering::SeqCst);
        Utc.timestamp_millis_opt(ms)
            .single()
            .unwrap_or_default()
    }
}

/// Elapsed milliseconds between two instants as a float (negative if `to` is earlier)
pub(crate) fn millis_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64
}

/// `at + ms`, or `None` when the instant is past chrono's representable range
pub(crate) fn checked_offset(at: DateTime<Utc>, ms: u64) -> Option<DateTime<Utc>> {
    let ms = i64::try_from(ms).ok()?;
    at.checked_add_signed(Duration::try_milliseconds(ms)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::at_epoch();
        let handle = clock.clone();

        handle.advance_ms(1_500);
        assert_eq!(clock.now().timestamp_millis(), 1_500);

        clock.advance(Duration::seconds(2));
        assert_eq!(handle.now().timestamp_millis(), 3_500);
    }

    #[test]
    fn test_manual_clock_set() {
        let start = Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        assert_eq!(clock.now(), start);

        let later = start + Duration::minutes(5);
        clock.set(later);
        assert_eq!(clock.now(), later);
    }

    #[test]
    fn test_millis_between() {
        let start = Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap();
        let end = start + Duration::milliseconds(2_250);
        assert!((millis_between(start, end) - 2_250.0).abs() < f64::EPSILON);
        assert!(millis_between(end, start) < 0.0);
    }

    #[test]
    fn test_checked_offset() {
        let start = Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap();
        assert_eq!(
            checked_offset(start, 1_500),
            Some(start + Duration::milliseconds(1_500))
        );
        assert_eq!(checked_offset(start, u64::MAX), None);
        assert_eq!(checked_offset(start, i64::MAX as u64), None);
    }
}
