//! One-shot timers driven by the host's tick

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Handle returned by [`Scheduler::schedule_once`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimerId(pub u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

/// Schedules one-shot deadlines.
///
/// A scheduler never runs callbacks itself. The owner asks for due timers with
/// [`Scheduler::take_due`] and acts on them, so a cancelled or disposed owner can
/// never be called back.
pub trait Scheduler {
    /// Register a deadline `delay` after `now`
    fn schedule_once(&mut self, now: DateTime<Utc>, delay: Duration) -> TimerId;

    /// Drop a timer; returns false if it already fired or never existed
    fn cancel(&mut self, id: TimerId) -> bool;

    fn cancel_all(&mut self);

    /// Remove and return every timer due at `now`, earliest deadline first
    fn take_due(&mut self, now: DateTime<Utc>) -> Vec<TimerId>;

    /// Timers still outstanding
    fn pending(&self) -> usize;
}

/// In-memory [`Scheduler`]
#[derive(Debug, Clone, Default)]
pub struct TimerQueue {
    next_id: u64,
    deadlines: BTreeMap<TimerId, DateTime<Utc>>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deadline(&self, id: TimerId) -> Option<DateTime<Utc>> {
        self.deadlines.get(&id).copied()
    }
}

impl Scheduler for TimerQueue {
    fn schedule_once(&mut self, now: DateTime<Utc>, delay: Duration) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        // A deadline past the representable range is never due
        let deadline = now
            .checked_add_signed(delay)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.deadlines.insert(id, deadline);
        id
    }

    fn cancel(&mut self, id: TimerId) -> bool {
        self.deadlines.remove(&id).is_some()
    }

    fn cancel_all(&mut self) {
        self.deadlines.clear();
    }

    fn take_due(&mut self, now: DateTime<Utc>) -> Vec<TimerId> {
        let mut due: Vec<(DateTime<Utc>, TimerId)> = self
            .deadlines
            .iter()
            .filter(|(_, &deadline)| deadline <= now)
            .map(|(&id, &deadline)| (deadline, id))
            .collect();
        due.sort();
        for (_, id) in &due {
            self.deadlines.remove(id);
        }
        due.into_iter().map(|(_, id)| id).collect()
    }

    fn pending(&self) -> usize {
        self.deadlines.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap()
    }

    #[test]
    fn test_take_due_orders_by_deadline() {
        let mut queue = TimerQueue::new();
        let late = queue.schedule_once(t0(), Duration::milliseconds(3000));
        let early = queue.schedule_once(t0(), Duration::milliseconds(1000));
        let never = queue.schedule_once(t0(), Duration::milliseconds(10_000));

        assert!(queue.take_due(t0() + Duration::milliseconds(999)).is_empty());
        assert_eq!(
            queue.take_due(t0() + Duration::milliseconds(3000)),
            vec![early, late]
        );
        assert_eq!(queue.pending(), 1);
        assert!(queue.deadline(never).is_some());
    }

    #[test]
    fn test_overflowing_delay_is_never_due() {
        let mut queue = TimerQueue::new();
        let id = queue.schedule_once(t0(), Duration::milliseconds(i64::MAX));
        assert_eq!(queue.deadline(id), Some(DateTime::<Utc>::MAX_UTC));
        assert!(queue.take_due(t0() + Duration::days(365 * 1000)).is_empty());
        assert_eq!(queue.pending(), 1);
    }

    #[test]
    fn test_cancel() {
        let mut queue = TimerQueue::new();
        let id = queue.schedule_once(t0(), Duration::milliseconds(100));
        assert!(queue.cancel(id));
        assert!(!queue.cancel(id));
        assert!(queue.take_due(t0() + Duration::seconds(1)).is_empty());
    }

    #[test]
    fn test_cancel_all() {
        let mut queue = TimerQueue::new();
        for delay in [10, 20, 30] {
            queue.schedule_once(t0(), Duration::milliseconds(delay));
        }
        queue.cancel_all();
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn test_ids_are_unique() {
        let mut queue = TimerQueue::new();
        let a = queue.schedule_once(t0(), Duration::zero());
        let b = queue.schedule_once(t0(), Duration::zero());
        assert_ne!(a, b);
        assert_eq!(a.to_string(), "timer-1");
    }
}
