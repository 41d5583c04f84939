#![forbid(unsafe_code)]

//! Host-clock timers.
//!
//! The engine has no thread and no event loop of its own. Time is a
//! monotonic [`Duration`] supplied by the host on every call, and timers are
//! plain deadlines that fire when the host advances past them. This makes
//! every component deterministic under test and leaves nothing running after
//! teardown: dropping or clearing a timer structure is the cancellation.
//!
//! - [`TimerQueue`] holds many one-shot deadlines, each tagged with a key.
//!   Ties fire in scheduling order.
//! - [`Interval`] is a single repeating timer.
//! - [`Timeout`] is a single one-shot timer.

use std::collections::BTreeMap;
use std::time::Duration;

// ---------------------------------------------------------------------------
// TimerQueue
// ---------------------------------------------------------------------------

/// Handle to a timer scheduled in a [`TimerQueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId {
    deadline: Duration,
    seq: u64,
}

impl TimerId {
    /// When this timer fires.
    #[must_use]
    pub fn deadline(&self) -> Duration {
        self.deadline
    }
}

/// Deadline-ordered one-shot timers.
#[derive(Debug, Clone)]
pub struct TimerQueue<K> {
    entries: BTreeMap<TimerId, K>,
    next_seq: u64,
}

impl<K> Default for TimerQueue<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> TimerQueue<K> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_seq: 0,
        }
    }

    /// Schedule `key` to fire at `deadline`.
    pub fn schedule(&mut self, deadline: Duration, key: K) -> TimerId {
        let id = TimerId {
            deadline,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.entries.insert(id, key);
        id
    }

    /// Cancel one timer. Returns its key if it was still pending.
    pub fn cancel(&mut self, id: TimerId) -> Option<K> {
        self.entries.remove(&id)
    }

    /// Cancel every timer whose key matches `pred`. Returns how many.
    pub fn cancel_where(&mut self, mut pred: impl FnMut(&K) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, key| !pred(key));
        before - self.entries.len()
    }

    /// Remove and return the earliest timer due at or before `now`.
    pub fn pop_due(&mut self, now: Duration) -> Option<(TimerId, K)> {
        let first = *self.entries.keys().next()?;
        if first.deadline > now {
            return None;
        }
        self.entries.remove(&first).map(|key| (first, key))
    }

    /// Earliest pending deadline.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.entries.keys().next().map(|id| id.deadline)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Count pending timers whose key matches `pred`.
    #[must_use]
    pub fn count_where(&self, mut pred: impl FnMut(&K) -> bool) -> usize {
        self.entries.values().filter(|key| pred(key)).count()
    }

    /// Cancel everything.
    pub fn clear(&mut self) -> usize {
        let n = self.entries.len();
        self.entries.clear();
        n
    }
}

// ---------------------------------------------------------------------------
// Interval
// ---------------------------------------------------------------------------

/// A single repeating timer.
///
/// Re-arming replaces the previous schedule, so there is never more than one
/// pending tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    period: Duration,
    next: Option<Duration>,
}

impl Interval {
    /// A disarmed interval. `period` must be non-zero for [`fire`](Self::fire)
    /// to make progress; callers validate that up front.
    #[must_use]
    pub const fn new(period: Duration) -> Self {
        Self { period, next: None }
    }

    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// (Re)start so the first tick lands at `now + period`.
    pub fn arm(&mut self, now: Duration) {
        self.next = Some(now.saturating_add(self.period));
    }

    pub fn disarm(&mut self) {
        self.next = None;
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.next.is_some()
    }

    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.next
    }

    /// If a tick is due at `now`, consume it and return its deadline.
    ///
    /// The following tick is scheduled one period after the consumed one,
    /// not after `now`, so cadence does not drift with host frame timing.
    pub fn fire(&mut self, now: Duration) -> Option<Duration> {
        let due = self.next.filter(|deadline| *deadline <= now)?;
        // Past the end of the clock there is no next tick.
        self.next = due.checked_add(self.period);
        Some(due)
    }
}

// ---------------------------------------------------------------------------
// Timeout
// ---------------------------------------------------------------------------

/// A single one-shot timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Timeout {
    deadline: Option<Duration>,
}

impl Timeout {
    #[must_use]
    pub const fn new() -> Self {
        Self { deadline: None }
    }

    pub fn set(&mut self, deadline: Duration) {
        self.deadline = Some(deadline);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// If due at `now`, clear it and return its deadline.
    pub fn fire(&mut self, now: Duration) -> Option<Duration> {
        let due = self.deadline.filter(|deadline| *deadline <= now)?;
        self.deadline = None;
        Some(due)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn queue_fires_in_deadline_order() {
        let mut q = TimerQueue::new();
        q.schedule(ms(300), "c");
        q.schedule(ms(100), "a");
        q.schedule(ms(200), "b");

        let mut fired = Vec::new();
        while let Some((_, key)) = q.pop_due(ms(1000)) {
            fired.push(key);
        }
        assert_eq!(fired, vec!["a", "b", "c"]);
    }

    #[test]
    fn queue_ties_fire_in_schedule_order() {
        let mut q = TimerQueue::new();
        q.schedule(ms(100), 1);
        q.schedule(ms(100), 2);
        q.schedule(ms(100), 3);
        let fired: Vec<_> = std::iter::from_fn(|| q.pop_due(ms(100)).map(|(_, k)| k)).collect();
        assert_eq!(fired, vec![1, 2, 3]);
    }

    #[test]
    fn queue_respects_now() {
        let mut q = TimerQueue::new();
        q.schedule(ms(100), ());
        assert!(q.pop_due(ms(99)).is_none());
        assert!(q.pop_due(ms(100)).is_some());
        assert!(q.is_empty());
    }

    #[test]
    fn queue_cancel_by_id_and_predicate() {
        let mut q = TimerQueue::new();
        let a = q.schedule(ms(10), 1);
        q.schedule(ms(20), 2);
        q.schedule(ms(30), 2);
        assert_eq!(q.cancel(a), Some(1));
        assert_eq!(q.cancel(a), None);
        assert_eq!(q.count_where(|k| *k == 2), 2);
        assert_eq!(q.cancel_where(|k| *k == 2), 2);
        assert!(q.is_empty());
        assert_eq!(q.next_deadline(), None);
    }

    #[test]
    fn interval_keeps_cadence() {
        let mut iv = Interval::new(ms(100));
        assert_eq!(iv.fire(ms(1000)), None);
        iv.arm(ms(0));
        assert_eq!(iv.fire(ms(99)), None);
        // Host was late by 30ms; next tick is still at 200.
        assert_eq!(iv.fire(ms(130)), Some(ms(100)));
        assert_eq!(iv.next_deadline(), Some(ms(200)));
    }

    #[test]
    fn interval_rearm_postpones() {
        let mut iv = Interval::new(ms(100));
        iv.arm(ms(0));
        iv.arm(ms(80));
        assert_eq!(iv.fire(ms(150)), None);
        assert_eq!(iv.fire(ms(180)), Some(ms(180)));
    }

    #[test]
    fn interval_stops_at_clock_limit() {
        let mut iv = Interval::new(ms(100));
        iv.arm(Duration::MAX - ms(50));
        assert_eq!(iv.next_deadline(), Some(Duration::MAX));
        assert_eq!(iv.fire(Duration::MAX), Some(Duration::MAX));
        assert_eq!(iv.fire(Duration::MAX), None);
        assert!(!iv.is_armed());
    }

    #[test]
    fn timeout_fires_once() {
        let mut t = Timeout::new();
        t.set(ms(50));
        assert_eq!(t.fire(ms(49)), None);
        assert_eq!(t.fire(ms(60)), Some(ms(50)));
        assert_eq!(t.fire(ms(70)), None);
        assert!(!t.is_pending());
    }
}
