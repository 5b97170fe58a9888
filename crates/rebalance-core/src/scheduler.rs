//! Cooperative delayed-task queue.
//!
//! The engine runs on the host's update path. Anything that must happen
//! later (the initial sync after session start, paced per-participant
//! broadcasts) is queued here and handed back from [`Scheduler::advance`]
//! once its time has come. Nothing runs on another thread.
//!
//! Tasks due at the same instant come back in the order they were queued.

use std::collections::BTreeMap;
use std::time::Duration;

/// Time-ordered queue of pending tasks.
#[derive(Debug, Clone)]
pub struct Scheduler<T> {
    now: Duration,
    seq: u64,
    queue: BTreeMap<(Duration, u64), T>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    /// Creates an empty scheduler at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            seq: 0,
            queue: BTreeMap::new(),
        }
    }

    /// Queues `task` to run `delay` from now. Delays past the end of the
    /// clock's range park the task at [`Duration::MAX`].
    pub fn schedule(&mut self, delay: Duration, task: T) {
        let key = (self.now.saturating_add(delay), self.seq);
        self.seq += 1;
        self.queue.insert(key, task);
    }

    /// Advances the clock by `dt` and returns every task now due, earliest
    /// first.
    pub fn advance(&mut self, dt: Duration) -> Vec<T> {
        self.now = self.now.saturating_add(dt);
        let mut due = Vec::new();
        while let Some(entry) = self.queue.first_entry() {
            if entry.key().0 > self.now {
                break;
            }
            due.push(entry.remove());
        }
        due
    }

    /// Time elapsed since creation.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Drops every pending task. The clock keeps running.
    pub fn clear(&mut self) {
        self.queue.clear();
    }

    /// Number of pending tasks.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

#[cfg(test)]
mod scheduler_tests {
    use super::*;

    #[test]
    fn tasks_come_back_when_due_in_order() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(Duration::from_millis(500), "b");
        scheduler.schedule(Duration::from_millis(200), "a");
        scheduler.schedule(Duration::from_millis(500), "c");

        assert!(scheduler.advance(Duration::from_millis(100)).is_empty());
        assert_eq!(scheduler.advance(Duration::from_millis(100)), vec!["a"]);
        assert_eq!(scheduler.advance(Duration::from_secs(1)), vec!["b", "c"]);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn delay_is_relative_to_current_time() {
        let mut scheduler = Scheduler::new();
        scheduler.advance(Duration::from_secs(3));
        scheduler.schedule(Duration::from_secs(1), 1);
        assert!(scheduler.advance(Duration::from_millis(999)).is_empty());
        assert_eq!(scheduler.advance(Duration::from_millis(1)), vec![1]);
    }

    #[test]
    fn huge_delays_saturate_instead_of_overflowing() {
        let mut scheduler = Scheduler::new();
        scheduler.advance(Duration::from_secs(10));
        scheduler.schedule(Duration::MAX, "far");
        scheduler.schedule(Duration::from_secs(1), "near");

        assert_eq!(scheduler.advance(Duration::from_secs(2)), vec!["near"]);
        assert_eq!(scheduler.pending(), 1);
        assert!(scheduler.advance(Duration::MAX).contains(&"far"));
        assert_eq!(scheduler.now(), Duration::MAX);
    }

    #[test]
    fn clear_keeps_clock() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(Duration::from_secs(1), ());
        scheduler.advance(Duration::from_millis(250));
        scheduler.clear();
        assert_eq!(scheduler.pending(), 0);
        assert_eq!(scheduler.now(), Duration::from_millis(250));
    }
}
