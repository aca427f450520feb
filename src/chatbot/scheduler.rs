//! Virtual-time task queue for the widget's delays.
//!
//! The host decides how fast time moves: a live session advances by real
//! elapsed time, tests jump straight to deadlines.

use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub u64);

#[derive(Debug, Clone)]
struct Scheduled<T> {
    id: TaskId,
    due: Duration,
    task: T,
}

/// Pending tasks ordered by due time, then by scheduling order.
#[derive(Debug)]
pub struct Scheduler<T> {
    now: Duration,
    next_id: u64,
    queue: Vec<Scheduled<T>>,
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            next_id: 1,
            queue: Vec::new(),
        }
    }

    /// Virtual time since the scheduler was created.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Schedule a task to run `delay` after the current virtual time.
    pub fn schedule(&mut self, delay: Duration, task: T) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        let due = self.now + delay;
        // Insert after every task due at or before `due`, keeping ties in order
        let pos = self.queue.partition_point(|s| s.due <= due);
        self.queue.insert(pos, Scheduled { id, due, task });
        debug!("Scheduled task {} in {:?}", id.0, delay);
        id
    }

    /// Delay until the earliest pending task, if any.
    pub fn time_until_next(&self) -> Option<Duration> {
        self.queue.first().map(|s| s.due.saturating_sub(self.now))
    }

    /// Take the earliest task due at or before `deadline`.
    ///
    /// The clock moves to the task's due time. Returns `None` once nothing else
    /// is due, leaving the clock at `deadline`.
    pub fn pop_due(&mut self, deadline: Duration) -> Option<(TaskId, T)> {
        match self.queue.first() {
            Some(first) if first.due <= deadline => {
                let s = self.queue.remove(0);
                self.now = self.now.max(s.due);
                Some((s.id, s.task))
            }
            _ => {
                self.now = self.now.max(deadline);
                None
            }
        }
    }
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_ids_increase() {
        let mut s = Scheduler::new();
        let a = s.schedule(ms(10), "a");
        let b = s.schedule(ms(5), "b");
        assert!(b > a);
    }

    #[test]
    fn test_fires_in_due_order() {
        let mut s = Scheduler::new();
        s.schedule(ms(30), "late");
        s.schedule(ms(10), "early");
        s.schedule(ms(10), "early-second");

        let fired: Vec<_> = std::iter::from_fn(|| s.pop_due(ms(100)).map(|(_, t)| t)).collect();
        assert_eq!(fired, vec!["early", "early-second", "late"]);
        assert_eq!(s.now(), ms(100));
    }

    #[test]
    fn test_not_due_yet() {
        let mut s = Scheduler::new();
        s.schedule(ms(50), "task");
        assert!(s.pop_due(ms(49)).is_none());
        assert_eq!(s.now(), ms(49));
        assert_eq!(s.time_until_next(), Some(ms(1)));
        assert!(s.pop_due(ms(50)).is_some());
        assert_eq!(s.time_until_next(), None);
    }

    #[test]
    fn test_delay_is_relative_to_fired_task() {
        let mut s = Scheduler::new();
        s.schedule(ms(800), 1);
        let (_, first) = s.pop_due(ms(5000)).unwrap();
        assert_eq!(first, 1);
        assert_eq!(s.now(), ms(800));

        s.schedule(ms(1200), 2);
        let (_, second) = s.pop_due(ms(5000)).unwrap();
        assert_eq!(second, 2);
        assert_eq!(s.now(), ms(2000));
    }
}
