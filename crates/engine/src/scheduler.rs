//! Cancellable scheduled tasks.
//!
//! The scheduler is a plain deadline-ordered queue; it never reads a clock
//! and never runs anything itself. The owner pops due tasks with
//! [`Scheduler::pop_due`] and decides what they mean.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Monotonic identifier assigned to each scheduled task.
pub type TaskId = u64;

/// Shared cancellation flag.
///
/// Clones observe the same flag. Once cancelled it stays cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Caller-side view of a scheduled task.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    id: TaskId,
    deadline: Instant,
    token: CancelToken,
}

impl TaskHandle {
    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Cancel the task. A cancelled task is dropped instead of being run.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// The token backing this handle.
    pub fn token(&self) -> &CancelToken {
        &self.token
    }
}

struct Entry<T> {
    task: T,
    token: CancelToken,
}

/// Deadline-ordered task queue.
///
/// Tasks due at the same instant run in the order they were scheduled.
pub struct Scheduler<T> {
    next_id: TaskId,
    queue: BTreeMap<(Instant, TaskId), Entry<T>>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            queue: BTreeMap::new(),
        }
    }

    /// Schedule `task` to run at `at` with a fresh cancellation token.
    pub fn schedule(&mut self, at: Instant, task: T) -> TaskHandle {
        self.schedule_with(at, task, CancelToken::new())
    }

    /// Schedule `task` under an existing token.
    ///
    /// Several tasks can share one token; cancelling it drops all of them.
    pub fn schedule_with(&mut self, at: Instant, task: T, token: CancelToken) -> TaskHandle {
        let id = self.next_id;
        self.next_id += 1;
        self.queue.insert(
            (at, id),
            Entry {
                task,
                token: token.clone(),
            },
        );
        TaskHandle {
            id,
            deadline: at,
            token,
        }
    }

    /// Remove and return the earliest live task due at or before `now`.
    ///
    /// Cancelled tasks encountered on the way are discarded.
    pub fn pop_due(&mut self, now: Instant) -> Option<T> {
        loop {
            let (&(deadline, _), _) = self.queue.first_key_value()?;
            if deadline > now {
                return None;
            }
            let (_, entry) = self.queue.pop_first()?;
            if !entry.token.is_cancelled() {
                return Some(entry.task);
            }
        }
    }

    /// Deadline of the earliest live task.
    pub fn next_deadline(&mut self) -> Option<Instant> {
        self.prune_front();
        self.queue.first_key_value().map(|(&(deadline, _), _)| deadline)
    }

    /// Number of live tasks.
    pub fn len(&self) -> usize {
        self.queue.values().filter(|e| !e.token.is_cancelled()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every queued task.
    pub fn clear(&mut self) {
        for entry in self.queue.values() {
            entry.token.cancel();
        }
        self.queue.clear();
    }

    fn prune_front(&mut self) {
        while let Some((_, entry)) = self.queue.first_key_value() {
            if !entry.token.is_cancelled() {
                break;
            }
            self.queue.pop_first();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_pop_due_in_deadline_order() {
        let t0 = Instant::now();
        let mut scheduler = Scheduler::new();
        scheduler.schedule(t0 + ms(30), "c");
        scheduler.schedule(t0 + ms(10), "a");
        scheduler.schedule(t0 + ms(20), "b");

        assert_eq!(scheduler.pop_due(t0 + ms(5)), None);
        assert_eq!(scheduler.pop_due(t0 + ms(25)), Some("a"));
        assert_eq!(scheduler.pop_due(t0 + ms(25)), Some("b"));
        assert_eq!(scheduler.pop_due(t0 + ms(25)), None);
        assert_eq!(scheduler.pop_due(t0 + ms(30)), Some("c"));
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_same_deadline_keeps_scheduling_order() {
        let t0 = Instant::now();
        let mut scheduler = Scheduler::new();
        for i in 0..5 {
            scheduler.schedule(t0, i);
        }
        let order: Vec<_> = std::iter::from_fn(|| scheduler.pop_due(t0)).collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_cancelled_tasks_are_skipped() {
        let t0 = Instant::now();
        let mut scheduler = Scheduler::new();
        let first = scheduler.schedule(t0 + ms(10), "first");
        scheduler.schedule(t0 + ms(20), "second");

        first.cancel();
        assert!(first.is_cancelled());
        assert_eq!(scheduler.len(), 1);
        assert_eq!(scheduler.next_deadline(), Some(t0 + ms(20)));
        assert_eq!(scheduler.pop_due(t0 + ms(20)), Some("second"));
    }

    #[test]
    fn test_shared_token_cancels_all() {
        let t0 = Instant::now();
        let mut scheduler = Scheduler::new();
        let token = CancelToken::new();
        scheduler.schedule_with(t0 + ms(10), 1, token.clone());
        scheduler.schedule_with(t0 + ms(20), 2, token.clone());
        scheduler.schedule(t0 + ms(30), 3);

        token.cancel();
        assert_eq!(scheduler.pop_due(t0 + ms(100)), Some(3));
        assert_eq!(scheduler.pop_due(t0 + ms(100)), None);
    }

    #[test]
    fn test_handle_reports_deadline() {
        let t0 = Instant::now();
        let mut scheduler = Scheduler::new();
        let a = scheduler.schedule(t0 + ms(16), ());
        let b = scheduler.schedule(t0 + ms(16), ());
        assert_eq!(a.deadline(), t0 + ms(16));
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_clear_cancels_handles() {
        let t0 = Instant::now();
        let mut scheduler = Scheduler::new();
        let handle = scheduler.schedule(t0, ());
        scheduler.clear();
        assert!(handle.is_cancelled());
        assert_eq!(scheduler.next_deadline(), None);
    }
}
