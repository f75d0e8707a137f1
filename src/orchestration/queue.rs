//! # Priority Task Queue
//!
//! Thread-safe, logically unbounded, priority-ordered blocking queue.
//!
//! Insertion never blocks. Takers block on a condition variable until a task
//! arrives, the timeout elapses, or [`PriorityTaskQueue::wake_all`] is called
//! so they can observe a stop request. Extraction always yields the minimum
//! task by [`Task::dispatch_order`], so ties resolve by creation order and
//! never by heap layout.

use parking_lot::{Condvar, Mutex};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering as AtomicOrdering};
use std::time::{Duration, Instant};
use tracing::trace;

use crate::models::Task;

/// Heap entry. `BinaryHeap` is a max-heap, so the order is reversed to put
/// the most urgent task on top.
#[derive(Debug)]
struct QueuedTask(Task);

impl PartialEq for QueuedTask {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueuedTask {}

impl PartialOrd for QueuedTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedTask {
    fn cmp(&self, other: &Self) -> Ordering {
        other.0.dispatch_order(&self.0)
    }
}

#[derive(Debug, Default)]
pub struct PriorityTaskQueue {
    heap: Mutex<BinaryHeap<QueuedTask>>,
    available: Condvar,
    /// Lock-free mirror of the heap length for read-only observers
    len: AtomicUsize,
    /// Bumped by `wake_all` so blocked takers can tell a wake-up from a task
    wake_epoch: AtomicU64,
}

impl PriorityTaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert without blocking
    pub fn submit(&self, task: Task) {
        let mut heap = self.heap.lock();
        trace!(task = %task.short_id(), priority = task.priority(), "Enqueuing task");
        heap.push(QueuedTask(task));
        self.len.store(heap.len(), AtomicOrdering::Release);
        drop(heap);
        self.available.notify_one();
    }

    /// Take the most urgent task, blocking for up to `timeout`.
    ///
    /// Returns `None` when the timeout elapses or when [`wake_all`](Self::wake_all)
    /// interrupts the wait while the queue is empty.
    pub fn take_timeout(&self, timeout: Duration) -> Option<Task> {
        self.take_timeout_with(timeout, |_| ()).map(|(task, ())| task)
    }

    /// As [`take_timeout`](Self::take_timeout), running `on_take` before the
    /// queue lock is released, so observers see the task either queued or taken
    pub fn take_timeout_with<R>(
        &self,
        timeout: Duration,
        on_take: impl FnOnce(&Task) -> R,
    ) -> Option<(Task, R)> {
        let deadline = Instant::now() + timeout;
        let epoch = self.wake_epoch.load(AtomicOrdering::Acquire);
        let mut heap = self.heap.lock();

        loop {
            if let Some(QueuedTask(task)) = heap.pop() {
                self.len.store(heap.len(), AtomicOrdering::Release);
                let taken = on_take(&task);
                return Some((task, taken));
            }

            if self.wake_epoch.load(AtomicOrdering::Acquire) != epoch {
                return None;
            }

            if self.available.wait_until(&mut heap, deadline).timed_out() {
                let QueuedTask(task) = heap.pop()?;
                self.len.store(heap.len(), AtomicOrdering::Release);
                let taken = on_take(&task);
                return Some((task, taken));
            }
        }
    }

    /// Take the most urgent task if one is present
    pub fn try_take(&self) -> Option<Task> {
        let mut heap = self.heap.lock();
        let task = heap.pop().map(|QueuedTask(task)| task);
        self.len.store(heap.len(), AtomicOrdering::Release);
        task
    }

    /// Instantaneous, possibly stale count
    pub fn len(&self) -> usize {
        self.len.load(AtomicOrdering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evaluate `check` with the queue locked and empty; `false` if not empty
    pub fn is_empty_and(&self, check: impl FnOnce() -> bool) -> bool {
        let heap = self.heap.lock();
        heap.is_empty() && check()
    }

    /// Remove every queued task, most urgent first
    pub fn drain(&self) -> Vec<Task> {
        let mut heap = self.heap.lock();
        let mut tasks = Vec::with_capacity(heap.len());
        while let Some(QueuedTask(task)) = heap.pop() {
            tasks.push(task);
        }
        self.len.store(0, AtomicOrdering::Release);
        tasks
    }

    /// Release every blocked taker so it can re-check its stop signal
    pub fn wake_all(&self) {
        // Epoch changes under the lock so a taker cannot miss it between its
        // check and its wait
        let heap = self.heap.lock();
        self.wake_epoch.fetch_add(1, AtomicOrdering::AcqRel);
        drop(heap);
        self.available.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_take_returns_lowest_priority_number_first() {
        let queue = PriorityTaskQueue::new();
        queue.submit(Task::new("maintenance", 5, ""));
        queue.submit(Task::new("payment", 1, ""));
        queue.submit(Task::new("email", 3, ""));

        let order: Vec<i32> = queue.drain().iter().map(Task::priority).collect();
        assert_eq!(order, vec![1, 3, 5]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_equal_priority_preserves_creation_order() {
        let now = Utc::now();
        let a = Task::builder("a", 2)
            .created_at(now - ChronoDuration::milliseconds(10))
            .build();
        let b = Task::builder("b", 2).created_at(now).build();

        let queue = PriorityTaskQueue::new();
        // Submitted in reverse creation order
        queue.submit(b);
        queue.submit(a);

        assert_eq!(queue.try_take().unwrap().name(), "a");
        assert_eq!(queue.try_take().unwrap().name(), "b");
        assert!(queue.try_take().is_none());
    }

    #[test]
    fn test_take_timeout_on_empty_queue() {
        let queue = PriorityTaskQueue::new();
        let started = Instant::now();

        assert!(queue.take_timeout(Duration::from_millis(20)).is_none());
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_blocked_taker_receives_later_submission() {
        let queue = Arc::new(PriorityTaskQueue::new());
        let taker = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.take_timeout(Duration::from_secs(10)))
        };

        thread::sleep(Duration::from_millis(20));
        queue.submit(Task::new("late", 4, ""));

        let task = taker.join().unwrap().expect("task should be delivered");
        assert_eq!(task.name(), "late");
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn test_wake_all_releases_blocked_takers() {
        let queue = Arc::new(PriorityTaskQueue::new());
        let takers: Vec<_> = (0..3)
            .map(|_| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || queue.take_timeout(Duration::from_secs(30)))
            })
            .collect();

        // A taker that had not started waiting yet would miss a single wake-up
        let give_up = Instant::now() + Duration::from_secs(10);
        while !takers.iter().all(|t| t.is_finished()) && Instant::now() < give_up {
            queue.wake_all();
            thread::sleep(Duration::from_millis(10));
        }

        for taker in takers {
            assert!(taker.is_finished());
            assert!(taker.join().unwrap().is_none());
        }
    }

    #[test]
    fn test_take_with_runs_hook_for_taken_task() {
        let queue = PriorityTaskQueue::new();
        queue.submit(Task::new("hooked", 2, ""));

        let (task, name) = queue
            .take_timeout_with(Duration::from_millis(10), |task| task.name().to_string())
            .unwrap();
        assert_eq!(task.name(), name);
        assert!(queue
            .take_timeout_with(Duration::from_millis(5), |_| unreachable!())
            .is_none());
        assert!(queue.is_empty_and(|| true));
    }

    #[test]
    fn test_len_tracks_submissions() {
        let queue = PriorityTaskQueue::new();
        for priority in 1..=4 {
            queue.submit(Task::new(format!("task-{priority}"), priority, ""));
        }
        assert_eq!(queue.len(), 4);

        queue.try_take();
        assert_eq!(queue.len(), 3);
    }
}
