//! # Scheduler Context
//!
//! The shared handle every producer, worker and reporter receives at
//! construction: the queue, the status tracker and the process-wide counters.
//! Built once by the [`Scheduler`](super::coordinator::Scheduler) and passed
//! around as `Arc<SchedulerContext>`.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use uuid::Uuid;

use super::queue::PriorityTaskQueue;
use super::status_tracker::StatusTracker;
use crate::models::Task;
use crate::state_machine::TaskStatus;

/// Monotonic counters plus the in-flight gauge. There is no cross-counter
/// consistency; each value is individually atomic.
#[derive(Debug, Default)]
pub struct SchedulerCounters {
    submitted: AtomicU64,
    processed: AtomicU64,
    retried: AtomicU64,
    in_flight: AtomicUsize,
}

impl SchedulerCounters {
    pub fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retried(&self) {
        self.retried.fetch_add(1, Ordering::Relaxed);
    }

    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn retried(&self) -> u64 {
        self.retried.load(Ordering::Relaxed)
    }

    /// Workers currently holding a dequeued task
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    pub(crate) fn begin_attempt(&self) -> InFlightGuard<'_> {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        InFlightGuard { counters: self }
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            submitted: self.submitted(),
            processed: self.processed(),
            retried: self.retried(),
            in_flight: self.in_flight(),
        }
    }
}

/// Decrements the in-flight gauge when the attempt's bookkeeping is done,
/// including a re-enqueue on retry
pub(crate) struct InFlightGuard<'a> {
    counters: &'a SchedulerCounters,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.counters.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    pub submitted: u64,
    pub processed: u64,
    pub retried: u64,
    pub in_flight: usize,
}

impl CounterSnapshot {
    /// Completed tasks as a percentage of submitted tasks
    pub fn processing_rate(&self) -> f64 {
        percent(self.processed, self.submitted)
    }

    /// Granted retries as a percentage of submitted tasks
    pub fn retry_rate(&self) -> f64 {
        percent(self.retried, self.submitted)
    }
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

#[derive(Debug)]
pub struct SchedulerContext {
    queue: PriorityTaskQueue,
    tracker: StatusTracker,
    counters: SchedulerCounters,
}

impl SchedulerContext {
    pub fn new(max_retry_attempts: u32) -> Self {
        Self {
            queue: PriorityTaskQueue::new(),
            tracker: StatusTracker::new(max_retry_attempts),
            counters: SchedulerCounters::default(),
        }
    }

    pub fn queue(&self) -> &PriorityTaskQueue {
        &self.queue
    }

    pub fn tracker(&self) -> &StatusTracker {
        &self.tracker
    }

    pub fn counters(&self) -> &SchedulerCounters {
        &self.counters
    }

    /// Producer-side submission: record SUBMITTED, count it, then enqueue.
    ///
    /// The record is written before the task becomes visible to workers so a
    /// fast worker never overtakes the SUBMITTED write.
    pub fn submit(&self, task: Task, actor: &str) -> Uuid {
        let task_id = task.id();
        self.tracker.record_status(task_id, TaskStatus::Submitted, actor);
        self.counters.record_submitted();
        self.queue.submit(task);
        task_id
    }

    /// Take the next task and count it in flight before the queue unlocks
    pub(crate) fn take_task(&self, timeout: Duration) -> Option<(Task, InFlightGuard<'_>)> {
        self.queue
            .take_timeout_with(timeout, |_| self.counters.begin_attempt())
    }

    /// Nothing queued and no worker holding a task
    pub fn is_quiescent(&self) -> bool {
        self.queue
            .is_empty_and(|| self.counters.in_flight() == 0)
    }
}
