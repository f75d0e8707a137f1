//! # Worker
//!
//! One worker per OS thread. Each loop iteration takes the most urgent task
//! with a bounded wait, runs one attempt through the [`WorkExecutor`] and
//! pushes the outcome through the status tracker:
//!
//! ```text
//! DEQUEUED -> PROCESSING -> COMPLETED
//!                        -> RETRYING (re-enqueued)
//!                        -> FAILED   (retry budget spent)
//! ```
//!
//! The stop signal is checked between attempts only, so an attempt that has
//! started always finishes its bookkeeping before the worker exits.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::context::{InFlightGuard, SchedulerContext};
use super::shutdown::StopSignal;
use super::work::{WorkError, WorkExecutor};
use crate::constants::actors;
use crate::models::Task;
use crate::state_machine::{AttemptOutcome, RetryDecision, TaskStatus};

/// Per-worker totals returned when the loop exits
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub name: String,
    pub completed: u64,
    pub retried: u64,
    pub failed: u64,
}

impl WorkerStats {
    fn record(&mut self, outcome: AttemptOutcome) {
        match outcome {
            AttemptOutcome::Completed => self.completed += 1,
            AttemptOutcome::Retried { .. } => self.retried += 1,
            AttemptOutcome::Failed { .. } => self.failed += 1,
        }
    }

    pub fn attempts(&self) -> u64 {
        self.completed + self.retried + self.failed
    }
}

pub struct Worker {
    name: String,
    context: Arc<SchedulerContext>,
    executor: Arc<dyn WorkExecutor>,
    poll_timeout: Duration,
    /// Cooperative stop, checked between attempts
    stop: StopSignal,
    /// Forced stop, handed to the executor
    interrupt: StopSignal,
}

impl Worker {
    pub fn new(
        id: usize,
        context: Arc<SchedulerContext>,
        executor: Arc<dyn WorkExecutor>,
        poll_timeout: Duration,
        stop: StopSignal,
        interrupt: StopSignal,
    ) -> Self {
        Self {
            name: worker_name(id),
            context,
            executor,
            poll_timeout,
            stop,
            interrupt,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run until the stop signal fires
    pub fn run(&self) -> WorkerStats {
        let mut stats = WorkerStats {
            name: self.name.clone(),
            ..WorkerStats::default()
        };
        info!(worker = %self.name, "Worker started");

        while !self.stop.is_cancelled() {
            let Some((task, in_flight)) = self.context.take_task(self.poll_timeout) else {
                continue;
            };
            stats.record(self.attempt(task, in_flight));
        }

        info!(
            worker = %self.name,
            completed = stats.completed,
            retried = stats.retried,
            failed = stats.failed,
            "Worker stopped"
        );
        stats
    }

    /// Run a single attempt of `task` and record its outcome
    pub fn process(&self, task: Task) -> AttemptOutcome {
        let in_flight = self.context.counters().begin_attempt();
        self.attempt(task, in_flight)
    }

    /// The gauge is held until the outcome is recorded, including a re-enqueue
    fn attempt(&self, task: Task, _in_flight: InFlightGuard<'_>) -> AttemptOutcome {
        let tracker = self.context.tracker();
        let task_id = task.id();

        tracker.record_status(task_id, TaskStatus::Processing, &self.name);
        debug!(worker = %self.name, task = %task, "Processing task");

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.executor.execute(&task, &self.interrupt)
        }))
        .unwrap_or_else(|payload| Err(WorkError::Failed(panic_message(payload.as_ref()))));

        let error = match result {
            Ok(()) => {
                tracker.record_status(task_id, TaskStatus::Completed, &self.name);
                self.context.counters().record_processed();
                return AttemptOutcome::Completed;
            }
            Err(error) => error.to_string(),
        };

        match tracker.try_grant_retry(&task_id, &self.name, &error) {
            RetryDecision::Granted { retry_count } => {
                self.context.counters().record_retried();
                self.context.queue().submit(task);
                AttemptOutcome::Retried { retry_count }
            }
            RetryDecision::Exhausted { retry_count } => AttemptOutcome::Failed { retry_count },
            RetryDecision::Unknown => {
                // PROCESSING was written above, so the record cannot be missing
                warn!(worker = %self.name, task_id = %task.short_id(), "Status record vanished");
                AttemptOutcome::Failed { retry_count: 0 }
            }
        }
    }
}

pub fn worker_name(id: usize) -> String {
    format!("{}-{id}", actors::WORKER_PREFIX)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("Work panicked: {detail}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestration::work::FnExecutor;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::thread;

    fn worker_with(
        context: &Arc<SchedulerContext>,
        executor: impl WorkExecutor + 'static,
    ) -> Worker {
        Worker::new(
            1,
            Arc::clone(context),
            Arc::new(executor),
            Duration::from_millis(10),
            StopSignal::new(),
            StopSignal::new(),
        )
    }

    #[test]
    fn test_successful_attempt_completes() {
        let context = Arc::new(SchedulerContext::new(3));
        let worker = worker_with(&context, FnExecutor::new(|_: &Task, _: &StopSignal| Ok(())));
        let task = Task::new("Payment-1", 1, "");
        let id = context.submit(task, "test");

        let task = context.queue().try_take().unwrap();
        assert_eq!(worker.process(task), AttemptOutcome::Completed);

        let record = context.tracker().get(&id).unwrap();
        assert_eq!(record.status, TaskStatus::Completed);
        assert_eq!(record.last_thread, "Worker-1");
        assert_eq!(context.counters().processed(), 1);
        assert_eq!(context.counters().in_flight(), 0);
    }

    #[test]
    fn test_failed_attempt_is_requeued_unchanged() {
        let context = Arc::new(SchedulerContext::new(3));
        let worker = worker_with(
            &context,
            FnExecutor::new(|_: &Task, _: &StopSignal| Err(WorkError::Failed("timeout".into()))),
        );
        let original = Task::new("Email-welcome-1", 3, "template=welcome");
        let id = context.submit(original.clone(), "test");

        let task = context.queue().try_take().unwrap();
        assert_eq!(worker.process(task), AttemptOutcome::Retried { retry_count: 1 });

        assert_eq!(context.queue().try_take(), Some(original));
        assert_eq!(context.counters().retried(), 1);
        let record = context.tracker().get(&id).unwrap();
        assert_eq!(record.status, TaskStatus::Retrying);
        assert_eq!(record.error_message.as_deref(), Some("timeout"));
    }

    #[test]
    fn test_panicking_work_counts_as_failure() {
        let context = Arc::new(SchedulerContext::new(0));
        let worker = worker_with(
            &context,
            FnExecutor::new(|_: &Task, _: &StopSignal| -> Result<(), WorkError> {
                panic!("handler exploded")
            }),
        );
        let id = context.submit(Task::new("Maintenance-backup-1", 5, ""), "test");

        let task = context.queue().try_take().unwrap();
        assert_eq!(worker.process(task), AttemptOutcome::Failed { retry_count: 0 });

        let record = context.tracker().get(&id).unwrap();
        assert_eq!(record.status, TaskStatus::Failed);
        assert!(record.error_message.unwrap().contains("handler exploded"));
        assert_eq!(context.counters().in_flight(), 0);
    }

    #[test]
    fn test_run_loop_retries_until_success_then_stops() {
        let context = Arc::new(SchedulerContext::new(3));
        let attempts = Arc::new(AtomicU32::new(0));
        let executor = {
            let attempts = Arc::clone(&attempts);
            FnExecutor::new(move |_: &Task, _: &StopSignal| {
                if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(WorkError::Failed("flaky".into()))
                } else {
                    Ok(())
                }
            })
        };
        let stop = StopSignal::new();
        let worker = Worker::new(
            7,
            Arc::clone(&context),
            Arc::new(executor),
            Duration::from_millis(10),
            stop.clone(),
            StopSignal::new(),
        );
        let id = context.submit(Task::new("Payment-2", 2, ""), "test");

        let handle = thread::spawn(move || worker.run());
        let deadline = std::time::Instant::now() + Duration::from_secs(10);
        while context.tracker().get(&id).map(|r| r.status) != Some(TaskStatus::Completed)
            && std::time::Instant::now() < deadline
        {
            thread::sleep(Duration::from_millis(5));
        }
        stop.cancel();
        context.queue().wake_all();

        let stats = handle.join().unwrap();
        assert_eq!(stats.name, "Worker-7");
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.retried, 2);
        assert_eq!(stats.attempts(), 3);
        assert_eq!(context.tracker().get(&id).unwrap().retry_count, 2);
    }
}
