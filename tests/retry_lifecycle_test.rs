//! Bounded retry through the worker protocol

mod common;

use common::*;
use std::sync::Arc;
use std::time::Duration;

use dispatch_core::orchestration::{StopSignal, Worker};
use dispatch_core::{AttemptOutcome, SchedulerContext, Task, TaskStatus};

fn worker_for(context: &Arc<SchedulerContext>, executor: Arc<ScriptedExecutor>) -> Worker {
    Worker::new(
        1,
        Arc::clone(context),
        executor,
        Duration::from_millis(10),
        StopSignal::new(),
        StopSignal::new(),
    )
}

#[test]
fn test_always_failing_task_ends_failed_after_budget() {
    let context = Arc::new(SchedulerContext::new(2));
    let task = Task::new("Payment-1", 1, "payment_id=1001");
    let id = context.submit(task, "PaymentProducer");
    let executor = Arc::new(ScriptedExecutor::failing([id]));
    let worker = worker_for(&context, Arc::clone(&executor));

    let mut outcomes = Vec::new();
    while let Some(task) = context.queue().try_take() {
        outcomes.push(worker.process(task));
    }

    assert_eq!(
        outcomes,
        vec![
            AttemptOutcome::Retried { retry_count: 1 },
            AttemptOutcome::Retried { retry_count: 2 },
            AttemptOutcome::Failed { retry_count: 2 },
        ]
    );
    let record = context.tracker().get(&id).unwrap();
    assert_eq!(record.retry_count, 2);
    assert_eq!(record.status, TaskStatus::Failed);
    assert_eq!(
        record.error_message.as_deref(),
        Some("scripted failure for Payment-1")
    );
    assert_eq!(executor.attempts(&id), 3);
    assert_eq!(context.counters().retried(), 2);
    assert_eq!(context.counters().processed(), 0);
}

#[test]
fn test_can_retry_is_false_exactly_at_the_limit() {
    let context = Arc::new(SchedulerContext::new(2));
    let id = context.submit(Task::new("Email-alert-1", 3, ""), "EmailProducer");
    let worker = worker_for(&context, Arc::new(ScriptedExecutor::failing([id])));
    let tracker = context.tracker();

    assert!(tracker.can_retry(&id));
    let task = context.queue().try_take().unwrap();
    worker.process(task);
    assert!(tracker.can_retry(&id));

    let task = context.queue().try_take().unwrap();
    worker.process(task);
    assert_eq!(tracker.get(&id).unwrap().retry_count, 2);
    assert!(!tracker.can_retry(&id));

    assert!(!tracker.can_retry(&uuid::Uuid::new_v4()));
}

#[test]
fn test_retried_task_reenters_priority_order() {
    let context = Arc::new(SchedulerContext::new(1));
    let tasks = tasks_with_priorities(&[3, 1, 2]);
    let failing = tasks[1].id();
    for task in tasks {
        context.submit(task, "test");
    }
    let worker = worker_for(&context, Arc::new(ScriptedExecutor::failing([failing])));

    let mut processed = Vec::new();
    while let Some(task) = context.queue().try_take() {
        processed.push(task.priority());
        worker.process(task);
    }

    // The priority-1 retry jumps ahead of the priority-2 and 3 tasks
    assert_eq!(processed, vec![1, 1, 2, 3]);
    assert_eq!(context.tracker().failed_records().len(), 1);
}

#[test]
fn test_zero_retry_budget_fails_on_first_error() {
    let context = Arc::new(SchedulerContext::new(0));
    let id = context.submit(Task::new("Maintenance-backup-1", 5, ""), "MaintenanceProducer");
    let worker = worker_for(&context, Arc::new(ScriptedExecutor::failing([id])));

    let task = context.queue().try_take().unwrap();
    assert_eq!(worker.process(task), AttemptOutcome::Failed { retry_count: 0 });
    assert!(context.queue().is_empty());
}
