//! Scheduler phase tests with millisecond-scale timings

use super::*;
use crate::config::{DispatchConfig, ReporterConfig, SchedulerConfig};
use crate::models::Task;
use crate::orchestration::producer::BatchProducer;
use crate::orchestration::work::{FnExecutor, WorkError};

fn fast_config(workers: usize, max_retries: u32) -> DispatchConfig {
    DispatchConfig {
        scheduler: SchedulerConfig {
            worker_pool_size: workers,
            max_retry_attempts: max_retries,
            poll_timeout_ms: 20,
            run_duration_ms: 50,
            drain_grace_period_ms: 5_000,
            shutdown_timeout_ms: 2_000,
            force_shutdown_timeout_ms: 500,
            producer_join_timeout_ms: 2_000,
        },
        reporter: ReporterConfig {
            enabled: false,
            ..ReporterConfig::default()
        },
        producers: Vec::new(),
        ..DispatchConfig::default()
    }
}

fn always_ok() -> Arc<dyn WorkExecutor> {
    Arc::new(FnExecutor::new(|_: &Task, _: &StopSignal| Ok(())))
}

#[test]
fn test_new_rejects_invalid_config() {
    let mut config = fast_config(1, 3);
    config.scheduler.worker_pool_size = 0;

    assert!(matches!(
        Scheduler::new(config, always_ok()),
        Err(SchedulerError::Configuration(_))
    ));
}

#[test]
fn test_worker_lifecycle_errors() {
    let mut scheduler = Scheduler::new(fast_config(2, 3), always_ok()).unwrap();

    assert!(matches!(
        scheduler.shutdown_workers(),
        Err(SchedulerError::InvalidState(_))
    ));

    scheduler.start_workers().unwrap();
    assert!(scheduler.workers_running());
    assert!(matches!(
        scheduler.start_workers(),
        Err(SchedulerError::InvalidState(_))
    ));

    let report = scheduler.shutdown_workers().unwrap();
    assert!(report.graceful);
    assert!(!scheduler.workers_running());
}

#[test]
fn test_wait_for_drain_reports_quiescence() {
    let mut scheduler = Scheduler::new(fast_config(2, 3), always_ok()).unwrap();
    let context = scheduler.context();

    for priority in 1..=5 {
        context.submit(Task::new(format!("task-{priority}"), priority, ""), "test");
    }
    scheduler.start_workers().unwrap();

    assert!(scheduler.wait_for_drain(Duration::from_secs(10)));
    assert_eq!(context.counters().processed(), 5);
    scheduler.shutdown_workers().unwrap();
}

#[test]
fn test_wait_for_drain_times_out_without_workers() {
    let scheduler = Scheduler::new(fast_config(1, 3), always_ok()).unwrap();
    scheduler
        .context()
        .submit(Task::new("orphan", 1, ""), "test");

    assert!(!scheduler.wait_for_drain(Duration::from_millis(30)));
}

#[test]
fn test_run_accounts_for_every_task() {
    let executor: Arc<dyn WorkExecutor> = Arc::new(FnExecutor::new(|task: &Task, _: &StopSignal| {
        if task.priority() == 5 {
            Err(WorkError::Failed("always fails".into()))
        } else {
            Ok(())
        }
    }));
    let mut scheduler = Scheduler::new(fast_config(3, 2), executor).unwrap();
    let tasks: Vec<Task> = (0..20)
        .map(|i| Task::new(format!("task-{i}"), i % 5 + 1, ""))
        .collect();

    let report = scheduler
        .run(vec![Box::new(BatchProducer::new("Batch", tasks))])
        .unwrap();

    assert!(report.drained);
    assert_eq!(report.counters.submitted, 20);
    assert_eq!(report.terminal_count(), 20);
    assert_eq!(report.statuses.count(TaskStatus::Failed), 4);
    assert_eq!(report.counters.retried, 8);
    assert_eq!(report.failed.len(), 4);
    assert!(report.failed.iter().all(|r| r.retry_count == 2));
    assert_eq!(report.remaining_in_queue, 0);
    assert!(report.shutdown.graceful);
}

#[test]
fn test_request_stop_cuts_run_phase_short() {
    let mut config = fast_config(1, 3);
    config.scheduler.run_duration_ms = 60_000;
    let mut scheduler = Scheduler::new(config, always_ok()).unwrap();

    let stop = scheduler.stop_handle();
    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        stop.cancel()
    });

    let report = scheduler.run(Vec::new()).unwrap();
    assert!(stopper.join().unwrap());
    assert!(report.elapsed_ms < 30_000);
    assert!(!scheduler.request_stop(), "already requested");
}
