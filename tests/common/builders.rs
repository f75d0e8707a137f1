//! Test fixtures: millisecond-scale configs, scripted executors and task sets

use chrono::{Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::thread;
use std::time::{Duration, Instant};
use uuid::Uuid;

use dispatch_core::config::{DispatchConfig, ReporterConfig, SchedulerConfig};
use dispatch_core::orchestration::{StopSignal, WorkError, WorkExecutor};
use dispatch_core::Task;

/// Scheduler config with short polls and generous shutdown windows
pub fn fast_config(workers: usize, max_retry_attempts: u32) -> DispatchConfig {
    DispatchConfig {
        scheduler: SchedulerConfig {
            worker_pool_size: workers,
            max_retry_attempts,
            poll_timeout_ms: 20,
            run_duration_ms: 50,
            drain_grace_period_ms: 10_000,
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

/// Tasks with the given priorities, created 1ms apart in slice order
pub fn tasks_with_priorities(priorities: &[i32]) -> Vec<Task> {
    let base = Utc::now();
    priorities
        .iter()
        .enumerate()
        .map(|(i, &priority)| {
            Task::builder(format!("task-{i}"), priority)
                .created_at(base + ChronoDuration::milliseconds(i as i64))
                .payload(format!("index={i}"))
                .build()
        })
        .collect()
}

/// Fails every attempt of the listed task ids and succeeds otherwise,
/// counting attempts per task
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    always_fail: HashSet<Uuid>,
    attempts: Mutex<HashMap<Uuid, u32>>,
}

impl ScriptedExecutor {
    pub fn failing(ids: impl IntoIterator<Item = Uuid>) -> Self {
        Self {
            always_fail: ids.into_iter().collect(),
            attempts: Mutex::new(HashMap::new()),
        }
    }

    pub fn attempts(&self, id: &Uuid) -> u32 {
        self.attempts.lock().get(id).copied().unwrap_or(0)
    }

    pub fn total_attempts(&self) -> u32 {
        self.attempts.lock().values().sum()
    }
}

impl WorkExecutor for ScriptedExecutor {
    fn execute(&self, task: &Task, _interrupt: &StopSignal) -> Result<(), WorkError> {
        *self.attempts.lock().entry(task.id()).or_insert(0) += 1;
        if self.always_fail.contains(&task.id()) {
            Err(WorkError::Failed(format!("scripted failure for {}", task.name())))
        } else {
            Ok(())
        }
    }
}

/// Poll `condition` until it holds or `timeout` elapses
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}
