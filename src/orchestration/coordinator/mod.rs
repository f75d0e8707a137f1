//! # Scheduler Coordinator
//!
//! The [`Scheduler`] owns the shared [`SchedulerContext`], the worker pool
//! and the metrics reporter, and drives a run through a fixed phase order:
//!
//! 1. start producers
//! 2. start workers
//! 3. start the metrics reporter (optional)
//! 4. run for the configured duration
//! 5. stop producers and wait for them
//! 6. let in-flight and retried tasks drain
//! 7. stop the reporter
//! 8. stop workers, escalating to interruption and abandonment
//! 9. report final counts and failed tasks
//!
//! Workers outlive producers through the drain phase, and the reporter is
//! stopped before the workers.
//!
//! ## Key Components
//!
//! - [`Scheduler`] - phase driver
//! - [`pool`] - worker threads and phased shutdown
//! - [`monitor`] - periodic metrics reporting

pub mod monitor;
pub mod pool;

#[cfg(test)]
mod tests;

use serde::Serialize;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::DispatchConfig;
use crate::constants::defaults;
use crate::error::{Result, SchedulerError};
use crate::models::{short_id, StatusRecord};
use crate::orchestration::context::{CounterSnapshot, SchedulerContext};
use crate::orchestration::producer::{Producer, ProducerGroup, ProducerReport};
use crate::orchestration::shutdown::StopSignal;
use crate::orchestration::status_tracker::StatusSnapshot;
use crate::orchestration::work::WorkExecutor;
use crate::state_machine::TaskStatus;

use self::monitor::MetricsReporter;
use self::pool::{ShutdownReport, WorkerPool};

/// Everything a finished run produced
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub counters: CounterSnapshot,
    pub statuses: StatusSnapshot,
    pub remaining_in_queue: usize,
    pub failed: Vec<StatusRecord>,
    #[serde(skip)]
    pub producers: ProducerReport,
    /// Queue emptied and nothing in flight before the grace period ran out
    pub drained: bool,
    pub shutdown: ShutdownReport,
    pub elapsed_ms: u64,
}

impl RunReport {
    /// Tasks that reached COMPLETED or FAILED
    pub fn terminal_count(&self) -> usize {
        self.statuses.count(TaskStatus::Completed) + self.statuses.count(TaskStatus::Failed)
    }

    /// Final aggregate counts, status summary and failed-task details
    pub fn log_summary(&self) {
        info!("=== FINAL RESULTS ===");
        info!("Tasks submitted: {}", self.counters.submitted);
        info!("Tasks processed: {}", self.counters.processed);
        info!("Tasks retried: {}", self.counters.retried);
        info!("Remaining in queue: {}", self.remaining_in_queue);

        info!("=== TASK STATUS SUMMARY ===");
        info!(
            "SUBMITTED: {}, PROCESSING: {}, COMPLETED: {}, RETRYING: {}, FAILED: {}",
            self.statuses.count(TaskStatus::Submitted),
            self.statuses.count(TaskStatus::Processing),
            self.statuses.count(TaskStatus::Completed),
            self.statuses.count(TaskStatus::Retrying),
            self.statuses.count(TaskStatus::Failed)
        );
        info!("Total tasks tracked: {}", self.statuses.total());

        if self.failed.is_empty() {
            info!("=== NO PERMANENTLY FAILED TASKS ===");
        } else {
            info!("=== FAILED TASKS DETAILS ===");
            for record in &self.failed {
                info!(
                    "Task {}: Retries: {}, Last Error: {}, Last Thread: {}",
                    short_id(&record.task_id),
                    record.retry_count,
                    record.error_message.as_deref().unwrap_or("none"),
                    record.last_thread
                );
            }
        }

        for record in self.statuses.records() {
            debug!(
                task_id = %short_id(&record.task_id),
                status = %record.status,
                last_thread = %record.last_thread,
                updated_at = %record.updated_at,
                retry_count = record.retry_count,
                "Final task status"
            );
        }
    }
}

pub struct Scheduler {
    id: Uuid,
    config: DispatchConfig,
    context: Arc<SchedulerContext>,
    executor: Arc<dyn WorkExecutor>,
    pool: Option<WorkerPool>,
    run_stop: StopSignal,
}

impl Scheduler {
    pub fn new(config: DispatchConfig, executor: Arc<dyn WorkExecutor>) -> Result<Self> {
        config.validate()?;
        let id = Uuid::new_v4();

        info!(
            "🚀 SCHEDULER {}: Created (workers: {}, max retries: {})",
            short_id(&id),
            config.scheduler.worker_pool_size,
            config.scheduler.max_retry_attempts
        );

        Ok(Self {
            id,
            context: Arc::new(SchedulerContext::new(config.scheduler.max_retry_attempts)),
            config,
            executor,
            pool: None,
            run_stop: StopSignal::new(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Shared handle for producers and observers
    pub fn context(&self) -> Arc<SchedulerContext> {
        Arc::clone(&self.context)
    }

    pub fn workers_running(&self) -> bool {
        self.pool.is_some()
    }

    pub fn start_workers(&mut self) -> Result<()> {
        if self.pool.is_some() {
            return Err(SchedulerError::InvalidState(
                "worker pool is already running".to_string(),
            ));
        }

        self.pool = Some(WorkerPool::start(
            &self.config.scheduler,
            Arc::clone(&self.context),
            Arc::clone(&self.executor),
        )?);
        Ok(())
    }

    /// End the run-duration phase early. Returns `true` the first time.
    pub fn request_stop(&self) -> bool {
        self.run_stop.cancel()
    }

    /// Signal that ends the run-duration phase, for use from other threads
    pub fn stop_handle(&self) -> StopSignal {
        self.run_stop.clone()
    }

    /// Wait until the queue is empty and no worker holds a task, or until
    /// `grace` elapses. Returns whether quiescence was reached.
    pub fn wait_for_drain(&self, grace: Duration) -> bool {
        let deadline = Instant::now() + grace;
        let check_interval = Duration::from_millis(defaults::DRAIN_CHECK_INTERVAL_MS);

        loop {
            if self.context.is_quiescent() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            thread::sleep(check_interval.min(deadline - now));
        }
    }

    pub fn shutdown_workers(&mut self) -> Result<ShutdownReport> {
        let pool = self.pool.take().ok_or_else(|| {
            SchedulerError::InvalidState("worker pool is not running".to_string())
        })?;
        Ok(pool.shutdown())
    }

    /// Drive a complete run through every phase
    pub fn run(&mut self, producers: Vec<Box<dyn Producer>>) -> Result<RunReport> {
        let started = Instant::now();
        let scheduler = &self.config.scheduler;
        let (run_duration, join_timeout, grace) = (
            scheduler.run_duration(),
            scheduler.producer_join_timeout(),
            scheduler.drain_grace_period(),
        );

        info!("=== PHASE 1: Starting {} producers ===", producers.len());
        let producers = ProducerGroup::spawn(producers, Arc::clone(&self.context))?;

        info!("=== PHASE 2: Starting worker pool ===");
        if !self.workers_running() {
            if let Err(e) = self.start_workers() {
                producers.stop(join_timeout);
                return Err(e);
            }
        }

        let reporter = if self.config.reporter.enabled {
            info!("=== PHASE 3: Starting metrics reporter ===");
            match MetricsReporter::start(
                Arc::clone(&self.context),
                self.config.reporter.interval(),
                self.config.scheduler.worker_pool_size,
            ) {
                Ok(reporter) => Some(reporter),
                Err(e) => {
                    producers.stop(join_timeout);
                    self.shutdown_workers()?;
                    return Err(e);
                }
            }
        } else {
            None
        };

        info!(
            "=== PHASE 4: Running for {}ms ===",
            run_duration.as_millis()
        );
        if self.run_stop.wait_timeout(run_duration) {
            info!("Stop requested, ending run phase early");
        }

        info!("=== PHASE 5: Stopping producers ===");
        let producer_report = producers.stop(join_timeout);
        info!(
            "All producers stopped. Total tasks submitted: {}",
            self.context.counters().submitted()
        );

        info!(
            "=== PHASE 6: Draining remaining tasks (up to {}ms) ===",
            grace.as_millis()
        );
        let drained = self.wait_for_drain(grace);
        if !drained {
            warn!(
                queued = self.context.queue().len(),
                in_flight = self.context.counters().in_flight(),
                "Grace period ended before the queue drained"
            );
        }

        if let Some(reporter) = reporter {
            info!("=== PHASE 7: Stopping metrics reporter ===");
            if let Err(e) = reporter.stop(self.config.reporter.stop_timeout()) {
                warn!(error = %e, "Metrics reporter detached");
            }
        }

        info!("=== PHASE 8: Shutting down worker pool ===");
        let shutdown = self.shutdown_workers()?;

        info!("=== PHASE 9: Final report ===");
        let report = RunReport {
            counters: self.context.counters().snapshot(),
            statuses: self.context.tracker().snapshot(),
            remaining_in_queue: self.context.queue().len(),
            failed: self.context.tracker().failed_records(),
            producers: producer_report,
            drained,
            shutdown,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        report.log_summary();
        Ok(report)
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("id", &self.id)
            .field("workers_running", &self.pool.is_some())
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}
