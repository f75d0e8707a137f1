//! # Worker Pool
//!
//! Fixed-size pool of worker threads sharing one queue and tracker.
//!
//! Shutdown is phased: request a cooperative stop and wait for exit
//! notifications; past the graceful timeout, fire the interrupt signal so
//! in-flight work unwinds through the retry path; past the force timeout,
//! abandon whatever is still running and reconcile the tasks it held.

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use serde::Serialize;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use crate::config::SchedulerConfig;
use crate::constants::{defaults, messages};
use crate::error::{Result, SchedulerError};
use crate::orchestration::context::SchedulerContext;
use crate::orchestration::shutdown::StopSignal;
use crate::orchestration::work::WorkExecutor;
use crate::orchestration::worker::{Worker, WorkerStats};

/// What pool shutdown had to do
#[derive(Debug, Clone, Default, Serialize)]
pub struct ShutdownReport {
    /// Every worker exited within the graceful timeout
    pub graceful: bool,
    /// The interrupt signal had to be fired
    pub forced: bool,
    #[serde(skip)]
    pub worker_stats: Vec<WorkerStats>,
    /// Workers still running after the force timeout, detached
    pub abandoned_workers: Vec<String>,
    /// PROCESSING records of abandoned workers that were marked FAILED
    pub abandoned_tasks: usize,
}

/// Reports the worker's exit on drop, so a panicking worker is counted too
struct ExitNotifier {
    index: usize,
    exits: Sender<usize>,
}

impl Drop for ExitNotifier {
    fn drop(&mut self) {
        let _ = self.exits.send(self.index);
    }
}

struct WorkerHandle {
    name: String,
    handle: JoinHandle<WorkerStats>,
    exited: bool,
}

pub struct WorkerPool {
    context: Arc<SchedulerContext>,
    stop: StopSignal,
    interrupt: StopSignal,
    workers: Vec<WorkerHandle>,
    exits: Receiver<usize>,
    shutdown_timeout: Duration,
    force_shutdown_timeout: Duration,
}

impl WorkerPool {
    /// Spawn `worker_pool_size` named worker threads
    pub fn start(
        config: &SchedulerConfig,
        context: Arc<SchedulerContext>,
        executor: Arc<dyn WorkExecutor>,
    ) -> Result<Self> {
        let stop = StopSignal::new();
        let interrupt = StopSignal::new();
        let (exit_tx, exits) = channel::unbounded();

        info!(
            "🏊 POOL: Starting {} workers (poll timeout: {}ms)",
            config.worker_pool_size, config.poll_timeout_ms
        );

        let mut pool = Self {
            context: Arc::clone(&context),
            stop: stop.clone(),
            interrupt: interrupt.clone(),
            workers: Vec::with_capacity(config.worker_pool_size),
            exits,
            shutdown_timeout: config.shutdown_timeout(),
            force_shutdown_timeout: config.force_shutdown_timeout(),
        };

        for index in 0..config.worker_pool_size {
            let worker = Worker::new(
                index + 1,
                Arc::clone(&context),
                Arc::clone(&executor),
                config.poll_timeout(),
                stop.clone(),
                interrupt.clone(),
            );
            let name = worker.name().to_string();
            let notifier = ExitNotifier {
                index,
                exits: exit_tx.clone(),
            };

            // On failure `pool` drops here and its Drop stops the workers already running
            let handle = thread::Builder::new()
                .name(name.clone())
                .spawn(move || {
                    let _notifier = notifier;
                    worker.run()
                })
                .map_err(|e| SchedulerError::spawn(name.clone(), e))?;

            pool.workers.push(WorkerHandle {
                name,
                handle,
                exited: false,
            });
        }

        info!("✅ POOL: {} workers running", pool.workers.len());
        Ok(pool)
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    pub fn worker_names(&self) -> Vec<String> {
        self.workers.iter().map(|w| w.name.clone()).collect()
    }

    /// Stop every worker, escalating to interruption and then abandonment
    pub fn shutdown(mut self) -> ShutdownReport {
        let mut report = ShutdownReport::default();

        info!(
            "🛑 POOL: Requesting cooperative stop of {} workers",
            self.workers.len()
        );
        self.stop.cancel();
        report.graceful = self.await_exits(Instant::now() + self.shutdown_timeout);

        if !report.graceful {
            warn!(
                "⚠️ POOL: Workers did not stop within {}ms, interrupting in-flight work",
                self.shutdown_timeout.as_millis()
            );
            report.forced = true;
            self.interrupt.cancel();
            self.await_exits(Instant::now() + self.force_shutdown_timeout);
        }

        for worker in self.workers.drain(..) {
            if !worker.exited {
                error!(worker = %worker.name, "❌ POOL: Abandoning worker still running after forced shutdown");
                report.abandoned_workers.push(worker.name);
                continue;
            }
            match worker.handle.join() {
                Ok(stats) => report.worker_stats.push(stats),
                Err(_) => error!(worker = %worker.name, "❌ POOL: Worker thread panicked"),
            }
        }

        report.abandoned_tasks = self
            .context
            .tracker()
            .reconcile_abandoned(&report.abandoned_workers, messages::ABANDONED);

        info!(
            graceful = report.graceful,
            forced = report.forced,
            abandoned_workers = report.abandoned_workers.len(),
            abandoned_tasks = report.abandoned_tasks,
            "🎉 POOL: Worker pool shut down"
        );
        report
    }

    /// Wait for exit notifications until `deadline`. Blocked takers are woken
    /// on every check so none sits out a full poll timeout.
    fn await_exits(&mut self, deadline: Instant) -> bool {
        let check_interval = Duration::from_millis(defaults::DRAIN_CHECK_INTERVAL_MS);

        while self.workers.iter().any(|w| !w.exited) {
            self.context.queue().wake_all();

            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let slice = check_interval.min(deadline - now);

            match self.exits.recv_timeout(slice) {
                Ok(index) => {
                    if let Some(worker) = self.workers.get_mut(index) {
                        worker.exited = true;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                // Every notifier is gone, so every worker has exited
                Err(RecvTimeoutError::Disconnected) => {
                    for worker in &mut self.workers {
                        worker.exited = true;
                    }
                }
            }
        }
        true
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            self.stop.cancel();
            self.interrupt.cancel();
            self.context.queue().wake_all();
        }
    }
}
