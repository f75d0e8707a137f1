//! # Metrics Reporter
//!
//! Periodic, read-only view of the scheduler: queue size, busy workers, the
//! three counters, the status breakdown and derived rates. Runs on its own
//! thread and logs a final report when stopped.

use crossbeam::channel::{self, RecvTimeoutError};
use serde::Serialize;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{info, warn};

use crate::constants::actors;
use crate::error::{Result, SchedulerError};
use crate::orchestration::context::{CounterSnapshot, SchedulerContext};
use crate::orchestration::shutdown::StopSignal;

/// One reporting sample
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub queue_size: usize,
    pub busy_workers: usize,
    pub pool_size: usize,
    pub counters: CounterSnapshot,
    /// Compact `S:n P:n C:n R:n F:n` breakdown
    pub status_breakdown: String,
    pub processing_rate: f64,
    pub retry_rate: f64,
}

impl MetricsReport {
    pub fn collect(context: &SchedulerContext, pool_size: usize) -> Self {
        let counters = context.counters().snapshot();
        Self {
            queue_size: context.queue().len(),
            busy_workers: counters.in_flight,
            pool_size,
            counters,
            status_breakdown: context.tracker().snapshot().to_string(),
            processing_rate: counters.processing_rate(),
            retry_rate: counters.retry_rate(),
        }
    }

    pub fn log(&self) {
        info!("📊 === SYSTEM MONITORING REPORT ===");
        info!(
            "🔢 Queue Size: {} | Active Workers: {}/{}",
            self.queue_size, self.busy_workers, self.pool_size
        );
        info!(
            "✅ Tasks Processed: {} | Submitted: {} | Retried: {}",
            self.counters.processed, self.counters.submitted, self.counters.retried
        );
        info!("📈 Task Status Breakdown: {}", self.status_breakdown);
        info!(
            "💡 Processing Rate: {:.1}% | Retry Rate: {:.1}%",
            self.processing_rate, self.retry_rate
        );
    }
}

pub struct MetricsReporter {
    stop: StopSignal,
    handle: JoinHandle<()>,
    exited: channel::Receiver<()>,
}

impl MetricsReporter {
    /// Start reporting every `interval`, first report after one interval
    pub fn start(context: Arc<SchedulerContext>, interval: Duration, pool_size: usize) -> Result<Self> {
        let stop = StopSignal::new();
        let signal = stop.clone();
        let (exit_tx, exited) = channel::bounded(1);

        let handle = thread::Builder::new()
            .name(actors::REPORTER_THREAD.to_string())
            .spawn(move || {
                info!(
                    interval_ms = interval.as_millis() as u64,
                    "Metrics reporter started"
                );
                while !signal.wait_timeout(interval) {
                    MetricsReport::collect(&context, pool_size).log();
                }

                info!("=== FINAL MONITORING REPORT ===");
                MetricsReport::collect(&context, pool_size).log();
                let _ = exit_tx.send(());
            })
            .map_err(|e| SchedulerError::spawn(actors::REPORTER_THREAD, e))?;

        Ok(Self {
            stop,
            handle,
            exited,
        })
    }

    /// Stop and wait up to `timeout`. The thread is detached on timeout.
    pub fn stop(self, timeout: Duration) -> Result<()> {
        self.stop.cancel();
        await_reporter_exit(&self.exited, timeout)?;
        if self.handle.join().is_err() {
            warn!("Metrics reporter thread panicked");
        }
        Ok(())
    }
}

fn await_reporter_exit(exited: &channel::Receiver<()>, timeout: Duration) -> Result<()> {
    match exited.recv_timeout(timeout) {
        Ok(()) | Err(RecvTimeoutError::Disconnected) => Ok(()),
        Err(RecvTimeoutError::Timeout) => Err(SchedulerError::Timeout {
            operation: "metrics reporter stop".to_string(),
            timeout_ms: timeout.as_millis() as u64,
        }),
    }
}
