//! # Producers
//!
//! Task sources feeding the scheduler, one OS thread each. A producer only
//! talks to the scheduler through [`SchedulerContext::submit`] and honors its
//! stop signal at every sleep/submit boundary.

use crossbeam::channel::{self, RecvTimeoutError};
use rand::seq::SliceRandom;
use rand::Rng;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use super::context::SchedulerContext;
use super::shutdown::StopSignal;
use crate::config::{ProducerConfig, ProducerKind};
use crate::error::{Result, SchedulerError};
use crate::models::Task;

const EMAIL_TYPES: [&str; 5] = ["welcome", "reminder", "notification", "marketing", "alert"];
const MAINTENANCE_TYPES: [&str; 5] = ["backup", "cleanup", "report", "archive", "optimize"];

pub trait Producer: Send {
    /// Thread name, also recorded as the actor on SUBMITTED writes
    fn name(&self) -> &str;

    /// Submit tasks until `stop` fires or the producer runs dry.
    /// Returns the number of tasks submitted.
    fn run(&mut self, context: &SchedulerContext, stop: &StopSignal) -> usize;
}

/// One of the three built-in task categories, submitting at a random
/// interval until stopped
#[derive(Debug, Clone)]
pub struct SimulatedProducer {
    config: ProducerConfig,
    created: usize,
}

impl SimulatedProducer {
    pub fn new(config: ProducerConfig) -> Self {
        Self { config, created: 0 }
    }

    pub fn from_configs(configs: &[ProducerConfig]) -> Vec<Box<dyn Producer>> {
        configs
            .iter()
            .cloned()
            .map(|config| Box::new(Self::new(config)) as Box<dyn Producer>)
            .collect()
    }

    /// Build the next task in this category's naming and payload pattern
    pub fn next_task(&mut self, rng: &mut impl Rng) -> Task {
        self.created += 1;
        let n = self.created;
        let priority = rng.gen_range(self.config.priority_min..=self.config.priority_max);

        let (name, payload) = match self.config.kind {
            ProducerKind::Payment => {
                let amount = 100.0 + rng.gen::<f64>() * 900.0;
                (
                    format!("Payment-{n}"),
                    format!("payment_id={},amount={amount:.2},type=credit_card", 1000 + n),
                )
            }
            ProducerKind::Email => {
                let kind = EMAIL_TYPES.choose(rng).copied().unwrap_or("notification");
                (
                    format!("Email-{kind}-{n}"),
                    format!("user_id={},template={kind},email=user{n}@example.com", 5000 + n),
                )
            }
            ProducerKind::Maintenance => {
                let kind = MAINTENANCE_TYPES.choose(rng).copied().unwrap_or("cleanup");
                (
                    format!("Maintenance-{kind}-{n}"),
                    format!("type={kind},target=system,scheduled=true"),
                )
            }
        };

        Task::new(name, priority, payload)
    }

    fn next_interval(&self, rng: &mut impl Rng) -> Duration {
        Duration::from_millis(
            rng.gen_range(self.config.interval_min_ms..=self.config.interval_max_ms),
        )
    }
}

impl Producer for SimulatedProducer {
    fn name(&self) -> &str {
        self.config.kind.name()
    }

    fn run(&mut self, context: &SchedulerContext, stop: &StopSignal) -> usize {
        let mut rng = rand::thread_rng();
        let mut submitted = 0;
        info!(producer = self.name(), "Producer started");

        while !stop.is_cancelled() {
            let task = self.next_task(&mut rng);
            let (name, priority) = (task.name().to_string(), task.priority());
            context.submit(task, self.name());
            submitted += 1;
            info!(producer = self.name(), task = %name, priority, "Created task");

            if stop.wait_timeout(self.next_interval(&mut rng)) {
                break;
            }
        }

        info!(producer = self.name(), submitted, "Producer finished");
        submitted
    }
}

/// Submits a fixed list of tasks once, then exits
#[derive(Debug, Clone)]
pub struct BatchProducer {
    name: String,
    tasks: Vec<Task>,
}

impl BatchProducer {
    pub fn new(name: impl Into<String>, tasks: Vec<Task>) -> Self {
        Self {
            name: name.into(),
            tasks,
        }
    }
}

impl Producer for BatchProducer {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&mut self, context: &SchedulerContext, stop: &StopSignal) -> usize {
        let mut submitted = 0;
        for task in self.tasks.drain(..) {
            if stop.is_cancelled() {
                break;
            }
            context.submit(task, &self.name);
            submitted += 1;
        }
        submitted
    }
}

/// Outcome of stopping the producer threads
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProducerReport {
    pub submitted: usize,
    /// Producers that did not exit within the join timeout
    pub timed_out: Vec<String>,
}

/// Running producer threads sharing one stop signal
pub struct ProducerGroup {
    stop: StopSignal,
    handles: Vec<(String, JoinHandle<usize>)>,
    exits: channel::Receiver<usize>,
}

impl ProducerGroup {
    pub fn spawn(producers: Vec<Box<dyn Producer>>, context: Arc<SchedulerContext>) -> Result<Self> {
        let stop = StopSignal::new();
        let (exit_tx, exits) = channel::unbounded();
        let mut handles = Vec::with_capacity(producers.len());

        for (index, mut producer) in producers.into_iter().enumerate() {
            let name = producer.name().to_string();
            let context = Arc::clone(&context);
            let signal = stop.clone();
            let exit_tx = exit_tx.clone();

            let handle = thread::Builder::new()
                .name(name.clone())
                .spawn(move || {
                    let submitted = producer.run(&context, &signal);
                    let _ = exit_tx.send(index);
                    submitted
                })
                .map_err(|e| {
                    stop.cancel();
                    SchedulerError::spawn(name.clone(), e)
                })?;
            handles.push((name, handle));
        }

        Ok(Self {
            stop,
            handles,
            exits,
        })
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Signal every producer and wait up to `timeout` for them to exit.
    /// Producers still running at the deadline are detached.
    pub fn stop(self, timeout: Duration) -> ProducerReport {
        self.stop.cancel();
        let deadline = Instant::now() + timeout;
        let mut exited = vec![false; self.handles.len()];

        for _ in 0..self.handles.len() {
            match self.exits.recv_deadline(deadline) {
                Ok(index) => exited[index] = true,
                Err(RecvTimeoutError::Timeout) => break,
                // A panicking producer drops its sender without reporting
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        let mut report = ProducerReport::default();
        for ((name, handle), exited) in self.handles.into_iter().zip(exited) {
            if !exited && !handle.is_finished() {
                warn!(producer = %name, timeout_ms = timeout.as_millis() as u64, "Producer did not stop in time, detaching");
                report.timed_out.push(name);
                continue;
            }
            match handle.join() {
                Ok(submitted) => report.submitted += submitted,
                Err(_) => warn!(producer = %name, "Producer thread panicked"),
            }
        }
        report
    }
}
