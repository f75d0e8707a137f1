//! # Unit of Work
//!
//! The pluggable operation a worker runs for each dequeued task. Delay and
//! failure behavior live here, not in the worker.

use rand::Rng;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use super::shutdown::StopSignal;
use crate::config::WorkConfig;
use crate::constants::messages;
use crate::models::Task;

/// Why an attempt did not complete. Both variants go through the same
/// retry accounting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkError {
    #[error("{0}")]
    Failed(String),

    #[error("{}", messages::INTERRUPTED)]
    Interrupted,
}

/// Executes one attempt of a task.
///
/// `interrupt` fires on forced shutdown; long-running work should wait on it
/// and return [`WorkError::Interrupted`].
pub trait WorkExecutor: Send + Sync {
    fn execute(&self, task: &Task, interrupt: &StopSignal) -> Result<(), WorkError>;
}

/// Delay proportional to priority, then a random failure
#[derive(Debug, Clone)]
pub struct SimulatedWork {
    config: WorkConfig,
}

impl SimulatedWork {
    pub fn new(config: WorkConfig) -> Self {
        Self { config }
    }

    /// `base + priority * per_priority + rand(0..variance)`
    pub fn processing_delay(&self, task: &Task, rng: &mut impl Rng) -> Duration {
        let priority = u64::try_from(task.priority()).unwrap_or(0);
        let variance = if self.config.delay_variance_ms == 0 {
            0
        } else {
            rng.gen_range(0..self.config.delay_variance_ms)
        };
        Duration::from_millis(
            self.config.base_delay_ms + priority * self.config.per_priority_delay_ms + variance,
        )
    }
}

impl WorkExecutor for SimulatedWork {
    fn execute(&self, task: &Task, interrupt: &StopSignal) -> Result<(), WorkError> {
        let mut rng = rand::thread_rng();
        let delay = self.processing_delay(task, &mut rng);

        if interrupt.wait_timeout(delay) {
            return Err(WorkError::Interrupted);
        }

        let probability = self.config.failure_probability.clamp(0.0, 1.0);
        if rng.gen_bool(probability) {
            return Err(WorkError::Failed(messages::SIMULATED_FAILURE.to_string()));
        }
        Ok(())
    }
}

/// Adapts a closure into a [`WorkExecutor`]
pub struct FnExecutor<F> {
    f: F,
}

impl<F> FnExecutor<F>
where
    F: Fn(&Task, &StopSignal) -> Result<(), WorkError> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> WorkExecutor for FnExecutor<F>
where
    F: Fn(&Task, &StopSignal) -> Result<(), WorkError> + Send + Sync,
{
    fn execute(&self, task: &Task, interrupt: &StopSignal) -> Result<(), WorkError> {
        (self.f)(task, interrupt)
    }
}

impl<F> fmt::Debug for FnExecutor<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnExecutor").finish_non_exhaustive()
    }
}
