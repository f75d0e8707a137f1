#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Dispatch Core
//!
//! In-process, priority-ordered task dispatch: producers submit tasks to a
//! shared priority queue, a fixed pool of worker threads executes them, and
//! a concurrent status tracker records every task's lifecycle with a bounded
//! retry budget.
//!
//! ## Module Organization
//!
//! - [`models`] - `Task` and `StatusRecord`
//! - [`state_machine`] - task statuses and retry decisions
//! - [`orchestration`] - queue, tracker, workers, producers and the scheduler
//! - [`config`] - layered configuration
//! - [`error`] - structured error handling
//! - [`logging`] - structured tracing setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use dispatch_core::config::ConfigManager;
//! use dispatch_core::orchestration::{Scheduler, SimulatedProducer, SimulatedWork};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let config = manager.config().clone();
//! dispatch_core::logging::init_structured_logging(&config.logging, manager.environment());
//!
//! let producers = SimulatedProducer::from_configs(&config.producers);
//! let executor = Arc::new(SimulatedWork::new(config.work.clone()));
//! let report = Scheduler::new(config, executor)?.run(producers)?;
//! println!("{} tasks reached a terminal state", report.terminal_count());
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # Unit, integration and property tests
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod state_machine;

pub use config::{ConfigManager, ConfigurationError, DispatchConfig};
pub use error::{Result, SchedulerError};
pub use models::{StatusRecord, Task, TaskBuilder};
pub use orchestration::{
    PriorityTaskQueue, RunReport, Scheduler, SchedulerContext, StatusTracker, StopSignal,
    WorkExecutor,
};
pub use state_machine::{AttemptOutcome, RetryDecision, TaskStatus};
