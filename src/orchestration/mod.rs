//! # Orchestration Engine
//!
//! Priority-ordered task dispatch with bounded retry, run by a fixed pool of
//! OS-thread workers.
//!
//! ## Core Components
//!
//! - **PriorityTaskQueue**: blocking priority queue, ties broken by creation order
//! - **StatusTracker**: per-task status records with an atomic retry decision
//! - **SchedulerContext**: the shared queue, tracker and counters handle
//! - **Worker**: take, execute, record; failures go through the retry protocol
//! - **Producer**: task sources, one thread each
//! - **Scheduler**: phase driver with graceful, forced and abandoning shutdown
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use dispatch_core::config::DispatchConfig;
//! use dispatch_core::orchestration::{Scheduler, SimulatedProducer, SimulatedWork};
//!
//! # fn main() -> Result<(), dispatch_core::SchedulerError> {
//! let config = DispatchConfig::default();
//! let producers = SimulatedProducer::from_configs(&config.producers);
//! let executor = Arc::new(SimulatedWork::new(config.work.clone()));
//!
//! let mut scheduler = Scheduler::new(config, executor)?;
//! let report = scheduler.run(producers)?;
//! println!("final breakdown: {}", report.statuses);
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod coordinator;
pub mod producer;
pub mod queue;
pub mod shutdown;
pub mod status_tracker;
pub mod work;
pub mod worker;

pub use context::{CounterSnapshot, SchedulerContext, SchedulerCounters};
pub use coordinator::monitor::{MetricsReport, MetricsReporter};
pub use coordinator::pool::{ShutdownReport, WorkerPool};
pub use coordinator::{RunReport, Scheduler};
pub use producer::{BatchProducer, Producer, ProducerGroup, ProducerReport, SimulatedProducer};
pub use queue::PriorityTaskQueue;
pub use shutdown::StopSignal;
pub use status_tracker::{StatusSnapshot, StatusTracker};
pub use work::{FnExecutor, SimulatedWork, WorkError, WorkExecutor};
pub use worker::{Worker, WorkerStats};
