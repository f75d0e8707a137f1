//! # Dispatch Configuration System
//!
//! Layered configuration for the scheduler, the simulated unit of work, the
//! built-in producers and the metrics reporter. Values are resolved in order:
//! compiled defaults, `dispatch-config.yaml`, `dispatch-config.<env>.yaml`,
//! then `DISPATCH__`-prefixed environment variables.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use dispatch_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let pool_size = manager.config().scheduler.worker_pool_size;
//! let poll_timeout = manager.config().scheduler.poll_timeout();
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{defaults, priority};

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure mirroring dispatch-config.yaml
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Worker pool, retry budget and shutdown phase timings
    pub scheduler: SchedulerConfig,

    /// Periodic metrics reporter
    pub reporter: ReporterConfig,

    /// Simulated unit-of-work behavior
    pub work: WorkConfig,

    /// Built-in task producers, one thread each
    pub producers: Vec<ProducerConfig>,

    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub worker_pool_size: usize,
    pub max_retry_attempts: u32,
    /// Bounded wait for each queue take; stop requests are observed between takes
    pub poll_timeout_ms: u64,
    pub run_duration_ms: u64,
    pub drain_grace_period_ms: u64,
    /// Cooperative stop window before in-flight work is interrupted
    pub shutdown_timeout_ms: u64,
    /// Window after interruption before remaining workers are abandoned
    pub force_shutdown_timeout_ms: u64,
    pub producer_join_timeout_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worker_pool_size: defaults::WORKER_POOL_SIZE,
            max_retry_attempts: defaults::MAX_RETRY_ATTEMPTS,
            poll_timeout_ms: defaults::POLL_TIMEOUT_MS,
            run_duration_ms: defaults::RUN_DURATION_MS,
            drain_grace_period_ms: defaults::DRAIN_GRACE_PERIOD_MS,
            shutdown_timeout_ms: defaults::SHUTDOWN_TIMEOUT_MS,
            force_shutdown_timeout_ms: defaults::FORCE_SHUTDOWN_TIMEOUT_MS,
            producer_join_timeout_ms: defaults::PRODUCER_JOIN_TIMEOUT_MS,
        }
    }
}

impl SchedulerConfig {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    pub fn run_duration(&self) -> Duration {
        Duration::from_millis(self.run_duration_ms)
    }

    pub fn drain_grace_period(&self) -> Duration {
        Duration::from_millis(self.drain_grace_period_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    pub fn force_shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.force_shutdown_timeout_ms)
    }

    pub fn producer_join_timeout(&self) -> Duration {
        Duration::from_millis(self.producer_join_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReporterConfig {
    pub enabled: bool,
    pub interval_ms: u64,
    pub stop_timeout_ms: u64,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: defaults::REPORTER_INTERVAL_MS,
            stop_timeout_ms: defaults::REPORTER_STOP_TIMEOUT_MS,
        }
    }
}

impl ReporterConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}

/// Simulated processing: `base + priority * per_priority + rand(0..variance)` ms,
/// then a failure with `failure_probability`
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkConfig {
    pub failure_probability: f64,
    pub base_delay_ms: u64,
    pub per_priority_delay_ms: u64,
    pub delay_variance_ms: u64,
}

impl Default for WorkConfig {
    fn default() -> Self {
        Self {
            failure_probability: defaults::FAILURE_PROBABILITY,
            base_delay_ms: defaults::BASE_DELAY_MS,
            per_priority_delay_ms: defaults::PER_PRIORITY_DELAY_MS,
            delay_variance_ms: defaults::DELAY_VARIANCE_MS,
        }
    }
}

/// Task categories produced by the built-in producers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProducerKind {
    Payment,
    Email,
    Maintenance,
}

impl ProducerKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Payment => "PaymentProducer",
            Self::Email => "EmailProducer",
            Self::Maintenance => "MaintenanceProducer",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProducerConfig {
    pub kind: ProducerKind,
    pub priority_min: i32,
    pub priority_max: i32,
    pub interval_min_ms: u64,
    pub interval_max_ms: u64,
}

impl ProducerConfig {
    pub fn payment() -> Self {
        Self {
            kind: ProducerKind::Payment,
            priority_min: priority::MOST_URGENT,
            priority_max: 2,
            interval_min_ms: 1_000,
            interval_max_ms: 2_000,
        }
    }

    pub fn email() -> Self {
        Self {
            kind: ProducerKind::Email,
            priority_min: 3,
            priority_max: 4,
            interval_min_ms: 1_500,
            interval_max_ms: 3_000,
        }
    }

    pub fn maintenance() -> Self {
        Self {
            kind: ProducerKind::Maintenance,
            priority_min: 4,
            priority_max: priority::LEAST_URGENT,
            interval_min_ms: 2_000,
            interval_max_ms: 4_000,
        }
    }

    /// The three reference producer categories
    pub fn reference_set() -> Vec<Self> {
        vec![Self::payment(), Self::email(), Self::maintenance()]
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Emit JSON lines on the console instead of the human-readable format
    pub json: bool,
    /// When set, also write JSON logs to a file in this directory
    pub log_directory: Option<PathBuf>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            reporter: ReporterConfig::default(),
            work: WorkConfig::default(),
            producers: ProducerConfig::reference_set(),
            logging: LoggingConfig::default(),
        }
    }
}

impl DispatchConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        let scheduler = &self.scheduler;

        if scheduler.worker_pool_size == 0 {
            return Err(ConfigurationError::invalid_value(
                "scheduler.worker_pool_size",
                scheduler.worker_pool_size,
                "worker pool size must be greater than 0",
            ));
        }

        if scheduler.poll_timeout_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "scheduler.poll_timeout_ms",
                scheduler.poll_timeout_ms,
                "poll timeout must be greater than 0",
            ));
        }

        if self.reporter.enabled && self.reporter.interval_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "reporter.interval_ms",
                self.reporter.interval_ms,
                "reporting interval must be greater than 0 when the reporter is enabled",
            ));
        }

        let probability = self.work.failure_probability;
        if !(0.0..=1.0).contains(&probability) {
            return Err(ConfigurationError::invalid_value(
                "work.failure_probability",
                probability,
                "probability must be within [0.0, 1.0]",
            ));
        }

        for producer in &self.producers {
            if producer.priority_min > producer.priority_max {
                return Err(ConfigurationError::invalid_value(
                    format!("producers.{}.priority_min", producer.kind.name()),
                    producer.priority_min,
                    format!("must not exceed priority_max ({})", producer.priority_max),
                ));
            }

            if producer.interval_min_ms > producer.interval_max_ms {
                return Err(ConfigurationError::invalid_value(
                    format!("producers.{}.interval_min_ms", producer.kind.name()),
                    producer.interval_min_ms,
                    format!(
                        "must not exceed interval_max_ms ({})",
                        producer.interval_max_ms
                    ),
                ));
            }
        }

        Ok(())
    }
}
