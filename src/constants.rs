//! # System Constants
//!
//! Defaults and fixed names that define the operational boundaries of the
//! dispatch core. Configuration values default to these; see [`crate::config`].

/// Scheduler defaults, matching the reference deployment
pub mod defaults {
    pub const WORKER_POOL_SIZE: usize = 4;
    pub const MAX_RETRY_ATTEMPTS: u32 = 3;
    pub const POLL_TIMEOUT_MS: u64 = 2_000;
    pub const RUN_DURATION_MS: u64 = 8_000;
    pub const DRAIN_GRACE_PERIOD_MS: u64 = 5_000;
    pub const SHUTDOWN_TIMEOUT_MS: u64 = 5_000;
    pub const FORCE_SHUTDOWN_TIMEOUT_MS: u64 = 1_000;
    pub const PRODUCER_JOIN_TIMEOUT_MS: u64 = 2_000;

    pub const REPORTER_INTERVAL_MS: u64 = 5_000;
    pub const REPORTER_STOP_TIMEOUT_MS: u64 = 2_000;

    pub const FAILURE_PROBABILITY: f64 = 0.15;
    pub const BASE_DELAY_MS: u64 = 200;
    pub const PER_PRIORITY_DELAY_MS: u64 = 150;
    pub const DELAY_VARIANCE_MS: u64 = 300;

    /// How often drain waits re-check queue and in-flight state
    pub const DRAIN_CHECK_INTERVAL_MS: u64 = 50;
}

/// Priority band used by the built-in producers (1 is most urgent)
pub mod priority {
    pub const MOST_URGENT: i32 = 1;
    pub const LEAST_URGENT: i32 = 5;
}

/// Actor names and messages recorded on status records
pub mod actors {
    pub const WORKER_PREFIX: &str = "Worker";
    pub const REPORTER_THREAD: &str = "MetricsReporter";
}

pub mod messages {
    pub const SIMULATED_FAILURE: &str = "Simulated processing failure - network timeout";
    pub const INTERRUPTED: &str = "Worker interrupted during processing";
    pub const ABANDONED: &str = "abandoned during forced shutdown";
}

/// Length of the task id prefix used in log lines
pub const SHORT_ID_LEN: usize = 8;
