//! # Error Types
//!
//! Orchestration-level errors. Task-level failures are never surfaced here:
//! they are recorded as status transitions on the [`StatusTracker`].
//!
//! [`StatusTracker`]: crate::orchestration::StatusTracker

use thiserror::Error;
use uuid::Uuid;

use crate::config::ConfigurationError;

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Timeout: {operation} did not complete within {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Failed to spawn {component}: {message}")]
    Spawn { component: String, message: String },

    #[error("Unknown task: {task_id}")]
    UnknownTask { task_id: Uuid },
}

impl SchedulerError {
    pub fn spawn(component: impl Into<String>, err: std::io::Error) -> Self {
        Self::Spawn {
            component: component.into(),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
