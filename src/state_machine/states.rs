use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a task as recorded by the status tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Task created and submitted to the queue
    Submitted,
    /// Task picked up by a worker
    Processing,
    /// Task processed successfully
    Completed,
    /// Task failed permanently (retries exhausted or abandoned)
    Failed,
    /// Task failed but was re-enqueued for another attempt
    Retrying,
}

impl TaskStatus {
    /// All statuses in lifecycle order, used for aggregate breakdowns
    pub const ALL: [TaskStatus; 5] = [
        Self::Submitted,
        Self::Processing,
        Self::Completed,
        Self::Retrying,
        Self::Failed,
    ];

    /// Check if this is an absorbing state (the worker protocol never leaves it)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Check if a worker currently holds the task
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Processing)
    }

    /// Single-letter code used in the compact status breakdown
    pub fn short_code(&self) -> char {
        match self {
            Self::Submitted => 'S',
            Self::Processing => 'P',
            Self::Completed => 'C',
            Self::Failed => 'F',
            Self::Retrying => 'R',
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Submitted => write!(f, "SUBMITTED"),
            Self::Processing => write!(f, "PROCESSING"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Failed => write!(f, "FAILED"),
            Self::Retrying => write!(f, "RETRYING"),
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "SUBMITTED" => Ok(Self::Submitted),
            "PROCESSING" => Ok(Self::Processing),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            "RETRYING" => Ok(Self::Retrying),
            _ => Err(format!("Invalid task status: {s}")),
        }
    }
}

/// Default status for newly registered tasks
impl Default for TaskStatus {
    fn default() -> Self {
        Self::Submitted
    }
}

/// Result of asking the tracker for another attempt after a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry granted; the record is now RETRYING with the incremented count
    Granted { retry_count: u32 },
    /// Retry budget spent; the record is now terminal FAILED
    Exhausted { retry_count: u32 },
    /// No record exists for the task id
    Unknown,
}

impl RetryDecision {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted { .. })
    }
}

/// What happened to a single dequeued attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Completed,
    Retried { retry_count: u32 },
    Failed { retry_count: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(!TaskStatus::Submitted.is_terminal());
        assert!(!TaskStatus::Processing.is_terminal());
        assert!(!TaskStatus::Retrying.is_terminal());
    }

    #[test]
    fn test_only_processing_is_active() {
        let active: Vec<_> = TaskStatus::ALL.into_iter().filter(TaskStatus::is_active).collect();
        assert_eq!(active, vec![TaskStatus::Processing]);
    }

    #[test]
    fn test_status_string_conversion() {
        assert_eq!(TaskStatus::Retrying.to_string(), "RETRYING");
        assert_eq!(
            "completed".parse::<TaskStatus>().unwrap(),
            TaskStatus::Completed
        );
        assert!("exploded".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn test_status_serde() {
        let json = serde_json::to_string(&TaskStatus::Processing).unwrap();
        assert_eq!(json, "\"PROCESSING\"");

        let parsed: TaskStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, TaskStatus::Processing);
    }

    #[test]
    fn test_retry_decision_granted() {
        assert!(RetryDecision::Granted { retry_count: 1 }.is_granted());
        assert!(!RetryDecision::Exhausted { retry_count: 3 }.is_granted());
        assert!(!RetryDecision::Unknown.is_granted());
    }
}
