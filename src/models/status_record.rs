//! # Status Record
//!
//! Mutable per-task tracking state, owned by the [`StatusTracker`] and
//! mutated only through its transition operations.
//!
//! [`StatusTracker`]: crate::orchestration::StatusTracker

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state_machine::TaskStatus;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub task_id: Uuid,
    pub status: TaskStatus,
    /// Identity of the last worker or producer to touch the record
    pub last_thread: String,
    pub updated_at: DateTime<Utc>,
    pub retry_count: u32,
    pub error_message: Option<String>,
}

impl StatusRecord {
    pub fn new(task_id: Uuid, status: TaskStatus, actor: impl Into<String>) -> Self {
        Self {
            task_id,
            status,
            last_thread: actor.into(),
            updated_at: Utc::now(),
            retry_count: 0,
            error_message: None,
        }
    }

    /// Move to `status`, refreshing actor and timestamp
    pub(crate) fn transition(&mut self, status: TaskStatus, actor: &str) {
        self.status = status;
        self.last_thread.clear();
        self.last_thread.push_str(actor);
        self.updated_at = Utc::now();
    }

    pub(crate) fn increment_retry(&mut self, actor: &str) -> u32 {
        self.retry_count += 1;
        self.transition(TaskStatus::Retrying, actor);
        self.retry_count
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
