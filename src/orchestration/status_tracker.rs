//! # Status Tracker
//!
//! Concurrent registry of [`StatusRecord`]s keyed by task id.
//!
//! Records live in a sharded `DashMap`, so transitions on different task ids
//! only contend when they hash to the same shard, and every transition on a
//! single id is linearized through that id's entry lock. Records are never
//! removed.
//!
//! The retry decision is exposed both as the two-step `can_retry` /
//! `increment_retry` pair and as the atomic [`StatusTracker::try_grant_retry`],
//! which checks and transitions while holding the record. Workers use the
//! atomic form.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;
use uuid::Uuid;

use crate::error::{Result, SchedulerError};
use crate::logging::log_status_transition;
use crate::models::StatusRecord;
use crate::state_machine::{RetryDecision, TaskStatus};

#[derive(Debug)]
pub struct StatusTracker {
    records: DashMap<Uuid, StatusRecord>,
    max_retry_attempts: u32,
}

impl StatusTracker {
    pub fn new(max_retry_attempts: u32) -> Self {
        Self {
            records: DashMap::new(),
            max_retry_attempts,
        }
    }

    pub fn max_retry_attempts(&self) -> u32 {
        self.max_retry_attempts
    }

    /// Create or update the record for `task_id`. The first writer creates the
    /// record; every writer refreshes status, actor and timestamp.
    pub fn record_status(&self, task_id: Uuid, status: TaskStatus, actor: &str) {
        let retry_count = self.upsert(task_id, status, actor, None);
        log_status_transition(&task_id, status, actor, retry_count, None);
    }

    /// As [`record_status`](Self::record_status), also setting the error message
    pub fn record_status_with_error(
        &self,
        task_id: Uuid,
        status: TaskStatus,
        actor: &str,
        message: &str,
    ) {
        let retry_count = self.upsert(task_id, status, actor, Some(message));
        log_status_transition(&task_id, status, actor, retry_count, Some(message));
    }

    fn upsert(
        &self,
        task_id: Uuid,
        status: TaskStatus,
        actor: &str,
        message: Option<&str>,
    ) -> u32 {
        let mut record = self
            .records
            .entry(task_id)
            .or_insert_with(|| StatusRecord::new(task_id, status, actor));
        record.transition(status, actor);
        if let Some(message) = message {
            record.error_message = Some(message.to_string());
        }
        record.retry_count
    }

    /// True iff a record exists and its retry budget is not spent
    pub fn can_retry(&self, task_id: &Uuid) -> bool {
        self.records
            .get(task_id)
            .is_some_and(|record| record.retry_count < self.max_retry_attempts)
    }

    /// Increment the retry count and move to RETRYING.
    ///
    /// The caller must already have confirmed [`can_retry`](Self::can_retry);
    /// prefer [`try_grant_retry`](Self::try_grant_retry), which does both atomically.
    pub fn increment_retry(&self, task_id: &Uuid, actor: &str) -> Result<u32> {
        let retry_count = self
            .records
            .get_mut(task_id)
            .map(|mut record| record.increment_retry(actor))
            .ok_or(SchedulerError::UnknownTask { task_id: *task_id })?;

        log_status_transition(task_id, TaskStatus::Retrying, actor, retry_count, None);
        Ok(retry_count)
    }

    /// Set terminal FAILED with `message`, regardless of the retry count
    pub fn mark_permanently_failed(&self, task_id: &Uuid, actor: &str, message: &str) -> Result<()> {
        let retry_count = self
            .records
            .get_mut(task_id)
            .map(|mut record| {
                record.transition(TaskStatus::Failed, actor);
                record.error_message = Some(message.to_string());
                record.retry_count
            })
            .ok_or(SchedulerError::UnknownTask { task_id: *task_id })?;

        log_status_transition(task_id, TaskStatus::Failed, actor, retry_count, Some(message));
        Ok(())
    }

    /// Decide the fate of a failed attempt while holding the record.
    ///
    /// Grants a retry (RETRYING, count + 1) when `retry_count < max_retry_attempts`,
    /// otherwise marks the task terminal FAILED. Either way `message` becomes the
    /// record's error.
    pub fn try_grant_retry(&self, task_id: &Uuid, actor: &str, message: &str) -> RetryDecision {
        let decision = match self.records.get_mut(task_id) {
            Some(mut record) => {
                record.error_message = Some(message.to_string());
                if record.retry_count < self.max_retry_attempts {
                    RetryDecision::Granted {
                        retry_count: record.increment_retry(actor),
                    }
                } else {
                    record.transition(TaskStatus::Failed, actor);
                    RetryDecision::Exhausted {
                        retry_count: record.retry_count,
                    }
                }
            }
            None => RetryDecision::Unknown,
        };

        match decision {
            RetryDecision::Granted { retry_count } => log_status_transition(
                task_id,
                TaskStatus::Retrying,
                actor,
                retry_count,
                Some(message),
            ),
            RetryDecision::Exhausted { retry_count } => log_status_transition(
                task_id,
                TaskStatus::Failed,
                actor,
                retry_count,
                Some(message),
            ),
            RetryDecision::Unknown => debug!(task_id = %task_id, "No status record for retry decision"),
        }

        decision
    }

    pub fn get(&self, task_id: &Uuid) -> Option<StatusRecord> {
        self.records.get(task_id).map(|record| record.clone())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Point-in-time copy of every record, for aggregate reporting
    pub fn snapshot(&self) -> StatusSnapshot {
        let records: Vec<StatusRecord> = self.records.iter().map(|entry| entry.clone()).collect();
        StatusSnapshot::from_records(records)
    }

    pub fn failed_records(&self) -> Vec<StatusRecord> {
        self.records
            .iter()
            .filter(|entry| entry.status == TaskStatus::Failed)
            .map(|entry| entry.clone())
            .collect()
    }

    /// Mark PROCESSING records last touched by one of `actors` as FAILED with
    /// `reason`. Returns how many records were reconciled.
    pub fn reconcile_abandoned(&self, actors: &[String], reason: &str) -> usize {
        if actors.is_empty() {
            return 0;
        }

        let mut reconciled = Vec::new();
        for mut entry in self.records.iter_mut() {
            if entry.status.is_active() && actors.contains(&entry.last_thread) {
                let actor = entry.last_thread.clone();
                entry.transition(TaskStatus::Failed, &actor);
                entry.error_message = Some(reason.to_string());
                reconciled.push((entry.task_id, actor, entry.retry_count));
            }
        }

        for (task_id, actor, retry_count) in &reconciled {
            log_status_transition(task_id, TaskStatus::Failed, actor, *retry_count, Some(reason));
        }
        reconciled.len()
    }
}

/// Read-only view of the tracker at one instant
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub taken_at: DateTime<Utc>,
    counts: HashMap<TaskStatus, usize>,
    records: Vec<StatusRecord>,
}

impl StatusSnapshot {
    fn from_records(records: Vec<StatusRecord>) -> Self {
        let mut counts = HashMap::new();
        for record in &records {
            *counts.entry(record.status).or_insert(0) += 1;
        }
        Self {
            taken_at: Utc::now(),
            counts,
            records,
        }
    }

    pub fn count(&self, status: TaskStatus) -> usize {
        self.counts.get(&status).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.records.len()
    }

    /// Tasks not yet COMPLETED or FAILED
    pub fn non_terminal(&self) -> usize {
        self.records.iter().filter(|r| !r.is_terminal()).count()
    }

    pub fn records(&self) -> &[StatusRecord] {
        &self.records
    }

    pub fn failed(&self) -> impl Iterator<Item = &StatusRecord> {
        self.records
            .iter()
            .filter(|r| r.status == TaskStatus::Failed)
    }
}

impl fmt::Display for StatusSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = TaskStatus::ALL
            .iter()
            .map(|status| format!("{}:{}", status.short_code(), self.count(*status)))
            .collect();
        write!(f, "{}", parts.join(" "))
    }
}
