//! # Task Model
//!
//! Immutable description of one unit of work.
//!
//! Dispatch order is `priority` ascending (1 is most urgent), then
//! `created_at`, then a process-wide creation sequence so that tasks stamped
//! with the same instant still leave the queue in creation order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use uuid::Uuid;

use crate::constants::SHORT_ID_LEN;

static CREATION_SEQUENCE: AtomicU64 = AtomicU64::new(0);

fn next_sequence() -> u64 {
    CREATION_SEQUENCE.fetch_add(1, AtomicOrdering::Relaxed)
}

/// One unit of work. Cloning is cheap enough to re-enqueue on retry, but the
/// worker moves the original value back into the queue instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: Uuid,
    name: String,
    priority: i32,
    created_at: DateTime<Utc>,
    payload: String,
    sequence: u64,
}

impl Task {
    /// Create a task stamped with a fresh id and the current time
    pub fn new(name: impl Into<String>, priority: i32, payload: impl Into<String>) -> Self {
        Self::builder(name, priority).payload(payload).build()
    }

    pub fn builder(name: impl Into<String>, priority: i32) -> TaskBuilder {
        TaskBuilder {
            id: None,
            name: name.into(),
            priority,
            created_at: None,
            payload: String::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// First characters of the id, as printed in log lines
    pub fn short_id(&self) -> String {
        short_id(&self.id)
    }

    /// Total dispatch order: `Less` means `self` leaves the queue first
    pub fn dispatch_order(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| self.created_at.cmp(&other.created_at))
            .then_with(|| self.sequence.cmp(&other.sequence))
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Task{{id={}..., name='{}', priority={}, created={}, payload='{}'}}",
            self.short_id(),
            self.name,
            self.priority,
            self.created_at.to_rfc3339(),
            self.payload
        )
    }
}

/// Shortened id used for log output
pub fn short_id(id: &Uuid) -> String {
    id.to_string().chars().take(SHORT_ID_LEN).collect()
}

/// Builder for tasks that need an explicit id or creation time
#[derive(Debug, Clone)]
pub struct TaskBuilder {
    id: Option<Uuid>,
    name: String,
    priority: i32,
    created_at: Option<DateTime<Utc>>,
    payload: String,
}

impl TaskBuilder {
    pub fn id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = payload.into();
        self
    }

    pub fn build(self) -> Task {
        Task {
            id: self.id.unwrap_or_else(Uuid::new_v4),
            name: self.name,
            priority: self.priority,
            created_at: self.created_at.unwrap_or_else(Utc::now),
            payload: self.payload,
            sequence: next_sequence(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_new_task_has_unique_identity() {
        let a = Task::new("Payment-1", 1, "payment_id=1001");
        let b = Task::new("Payment-1", 1, "payment_id=1001");

        assert_ne!(a.id(), b.id());
        assert_eq!(a.name(), "Payment-1");
        assert_eq!(a.payload(), "payment_id=1001");
    }

    #[test]
    fn test_lower_priority_number_dispatches_first() {
        let urgent = Task::new("urgent", 1, "");
        let routine = Task::new("routine", 5, "");

        assert_eq!(urgent.dispatch_order(&routine), Ordering::Less);
        assert_eq!(routine.dispatch_order(&urgent), Ordering::Greater);
    }

    #[test]
    fn test_equal_priority_breaks_tie_on_creation_time() {
        let now = Utc::now();
        let later = Task::builder("later", 2).created_at(now).build();
        let earlier = Task::builder("earlier", 2)
            .created_at(now - Duration::milliseconds(5))
            .build();

        // Built second, but stamped earlier
        assert_eq!(earlier.dispatch_order(&later), Ordering::Less);
    }

    #[test]
    fn test_identical_timestamps_fall_back_to_creation_sequence() {
        let now = Utc::now();
        let first = Task::builder("first", 3).created_at(now).build();
        let second = Task::builder("second", 3).created_at(now).build();

        assert_eq!(first.dispatch_order(&second), Ordering::Less);
        assert_eq!(first.dispatch_order(&first), Ordering::Equal);
    }

    #[test]
    fn test_display_shortens_id() {
        let task = Task::new("Email-welcome-1", 3, "template=welcome");
        let rendered = task.to_string();

        assert!(rendered.contains(&format!("id={}...", task.short_id())));
        assert!(rendered.contains("name='Email-welcome-1'"));
        assert_eq!(task.short_id().len(), SHORT_ID_LEN);
    }
}
