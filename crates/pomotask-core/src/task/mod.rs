//! Task entity with per-task work-time accounting.
//!
//! A task is created once with a fixed id, title and creation time. After
//! that it only changes through [`Task::add_time`], [`Task::complete_pomodoro`]
//! and [`Task::mark_complete`]; the session engine is the only caller of the
//! first two during a running session.
//!
//! ```text
//!   Pending ──mark_complete──> Completed   (terminal, no reopen)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;

/// Completion state of a task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Pending,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TaskStatus::Pending),
            "completed" => Some(TaskStatus::Completed),
            _ => None,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A unit of work that pomodoros are spent on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: i64,
    title: String,
    status: TaskStatus,
    pomodoros_completed: u32,
    /// Seconds from fully completed work intervals.
    total_pomodoro_time: u64,
    /// Seconds accrued in the interval in progress (or left over from a
    /// session that ended early).
    current_pomodoro_time: u64,
    created_at: DateTime<Utc>,
}

impl Task {
    /// Create a pending task with no recorded time.
    ///
    /// The id is assigned by the caller (the task list) and must be unique.
    pub fn new(
        id: i64,
        title: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        Ok(Self {
            id,
            title,
            status: TaskStatus::Pending,
            pomodoros_completed: 0,
            total_pomodoro_time: 0,
            current_pomodoro_time: 0,
            created_at,
        })
    }

    /// Rebuild a task from persisted columns.
    pub(crate) fn restore(
        id: i64,
        title: String,
        status: TaskStatus,
        pomodoros_completed: u32,
        total_pomodoro_time: u64,
        current_pomodoro_time: u64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            title,
            status,
            pomodoros_completed,
            total_pomodoro_time,
            current_pomodoro_time,
            created_at,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn pomodoros_completed(&self) -> u32 {
        self.pomodoros_completed
    }

    pub fn total_pomodoro_time(&self) -> u64 {
        self.total_pomodoro_time
    }

    pub fn current_pomodoro_time(&self) -> u64 {
        self.current_pomodoro_time
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// All time ever spent on the task, committed or not.
    pub fn tracked_time(&self) -> u64 {
        self.total_pomodoro_time
            .saturating_add(self.current_pomodoro_time)
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Attribute `seconds` of work to the interval in progress.
    pub fn add_time(&mut self, seconds: u64) {
        self.current_pomodoro_time = self.current_pomodoro_time.saturating_add(seconds);
    }

    /// Fold the in-progress interval into the committed total.
    ///
    /// Must be called exactly once per completed work interval.
    pub fn complete_pomodoro(&mut self) {
        self.total_pomodoro_time = self
            .total_pomodoro_time
            .saturating_add(self.current_pomodoro_time);
        self.current_pomodoro_time = 0;
        self.pomodoros_completed = self.pomodoros_completed.saturating_add(1);
    }

    /// Irreversibly mark the task as done.
    pub fn mark_complete(&mut self) {
        self.status = TaskStatus::Completed;
    }
}
