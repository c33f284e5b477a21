//! Append-only task history entries.

use super::{TaskId, TaskStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Action label recorded with each history entry.
///
/// The display labels are part of the external contract and mirror what the
/// reporting surface shows to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    /// Direct status change requested by a caller.
    StatusUpdated,
    /// Parent explicitly completed by a caller.
    ParentCompleted,
    /// Child completed automatically because its parent completed.
    AutoCompleted,
    /// Parent blocked automatically because a child became blocked.
    AutoBlocked,
    /// Status change applied as part of a bulk request.
    BulkStatusUpdate,
}

impl HistoryAction {
    /// Returns the human-readable label stored with the entry.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::StatusUpdated => "Status updated",
            Self::ParentCompleted => "Parent task completed",
            Self::AutoCompleted => "Auto-completed due to parent completion",
            Self::AutoBlocked => "Auto-blocked due to child task",
            Self::BulkStatusUpdate => "Bulk status update",
        }
    }
}

impl fmt::Display for HistoryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One append-only log record of a task status mutation.
///
/// Entries are created exactly once per mutation performed by the cascade
/// engine and are never updated or deleted by normal operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    task_id: TaskId,
    action: HistoryAction,
    from_status: TaskStatus,
    to_status: TaskStatus,
    recorded_at: DateTime<Utc>,
}

impl HistoryEntry {
    /// Creates a history entry for a planned status write.
    #[must_use]
    pub const fn new(
        task_id: TaskId,
        action: HistoryAction,
        from_status: TaskStatus,
        to_status: TaskStatus,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            task_id,
            action,
            from_status,
            to_status,
            recorded_at,
        }
    }

    /// Returns the task this entry belongs to.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the action label.
    #[must_use]
    pub const fn action(&self) -> HistoryAction {
        self.action
    }

    /// Returns the status before the write.
    #[must_use]
    pub const fn from_status(&self) -> TaskStatus {
        self.from_status
    }

    /// Returns the status after the write.
    #[must_use]
    pub const fn to_status(&self) -> TaskStatus {
        self.to_status
    }

    /// Returns when the write was committed.
    #[must_use]
    pub const fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }
}
