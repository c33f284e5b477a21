//! Task aggregate root and its status/priority vocabulary.

use super::{Hours, ParseTaskPriorityError, ParseTaskStatusError, TaskDomainError, TaskId};
use crate::principal::PrincipalId;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Work has not started.
    Pending,
    /// Work is underway.
    InProgress,
    /// Work is stalled on an external condition.
    Blocked,
    /// Work is finished.
    Completed,
}

impl TaskStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Blocked => "blocked",
            Self::Completed => "completed",
        }
    }
}

impl TryFrom<&str> for TaskStatus {
    type Error = ParseTaskStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "blocked" => Ok(Self::Blocked),
            "completed" => Ok(Self::Completed),
            _ => Err(ParseTaskStatusError(value.to_owned())),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task priority on a totally ordered scale.
///
/// The derived ordering follows declaration order: `Low < Medium < High <
/// Critical`. The escalation scheduler relies on this ordering through
/// [`TaskPriority::successor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    /// Lowest urgency.
    Low,
    /// Default urgency.
    Medium,
    /// Elevated urgency.
    High,
    /// Highest urgency; exempt from the business-hours write window.
    Critical,
}

impl TaskPriority {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// Returns the next priority on the scale, or `None` at the top.
    ///
    /// Escalation is saturating: a critical task has no successor and is
    /// skipped rather than treated as an error.
    #[must_use]
    pub const fn successor(self) -> Option<Self> {
        match self {
            Self::Low => Some(Self::Medium),
            Self::Medium => Some(Self::High),
            Self::High => Some(Self::Critical),
            Self::Critical => None,
        }
    }
}

impl TryFrom<&str> for TaskPriority {
    type Error = ParseTaskPriorityError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            _ => Err(ParseTaskPriorityError(value.to_owned())),
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task aggregate root.
///
/// Status mutations flow through the cascade engine, which plans a set of
/// explicit status writes and commits them atomically through the store
/// port. The aggregate itself never triggers cascades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    title: String,
    description: Option<String>,
    status: TaskStatus,
    priority: TaskPriority,
    assigned_to: PrincipalId,
    created_by: PrincipalId,
    parent: Option<TaskId>,
    estimated_hours: Option<Hours>,
    actual_hours: Option<Hours>,
    deadline: DateTime<Utc>,
    priority_escalated: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted task aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedTaskData {
    /// Persisted task identifier.
    pub id: TaskId,
    /// Persisted title.
    pub title: String,
    /// Persisted description, if any.
    pub description: Option<String>,
    /// Persisted lifecycle status.
    pub status: TaskStatus,
    /// Persisted priority.
    pub priority: TaskPriority,
    /// Persisted assignee.
    pub assigned_to: PrincipalId,
    /// Persisted creator.
    pub created_by: PrincipalId,
    /// Persisted parent reference, if any.
    pub parent: Option<TaskId>,
    /// Persisted hour estimate, if any.
    pub estimated_hours: Option<Hours>,
    /// Persisted hours spent, if any.
    pub actual_hours: Option<Hours>,
    /// Persisted deadline.
    pub deadline: DateTime<Utc>,
    /// Persisted one-shot escalation flag.
    pub priority_escalated: bool,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates a new pending task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::EmptyTitle`] when the title is empty after
    /// trimming.
    pub fn new(
        title: impl Into<String>,
        assigned_to: PrincipalId,
        created_by: PrincipalId,
        deadline: DateTime<Utc>,
        clock: &impl Clock,
    ) -> Result<Self, TaskDomainError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(TaskDomainError::EmptyTitle);
        }
        let timestamp = clock.utc();
        Ok(Self {
            id: TaskId::new(),
            title,
            description: None,
            status: TaskStatus::Pending,
            priority: TaskPriority::Medium,
            assigned_to,
            created_by,
            parent: None,
            estimated_hours: None,
            actual_hours: None,
            deadline,
            priority_escalated: false,
            created_at: timestamp,
            updated_at: timestamp,
        })
    }

    /// Reconstructs a task from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskData) -> Self {
        Self {
            id: data.id,
            title: data.title,
            description: data.description,
            status: data.status,
            priority: data.priority,
            assigned_to: data.assigned_to,
            created_by: data.created_by,
            parent: data.parent,
            estimated_hours: data.estimated_hours,
            actual_hours: data.actual_hours,
            deadline: data.deadline,
            priority_escalated: data.priority_escalated,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Sets the task description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the task priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the initial status.
    ///
    /// Only used when seeding tasks; regular status changes flow through the
    /// cascade engine.
    #[must_use]
    pub const fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets the hour estimate.
    #[must_use]
    pub const fn with_estimated_hours(mut self, hours: Hours) -> Self {
        self.estimated_hours = Some(hours);
        self
    }

    /// Sets the hours spent.
    #[must_use]
    pub const fn with_actual_hours(mut self, hours: Hours) -> Self {
        self.actual_hours = Some(hours);
        self
    }

    /// Links this task under a parent task.
    ///
    /// Hierarchies are a single level deep: a task references at most one
    /// parent, and cascades never traverse further.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::SelfParent`] when the parent is the task
    /// itself.
    pub fn with_parent(mut self, parent: TaskId) -> Result<Self, TaskDomainError> {
        if parent == self.id {
            return Err(TaskDomainError::SelfParent(self.id));
        }
        self.parent = Some(parent);
        Ok(self)
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the task title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the task description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns the priority.
    #[must_use]
    pub const fn priority(&self) -> TaskPriority {
        self.priority
    }

    /// Returns the assignee.
    #[must_use]
    pub const fn assigned_to(&self) -> PrincipalId {
        self.assigned_to
    }

    /// Returns the creator.
    #[must_use]
    pub const fn created_by(&self) -> PrincipalId {
        self.created_by
    }

    /// Returns the parent task reference, if any.
    #[must_use]
    pub const fn parent(&self) -> Option<TaskId> {
        self.parent
    }

    /// Returns the hour estimate, if any.
    #[must_use]
    pub const fn estimated_hours(&self) -> Option<Hours> {
        self.estimated_hours
    }

    /// Returns the hours spent, if any.
    #[must_use]
    pub const fn actual_hours(&self) -> Option<Hours> {
        self.actual_hours
    }

    /// Returns the deadline.
    #[must_use]
    pub const fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }

    /// Returns whether the one-shot escalation already fired.
    #[must_use]
    pub const fn priority_escalated(&self) -> bool {
        self.priority_escalated
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest mutation timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns whether the task qualifies for deadline escalation.
    ///
    /// A task qualifies when it is not completed, its deadline falls on or
    /// before `deadline_until`, and the one-shot flag has not fired yet.
    #[must_use]
    pub fn eligible_for_escalation(&self, deadline_until: DateTime<Utc>) -> bool {
        self.status != TaskStatus::Completed
            && self.deadline <= deadline_until
            && !self.priority_escalated
    }

    /// Applies a planned status write.
    ///
    /// Invariant checks belong to the cascade engine; adapters call this
    /// while committing an already validated write batch.
    pub fn apply_status(&mut self, status: TaskStatus, now: DateTime<Utc>) {
        self.status = status;
        self.updated_at = now;
    }

    /// Applies an escalation: new priority plus the one-shot flag, together.
    ///
    /// The flag is only reset externally (deadline extension is a manual
    /// action), so repeated scheduler runs observe it and no-op.
    pub fn apply_escalation(&mut self, priority: TaskPriority, now: DateTime<Utc>) {
        self.priority = priority;
        self.priority_escalated = true;
        self.updated_at = now;
    }
}
