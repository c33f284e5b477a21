//! Store port for task persistence with atomic write batches.

use crate::task::domain::{HistoryEntry, Task, TaskId, TaskPriority, TaskStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for task store operations.
pub type TaskStoreResult<T> = Result<T, TaskStoreError>;

/// One planned status write inside a batch.
///
/// `from` is the status the store must observe immediately before applying
/// the write (earlier writes in the same batch included). A mismatch means a
/// concurrent writer got there first and the whole batch must roll back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusWrite {
    /// Task to update.
    pub task_id: TaskId,
    /// Expected current status.
    pub from: TaskStatus,
    /// Status to apply.
    pub to: TaskStatus,
}

/// An all-or-nothing set of status writes and history appends.
///
/// Built by the cascade engine after validation; either every write and
/// every history entry becomes visible, or none does.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteBatch {
    /// Status writes in application order.
    pub writes: Vec<StatusWrite>,
    /// History entries to append alongside the writes.
    pub history: Vec<HistoryEntry>,
    /// Commit timestamp stamped onto each updated task.
    pub applied_at: DateTime<Utc>,
}

impl WriteBatch {
    /// Creates an empty batch committed at `applied_at`.
    #[must_use]
    pub const fn new(applied_at: DateTime<Utc>) -> Self {
        Self {
            writes: Vec::new(),
            history: Vec::new(),
            applied_at,
        }
    }

    /// Returns whether the batch contains no writes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty() && self.history.is_empty()
    }
}

/// Task persistence contract.
///
/// Implementations provide transactional isolation: a concurrent reader
/// never observes a partially applied [`WriteBatch`], and
/// [`TaskStore::try_escalate`] checks and sets the one-shot flag in the same
/// atomic update as the priority change.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Stores a new task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::DuplicateTask`] when the identifier already
    /// exists, or [`TaskStoreError::NotFound`] when the parent reference does
    /// not resolve.
    async fn insert(&self, task: &Task) -> TaskStoreResult<()>;

    /// Finds a task by identifier. Returns `None` when absent.
    async fn find_by_id(&self, id: TaskId) -> TaskStoreResult<Option<Task>>;

    /// Finds every task whose identifier appears in `ids`.
    ///
    /// Missing identifiers are simply absent from the result; callers detect
    /// and report them.
    async fn find_many(&self, ids: &[TaskId]) -> TaskStoreResult<Vec<Task>>;

    /// Returns the immediate children of `parent`.
    async fn children_of(&self, parent: TaskId) -> TaskStoreResult<Vec<Task>>;

    /// Applies a validated write batch atomically.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::NotFound`] or
    /// [`TaskStoreError::Conflict`] without applying anything when a write
    /// targets a missing task or its expected status no longer holds.
    async fn commit(&self, batch: WriteBatch) -> TaskStoreResult<()>;

    /// Returns tasks eligible for deadline escalation.
    ///
    /// Eligible: not completed, deadline at or before `deadline_until`, and
    /// the one-shot flag unset.
    async fn escalation_candidates(
        &self,
        deadline_until: DateTime<Utc>,
    ) -> TaskStoreResult<Vec<Task>>;

    /// Atomically promotes a task if its one-shot flag is still unset.
    ///
    /// Returns `Ok(true)` when this call performed the escalation and
    /// `Ok(false)` when another writer already escalated or completed the
    /// task, which callers treat as a no-op.
    async fn try_escalate(
        &self,
        id: TaskId,
        priority: TaskPriority,
        now: DateTime<Utc>,
    ) -> TaskStoreResult<bool>;

    /// Returns the history entries recorded for a task, oldest first.
    async fn history_for(&self, id: TaskId) -> TaskStoreResult<Vec<HistoryEntry>>;
}

/// Errors returned by task store implementations.
#[derive(Debug, Clone, Error)]
pub enum TaskStoreError {
    /// A task with the same identifier already exists.
    #[error("duplicate task identifier: {0}")]
    DuplicateTask(TaskId),

    /// A referenced task does not exist.
    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// A write's expected status no longer matched at commit time.
    #[error("conflicting write on task {task_id}: expected {expected}, found {actual}")]
    Conflict {
        /// Task whose status diverged.
        task_id: TaskId,
        /// Status the batch expected.
        expected: TaskStatus,
        /// Status actually present.
        actual: TaskStatus,
    },

    /// Persistence-layer failure, including store timeouts.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl TaskStoreError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
