//! Cascade engine: validated single and bulk status transitions.
//!
//! Every mutation follows the same shape: authorize, validate, build an
//! explicit [`TransitionPlan`] of status writes and history appends, then
//! commit the plan atomically through the store port. Cascades (parent
//! completion, child blocking) are part of the plan, never separate writes,
//! so a concurrent reader can never observe a half-applied cascade.

use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

use crate::access::{AccessDenied, AccessEvaluator, ActionClass};
use crate::principal::{Principal, PrincipalId};
use crate::task::domain::{
    HistoryAction, HistoryEntry, Hours, Task, TaskDomainError, TaskId, TaskPriority, TaskStatus,
};
use crate::task::ports::{
    Notification, NotificationBus, NotificationKind, StatusWrite, TaskStore, TaskStoreError,
    WriteBatch,
};

/// Service-level errors for cascade operations.
#[derive(Debug, Error)]
pub enum CascadeError {
    /// A referenced task does not exist.
    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// A parent cannot complete while a child is still active.
    #[error("cannot complete parent task '{parent}': child task '{child}' is {child_status}")]
    ChildNotReady {
        /// Parent title.
        parent: String,
        /// Offending child title.
        child: String,
        /// The child's current status.
        child_status: TaskStatus,
    },

    /// A child cannot block under a parent that already completed.
    #[error("cannot block child task '{child}': parent task '{parent}' is already completed")]
    ParentAlreadyCompleted {
        /// Child title.
        child: String,
        /// Completed parent title.
        parent: String,
    },

    /// A bulk request named no tasks.
    #[error("task_ids must not be empty")]
    EmptyBatch,

    /// An access rule denied the operation.
    #[error(transparent)]
    Denied(#[from] AccessDenied),

    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] TaskDomainError),

    /// Store operation failed.
    #[error(transparent)]
    Store(#[from] TaskStoreError),
}

impl CascadeError {
    /// HTTP status this error maps to at the boundary.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::ChildNotReady { .. }
            | Self::ParentAlreadyCompleted { .. }
            | Self::EmptyBatch
            | Self::Domain(_) => 400,
            Self::Denied(_) => 403,
            Self::NotFound(_) => 404,
            Self::Store(_) => 500,
        }
    }
}

/// Result type for cascade operations.
pub type CascadeResult<T> = Result<T, CascadeError>;

/// Bulk update payload received at the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkUpdateRequest {
    /// Tasks to update; must be non-empty.
    pub task_ids: Vec<TaskId>,
    /// Status to apply to every task.
    pub status: TaskStatus,
}

/// Bulk update success payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkUpdateResponse {
    /// Human-readable summary.
    pub detail: String,
}

impl BulkUpdateResponse {
    /// Builds the summary for a successful batch.
    #[must_use]
    pub fn updated(count: usize) -> Self {
        Self {
            detail: format!("{count} tasks updated successfully."),
        }
    }
}

/// Request payload for creating a task.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTaskRequest {
    title: String,
    description: Option<String>,
    assigned_to: PrincipalId,
    deadline: DateTime<Utc>,
    priority: Option<TaskPriority>,
    parent: Option<TaskId>,
    estimated_hours: Option<f64>,
}

impl CreateTaskRequest {
    /// Creates a request with required fields.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        assigned_to: PrincipalId,
        deadline: DateTime<Utc>,
    ) -> Self {
        Self {
            title: title.into(),
            description: None,
            assigned_to,
            deadline,
            priority: None,
            parent: None,
            estimated_hours: None,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets a non-default priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Links the new task under a parent.
    #[must_use]
    pub const fn with_parent(mut self, parent: TaskId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Sets the hour estimate.
    #[must_use]
    pub const fn with_estimated_hours(mut self, hours: f64) -> Self {
        self.estimated_hours = Some(hours);
        self
    }
}

/// Planned, not-yet-committed outcome of a transition.
///
/// Carries the write batch, the notifications to publish after commit, and
/// an overlay of statuses already written within the plan. The overlay is
/// what earlier implicit "previous status" tracking becomes: every write
/// states its expected `from` explicitly, including writes that follow
/// other writes in the same plan.
#[derive(Debug)]
struct TransitionPlan {
    batch: WriteBatch,
    notices: Vec<(PrincipalId, Notification)>,
    overlay: HashMap<TaskId, TaskStatus>,
}

impl TransitionPlan {
    fn new(applied_at: DateTime<Utc>) -> Self {
        Self {
            batch: WriteBatch::new(applied_at),
            notices: Vec::new(),
            overlay: HashMap::new(),
        }
    }

    /// Status the task will hold once writes planned so far are applied.
    fn current_status(&self, task: &Task) -> TaskStatus {
        self.overlay
            .get(&task.id())
            .copied()
            .unwrap_or_else(|| task.status())
    }

    /// Plans one status write with its history entry and notification.
    fn record(&mut self, task: &Task, to: TaskStatus, action: HistoryAction) {
        let from = self.current_status(task);
        self.batch.writes.push(StatusWrite {
            task_id: task.id(),
            from,
            to,
        });
        self.batch.history.push(HistoryEntry::new(
            task.id(),
            action,
            from,
            to,
            self.batch.applied_at,
        ));
        self.overlay.insert(task.id(), to);
        self.notices.push((
            task.assigned_to(),
            Notification {
                task_id: task.id(),
                task_title: task.title().to_owned(),
                message: format!("Task '{}' status changed to {}", task.title(), to),
                kind: NotificationKind::StatusChange,
            },
        ));
    }

    /// Plans a parent completion: validate every child, then complete the
    /// parent and auto-complete pending children.
    ///
    /// Validation runs over the full child set before any write is planned,
    /// so a failing child leaves the plan untouched.
    fn plan_completion(&mut self, parent: &Task, children: &[Task]) -> CascadeResult<()> {
        for child in children {
            let status = self.current_status(child);
            if matches!(status, TaskStatus::InProgress | TaskStatus::Blocked) {
                return Err(CascadeError::ChildNotReady {
                    parent: parent.title().to_owned(),
                    child: child.title().to_owned(),
                    child_status: status,
                });
            }
        }
        self.record(parent, TaskStatus::Completed, HistoryAction::ParentCompleted);
        for child in children {
            if self.current_status(child) == TaskStatus::Pending {
                self.record(child, TaskStatus::Completed, HistoryAction::AutoCompleted);
            }
        }
        Ok(())
    }

    /// Plans the parent side of a child block, unless the parent is already
    /// blocked (avoids a duplicate history entry).
    fn plan_parent_block(&mut self, parent: &Task) {
        if self.current_status(parent) != TaskStatus::Blocked {
            self.record(parent, TaskStatus::Blocked, HistoryAction::AutoBlocked);
        }
    }
}

/// Orchestrates task mutations with cascading invariants.
#[derive(Clone)]
pub struct CascadeEngine<S, B, C>
where
    S: TaskStore,
    B: NotificationBus,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    bus: Arc<B>,
    access: AccessEvaluator,
    clock: Arc<C>,
}

impl<S, B, C> CascadeEngine<S, B, C>
where
    S: TaskStore,
    B: NotificationBus,
    C: Clock + Send + Sync,
{
    /// Creates an engine with the default access evaluator.
    #[must_use]
    pub fn new(store: Arc<S>, bus: Arc<B>, clock: Arc<C>) -> Self {
        Self::with_evaluator(store, bus, clock, AccessEvaluator::new())
    }

    /// Creates an engine with a custom access evaluator.
    #[must_use]
    pub const fn with_evaluator(
        store: Arc<S>,
        bus: Arc<B>,
        clock: Arc<C>,
        access: AccessEvaluator,
    ) -> Self {
        Self {
            store,
            bus,
            access,
            clock,
        }
    }

    /// Creates a task after a creation-level access check.
    ///
    /// # Errors
    ///
    /// Returns [`CascadeError::Denied`] when the creation rules fail,
    /// [`CascadeError::Domain`] on invalid fields, and store errors on
    /// persistence failure (including an unresolved parent reference).
    pub async fn create_task(
        &self,
        request: CreateTaskRequest,
        principal: &Principal,
    ) -> CascadeResult<Task> {
        let now = self.clock.utc();
        self.access
            .evaluate_create(principal, request.assigned_to, now)?;

        let mut task = Task::new(
            request.title,
            request.assigned_to,
            principal.id(),
            request.deadline,
            &*self.clock,
        )?;
        if let Some(description) = request.description {
            task = task.with_description(description);
        }
        if let Some(priority) = request.priority {
            task = task.with_priority(priority);
        }
        if let Some(hours) = request.estimated_hours {
            task = task.with_estimated_hours(Hours::new(hours)?);
        }
        if let Some(parent) = request.parent {
            task = task.with_parent(parent)?;
        }
        self.store.insert(&task).await?;

        self.publish(
            task.assigned_to(),
            Notification {
                task_id: task.id(),
                task_title: task.title().to_owned(),
                message: format!("You have been assigned a new task: {}", task.title()),
                kind: NotificationKind::TaskAssigned,
            },
        )
        .await;
        Ok(task)
    }

    /// Applies a single status transition with cascade rules.
    ///
    /// The whole operation commits atomically: either every planned write
    /// and history entry becomes visible, or none does.
    ///
    /// # Errors
    ///
    /// Returns [`CascadeError::NotFound`] for an unknown task,
    /// [`CascadeError::Denied`] when the write check fails (nothing is
    /// mutated), and [`CascadeError::ChildNotReady`] when completing a
    /// parent with an active child.
    pub async fn apply_transition(
        &self,
        task_id: TaskId,
        new_status: TaskStatus,
        principal: &Principal,
    ) -> CascadeResult<()> {
        let now = self.clock.utc();
        let task = self
            .store
            .find_by_id(task_id)
            .await?
            .ok_or(CascadeError::NotFound(task_id))?;
        self.access
            .evaluate_object(principal, ActionClass::Write, &task, now)?;

        let mut plan = TransitionPlan::new(now);
        let children = self.store.children_of(task_id).await?;
        if new_status == TaskStatus::Completed && !children.is_empty() {
            plan.plan_completion(&task, &children)?;
        } else if new_status == TaskStatus::Blocked && task.parent().is_some() {
            plan.record(&task, TaskStatus::Blocked, HistoryAction::StatusUpdated);
            let parent = self.resolve_parent(&task).await?;
            plan.plan_parent_block(&parent);
        } else {
            plan.record(&task, new_status, HistoryAction::StatusUpdated);
        }
        self.commit(plan).await
    }

    /// Applies one status to a batch of tasks, all or nothing.
    ///
    /// Validation (resolution, authorization, cascade preconditions) runs
    /// over the entire batch before any write is planned; the apply pass
    /// then plans every write, including cascade effects, into one batch
    /// committed atomically. Returns the number of requested tasks.
    ///
    /// # Errors
    ///
    /// Any resolution, authorization, or validation failure aborts the
    /// whole batch with zero side effects.
    pub async fn apply_bulk_transition(
        &self,
        task_ids: &[TaskId],
        new_status: TaskStatus,
        principal: &Principal,
    ) -> CascadeResult<usize> {
        if task_ids.is_empty() {
            return Err(CascadeError::EmptyBatch);
        }
        let mut seen = HashSet::new();
        let ids: Vec<TaskId> = task_ids
            .iter()
            .copied()
            .filter(|id| seen.insert(*id))
            .collect();

        let tasks = self.store.find_many(&ids).await?;
        if tasks.len() != ids.len() {
            let found: HashSet<TaskId> = tasks.iter().map(Task::id).collect();
            let missing = ids
                .iter()
                .copied()
                .find(|id| !found.contains(id))
                .unwrap_or_else(TaskId::new);
            return Err(CascadeError::NotFound(missing));
        }

        for task in &tasks {
            self.access.evaluate_bulk(principal, task)?;
        }

        let in_batch: HashSet<TaskId> = ids.iter().copied().collect();
        let mut children: HashMap<TaskId, Vec<Task>> = HashMap::new();
        for task in &tasks {
            children.insert(task.id(), self.store.children_of(task.id()).await?);
        }
        let mut outside_parents: HashMap<TaskId, Task> = HashMap::new();
        for task in &tasks {
            if let Some(parent_id) = task.parent()
                && !in_batch.contains(&parent_id)
                && !outside_parents.contains_key(&parent_id)
            {
                let parent = self.resolve_parent(task).await?;
                outside_parents.insert(parent_id, parent);
            }
        }

        // Global validation pass: nothing below plans a write until every
        // task in the batch has passed.
        for task in &tasks {
            let kids = children.get(&task.id()).map(Vec::as_slice).unwrap_or_default();
            if new_status == TaskStatus::Completed {
                for child in kids {
                    if matches!(
                        child.status(),
                        TaskStatus::InProgress | TaskStatus::Blocked
                    ) {
                        return Err(CascadeError::ChildNotReady {
                            parent: task.title().to_owned(),
                            child: child.title().to_owned(),
                            child_status: child.status(),
                        });
                    }
                }
            }
            if new_status == TaskStatus::Blocked
                && let Some(parent_id) = task.parent()
                && let Some(parent) = outside_parents.get(&parent_id)
                && parent.status() == TaskStatus::Completed
            {
                return Err(CascadeError::ParentAlreadyCompleted {
                    child: task.title().to_owned(),
                    parent: parent.title().to_owned(),
                });
            }
        }

        // Apply pass: every write, cascade effects included, in one plan.
        let mut plan = TransitionPlan::new(self.clock.utc());
        for task in &tasks {
            plan.record(task, new_status, HistoryAction::BulkStatusUpdate);
            let kids = children.get(&task.id()).map(Vec::as_slice).unwrap_or_default();
            if new_status == TaskStatus::Completed && !kids.is_empty() {
                plan.plan_completion(task, kids)?;
            }
            // Parents inside the batch receive the blocked status through
            // their own bulk write; only outside parents need the cascade.
            if new_status == TaskStatus::Blocked
                && let Some(parent_id) = task.parent()
                && let Some(parent) = outside_parents.get(&parent_id)
            {
                plan.plan_parent_block(parent);
            }
        }
        self.commit(plan).await?;
        Ok(ids.len())
    }

    /// Boundary wrapper around [`CascadeEngine::apply_bulk_transition`].
    ///
    /// # Errors
    ///
    /// See [`CascadeEngine::apply_bulk_transition`].
    pub async fn apply_bulk(
        &self,
        request: &BulkUpdateRequest,
        principal: &Principal,
    ) -> CascadeResult<BulkUpdateResponse> {
        let count = self
            .apply_bulk_transition(&request.task_ids, request.status, principal)
            .await?;
        Ok(BulkUpdateResponse::updated(count))
    }

    async fn resolve_parent(&self, child: &Task) -> CascadeResult<Task> {
        let Some(parent_id) = child.parent() else {
            return Err(CascadeError::NotFound(child.id()));
        };
        self.store
            .find_by_id(parent_id)
            .await?
            .ok_or(CascadeError::Store(TaskStoreError::NotFound(parent_id)))
    }

    async fn commit(&self, plan: TransitionPlan) -> CascadeResult<()> {
        let TransitionPlan { batch, notices, .. } = plan;
        self.store.commit(batch).await?;
        for (recipient, notification) in notices {
            self.publish(recipient, notification).await;
        }
        Ok(())
    }

    /// Publishes post-commit; delivery failures are logged, never unwound,
    /// because the task state is already durable.
    async fn publish(&self, recipient: PrincipalId, notification: Notification) {
        if let Err(err) = self.bus.publish(recipient, notification).await {
            warn!(%recipient, error = %err, "notification publish failed");
        }
    }
}
