//! In-memory task store with single-lock transactional semantics.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::task::{
    domain::{HistoryEntry, Task, TaskId, TaskPriority, TaskStatus},
    ports::{TaskStore, TaskStoreError, TaskStoreResult, WriteBatch},
};

/// Thread-safe in-memory task store.
///
/// A single `RwLock` over the whole state gives every operation the
/// isolation the port demands: batches validate and apply under one write
/// guard, so readers never observe a torn batch.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskStore {
    state: Arc<RwLock<InMemoryState>>,
}

#[derive(Debug, Default)]
struct InMemoryState {
    tasks: HashMap<TaskId, Task>,
    children: HashMap<TaskId, Vec<TaskId>>,
    history: Vec<HistoryEntry>,
}

impl InMemoryTaskStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned(err: impl std::fmt::Display) -> TaskStoreError {
    TaskStoreError::persistence(std::io::Error::other(err.to_string()))
}

/// Validates every write against current state before anything mutates.
fn check_batch(state: &InMemoryState, batch: &WriteBatch) -> TaskStoreResult<()> {
    // Track intermediate statuses so later writes in the batch validate
    // against the state earlier writes will produce.
    let mut pending: HashMap<TaskId, TaskStatus> = HashMap::new();
    for write in &batch.writes {
        let current = pending.get(&write.task_id).copied().unwrap_or(
            state
                .tasks
                .get(&write.task_id)
                .ok_or(TaskStoreError::NotFound(write.task_id))?
                .status(),
        );
        if current != write.from {
            return Err(TaskStoreError::Conflict {
                task_id: write.task_id,
                expected: write.from,
                actual: current,
            });
        }
        pending.insert(write.task_id, write.to);
    }
    for entry in &batch.history {
        if !state.tasks.contains_key(&entry.task_id()) {
            return Err(TaskStoreError::NotFound(entry.task_id()));
        }
    }
    Ok(())
}

fn apply_batch(state: &mut InMemoryState, batch: WriteBatch, applied_at: DateTime<Utc>) {
    for write in batch.writes {
        if let Some(task) = state.tasks.get_mut(&write.task_id) {
            task.apply_status(write.to, applied_at);
        }
    }
    state.history.extend(batch.history);
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn insert(&self, task: &Task) -> TaskStoreResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        if state.tasks.contains_key(&task.id()) {
            return Err(TaskStoreError::DuplicateTask(task.id()));
        }
        if let Some(parent) = task.parent() {
            if !state.tasks.contains_key(&parent) {
                return Err(TaskStoreError::NotFound(parent));
            }
            state.children.entry(parent).or_default().push(task.id());
        }
        state.tasks.insert(task.id(), task.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: TaskId) -> TaskStoreResult<Option<Task>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.tasks.get(&id).cloned())
    }

    async fn find_many(&self, ids: &[TaskId]) -> TaskStoreResult<Vec<Task>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(ids
            .iter()
            .filter_map(|id| state.tasks.get(id).cloned())
            .collect())
    }

    async fn children_of(&self, parent: TaskId) -> TaskStoreResult<Vec<Task>> {
        let state = self.state.read().map_err(poisoned)?;
        let tasks = state
            .children
            .get(&parent)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| state.tasks.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default();
        Ok(tasks)
    }

    async fn commit(&self, batch: WriteBatch) -> TaskStoreResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        check_batch(&state, &batch)?;
        let applied_at = batch.applied_at;
        apply_batch(&mut state, batch, applied_at);
        Ok(())
    }

    async fn escalation_candidates(
        &self,
        deadline_until: DateTime<Utc>,
    ) -> TaskStoreResult<Vec<Task>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state
            .tasks
            .values()
            .filter(|task| task.eligible_for_escalation(deadline_until))
            .cloned()
            .collect())
    }

    async fn try_escalate(
        &self,
        id: TaskId,
        priority: TaskPriority,
        now: DateTime<Utc>,
    ) -> TaskStoreResult<bool> {
        let mut state = self.state.write().map_err(poisoned)?;
        let task = state
            .tasks
            .get_mut(&id)
            .ok_or(TaskStoreError::NotFound(id))?;
        if task.priority_escalated() || task.status() == TaskStatus::Completed {
            return Ok(false);
        }
        task.apply_escalation(priority, now);
        Ok(true)
    }

    async fn history_for(&self, id: TaskId) -> TaskStoreResult<Vec<HistoryEntry>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state
            .history
            .iter()
            .filter(|entry| entry.task_id() == id)
            .cloned()
            .collect())
    }
}
