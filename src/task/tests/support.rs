//! Shared fixtures and helpers for task service tests.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::principal::{Principal, PrincipalId, Role};
use crate::task::adapters::memory::{InMemoryNotificationBus, InMemoryTaskStore};
use crate::task::domain::{Task, TaskId, TaskStatus};
use crate::task::ports::TaskStore;
use crate::task::services::CascadeEngine;
use crate::testutil::FixedClock;

pub(super) type TestEngine = CascadeEngine<InMemoryTaskStore, InMemoryNotificationBus, FixedClock>;

/// Midday UTC; inside business hours for Europe/London principals.
pub(super) fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0)
        .single()
        .expect("valid time")
}

pub(super) fn manager() -> Principal {
    Principal::new(PrincipalId::new(), Role::Manager, "Europe/London")
}

pub(super) fn developer() -> Principal {
    Principal::new(PrincipalId::new(), Role::Developer, "Europe/London")
}

pub(super) fn auditor() -> Principal {
    Principal::new(PrincipalId::new(), Role::Auditor, "Europe/London")
}

pub(super) struct Harness {
    pub store: Arc<InMemoryTaskStore>,
    pub bus: Arc<InMemoryNotificationBus>,
    pub engine: TestEngine,
    pub clock: FixedClock,
}

pub(super) fn harness() -> Harness {
    let clock = FixedClock(fixed_now());
    let store = Arc::new(InMemoryTaskStore::new());
    let bus = Arc::new(InMemoryNotificationBus::new());
    let engine = CascadeEngine::new(Arc::clone(&store), Arc::clone(&bus), Arc::new(clock));
    Harness {
        store,
        bus,
        engine,
        clock,
    }
}

pub(super) async fn seed_task(
    harness: &Harness,
    title: &str,
    assignee: PrincipalId,
    status: TaskStatus,
) -> Task {
    let task = Task::new(
        title,
        assignee,
        assignee,
        fixed_now() + Duration::days(7),
        &harness.clock,
    )
    .expect("valid task")
    .with_status(status);
    harness.store.insert(&task).await.expect("insert succeeds");
    task
}

pub(super) async fn seed_child(
    harness: &Harness,
    title: &str,
    parent: TaskId,
    assignee: PrincipalId,
    status: TaskStatus,
) -> Task {
    let task = Task::new(
        title,
        assignee,
        assignee,
        fixed_now() + Duration::days(7),
        &harness.clock,
    )
    .expect("valid task")
    .with_status(status)
    .with_parent(parent)
    .expect("valid parent");
    harness.store.insert(&task).await.expect("insert succeeds");
    task
}

pub(super) async fn status_of(harness: &Harness, id: TaskId) -> TaskStatus {
    harness
        .store
        .find_by_id(id)
        .await
        .expect("lookup succeeds")
        .expect("task exists")
        .status()
}
