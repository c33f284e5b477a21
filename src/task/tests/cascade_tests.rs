//! Single-transition cascade behavior: parent completion, child blocking,
//! history, and notifications.

use rstest::rstest;

use super::support::{developer, harness, manager, seed_child, seed_task, status_of};
use crate::access::AccessDenied;
use crate::task::domain::{HistoryAction, TaskId, TaskStatus};
use crate::task::ports::{NotificationKind, TaskStore};
use crate::task::services::{CascadeError, CreateTaskRequest};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn plain_transition_records_history_and_notifies() {
    let h = harness();
    let caller = manager();
    let task = seed_task(&h, "Draft migration plan", caller.id(), TaskStatus::Pending).await;

    h.engine
        .apply_transition(task.id(), TaskStatus::InProgress, &caller)
        .await
        .expect("transition succeeds");

    assert_eq!(status_of(&h, task.id()).await, TaskStatus::InProgress);

    let history = h
        .store
        .history_for(task.id())
        .await
        .expect("history lookup");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].action(), HistoryAction::StatusUpdated);
    assert_eq!(history[0].from_status(), TaskStatus::Pending);
    assert_eq!(history[0].to_status(), TaskStatus::InProgress);

    let published = h.bus.published().expect("bus lookup");
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].0, caller.id());
    assert_eq!(
        published[0].1.message,
        "Task 'Draft migration plan' status changed to in_progress"
    );
    assert_eq!(published[0].1.kind, NotificationKind::StatusChange);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn completing_a_parent_auto_completes_pending_children() {
    let h = harness();
    let caller = manager();
    let parent = seed_task(&h, "Release 3.2", caller.id(), TaskStatus::InProgress).await;
    let changelog = seed_child(&h, "Write changelog", parent.id(), caller.id(), TaskStatus::Pending)
        .await;
    let notes = seed_child(&h, "Draft notes", parent.id(), caller.id(), TaskStatus::Pending).await;
    let done = seed_child(&h, "Tag build", parent.id(), caller.id(), TaskStatus::Completed).await;

    h.engine
        .apply_transition(parent.id(), TaskStatus::Completed, &caller)
        .await
        .expect("completion succeeds");

    for id in [parent.id(), changelog.id(), notes.id(), done.id()] {
        assert_eq!(status_of(&h, id).await, TaskStatus::Completed);
    }

    // One entry for the parent plus one per auto-completed child.
    let parent_history = h
        .store
        .history_for(parent.id())
        .await
        .expect("history lookup");
    assert_eq!(parent_history.len(), 1);
    assert_eq!(parent_history[0].action(), HistoryAction::ParentCompleted);

    for id in [changelog.id(), notes.id()] {
        let child_history = h.store.history_for(id).await.expect("history lookup");
        assert_eq!(child_history.len(), 1);
        assert_eq!(child_history[0].action(), HistoryAction::AutoCompleted);
    }

    // The already-completed child gets no redundant write.
    let done_history = h.store.history_for(done.id()).await.expect("history lookup");
    assert!(done_history.is_empty());
}

#[rstest]
#[case(TaskStatus::InProgress)]
#[case(TaskStatus::Blocked)]
#[tokio::test(flavor = "multi_thread")]
async fn active_child_vetoes_parent_completion(#[case] child_status: TaskStatus) {
    let h = harness();
    let caller = manager();
    let parent = seed_task(&h, "Release 3.2", caller.id(), TaskStatus::InProgress).await;
    let child = seed_child(&h, "Fix regression", parent.id(), caller.id(), child_status).await;

    let result = h
        .engine
        .apply_transition(parent.id(), TaskStatus::Completed, &caller)
        .await;

    assert!(matches!(
        result,
        Err(CascadeError::ChildNotReady { child_status: status, .. }) if status == child_status
    ));

    // Nothing changed: statuses, history, notifications.
    assert_eq!(status_of(&h, parent.id()).await, TaskStatus::InProgress);
    assert_eq!(status_of(&h, child.id()).await, child_status);
    assert!(
        h.store
            .history_for(parent.id())
            .await
            .expect("history lookup")
            .is_empty()
    );
    assert!(h.bus.published().expect("bus lookup").is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn blocking_a_child_auto_blocks_its_parent() {
    let h = harness();
    let caller = manager();
    let parent = seed_task(&h, "Release 3.2", caller.id(), TaskStatus::InProgress).await;
    let child =
        seed_child(&h, "Fix regression", parent.id(), caller.id(), TaskStatus::InProgress).await;

    h.engine
        .apply_transition(child.id(), TaskStatus::Blocked, &caller)
        .await
        .expect("block succeeds");

    assert_eq!(status_of(&h, child.id()).await, TaskStatus::Blocked);
    assert_eq!(status_of(&h, parent.id()).await, TaskStatus::Blocked);

    let parent_history = h
        .store
        .history_for(parent.id())
        .await
        .expect("history lookup");
    assert_eq!(parent_history.len(), 1);
    assert_eq!(parent_history[0].action(), HistoryAction::AutoBlocked);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn already_blocked_parent_gets_no_duplicate_entry() {
    let h = harness();
    let caller = manager();
    let parent = seed_task(&h, "Release 3.2", caller.id(), TaskStatus::Blocked).await;
    let child =
        seed_child(&h, "Fix regression", parent.id(), caller.id(), TaskStatus::InProgress).await;

    h.engine
        .apply_transition(child.id(), TaskStatus::Blocked, &caller)
        .await
        .expect("block succeeds");

    assert!(
        h.store
            .history_for(parent.id())
            .await
            .expect("history lookup")
            .is_empty()
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn denied_write_leaves_the_store_untouched() {
    let h = harness();
    let caller = developer();
    let task = seed_task(&h, "Someone else's task", crate::principal::PrincipalId::new(),
        TaskStatus::Pending,
    )
    .await;

    let result = h
        .engine
        .apply_transition(task.id(), TaskStatus::InProgress, &caller)
        .await;

    assert!(matches!(
        result,
        Err(CascadeError::Denied(AccessDenied::NotAssignee { .. }))
    ));
    assert_eq!(status_of(&h, task.id()).await, TaskStatus::Pending);
    assert!(h.bus.published().expect("bus lookup").is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unknown_task_is_reported_as_not_found() {
    let h = harness();
    let caller = manager();
    let missing = TaskId::new();

    let result = h
        .engine
        .apply_transition(missing, TaskStatus::Completed, &caller)
        .await;

    assert!(matches!(result, Err(CascadeError::NotFound(id)) if id == missing));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn error_status_codes_follow_the_boundary_contract() {
    let h = harness();
    let caller = manager();
    let parent = seed_task(&h, "Release 3.2", caller.id(), TaskStatus::InProgress).await;
    seed_child(&h, "Fix regression", parent.id(), caller.id(), TaskStatus::InProgress).await;

    let veto = h
        .engine
        .apply_transition(parent.id(), TaskStatus::Completed, &caller)
        .await
        .expect_err("veto expected");
    assert_eq!(veto.status_code(), 400);

    let missing = h
        .engine
        .apply_transition(TaskId::new(), TaskStatus::Completed, &caller)
        .await
        .expect_err("not found expected");
    assert_eq!(missing.status_code(), 404);

    let denied = h
        .engine
        .apply_transition(parent.id(), TaskStatus::Completed, &developer())
        .await
        .expect_err("denial expected");
    assert_eq!(denied.status_code(), 403);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn create_task_notifies_the_assignee() {
    let h = harness();
    let caller = manager();
    let assignee = developer();
    let request = CreateTaskRequest::new(
        "Audit login flow",
        assignee.id(),
        super::support::fixed_now() + chrono::Duration::days(5),
    )
    .with_description("Cover the lockout path");

    let task = h
        .engine
        .create_task(request, &caller)
        .await
        .expect("creation succeeds");

    assert_eq!(task.title(), "Audit login flow");
    assert_eq!(task.created_by(), caller.id());
    assert_eq!(task.assigned_to(), assignee.id());
    assert!(
        h.store
            .find_by_id(task.id())
            .await
            .expect("lookup succeeds")
            .is_some()
    );

    let published = h.bus.published().expect("bus lookup");
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].0, assignee.id());
    assert_eq!(published[0].1.kind, NotificationKind::TaskAssigned);
    assert_eq!(
        published[0].1.message,
        "You have been assigned a new task: Audit login flow"
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn developer_cannot_create_for_someone_else() {
    let h = harness();
    let caller = developer();
    let request = CreateTaskRequest::new(
        "Audit login flow",
        crate::principal::PrincipalId::new(),
        super::support::fixed_now() + chrono::Duration::days(5),
    );

    let result = h.engine.create_task(request, &caller).await;

    assert!(matches!(
        result,
        Err(CascadeError::Denied(AccessDenied::AssignmentMismatch))
    ));
}
