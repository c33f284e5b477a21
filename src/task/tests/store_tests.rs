//! Store adapter contract: batches commit atomically or not at all.

use rstest::rstest;

use super::support::{harness, manager, seed_task, status_of};
use crate::task::domain::TaskStatus;
use crate::task::ports::{StatusWrite, TaskStore, TaskStoreError, WriteBatch};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn stale_expected_status_rolls_back_the_whole_batch() {
    let h = harness();
    let caller = manager();
    let first = seed_task(&h, "Rotate API keys", caller.id(), TaskStatus::Pending).await;
    // A concurrent writer already moved this one past the expected status.
    let second = seed_task(&h, "Update runbooks", caller.id(), TaskStatus::Completed).await;

    let mut batch = WriteBatch::new(super::support::fixed_now());
    batch.writes.push(StatusWrite {
        task_id: first.id(),
        from: TaskStatus::Pending,
        to: TaskStatus::InProgress,
    });
    batch.writes.push(StatusWrite {
        task_id: second.id(),
        from: TaskStatus::Pending,
        to: TaskStatus::InProgress,
    });

    let result = h.store.commit(batch).await;

    let Err(TaskStoreError::Conflict {
        task_id,
        expected,
        actual,
    }) = result
    else {
        panic!("expected a conflict, got {result:?}");
    };
    assert_eq!(task_id, second.id());
    assert_eq!(expected, TaskStatus::Pending);
    assert_eq!(actual, TaskStatus::Completed);

    // The valid first write must not survive the failed batch.
    assert_eq!(status_of(&h, first.id()).await, TaskStatus::Pending);
    assert!(
        h.store
            .history_for(first.id())
            .await
            .expect("history lookup")
            .is_empty()
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn later_writes_validate_against_earlier_writes_in_the_batch() {
    let h = harness();
    let caller = manager();
    let task = seed_task(&h, "Rotate API keys", caller.id(), TaskStatus::Pending).await;

    // The second write's `from` is the status the first write produces.
    let mut batch = WriteBatch::new(super::support::fixed_now());
    batch.writes.push(StatusWrite {
        task_id: task.id(),
        from: TaskStatus::Pending,
        to: TaskStatus::InProgress,
    });
    batch.writes.push(StatusWrite {
        task_id: task.id(),
        from: TaskStatus::InProgress,
        to: TaskStatus::Completed,
    });

    h.store.commit(batch).await.expect("commit succeeds");
    assert_eq!(status_of(&h, task.id()).await, TaskStatus::Completed);
}
