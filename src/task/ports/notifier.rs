//! Publish/subscribe notification port keyed by principal id.

use crate::principal::PrincipalId;
use crate::task::domain::TaskId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Result type for notification delivery.
pub type NotifyResult<T> = Result<T, NotifyError>;

/// Category of a published notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A task the recipient is assigned to changed status.
    StatusChange,
    /// A task's priority was escalated by the deadline scheduler.
    PriorityEscalated,
    /// A task was assigned to the recipient.
    TaskAssigned,
}

/// Payload published to a recipient's topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Task the notification concerns.
    pub task_id: TaskId,
    /// Task title at publish time.
    pub task_title: String,
    /// Human-readable message.
    pub message: String,
    /// Notification category.
    pub kind: NotificationKind,
}

/// Message-bus contract for user notifications.
///
/// Delivery is at-least-once with acknowledgement handled by the transport;
/// the core only publishes. Publish failures never roll back committed task
/// state — callers log and continue.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationBus: Send + Sync {
    /// Publishes a notification to the recipient's topic.
    async fn publish(&self, recipient: PrincipalId, notification: Notification)
    -> NotifyResult<()>;
}

/// Errors returned by notification bus implementations.
#[derive(Debug, Clone, Error)]
pub enum NotifyError {
    /// Transport-layer failure.
    #[error("notification transport error: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),
}

impl NotifyError {
    /// Wraps a transport error.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Arc::new(err))
    }
}
