//! Port contracts for task persistence and notification delivery.
//!
//! Ports define infrastructure-agnostic interfaces used by task services.

pub mod notifier;
pub mod store;

pub use notifier::{Notification, NotificationBus, NotificationKind, NotifyError, NotifyResult};
pub use store::{StatusWrite, TaskStore, TaskStoreError, TaskStoreResult, WriteBatch};

#[cfg(test)]
pub use notifier::MockNotificationBus;
