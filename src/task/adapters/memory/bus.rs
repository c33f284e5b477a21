//! In-memory notification bus recording published messages.

use async_trait::async_trait;
use std::sync::{Arc, RwLock};

use crate::principal::PrincipalId;
use crate::task::ports::{Notification, NotificationBus, NotifyError, NotifyResult};

/// Notification bus that records every published message.
///
/// Used by tests and single-process deployments without a real transport.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotificationBus {
    published: Arc<RwLock<Vec<(PrincipalId, Notification)>>>,
}

impl InMemoryNotificationBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every message published so far, in publish order.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Transport`] when the internal lock is poisoned.
    pub fn published(&self) -> NotifyResult<Vec<(PrincipalId, Notification)>> {
        let published = self
            .published
            .read()
            .map_err(|err| NotifyError::transport(std::io::Error::other(err.to_string())))?;
        Ok(published.clone())
    }
}

#[async_trait]
impl NotificationBus for InMemoryNotificationBus {
    async fn publish(
        &self,
        recipient: PrincipalId,
        notification: Notification,
    ) -> NotifyResult<()> {
        let mut published = self
            .published
            .write()
            .map_err(|err| NotifyError::transport(std::io::Error::other(err.to_string())))?;
        published.push((recipient, notification));
        Ok(())
    }
}
