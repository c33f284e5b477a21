//! Deadline-driven priority escalation.
//!
//! A periodic sweep promotes tasks whose deadlines fall inside a lookahead
//! window by one priority step. Each task carries a one-shot escalation
//! flag so a task is promoted at most once over its lifetime, no matter how
//! many sweeps observe it.

use mockable::Clock;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::task::domain::Task;
use crate::task::ports::{
    Notification, NotificationBus, NotificationKind, NotifyError, TaskStore, TaskStoreError,
};

/// Tuning knobs for the escalation sweep.
#[derive(Debug, Clone)]
pub struct EscalationConfig {
    /// Interval between sweeps when driven by [`EscalationScheduler::run`].
    pub period: Duration,
    /// How far ahead of now a deadline qualifies a task for promotion.
    pub deadline_lookahead: chrono::Duration,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(300),
            deadline_lookahead: chrono::Duration::hours(24),
        }
    }
}

/// Outcome counters for one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EscalationRun {
    /// Candidates returned by the store.
    pub examined: usize,
    /// Tasks promoted and notified.
    pub escalated: usize,
    /// Candidates left alone (already at the top, or lost the
    /// check-and-set race).
    pub skipped: usize,
    /// Tasks whose promotion or notification failed.
    pub failed: usize,
}

/// Errors while escalating a single task.
#[derive(Debug, Error)]
pub enum EscalationError {
    /// Store operation failed.
    #[error(transparent)]
    Store(#[from] TaskStoreError),
    /// Notification delivery failed after the promotion persisted.
    #[error(transparent)]
    Notify(#[from] NotifyError),
}

/// Periodic escalation sweeper over a [`TaskStore`].
#[derive(Clone)]
pub struct EscalationScheduler<S, B, C>
where
    S: TaskStore,
    B: NotificationBus,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    bus: Arc<B>,
    clock: Arc<C>,
    config: EscalationConfig,
}

impl<S, B, C> EscalationScheduler<S, B, C>
where
    S: TaskStore,
    B: NotificationBus,
    C: Clock + Send + Sync,
{
    /// Creates a scheduler with default tuning.
    #[must_use]
    pub fn new(store: Arc<S>, bus: Arc<B>, clock: Arc<C>) -> Self {
        Self::with_config(store, bus, clock, EscalationConfig::default())
    }

    /// Creates a scheduler with explicit tuning.
    #[must_use]
    pub const fn with_config(
        store: Arc<S>,
        bus: Arc<B>,
        clock: Arc<C>,
        config: EscalationConfig,
    ) -> Self {
        Self {
            store,
            bus,
            clock,
            config,
        }
    }

    /// Runs one sweep and reports what happened.
    ///
    /// A failure on one task is logged and counted; the sweep continues
    /// with the remaining candidates.
    ///
    /// # Errors
    ///
    /// Returns a store error only when the candidate query itself fails.
    pub async fn run_once(&self) -> Result<EscalationRun, TaskStoreError> {
        let now = self.clock.utc();
        let candidates = self
            .store
            .escalation_candidates(now + self.config.deadline_lookahead)
            .await?;
        let mut run = EscalationRun {
            examined: candidates.len(),
            ..EscalationRun::default()
        };
        for task in candidates {
            match self.escalate(&task).await {
                Ok(true) => run.escalated += 1,
                Ok(false) => run.skipped += 1,
                Err(err) => {
                    warn!(task = %task.id(), error = %err, "escalation failed");
                    run.failed += 1;
                }
            }
        }
        debug!(
            examined = run.examined,
            escalated = run.escalated,
            skipped = run.skipped,
            failed = run.failed,
            "escalation sweep complete"
        );
        Ok(run)
    }

    /// Drives [`EscalationScheduler::run_once`] on a fixed interval.
    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(self.config.period);
        loop {
            ticker.tick().await;
            if let Err(err) = self.run_once().await {
                warn!(error = %err, "escalation sweep failed");
            }
        }
    }

    async fn escalate(&self, task: &Task) -> Result<bool, EscalationError> {
        let Some(next) = task.priority().successor() else {
            return Ok(false);
        };
        let now = self.clock.utc();
        if !self.store.try_escalate(task.id(), next, now).await? {
            return Ok(false);
        }
        let notification = Notification {
            task_id: task.id(),
            task_title: task.title().to_owned(),
            message: format!(
                "Task '{}' priority escalated to {} due to upcoming deadline.",
                task.title(),
                next.as_str().to_uppercase()
            ),
            kind: NotificationKind::PriorityEscalated,
        };
        self.bus.publish(task.assigned_to(), notification).await?;
        Ok(true)
    }
}
