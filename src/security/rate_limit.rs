//! Role- and action-aware fixed-window rate limiting.
//!
//! Counters live in the shared [`CounterStore`] under
//! `rate:{principal}:{role}:{action}:{window}` and expire after one window.
//! Admission is two-phase: [`RateLimiter::check`] gates the request before
//! it runs, and [`RateLimiter::record_success`] counts it only when the
//! downstream response succeeded, so failed requests never consume quota.
//!
//! Fixed windows reset at window boundaries, which permits short bursts of
//! up to twice the nominal limit across a boundary. That is an accepted
//! property of the scheme, kept for its simplicity and cheap counters.

use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::counter::{CounterStore, CounterStoreError};
use crate::access::ActionClass;
use crate::principal::{Principal, Role};

/// Per-role request budgets for one window.
///
/// `None` means unlimited; `Some(0)` means the action is never admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleLimits {
    /// Reads admitted per window.
    pub read: Option<u32>,
    /// Writes admitted per window.
    pub write: Option<u32>,
}

impl RoleLimits {
    /// Returns the budget for an action class.
    #[must_use]
    pub const fn for_action(&self, action: ActionClass) -> Option<u32> {
        match action {
            ActionClass::Read => self.read,
            ActionClass::Write => self.write,
        }
    }
}

/// Rate limiter configuration: window size and per-role budgets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Fixed window duration.
    pub window: Duration,
    /// Manager budgets.
    pub manager: RoleLimits,
    /// Developer budgets.
    pub developer: RoleLimits,
    /// Auditor budgets.
    pub auditor: RoleLimits,
}

impl RateLimitConfig {
    /// Returns the budgets for a role.
    #[must_use]
    pub const fn limits_for(&self, role: Role) -> RoleLimits {
        match role {
            Role::Manager => self.manager,
            Role::Developer => self.developer,
            Role::Auditor => self.auditor,
        }
    }
}

impl Default for RateLimitConfig {
    /// Production defaults: 1-hour windows; manager 200/50, developer
    /// 100/20, auditor unlimited reads and no writes.
    fn default() -> Self {
        Self {
            window: Duration::from_secs(60 * 60),
            manager: RoleLimits {
                read: Some(200),
                write: Some(50),
            },
            developer: RoleLimits {
                read: Some(100),
                write: Some(20),
            },
            auditor: RoleLimits {
                read: None,
                write: Some(0),
            },
        }
    }
}

/// Errors and rejections produced by the rate limiter.
#[derive(Debug, Clone, Error)]
pub enum RateLimitError {
    /// Auditor attempted a write; rejected before any counting.
    #[error("auditors are not allowed to modify data")]
    WriteForbidden,

    /// The caller exhausted its window budget.
    #[error("{} rate limit exceeded", action.label())]
    Exceeded {
        /// Action class that ran out of budget.
        action: ActionClass,
        /// Remaining window time, attached for writes as a retry hint.
        retry_after: Option<Duration>,
    },

    /// Counter store failure; treated as transient.
    #[error(transparent)]
    Store(#[from] CounterStoreError),
}

impl RateLimitError {
    /// HTTP status this rejection maps to at the boundary.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::WriteForbidden => 403,
            Self::Exceeded { .. } => 429,
            Self::Store(_) => 500,
        }
    }

    /// Response body detail for the boundary layer.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::WriteForbidden => "Auditors are not allowed to modify data.".to_owned(),
            Self::Exceeded { action, .. } => format!("{} rate limit exceeded.", action.label()),
            Self::Store(_) => "Service temporarily unavailable.".to_owned(),
        }
    }
}

/// Snapshot of a principal's current window, for the debug endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimitUsage {
    /// Role the budgets were resolved for.
    pub role: Role,
    /// Window size in seconds.
    pub window_seconds: u64,
    /// Budgets configured for the role.
    pub limits: RoleLimits,
    /// Reads counted in the current window.
    pub read_count: u64,
    /// Writes counted in the current window.
    pub write_count: u64,
}

/// Fixed-window admission control over the shared counter store.
#[derive(Debug, Clone)]
pub struct RateLimiter<S, C>
where
    S: CounterStore,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    clock: Arc<C>,
    config: RateLimitConfig,
}

impl<S, C> RateLimiter<S, C>
where
    S: CounterStore,
    C: Clock + Send + Sync,
{
    /// Creates a limiter with production default budgets.
    #[must_use]
    pub fn new(store: Arc<S>, clock: Arc<C>) -> Self {
        Self::with_config(store, clock, RateLimitConfig::default())
    }

    /// Creates a limiter with custom budgets.
    #[must_use]
    pub fn with_config(store: Arc<S>, clock: Arc<C>, config: RateLimitConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    fn window_seconds(&self) -> u64 {
        self.config.window.as_secs().max(1)
    }

    fn window_key(&self, principal: &Principal, action: ActionClass, now: DateTime<Utc>) -> String {
        let window = now.timestamp().div_euclid(self.window_seconds() as i64);
        format!(
            "rate:{}:{}:{}:{}",
            principal.id(),
            principal.role(),
            action,
            window
        )
    }

    /// Gates a request before it executes.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError::WriteForbidden`] for auditor writes,
    /// [`RateLimitError::Exceeded`] once the window budget is spent (with a
    /// retry hint attached for writes), and [`RateLimitError::Store`] on
    /// backend failure.
    pub async fn check(
        &self,
        principal: &Principal,
        action: ActionClass,
    ) -> Result<(), RateLimitError> {
        if principal.role() == Role::Auditor && action == ActionClass::Write {
            return Err(RateLimitError::WriteForbidden);
        }
        let Some(limit) = self.config.limits_for(principal.role()).for_action(action) else {
            return Ok(());
        };

        let now = self.clock.utc();
        let key = self.window_key(principal, action, now);
        let current = self.store.count(&key).await?;
        if current >= u64::from(limit) {
            debug!(principal = %principal.id(), %action, current, limit, "rate limit exceeded");
            let retry_after = if action == ActionClass::Write {
                Some(
                    self.store
                        .time_to_live(&key)
                        .await?
                        .unwrap_or(self.config.window),
                )
            } else {
                None
            };
            return Err(RateLimitError::Exceeded {
                action,
                retry_after,
            });
        }
        Ok(())
    }

    /// Counts a request whose downstream response succeeded (status < 400).
    ///
    /// Unlimited actions are not counted at all.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError::Store`] on backend failure.
    pub async fn record_success(
        &self,
        principal: &Principal,
        action: ActionClass,
    ) -> Result<(), RateLimitError> {
        if self
            .config
            .limits_for(principal.role())
            .for_action(action)
            .is_none()
        {
            return Ok(());
        }
        let now = self.clock.utc();
        let key = self.window_key(principal, action, now);
        self.store.increment(&key, self.config.window).await?;
        Ok(())
    }

    /// Reports the caller's current window usage.
    ///
    /// Non-production introspection surface; exposes counts and configured
    /// budgets, never other principals' state.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError::Store`] on backend failure.
    pub async fn usage(&self, principal: &Principal) -> Result<RateLimitUsage, RateLimitError> {
        let now = self.clock.utc();
        let read_key = self.window_key(principal, ActionClass::Read, now);
        let write_key = self.window_key(principal, ActionClass::Write, now);
        Ok(RateLimitUsage {
            role: principal.role(),
            window_seconds: self.window_seconds(),
            limits: self.config.limits_for(principal.role()),
            read_count: self.store.count(&read_key).await?,
            write_count: self.store.count(&write_key).await?,
        })
    }
}
