//! Access evaluation over roles, ownership, and local business hours.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::rules;
use crate::principal::{Principal, PrincipalId, Role};
use crate::task::domain::{Task, TaskId, TaskPriority};

/// Coarse classification of a request for quota and permission purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionClass {
    /// Safe methods: GET, HEAD, OPTIONS.
    Read,
    /// Mutating methods: POST, PUT, PATCH, DELETE.
    Write,
}

impl ActionClass {
    /// Returns the canonical key representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
        }
    }

    /// Returns the capitalized label used in user-facing messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Read => "Read",
            Self::Write => "Write",
        }
    }
}

impl fmt::Display for ActionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Local-time write window applied to developers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusinessHours {
    start: u32,
    end: u32,
}

impl BusinessHours {
    /// Creates a half-open `[start, end)` window over local hours.
    #[must_use]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Returns whether the local hour falls inside the window.
    #[must_use]
    pub const fn contains(&self, hour: u32) -> bool {
        self.start <= hour && hour < self.end
    }
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self::new(9, 18)
    }
}

/// Reasons an access check denies a request. All map to HTTP 403.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AccessDenied {
    /// The role never performs this action (auditor writes).
    #[error("role '{role}' is not allowed to modify data")]
    RoleForbidden {
        /// Denied role.
        role: Role,
    },

    /// A developer touched a task assigned to someone else.
    #[error("task {task_id} is not assigned to the caller")]
    NotAssignee {
        /// Task the caller attempted to modify.
        task_id: TaskId,
    },

    /// The caller's local clock is outside the write window.
    #[error("writes are not permitted at local hour {hour}")]
    OutsideBusinessHours {
        /// Hour-of-day in the caller's zone.
        hour: u32,
    },

    /// A developer attempted to create a task assigned to someone else.
    #[error("developers may only create tasks assigned to themselves")]
    AssignmentMismatch,

    /// The principal carries an unparseable IANA zone name.
    #[error("unknown timezone: {0}")]
    UnknownTimezone(String),
}

impl AccessDenied {
    /// HTTP status this denial maps to at the boundary.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        403
    }
}

/// Stateless access decision function.
///
/// Object-level rules, evaluated in order with first match winning:
///
/// 1. reads are always allowed;
/// 2. auditor writes are denied;
/// 3. manager writes are allowed unconditionally;
/// 4. developer writes on a task not assigned to them are denied;
/// 5. developer writes on a critical-priority task are allowed at any hour;
/// 6. remaining developer writes require the local business-hours window.
///
/// Creation-level rules share the window predicate and additionally require
/// developers to assign the new task to themselves. Bulk authorization
/// applies role and ownership only; the time window is deliberately not
/// consulted there.
#[derive(Debug, Clone, Default)]
pub struct AccessEvaluator {
    hours: BusinessHours,
}

impl AccessEvaluator {
    /// Creates an evaluator with the default 09:00–18:00 window.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an evaluator with a custom write window.
    #[must_use]
    pub const fn with_hours(hours: BusinessHours) -> Self {
        Self { hours }
    }

    /// Decides an action against an existing task.
    ///
    /// # Errors
    ///
    /// Returns the first matching [`AccessDenied`] rule.
    pub fn evaluate_object(
        &self,
        principal: &Principal,
        action: ActionClass,
        task: &Task,
        now: DateTime<Utc>,
    ) -> Result<(), AccessDenied> {
        if action == ActionClass::Read {
            return Ok(());
        }
        match principal.role() {
            Role::Auditor => Err(AccessDenied::RoleForbidden {
                role: Role::Auditor,
            }),
            Role::Manager => Ok(()),
            Role::Developer => {
                rules::require_assignee(principal, task)?;
                if task.priority() == TaskPriority::Critical {
                    return Ok(());
                }
                rules::require_business_hours(principal, now, &self.hours)
            }
        }
    }

    /// Decides a task creation before any task exists.
    ///
    /// # Errors
    ///
    /// Returns the first matching [`AccessDenied`] rule.
    pub fn evaluate_create(
        &self,
        principal: &Principal,
        assigned_to: PrincipalId,
        now: DateTime<Utc>,
    ) -> Result<(), AccessDenied> {
        match principal.role() {
            Role::Auditor => Err(AccessDenied::RoleForbidden {
                role: Role::Auditor,
            }),
            Role::Manager => Ok(()),
            Role::Developer => {
                rules::require_business_hours(principal, now, &self.hours)?;
                if assigned_to != principal.id() {
                    return Err(AccessDenied::AssignmentMismatch);
                }
                Ok(())
            }
        }
    }

    /// Decides membership of a task in a bulk mutation.
    ///
    /// Role and ownership only; bulk requests are not time-windowed.
    ///
    /// # Errors
    ///
    /// Returns the first matching [`AccessDenied`] rule.
    pub fn evaluate_bulk(&self, principal: &Principal, task: &Task) -> Result<(), AccessDenied> {
        match principal.role() {
            Role::Auditor => Err(AccessDenied::RoleForbidden {
                role: Role::Auditor,
            }),
            Role::Manager => Ok(()),
            Role::Developer => rules::require_assignee(principal, task),
        }
    }
}
