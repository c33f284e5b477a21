//! Domain model for task tracking.
//!
//! Tasks carry a lifecycle status, an ordered priority, an optional
//! single-level parent reference, and a one-shot deadline escalation flag.
//! All infrastructure concerns stay outside the domain boundary.

mod error;
mod history;
mod ids;
mod task;

pub use error::{ParseTaskPriorityError, ParseTaskStatusError, TaskDomainError};
pub use history::{HistoryAction, HistoryEntry};
pub use ids::{Hours, TaskId};
pub use task::{PersistedTaskData, Task, TaskPriority, TaskStatus};
