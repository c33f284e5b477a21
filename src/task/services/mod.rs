//! Task services: transition orchestration and scheduled escalation.

mod cascade;
mod escalation;

pub use cascade::{
    BulkUpdateRequest, BulkUpdateResponse, CascadeEngine, CascadeError, CascadeResult,
    CreateTaskRequest,
};
pub use escalation::{EscalationConfig, EscalationError, EscalationRun, EscalationScheduler};
