//! Individual access rule predicates.
//!
//! Each rule is a pure function that either passes (`Ok(())`) or produces
//! the specific denial it guards against. The evaluator composes them in a
//! fixed order.

use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;

use super::evaluator::{AccessDenied, BusinessHours};
use crate::principal::Principal;
use crate::task::domain::Task;

/// Requires that the principal is the task's assignee.
///
/// # Errors
///
/// Returns [`AccessDenied::NotAssignee`] when the task is assigned to
/// someone else.
pub(crate) fn require_assignee(principal: &Principal, task: &Task) -> Result<(), AccessDenied> {
    if task.assigned_to() != principal.id() {
        return Err(AccessDenied::NotAssignee { task_id: task.id() });
    }
    Ok(())
}

/// Requires that the principal's local clock falls inside business hours.
///
/// The current UTC time is converted into the principal's IANA zone; the
/// window is half-open over the local hour.
///
/// # Errors
///
/// Returns [`AccessDenied::OutsideBusinessHours`] outside the window and
/// [`AccessDenied::UnknownTimezone`] when the zone name does not parse.
pub(crate) fn require_business_hours(
    principal: &Principal,
    now: DateTime<Utc>,
    hours: &BusinessHours,
) -> Result<(), AccessDenied> {
    let hour = local_hour(principal, now)?;
    if !hours.contains(hour) {
        return Err(AccessDenied::OutsideBusinessHours { hour });
    }
    Ok(())
}

/// Returns the hour-of-day in the principal's IANA timezone.
///
/// # Errors
///
/// Returns [`AccessDenied::UnknownTimezone`] when the zone name does not
/// parse; an unrecognized zone is a denial, never a silent pass.
pub(crate) fn local_hour(principal: &Principal, now: DateTime<Utc>) -> Result<u32, AccessDenied> {
    let zone: Tz = principal
        .timezone()
        .parse()
        .map_err(|_| AccessDenied::UnknownTimezone(principal.timezone().to_owned()))?;
    Ok(now.with_timezone(&zone).hour())
}
