//! # Condition module
//!
//! This module provide constructors of the `Ready` and `Synced` conditions
//! reported in the status of managed resources

use chrono::{SecondsFormat, Utc};

use crate::svc::crd::Condition;

// -----------------------------------------------------------------------------
// Constants

pub const TYPE_READY: &str = "Ready";
pub const TYPE_SYNCED: &str = "Synced";

pub const STATUS_TRUE: &str = "True";
pub const STATUS_FALSE: &str = "False";

pub const REASON_AVAILABLE: &str = "Available";
pub const REASON_CREATING: &str = "Creating";
pub const REASON_DELETING: &str = "Deleting";
pub const REASON_MODIFYING: &str = "Modifying";
pub const REASON_UNAVAILABLE: &str = "Unavailable";
pub const REASON_RECONCILE_SUCCESS: &str = "ReconcileSuccess";
pub const REASON_RECONCILE_ERROR: &str = "ReconcileError";
pub const REASON_REFERENCE_RESOLUTION_FAILURE: &str = "ReferenceResolutionFailure";

// -----------------------------------------------------------------------------
// Constructors

fn new(type_: &str, status: &str, reason: &str, message: Option<&str>) -> Condition {
    Condition {
        type_: type_.to_string(),
        status: status.to_string(),
        reason: reason.to_string(),
        message: message.map(ToString::to_string),
        last_transition_time: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    }
}

pub fn available() -> Condition {
    new(TYPE_READY, STATUS_TRUE, REASON_AVAILABLE, None)
}

pub fn creating() -> Condition {
    new(TYPE_READY, STATUS_FALSE, REASON_CREATING, None)
}

pub fn deleting() -> Condition {
    new(TYPE_READY, STATUS_FALSE, REASON_DELETING, None)
}

/// the resource keeps serving while a modification is applied
pub fn modifying() -> Condition {
    new(TYPE_READY, STATUS_TRUE, REASON_MODIFYING, None)
}

pub fn unavailable() -> Condition {
    new(TYPE_READY, STATUS_FALSE, REASON_UNAVAILABLE, None)
}

pub fn reconcile_success() -> Condition {
    new(TYPE_SYNCED, STATUS_TRUE, REASON_RECONCILE_SUCCESS, None)
}

pub fn reconcile_error(message: &str) -> Condition {
    new(TYPE_SYNCED, STATUS_FALSE, REASON_RECONCILE_ERROR, Some(message))
}

pub fn reference_resolution_failure(message: &str) -> Condition {
    new(
        TYPE_SYNCED,
        STATUS_FALSE,
        REASON_REFERENCE_RESOLUTION_FAILURE,
        Some(message),
    )
}

// -----------------------------------------------------------------------------
// Helpers

pub fn get<'a>(conditions: &'a [Condition], type_: &str) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.type_ == type_)
}

/// replace the condition of the same type, the transition time is kept when
/// neither the status nor the reason nor the message changed
pub fn set(conditions: &mut Vec<Condition>, condition: Condition) {
    match conditions.iter_mut().find(|c| c.type_ == condition.type_) {
        Some(existing)
            if existing.status == condition.status
                && existing.reason == condition.reason
                && existing.message == condition.message => {}
        Some(existing) => *existing = condition,
        None => conditions.push(condition),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_replaces_the_condition_of_the_same_type() {
        let mut conditions = vec![];

        set(&mut conditions, creating());
        set(&mut conditions, reconcile_success());
        set(&mut conditions, available());

        assert_eq!(conditions.len(), 2);
        assert_eq!(get(&conditions, TYPE_READY).map(|c| c.reason.as_str()), Some("Available"));
        assert_eq!(get(&conditions, TYPE_SYNCED).map(|c| c.status.as_str()), Some("True"));
    }

    #[test]
    fn set_keeps_the_transition_time_of_an_unchanged_condition() {
        let mut previous = available();
        previous.last_transition_time = "2021-01-01T00:00:00Z".into();
        let mut conditions = vec![previous];

        set(&mut conditions, available());
        assert_eq!(conditions[0].last_transition_time, "2021-01-01T00:00:00Z");

        set(&mut conditions, reconcile_error("boom"));
        set(&mut conditions, reconcile_error("boom again"));
        assert_eq!(
            get(&conditions, TYPE_SYNCED).and_then(|c| c.message.as_deref()),
            Some("boom again")
        );
    }
}
