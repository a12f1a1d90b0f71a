//! # Event module
//!
//! This module provide helpers to build objects of the kubernetes
//! core/v1/event api

use chrono::Utc;
use k8s_openapi::{
    api::core::v1::{Event, EventSource},
    apimachinery::pkg::apis::meta::v1::{MicroTime, Time},
};
use kube::{api::ObjectMeta, Resource, ResourceExt};

use crate::svc::k8s::{recorder::Level, resource};

// -----------------------------------------------------------------------------
// Constants

pub const COMPONENT: &str = env!("CARGO_PKG_NAME");

// -----------------------------------------------------------------------------
// Helper functions

/// create a new event from the given parameters
pub fn new<T>(obj: &T, level: &Level, action: &str, message: &str) -> Event
where
    T: Resource<DynamicType = ()>,
{
    let now = Utc::now();

    Event {
        metadata: ObjectMeta {
            namespace: obj.namespace(),
            name: Some(format!(
                "{}-{}-{}",
                obj.name_any(),
                action.to_lowercase(),
                now.timestamp_nanos_opt().unwrap_or_else(|| now.timestamp())
            )),
            ..Default::default()
        },
        type_: Some(level.to_string()),
        action: Some(action.to_string()),
        count: Some(1),
        event_time: Some(MicroTime(now)),
        first_timestamp: Some(Time(now)),
        involved_object: resource::object_reference(obj),
        last_timestamp: Some(Time(now)),
        message: Some(message.to_string()),
        reason: Some(action.to_string()),
        reporting_component: Some(COMPONENT.to_string()),
        reporting_instance: Some(format!("{}/{}", COMPONENT, env!("CARGO_PKG_VERSION"))),
        source: Some(source()),
        ..Default::default()
    }
}

/// returns the source of this controller
pub fn source() -> EventSource {
    let host = hostname::get()
        .ok()
        .map(|host| host.to_string_lossy().to_string());

    EventSource {
        component: Some(COMPONENT.to_string()),
        host,
    }
}

#[cfg(test)]
mod tests {
    use k8s_openapi::api::core::v1::Secret;

    use super::*;

    #[test]
    fn event_points_to_the_object() {
        let mut obj = Secret::default();
        obj.metadata.namespace = Some("default".into());
        obj.metadata.name = Some("pw".into());

        let event = new(&obj, &Level::Warning, "CannotCreateExternalResource", "boom");

        assert_eq!(event.type_.as_deref(), Some("Warning"));
        assert_eq!(event.reason.as_deref(), Some("CannotCreateExternalResource"));
        assert_eq!(event.involved_object.name.as_deref(), Some("pw"));
        assert_eq!(event.metadata.namespace.as_deref(), Some("default"));
        assert!(event
            .metadata
            .name
            .is_some_and(|name| name.starts_with("pw-cannotcreateexternalresource-")));
    }
}
