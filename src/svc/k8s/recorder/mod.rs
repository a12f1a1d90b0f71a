//! # Event recorder module
//!
//! This module records kubernetes events on managed resources, the messages
//! usually carry the error returned by the aws api

use std::fmt::{self, Debug, Display, Formatter};

use k8s_openapi::api::core::v1::Event;
use kube::{api::PostParams, Api, Client, Resource};
use tracing::debug;

use crate::svc::k8s::resource;

pub mod event;

// -----------------------------------------------------------------------------
// Constants

/// kubernetes refuses event messages longer than this number of bytes
pub const MESSAGE_MAX_LENGTH: usize = 1024;

// -----------------------------------------------------------------------------
// Level enumeration

#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Debug)]
pub enum Level {
    Warning,
    Normal,
}

impl Display for Level {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "Warning"),
            Self::Normal => write!(f, "Normal"),
        }
    }
}

// -----------------------------------------------------------------------------
// Helper methods

/// returns the message cut on a char boundary to fit in an event
pub fn truncate(message: &str) -> &str {
    if message.len() <= MESSAGE_MAX_LENGTH {
        return message;
    }

    let mut end = MESSAGE_MAX_LENGTH;
    while !message.is_char_boundary(end) {
        end -= 1;
    }

    &message[..end]
}

#[cfg_attr(feature = "trace", tracing::instrument(skip(client, obj)))]
/// record an event for the given managed resource
pub async fn record<T>(
    client: Client,
    obj: &T,
    level: &Level,
    reason: &str,
    message: &str,
) -> Result<Event, kube::Error>
where
    T: Resource<DynamicType = ()>,
{
    let (namespace, name) = resource::namespaced_name(obj);

    debug!(
        kind = T::kind(&()).to_string(),
        namespace = &namespace,
        name = &name,
        reason = reason,
        level = level.to_string(),
        "Record event on managed resource"
    );

    Api::<Event>::namespaced(client, &namespace)
        .create(
            &PostParams::default(),
            &event::new(obj, level, reason, truncate(message)),
        )
        .await
}
