//! # Error module
//!
//! This module provide the error returned by the managed resource engine and
//! its classification used to decide when to retry

use std::time::Duration;

use crate::svc::{
    aws,
    crd::Condition,
    k8s::store,
    managed::condition,
};

// -----------------------------------------------------------------------------
// Constants

pub const PHASE_RESOLVE_REFERENCES: &str = "resolve references";

pub const INVALID_REQUEST_CODES: [&str; 4] = [
    "InvalidParameterValue",
    "InvalidParameterCombination",
    "InvalidParameterValueException",
    "ValidationError",
];

// -----------------------------------------------------------------------------
// Class enumeration

/// how the controller should react to an error
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Class {
    /// another writer modified the object, retry immediately on fresh data
    Conflict,
    /// retry with an exponential backoff
    Transient,
    /// nothing will change until the spec does
    Permanent,
    /// the cloud resource disappeared while acting on it
    NotFound,
}

// -----------------------------------------------------------------------------
// Error enumeration

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to interact with kubernetes api, {0}")]
    Store(store::Error),
    #[error("failed to interact with documentdb api, {0}")]
    Cloud(aws::Error),
    #[error("failed to resolve reference '{field}', {reason}")]
    Reference { field: &'static str, reason: String },
    #[error("failed to retrieve key '{2}' of secret '{0}/{1}'")]
    MissingSecret(String, String, String),
    #[error("{0}")]
    Permanent(String),
    #[error("failed to reconcile resource within {0:?}")]
    Timeout(Duration),
    #[error("{0}: {1}")]
    Phase(&'static str, Box<Error>),
}

impl From<store::Error> for Error {
    fn from(err: store::Error) -> Self {
        Self::Store(err)
    }
}

impl From<aws::Error> for Error {
    fn from(err: aws::Error) -> Self {
        Self::Cloud(err)
    }
}

impl Error {
    /// tags the error with the step of the pipeline where it happened
    pub fn phase(self, phase: &'static str) -> Self {
        Self::Phase(phase, Box::new(self))
    }

    /// tags the error unless a hook already did
    pub fn or_phase(self, phase: &'static str) -> Self {
        match self {
            Self::Phase(..) => self,
            err => err.phase(phase),
        }
    }

    /// returns the outermost phase tag, if any
    pub fn tag(&self) -> Option<&'static str> {
        match self {
            Self::Phase(phase, _) => Some(phase),
            _ => None,
        }
    }

    pub fn class(&self) -> Class {
        match self {
            Self::Phase(_, err) => err.class(),
            Self::Store(err) if err.is_conflict() => Class::Conflict,
            Self::Store(_) | Self::Reference { .. } | Self::Timeout(_) => Class::Transient,
            Self::MissingSecret(..) | Self::Permanent(_) => Class::Permanent,
            Self::Cloud(err) if err.is_transient() => Class::Transient,
            Self::Cloud(err) if err.is_code(&INVALID_REQUEST_CODES) => Class::Permanent,
            Self::Cloud(aws::Error::Configuration(_)) => Class::Permanent,
            Self::Cloud(err) if err.code().is_some_and(|code| code.contains("NotFound")) => {
                Class::NotFound
            }
            Self::Cloud(_) => Class::Transient,
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.class() == Class::Conflict
    }

    /// returns the synced condition reporting this error
    pub fn synced(&self) -> Condition {
        if self.tag() == Some(PHASE_RESOLVE_REFERENCES) {
            return condition::reference_resolution_failure(&self.to_string());
        }

        condition::reconcile_error(&self.to_string())
    }
}
