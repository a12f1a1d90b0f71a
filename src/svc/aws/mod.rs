//! # AWS module
//!
//! This module provide the documentdb client port, its implementation on top of
//! the aws sdk and the connector building clients per region

pub mod client;
pub mod docdb;
#[cfg(test)]
pub mod fake;
pub mod sdk;

// -----------------------------------------------------------------------------
// Constants

pub const THROTTLING_CODES: [&str; 5] = [
    "Throttling",
    "ThrottlingException",
    "RequestLimitExceeded",
    "ServiceUnavailable",
    "InternalFailure",
];

// -----------------------------------------------------------------------------
// Error enumeration

#[derive(thiserror::Error, Clone, PartialEq, Eq, Debug)]
pub enum Error {
    #[error("aws api responded with error '{code}', {message}")]
    Api { code: String, message: String },
    #[error("failed to reach aws api, {0}")]
    Transport(String),
    #[error("failed to configure aws client, {0}")]
    Configuration(String),
}

impl Error {
    pub fn api(code: &str, message: &str) -> Self {
        Self::Api {
            code: code.to_string(),
            message: message.to_string(),
        }
    }

    /// returns the aws error code, if the api has been reached
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => Some(code),
            _ => None,
        }
    }

    /// returns if the error code is one of the given ones
    pub fn is_code(&self, codes: &[&str]) -> bool {
        self.code().is_some_and(|code| codes.contains(&code))
    }

    pub fn is_already_exists(&self) -> bool {
        self.code().is_some_and(|code| code.contains("AlreadyExists"))
    }

    /// returns if the request could succeed later without any change, this is
    /// the case for network failures, throttling and resources in a state
    /// that temporarily forbid the operation
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Configuration(_) => false,
            Self::Api { code, .. } => {
                THROTTLING_CODES.contains(&code.as_str())
                    || (code.starts_with("Invalid")
                        && (code.ends_with("State") || code.ends_with("StateFault")))
            }
        }
    }
}
