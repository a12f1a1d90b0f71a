//! # Configuration module
//!
//! This module provide utilities and helpers to interact with the configuration

use std::{
    convert::TryFrom,
    env,
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use config::{builder::DefaultState, Config, ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

// -----------------------------------------------------------------------------
// Constants

pub const DEFAULT_LISTEN: &str = "0.0.0.0:8000";
pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_PROVIDER_CONFIG: &str = "default";
pub const DEFAULT_POLL_INTERVAL: i64 = 60;
pub const DEFAULT_RECONCILE_TIMEOUT: i64 = 180;
pub const DEFAULT_MAX_CONCURRENT_RECONCILES: i64 = 10;
pub const DEFAULT_BACKOFF_BASE: i64 = 1;
pub const DEFAULT_BACKOFF_MAX: i64 = 300;

// -----------------------------------------------------------------------------
// Error enumeration

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to load file '{0:?}', {1}")]
    File(PathBuf, ConfigError),
    #[error("failed to load configuration, {0}")]
    Cast(ConfigError),
    #[error("failed to build configuration, {0}")]
    Build(ConfigError),
    #[error("failed to set default for key '{0}', {1}")]
    Default(&'static str, ConfigError),
}

// -----------------------------------------------------------------------------
// Backoff structure

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
pub struct Backoff {
    /// first delay in seconds applied after a transient failure
    #[serde(rename = "base")]
    pub base: u64,
    /// upper bound in seconds of the delay between two attempts
    #[serde(rename = "max")]
    pub max: u64,
}

// -----------------------------------------------------------------------------
// Operator structure

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
pub struct Operator {
    #[serde(rename = "listen")]
    pub listen: SocketAddr,
    #[serde(rename = "poll_interval")]
    pub poll_interval: u64,
    #[serde(rename = "max_concurrent_reconciles")]
    pub max_concurrent_reconciles: u16,
    #[serde(rename = "reconcile_timeout")]
    pub reconcile_timeout: u64,
    #[serde(rename = "provider_config")]
    pub provider_config: String,
    #[serde(rename = "backoff")]
    pub backoff: Backoff,
}

impl Operator {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval)
    }

    pub fn reconcile_timeout(&self) -> Duration {
        Duration::from_secs(self.reconcile_timeout)
    }
}

// -----------------------------------------------------------------------------
// Aws structure

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
pub struct Aws {
    #[serde(rename = "region")]
    pub region: String,
    #[serde(rename = "endpoint", default)]
    pub endpoint: Option<String>,
    #[serde(rename = "access_key_id", default)]
    pub access_key_id: Option<String>,
    #[serde(rename = "secret_access_key", default)]
    pub secret_access_key: Option<String>,
    #[serde(rename = "session_token", default)]
    pub session_token: Option<String>,
}

// -----------------------------------------------------------------------------
// Logging structure

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Debug, Default)]
pub enum Format {
    #[default]
    #[serde(rename = "text")]
    Text,
    #[serde(rename = "json")]
    Json,
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug, Default)]
pub struct Logging {
    #[serde(rename = "format", default)]
    pub format: Format,
}

// -----------------------------------------------------------------------------
// Configuration structures

#[derive(Serialize, Deserialize, PartialEq, Eq, Clone, Debug)]
pub struct Configuration {
    #[serde(rename = "operator")]
    pub operator: Operator,
    #[serde(rename = "aws")]
    pub aws: Aws,
    #[serde(rename = "logging", default)]
    pub logging: Logging,
}

impl TryFrom<PathBuf> for Configuration {
    type Error = Error;

    fn try_from(path: PathBuf) -> Result<Self, Self::Error> {
        let builder = defaults()?.add_source(File::from(path.as_path()).required(true));

        builder
            .build()
            .map_err(|err| Error::File(path, err))?
            .try_deserialize()
            .map_err(Error::Cast)
    }
}

impl Configuration {
    pub fn try_default() -> Result<Self, Error> {
        let mut paths = vec![
            PathBuf::from(format!("/usr/share/{}/config", env!("CARGO_PKG_NAME"))),
            PathBuf::from(format!("/etc/{}/config", env!("CARGO_PKG_NAME"))),
        ];

        if let Ok(home) = env::var("HOME") {
            paths.push(Path::new(&home).join(".config").join(env!("CARGO_PKG_NAME")).join("config"));
        }

        paths.push(PathBuf::from("config"));

        paths
            .iter()
            .try_fold(defaults()?, |builder, path| {
                Ok::<_, Error>(builder.add_source(File::from(path.as_path()).required(false)))
            })?
            .build()
            .map_err(Error::Build)?
            .try_deserialize()
            .map_err(Error::Cast)
    }
}

/// returns a configuration builder filled with defaults and the environment
/// source, files are expected to be added by the caller.
fn defaults() -> Result<ConfigBuilder<DefaultState>, Error> {
    let defaults: [(&'static str, config::Value); 9] = [
        ("operator.listen", DEFAULT_LISTEN.into()),
        ("operator.poll_interval", DEFAULT_POLL_INTERVAL.into()),
        (
            "operator.max_concurrent_reconciles",
            DEFAULT_MAX_CONCURRENT_RECONCILES.into(),
        ),
        ("operator.reconcile_timeout", DEFAULT_RECONCILE_TIMEOUT.into()),
        ("operator.provider_config", DEFAULT_PROVIDER_CONFIG.into()),
        ("operator.backoff.base", DEFAULT_BACKOFF_BASE.into()),
        ("operator.backoff.max", DEFAULT_BACKOFF_MAX.into()),
        ("aws.region", DEFAULT_REGION.into()),
        ("logging.format", "text".into()),
    ];

    let builder = defaults
        .into_iter()
        .try_fold(Config::builder(), |builder, (key, value)| {
            builder
                .set_default(key, value)
                .map_err(|err| Error::Default(key, err))
        })?;

    // Environment variables are the last source, so that they override files
    // whatever the order files are added by the caller.
    Ok(builder.add_source(
        Environment::with_prefix(&env!("CARGO_PKG_NAME").replace('-', "_").to_uppercase())
            .prefix_separator("_")
            .separator("__"),
    ))
}
