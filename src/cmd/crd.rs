//! # Custom resource definition module
//!
//! This module provides custom resource module command line interface function
//! implementation

use std::sync::Arc;

use async_trait::async_trait;
use clap::Subcommand;

use crate::{
    cmd::Executor,
    svc::{
        cfg::Configuration,
        managed::registry::{self, Kind},
    },
};

// -----------------------------------------------------------------------------
// Error enum

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to serialize custom resource definition, {0}")]
    Serialize(serde_yaml::Error),
    #[error("failed to find custom resource '{0}', available options are {1}")]
    UnknownKind(String, String),
}

// -----------------------------------------------------------------------------
// CustomResourceDefinition enum

#[derive(Subcommand, Clone, Debug)]
pub enum CustomResourceDefinition {
    /// View custom resource definition
    #[clap(name = "view", aliases = &["v"])]
    View {
        /// One of 'cluster', 'cluster-parameter-group', 'subnet-group' or
        /// 'instance', all definitions are printed if omitted
        #[clap(name = "custom-resource")]
        custom_resource: Option<String>,
    },
}

#[async_trait]
impl Executor for CustomResourceDefinition {
    type Error = Error;

    #[cfg_attr(feature = "trace", tracing::instrument(skip(config)))]
    async fn execute(&self, config: Arc<Configuration>) -> Result<(), Self::Error> {
        match self {
            Self::View { custom_resource } => view(config, custom_resource.as_deref()).await,
        }
    }
}

// -----------------------------------------------------------------------------
// helpers

/// returns the yaml documents of the definitions of the selected kinds
pub fn render(custom_resource: Option<&str>) -> Result<String, Error> {
    let kinds: Vec<Kind> = match custom_resource {
        None => registry::kinds().to_vec(),
        Some(name) => vec![registry::find(name)
            .ok_or_else(|| Error::UnknownKind(name.to_string(), registry::names()))?],
    };

    let documents = kinds
        .iter()
        .map(|kind| serde_yaml::to_string(&(kind.crd)()).map_err(Error::Serialize))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(documents.join("---\n"))
}

#[cfg_attr(feature = "trace", tracing::instrument(skip(_config)))]
pub async fn view(_config: Arc<Configuration>, custom_resource: Option<&str>) -> Result<(), Error> {
    print!("{}", render(custom_resource)?);
    Ok(())
}
