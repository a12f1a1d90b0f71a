//! # Command module
//!
//! This module provide command line interface structures and helpers
use std::{io, net::SocketAddr, path::PathBuf, sync::Arc};

use async_trait::async_trait;
use clap::{ArgAction, Parser, Subcommand};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::svc::{
    aws::client::Connector,
    cfg::Configuration,
    http::{self, Health},
    k8s::{client, Context},
    managed::registry,
};

pub mod crd;

// -----------------------------------------------------------------------------
// Executor trait

#[async_trait]
pub trait Executor {
    type Error;

    async fn execute(&self, config: Arc<Configuration>) -> Result<(), Self::Error>;
}

// -----------------------------------------------------------------------------
// Command enum

#[derive(Subcommand, Clone, Debug)]
pub enum Command {
    /// Interact with custom resource definition
    #[clap(name = "custom-resource-definition", aliases = &["crd"], subcommand)]
    CustomResourceDefinition(crd::CustomResourceDefinition),
}

#[async_trait]
impl Executor for Command {
    type Error = Error;

    #[cfg_attr(feature = "trace", tracing::instrument(skip(config)))]
    async fn execute(&self, config: Arc<Configuration>) -> Result<(), Self::Error> {
        match self {
            Self::CustomResourceDefinition(crd) => crd
                .execute(config)
                .await
                .map_err(Error::CustomResourceDefinition),
        }
    }
}

// -----------------------------------------------------------------------------
// Args struct

#[derive(Parser, Clone, Debug)]
#[clap(author, version, about = env!("CARGO_PKG_DESCRIPTION"))]
pub struct Args {
    /// Increase log verbosity
    #[clap(short = 'v', global = true, action = ArgAction::Count)]
    pub verbosity: u8,
    /// Specify location of kubeconfig
    #[clap(short = 'k', long = "kubeconfig", global = true)]
    pub kubeconfig: Option<PathBuf>,
    /// Specify location of configuration
    #[clap(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,
    /// Check if configuration is healthy
    #[clap(short = 't', long = "check", global = true)]
    pub check: bool,
    #[clap(subcommand)]
    pub command: Option<Command>,
}

// -----------------------------------------------------------------------------
// Error enum

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to execute command 'custom-resource-definition', {0}")]
    CustomResourceDefinition(crd::Error),
    #[error("failed to handle termination signal, {0}")]
    SigTerm(io::Error),
    #[error("failed to create kubernetes client, {0}")]
    Client(client::Error),
    #[error("failed to serve http content on '{0}', {1}")]
    Serve(SocketAddr, http::server::Error),
}

// -----------------------------------------------------------------------------
// daemon function

#[cfg_attr(feature = "trace", tracing::instrument(skip(config)))]
pub async fn daemon(kubeconfig: Option<PathBuf>, config: Arc<Configuration>) -> Result<(), Error> {
    // -------------------------------------------------------------------------
    // Create a new kubernetes client from path if defined, or via the
    // environment or defaults locations
    let kube_client = client::try_new(kubeconfig).await.map_err(Error::Client)?;

    // -------------------------------------------------------------------------
    // Create the aws connector, credentials are resolved on first use
    let connector = Arc::new(Connector::from(config.aws.to_owned()));

    // -------------------------------------------------------------------------
    // Create context to give to each reconciler
    let context = Arc::new(Context::new(kube_client, connector.to_owned(), config.to_owned()));

    // -------------------------------------------------------------------------
    // Track running controllers for the readiness endpoint
    let kinds = registry::kinds();
    let health = Arc::new(Health::new(connector, kinds.iter().map(|kind| kind.name)));

    // -------------------------------------------------------------------------
    // Create reconcilers, one per kind
    let mut handles: Vec<JoinHandle<()>> = kinds
        .into_iter()
        .map(|kind| {
            let context = context.to_owned();
            let health = health.to_owned();

            tokio::spawn(async move {
                info!(kind = kind.name, "Start to listen for events of custom resource");
                health.started(kind.name);
                let result = (kind.watch)(context).await;
                health.stopped(kind.name);

                if let Err(err) = result {
                    error!(
                        kind = kind.name,
                        error = err.to_string(),
                        "Could not reconcile custom resource"
                    );
                }
            })
        })
        .collect();

    // -------------------------------------------------------------------------
    // Start http server
    let listen = config.operator.listen;
    let server = tokio::spawn(async move {
        if let Err(err) = http::server::serve(http::server::router(health), listen).await {
            error!(
                error = Error::Serve(listen, err).to_string(),
                "Could not serve http content"
            );
        }
    });

    handles.push(server);

    // -------------------------------------------------------------------------
    // Wait for termination signal
    tokio::signal::ctrl_c().await.map_err(Error::SigTerm)?;

    // -------------------------------------------------------------------------
    // Cancel reconcilers and the http server
    handles.iter().for_each(|handle| handle.abort());

    for handle in handles {
        if let Err(err) = handle.await {
            if !err.is_cancelled() {
                error!(
                    error = err.to_string(),
                    "Could not wait for the task to complete"
                );
            }
        }
    }

    Ok(())
}
