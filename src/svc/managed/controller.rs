//! # Controller module
//!
//! This module provide the glue between the kubernetes controller runtime and
//! the managed resource pipeline, one controller is spawned per kind

use std::{marker::PhantomData, sync::Arc, time::Duration};

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::{
    runtime::{
        controller::{self, Action},
        watcher, Controller,
    },
    Api,
};
use tracing::{debug, warn};

use crate::svc::{
    k8s::{self, backoff, resource, Context, ControllerBuilder},
    managed::{
        self,
        error::Class,
        reconciler::{Options, Outcome, Pipeline},
        External,
    },
};

// -----------------------------------------------------------------------------
// ReconcilerError enum

#[derive(thiserror::Error, Debug)]
pub enum ReconcilerError {
    #[error("failed to reconcile resource, {0}")]
    Reconcile(String),
    #[error("failed to reconcile managed resource, {0}")]
    Managed(managed::Error),
    #[error("failed to execute request on kubernetes api, {0}")]
    KubeClient(kube::Error),
}

impl From<managed::Error> for ReconcilerError {
    fn from(err: managed::Error) -> Self {
        Self::Managed(err)
    }
}

impl From<kube::Error> for ReconcilerError {
    fn from(err: kube::Error) -> Self {
        Self::KubeClient(err)
    }
}

impl From<controller::Error<Self, watcher::Error>> for ReconcilerError {
    fn from(err: controller::Error<ReconcilerError, watcher::Error>) -> Self {
        Self::Reconcile(err.to_string())
    }
}

impl ReconcilerError {
    pub fn class(&self) -> Class {
        match self {
            Self::Managed(err) => err.class(),
            Self::Reconcile(_) | Self::KubeClient(_) => Class::Transient,
        }
    }
}

// -----------------------------------------------------------------------------
// Helpers

fn key<T: External>(obj: &T) -> String {
    let (namespace, name) = resource::namespaced_name(obj);
    backoff::key(&T::kind(&()), &namespace, &name)
}

fn options(ctx: &Context) -> Options {
    Options {
        poll_interval: ctx.config.operator.poll_interval(),
        provider_config: ctx.config.operator.provider_config.to_owned(),
    }
}

/// maps the outcome of the pipeline to the action of the controller runtime
pub fn action(outcome: Outcome) -> Action {
    match outcome {
        Outcome::Done => Action::await_change(),
        Outcome::Requeue => Action::requeue(Duration::ZERO),
        Outcome::RequeueAfter(delay) => Action::requeue(delay),
    }
}

/// runs the pipeline on the object bounded by the reconcile timeout
async fn run<T: External>(ctx: &Context, obj: &T) -> Result<Action, ReconcilerError> {
    let (namespace, name) = resource::namespaced_name(obj);
    let options = options(ctx);
    let timeout = ctx.config.operator.reconcile_timeout();
    let pipeline = Pipeline::new(&ctx.kube, ctx.connector.as_ref(), &options);

    let outcome = tokio::time::timeout(timeout, pipeline.reconcile::<T>(&namespace, &name))
        .await
        .map_err(|_| managed::Error::Timeout(timeout))??;

    ctx.backoff.reset(&key(obj));
    Ok(action(outcome))
}

// -----------------------------------------------------------------------------
// Reconciler structure

/// reconciler of a managed resource kind
pub struct Reconciler<T> {
    kind: PhantomData<fn() -> T>,
}

impl<T> Default for Reconciler<T> {
    fn default() -> Self {
        Self { kind: PhantomData }
    }
}

impl<T: External> ControllerBuilder<T> for Reconciler<T> {
    fn build(&self, ctx: Arc<Context>) -> Controller<T> {
        let config = watcher::Config::default();
        let concurrency = ctx.config.operator.max_concurrent_reconciles;

        Controller::new(Api::<T>::all(ctx.kube.to_owned()), config.to_owned())
            .owns(Api::<Secret>::all(ctx.kube.to_owned()), config)
            .with_config(controller::Config::default().concurrency(concurrency))
    }
}

#[async_trait]
impl<T: External> k8s::Reconciler<T> for Reconciler<T> {
    type Error = ReconcilerError;

    async fn upsert(ctx: Arc<Context>, obj: Arc<T>) -> Result<Action, ReconcilerError> {
        run(&ctx, &*obj).await
    }

    async fn delete(ctx: Arc<Context>, obj: Arc<T>) -> Result<Action, ReconcilerError> {
        run(&ctx, &*obj).await
    }

    fn retry(obj: Arc<T>, err: &ReconcilerError, ctx: Arc<Context>) -> Action {
        let key = key(&*obj);
        let delay = match err.class() {
            Class::Conflict => Duration::ZERO,
            Class::Transient | Class::NotFound => ctx.backoff.next(&key),
            Class::Permanent => ctx.config.operator.poll_interval(),
        };

        if err.class() == Class::Conflict {
            debug!(
                key = &key,
                error = err.to_string(),
                "Object has been modified concurrently, retry on fresh data"
            );
        } else {
            warn!(
                key = &key,
                delay = delay.as_secs(),
                error = err.to_string(),
                "Requeue failed reconciliation"
            );
        }

        Action::requeue(delay)
    }
}
