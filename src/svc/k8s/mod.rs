//! # Kubernetes module
//!
//! This module provide kubernetes plumbing, the shared reconciliation context
//! and the traits used to build a controller for a custom resource

use std::{error::Error, fmt::Debug, sync::Arc, time::Duration};

#[cfg(feature = "metrics")]
use std::sync::LazyLock;

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use kube::{
    runtime::{
        controller::{self, Action},
        watcher, Controller,
    },
    CustomResourceExt, Resource,
};
#[cfg(feature = "metrics")]
use prometheus::{opts, register_counter_vec, CounterVec};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, trace};
#[cfg(feature = "trace")]
use tracing::Instrument;

use crate::svc::{aws::client::Connector, cfg::Configuration, k8s::backoff::Backoff};

pub mod backoff;
pub mod client;
pub mod finalizer;
#[cfg(test)]
pub mod memory;
pub mod recorder;
pub mod resource;
pub mod secret;
pub mod store;

// -----------------------------------------------------------------------------
// Constants

pub const RECONCILIATION_UPSERT_EVENT: &str = "upsert";
pub const RECONCILIATION_DELETE_EVENT: &str = "delete";

// -----------------------------------------------------------------------------
// Telemetry

#[cfg(feature = "metrics")]
static RECONCILIATION_SUCCESS: LazyLock<CounterVec> = LazyLock::new(|| {
    register_counter_vec!(
        opts!(
            "kubernetes_operator_reconciliation_success",
            "number of successful reconciliation"
        ),
        &["kind"]
    )
    .expect("metrics 'kubernetes_operator_reconciliation_success' to not be already initialized")
});

#[cfg(feature = "metrics")]
static RECONCILIATION_FAILED: LazyLock<CounterVec> = LazyLock::new(|| {
    register_counter_vec!(
        opts!(
            "kubernetes_operator_reconciliation_failed",
            "number of failed reconciliation"
        ),
        &["kind"]
    )
    .expect("metrics 'kubernetes_operator_reconciliation_failed' to not be already initialized")
});

#[cfg(feature = "metrics")]
static RECONCILIATION_EVENT: LazyLock<CounterVec> = LazyLock::new(|| {
    register_counter_vec!(
        opts!(
            "kubernetes_operator_reconciliation_event",
            "number of upsert and delete events"
        ),
        &["kind", "namespace", "event"]
    )
    .expect("metrics 'kubernetes_operator_reconciliation_event' to not be already initialized")
});

#[cfg(feature = "metrics")]
static RECONCILIATION_DURATION: LazyLock<CounterVec> = LazyLock::new(|| {
    register_counter_vec!(
        opts!(
            "kubernetes_operator_reconciliation_duration",
            "duration of reconciliation"
        ),
        &["kind", "unit"]
    )
    .expect("metrics 'kubernetes_operator_reconciliation_duration' to not be already initialized")
});

// -----------------------------------------------------------------------------
// Context structure

/// contains clients to interact with kubernetes and aws apis, shared by every
/// controller of the process
#[derive(Clone)]
pub struct Context {
    pub kube: kube::Client,
    pub connector: Arc<Connector>,
    pub config: Arc<Configuration>,
    pub backoff: Arc<Backoff>,
}

impl Context {
    pub fn new(kube: kube::Client, connector: Arc<Connector>, config: Arc<Configuration>) -> Self {
        let backoff = Arc::new(Backoff::from(&config.operator.backoff));

        Self {
            kube,
            connector,
            config,
            backoff,
        }
    }
}

// -----------------------------------------------------------------------------
// ControllerBuilder trait

/// provides a common way to create a kubernetes controller [`Controller<T>`]
pub trait ControllerBuilder<T>
where
    T: Resource<DynamicType = ()> + Clone + Debug,
{
    /// returns a new created kubernetes controller
    fn build(&self, ctx: Arc<Context>) -> Controller<T>;
}

// -----------------------------------------------------------------------------
// Reconciler trait

/// provides the methods given to a kubernetes controller [`Controller<T>`]
#[async_trait]
pub trait Reconciler<T>
where
    T: Resource<DynamicType = ()> + CustomResourceExt + Debug + Clone + Send + Sync + 'static,
{
    type Error: Error + Send + Sync;

    /// create or update the object, this is part of the the reconcile function
    async fn upsert(ctx: Arc<Context>, obj: Arc<T>) -> Result<Action, Self::Error>;

    /// delete the object from kubernetes and third parts
    async fn delete(ctx: Arc<Context>, obj: Arc<T>) -> Result<Action, Self::Error>;

    /// returns a [`Action`] to perform following the given error
    fn retry(_obj: Arc<T>, err: &Self::Error, _ctx: Arc<Context>) -> Action {
        trace!(
            duration = 500,
            error = err.to_string(),
            "Requeue failed reconciliation"
        );

        Action::requeue(Duration::from_millis(500))
    }

    /// process the object and perform actions on kubernetes and/or aws api
    /// returns a [`Action`] to maybe perform another reconciliation or an
    /// error, if something gets wrong.
    async fn reconcile(obj: Arc<T>, ctx: Arc<Context>) -> Result<Action, Self::Error> {
        let (namespace, name) = resource::namespaced_name(&*obj);
        let kind = T::kind(&()).to_string();

        if resource::deleted(&*obj) {
            info!(
                kind = &kind,
                namespace = &namespace,
                name = &name,
                "Received deletion event for custom resource",
            );

            #[cfg(feature = "metrics")]
            RECONCILIATION_EVENT
                .with_label_values(&[&kind, &namespace, RECONCILIATION_DELETE_EVENT])
                .inc();

            #[cfg(not(feature = "trace"))]
            let result = Self::delete(ctx, obj.to_owned()).await;
            #[cfg(feature = "trace")]
            let result = Self::delete(ctx, obj.to_owned())
                .instrument(tracing::info_span!("Reconciler::delete"))
                .await;

            if let Err(err) = &result {
                error!(
                    kind = &kind,
                    namespace = &namespace,
                    name = &name,
                    error = err.to_string(),
                    "Failed to delete custom resource",
                );
            }

            return result;
        }

        info!(
            kind = &kind,
            namespace = &namespace,
            name = &name,
            "Received upsertion event for custom resource",
        );

        #[cfg(feature = "metrics")]
        RECONCILIATION_EVENT
            .with_label_values(&[&kind, &namespace, RECONCILIATION_UPSERT_EVENT])
            .inc();

        #[cfg(not(feature = "trace"))]
        let result = Self::upsert(ctx, obj.to_owned()).await;
        #[cfg(feature = "trace")]
        let result = Self::upsert(ctx, obj.to_owned())
            .instrument(tracing::info_span!("Reconciler::upsert"))
            .await;

        if let Err(err) = &result {
            error!(
                kind = &kind,
                namespace = &namespace,
                name = &name,
                error = err.to_string(),
                "Failed to upsert custom resource",
            );
        }

        result
    }
}

// -----------------------------------------------------------------------------
// WatcherError trait

/// group other trait needed to provide a default implementation for
/// [`Watcher<T>`] trait
pub trait WatcherError:
    From<kube::Error> + From<controller::Error<Self, watcher::Error>> + Error
where
    Self: 'static,
{
}

/// Blanket implementation of [`WatcherError`]
impl<T> WatcherError for T
where
    T: From<kube::Error> + From<controller::Error<Self, watcher::Error>> + Error,
    Self: 'static,
{
}

// -----------------------------------------------------------------------------
// Watcher trait

/// provides a watch method that listen to events of kubernetes custom resource
/// using a [`Controller<T>`]
#[async_trait]
pub trait Watcher<T>: ControllerBuilder<T> + Reconciler<T>
where
    T: Resource<DynamicType = ()>
        + serde::de::DeserializeOwned
        + CustomResourceExt
        + Clone
        + Debug
        + Send
        + Sync
        + 'static,
    Self: Send + Sync + 'static,
    <Self as Reconciler<T>>::Error: WatcherError + Send + Sync,
{
    type Error: WatcherError + Send + Sync;

    /// listen for events of the custom resource as generic parameter
    async fn watch(&self, ctx: Arc<Context>) -> Result<(), <Self as Watcher<T>>::Error> {
        let kind = T::kind(&()).to_string();
        let mut stream = self
            .build(ctx.to_owned())
            .run(Self::reconcile, Self::retry, ctx.to_owned())
            .boxed();

        loop {
            let instant = Instant::now();

            match stream.try_next().await {
                Ok(None) => {
                    debug!(kind = &kind, "We have reached the end of the watch stream");
                    return Ok(());
                }
                Ok(Some((obj, _action))) => {
                    info!(
                        kind = &kind,
                        namespace = &obj.namespace,
                        name = &obj.name,
                        "Successfully reconcile resource",
                    );

                    #[cfg(feature = "metrics")]
                    RECONCILIATION_SUCCESS.with_label_values(&[&kind]).inc();
                }
                Err(controller::Error::ObjectNotFound(obj_ref)) => {
                    ctx.backoff.reset(&backoff::key(
                        &kind,
                        obj_ref.namespace.as_deref().unwrap_or_default(),
                        &obj_ref.name,
                    ));

                    debug!(
                        kind = &kind,
                        namespace = &obj_ref.namespace,
                        name = &obj_ref.name,
                        "Received an event about an already deleted resource",
                    );

                    #[cfg(feature = "metrics")]
                    RECONCILIATION_SUCCESS.with_label_values(&[&kind]).inc();
                }
                Err(err) => {
                    error!(
                        kind = &kind,
                        error = err.to_string(),
                        "Failed to reconcile resource",
                    );

                    #[cfg(feature = "metrics")]
                    RECONCILIATION_FAILED.with_label_values(&[&kind]).inc();
                }
            }

            #[cfg(feature = "metrics")]
            RECONCILIATION_DURATION
                .with_label_values(&[&kind, "us"])
                .inc_by(Instant::now().duration_since(instant).as_micros() as f64);

            sleep_until(instant + Duration::from_millis(100)).await;
        }
    }
}

/// Blanket implementation for [`Watcher<T>`]
impl<T, U> Watcher<T> for U
where
    T: Resource<DynamicType = ()>
        + serde::de::DeserializeOwned
        + CustomResourceExt
        + Clone
        + Debug
        + Send
        + Sync
        + 'static,
    U: Reconciler<T> + ControllerBuilder<T>,
    U::Error: WatcherError + Send + Sync,
    Self: Send + Sync + 'static,
{
    type Error = U::Error;
}
