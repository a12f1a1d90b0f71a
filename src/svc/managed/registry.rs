//! # Registry module
//!
//! This module provide the static table of managed resource kinds served by
//! the provider

use std::sync::Arc;

use futures::future::BoxFuture;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;

use crate::svc::{
    crd::{
        db_cluster::DbCluster, db_cluster_parameter_group::DbClusterParameterGroup,
        db_instance::DbInstance, db_subnet_group::DbSubnetGroup,
    },
    k8s::{Context, Watcher},
    managed::{
        controller::{Reconciler, ReconcilerError},
        External,
    },
};

// -----------------------------------------------------------------------------
// Kind structure

/// a managed resource kind, its definition and the way to watch it
#[derive(Clone, Copy)]
pub struct Kind {
    /// name used on the command line
    pub name: &'static str,
    pub crd: fn() -> CustomResourceDefinition,
    pub watch: fn(Arc<Context>) -> BoxFuture<'static, Result<(), ReconcilerError>>,
}

fn watch<T: External>(ctx: Arc<Context>) -> BoxFuture<'static, Result<(), ReconcilerError>> {
    Box::pin(async move {
        let reconciler = Reconciler::<T>::default();
        Watcher::<T>::watch(&reconciler, ctx).await
    })
}

fn kind<T: External>(name: &'static str) -> Kind {
    Kind {
        name,
        crd: T::crd,
        watch: watch::<T>,
    }
}

/// returns every kind served by the provider
pub fn kinds() -> [Kind; 4] {
    [
        kind::<DbClusterParameterGroup>("cluster-parameter-group"),
        kind::<DbSubnetGroup>("subnet-group"),
        kind::<DbCluster>("cluster"),
        kind::<DbInstance>("instance"),
    ]
}

/// returns the quoted names of every kind, comma separated
pub fn names() -> String {
    kinds()
        .iter()
        .map(|kind| format!("'{}'", kind.name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// returns the kind with the given name, case is ignored
pub fn find(name: &str) -> Option<Kind> {
    kinds()
        .into_iter()
        .find(|kind| kind.name.eq_ignore_ascii_case(name))
}
