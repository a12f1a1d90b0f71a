//! # Store module
//!
//! This module provide the port used by reconcilers to read and write objects
//! from the kubernetes api and its implementation on top of [`kube::Client`]

use std::{collections::BTreeMap, fmt::Debug};

use async_trait::async_trait;
use k8s_openapi::{apimachinery::pkg::apis::meta::v1::OwnerReference, NamespaceResourceScope};
use kube::{
    api::{ListParams, Patch, PatchParams, PostParams},
    Api, Resource,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::svc::k8s::{
    recorder::{self, Level},
    resource, secret,
};

// -----------------------------------------------------------------------------
// Error enumeration

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to write resource '{0}/{1}', the object has been modified")]
    Conflict(String, String),
    #[error("failed to execute request on kubernetes api, {0}")]
    KubeClient(kube::Error),
    #[error("failed to serialize resource, {0}")]
    Serialize(serde_json::Error),
    #[error("failed to upsert secret, {0}")]
    Secret(secret::Error),
}

impl Error {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_, _))
    }

    fn from_kube(err: kube::Error, namespace: &str, name: &str) -> Self {
        match err {
            kube::Error::Api(ref response) if response.code == 409 => {
                Self::Conflict(namespace.to_string(), name.to_string())
            }
            err => Self::KubeClient(err),
        }
    }
}

impl From<kube::Error> for Error {
    fn from(err: kube::Error) -> Self {
        Self::KubeClient(err)
    }
}

// -----------------------------------------------------------------------------
// Object trait

/// namespaced kubernetes object that could be stored and retrieved
pub trait Object:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
}

impl<T> Object for T where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static
{
}

// -----------------------------------------------------------------------------
// SecretStore trait

/// access to secrets holding credentials and connection details
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// returns the decoded content of the secret, none if it does not exist
    async fn secret(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<BTreeMap<String, String>>, Error>;

    /// merge the given keys into the secret, creating it if needed
    async fn apply_secret(
        &self,
        namespace: &str,
        name: &str,
        data: BTreeMap<String, String>,
        owner: Option<OwnerReference>,
    ) -> Result<(), Error>;
}

// -----------------------------------------------------------------------------
// Store trait

#[async_trait]
pub trait Store: SecretStore {
    async fn get<T: Object>(&self, namespace: &str, name: &str) -> Result<Option<T>, Error>;

    /// returns objects of the namespace carrying all the given labels
    async fn list<T: Object>(
        &self,
        namespace: &str,
        labels: &BTreeMap<String, String>,
    ) -> Result<Vec<T>, Error>;

    /// replace metadata and spec of the object, the resource version is used
    /// for optimistic concurrency
    async fn update<T: Object>(&self, obj: &T) -> Result<T, Error>;

    /// replace the status sub-resource of the object
    async fn update_status<T: Object>(&self, obj: &T) -> Result<T, Error>;

    async fn record<T: Object>(
        &self,
        obj: &T,
        level: Level,
        action: &str,
        message: &str,
    ) -> Result<(), Error>;
}

// -----------------------------------------------------------------------------
// Implementation for kube::Client

#[async_trait]
impl SecretStore for kube::Client {
    async fn secret(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<BTreeMap<String, String>>, Error> {
        Ok(secret::get(self.to_owned(), namespace, name)
            .await?
            .as_ref()
            .map(secret::decode))
    }

    async fn apply_secret(
        &self,
        namespace: &str,
        name: &str,
        data: BTreeMap<String, String>,
        owner: Option<OwnerReference>,
    ) -> Result<(), Error> {
        secret::upsert(self.to_owned(), namespace, name, &data, owner)
            .await
            .map_err(Error::Secret)?;

        Ok(())
    }
}

#[async_trait]
impl Store for kube::Client {
    async fn get<T: Object>(&self, namespace: &str, name: &str) -> Result<Option<T>, Error> {
        Ok(Api::<T>::namespaced(self.to_owned(), namespace).get_opt(name).await?)
    }

    async fn list<T: Object>(
        &self,
        namespace: &str,
        labels: &BTreeMap<String, String>,
    ) -> Result<Vec<T>, Error> {
        let selector = labels
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",");

        let params = if selector.is_empty() {
            ListParams::default()
        } else {
            ListParams::default().labels(&selector)
        };

        Ok(Api::<T>::namespaced(self.to_owned(), namespace)
            .list(&params)
            .await?
            .items)
    }

    async fn update<T: Object>(&self, obj: &T) -> Result<T, Error> {
        let (namespace, name) = resource::namespaced_name(obj);

        debug!(
            kind = T::kind(&()).to_string(),
            namespace = &namespace,
            name = &name,
            "Execute replace request on resource"
        );

        Api::<T>::namespaced(self.to_owned(), &namespace)
            .replace(&name, &PostParams::default(), obj)
            .await
            .map_err(|err| Error::from_kube(err, &namespace, &name))
    }

    async fn update_status<T: Object>(&self, obj: &T) -> Result<T, Error> {
        let (namespace, name) = resource::namespaced_name(obj);
        let value = serde_json::to_value(obj).map_err(Error::Serialize)?;

        let patch = serde_json::json!({
            "metadata": { "resourceVersion": obj.meta().resource_version },
            "status": value.get("status"),
        });

        debug!(
            kind = T::kind(&()).to_string(),
            namespace = &namespace,
            name = &name,
            "Execute patch request on resource's status"
        );

        Api::<T>::namespaced(self.to_owned(), &namespace)
            .patch_status(&name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|err| Error::from_kube(err, &namespace, &name))
    }

    async fn record<T: Object>(
        &self,
        obj: &T,
        level: Level,
        action: &str,
        message: &str,
    ) -> Result<(), Error> {
        recorder::record(self.to_owned(), obj, &level, action, message).await?;
        Ok(())
    }
}
