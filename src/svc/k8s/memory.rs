//! # Memory module
//!
//! This module provide an in-memory [`Store`] mimicking the behaviour of the
//! kubernetes api server for reconcilers' tests

use std::{
    collections::{BTreeMap, HashMap},
    sync::{Mutex, PoisonError},
};

use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use serde_json::Value;

use crate::svc::k8s::{
    recorder::Level,
    resource,
    store::{Error, Object, SecretStore, Store},
};

type Key = (String, String, String);

#[derive(Default, Debug)]
struct Inner {
    objects: HashMap<Key, Value>,
    secrets: HashMap<(String, String), BTreeMap<String, String>>,
    owners: HashMap<(String, String), Vec<OwnerReference>>,
    events: Vec<(Level, String, String)>,
    version: u64,
    writes: usize,
}

#[derive(Default, Debug)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

fn key<T: Object>(namespace: &str, name: &str) -> Key {
    (
        format!("{}/{}", T::api_version(&()), T::kind(&())),
        namespace.to_string(),
        name.to_string(),
    )
}

impl MemoryStore {
    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// insert or overwrite the object as is, a uid is assigned if missing
    pub fn put<T: Object>(&self, mut obj: T) -> T {
        let mut inner = self.lock();
        let (namespace, name) = resource::namespaced_name(&obj);

        inner.version += 1;
        obj.meta_mut().resource_version = Some(inner.version.to_string());
        obj.meta_mut()
            .uid
            .get_or_insert_with(|| format!("uid-{namespace}-{name}"));

        let value = serde_json::to_value(&obj).expect("object to be serializable");
        inner.objects.insert(key::<T>(&namespace, &name), value);
        obj
    }

    pub fn object<T: Object>(&self, namespace: &str, name: &str) -> Option<T> {
        self.lock()
            .objects
            .get(&key::<T>(namespace, name))
            .map(|value| serde_json::from_value(value.to_owned()).expect("object to be deserializable"))
    }

    pub fn put_secret(&self, namespace: &str, name: &str, data: &[(&str, &str)]) {
        self.lock().secrets.insert(
            (namespace.to_string(), name.to_string()),
            data.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        );
    }

    pub fn secret_data(&self, namespace: &str, name: &str) -> Option<BTreeMap<String, String>> {
        self.lock()
            .secrets
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub fn secret_owners(&self, namespace: &str, name: &str) -> Vec<OwnerReference> {
        self.lock()
            .owners
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    pub fn events(&self) -> Vec<(Level, String, String)> {
        self.lock().events.to_owned()
    }

    /// returns the number of successful object writes, spec and status
    pub fn writes(&self) -> usize {
        self.lock().writes
    }

    fn check_version<T: Object>(inner: &Inner, obj: &T) -> Result<Key, Error> {
        let (namespace, name) = resource::namespaced_name(obj);
        let key = key::<T>(&namespace, &name);
        let stored = inner
            .objects
            .get(&key)
            .ok_or_else(|| Error::Conflict(namespace.to_owned(), name.to_owned()))?;

        let version = stored
            .pointer("/metadata/resourceVersion")
            .and_then(Value::as_str);

        match &obj.meta().resource_version {
            Some(expected) if Some(expected.as_str()) != version => {
                Err(Error::Conflict(namespace, name))
            }
            _ => Ok(key),
        }
    }
}

#[async_trait]
impl SecretStore for MemoryStore {
    async fn secret(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<BTreeMap<String, String>>, Error> {
        Ok(self.secret_data(namespace, name))
    }

    async fn apply_secret(
        &self,
        namespace: &str,
        name: &str,
        data: BTreeMap<String, String>,
        owner: Option<OwnerReference>,
    ) -> Result<(), Error> {
        let mut inner = self.lock();
        let id = (namespace.to_string(), name.to_string());

        inner.secrets.entry(id.to_owned()).or_default().extend(data);
        if let Some(owner) = owner {
            let owners = inner.owners.entry(id).or_default();
            if !owners.iter().any(|o| o.uid == owner.uid) {
                owners.push(owner);
            }
        }

        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get<T: Object>(&self, namespace: &str, name: &str) -> Result<Option<T>, Error> {
        self.lock()
            .objects
            .get(&key::<T>(namespace, name))
            .map(|value| serde_json::from_value(value.to_owned()).map_err(Error::Serialize))
            .transpose()
    }

    async fn list<T: Object>(
        &self,
        namespace: &str,
        labels: &BTreeMap<String, String>,
    ) -> Result<Vec<T>, Error> {
        let inner = self.lock();
        let kind = format!("{}/{}", T::api_version(&()), T::kind(&()));

        inner
            .objects
            .iter()
            .filter(|((k, ns, _), _)| *k == kind && ns == namespace)
            .map(|(_, value)| serde_json::from_value::<T>(value.to_owned()).map_err(Error::Serialize))
            .filter(|obj| {
                obj.as_ref().map_or(true, |obj| {
                    labels.iter().all(|(k, v)| {
                        obj.meta()
                            .labels
                            .as_ref()
                            .and_then(|labels| labels.get(k))
                            == Some(v)
                    })
                })
            })
            .collect()
    }

    async fn update<T: Object>(&self, obj: &T) -> Result<T, Error> {
        let mut inner = self.lock();
        let key = Self::check_version(&inner, obj)?;

        let mut value = serde_json::to_value(obj).map_err(Error::Serialize)?;
        let status = inner
            .objects
            .get(&key)
            .and_then(|stored| stored.get("status"))
            .cloned();

        if let Some(map) = value.as_object_mut() {
            match status {
                Some(status) => map.insert("status".to_string(), status),
                None => map.remove("status"),
            };
        }

        inner.version += 1;
        inner.writes += 1;
        value["metadata"]["resourceVersion"] = Value::String(inner.version.to_string());

        let updated: T = serde_json::from_value(value.to_owned()).map_err(Error::Serialize)?;
        let finalized = updated
            .meta()
            .finalizers
            .as_ref()
            .map_or(true, Vec::is_empty);

        if resource::deleted(&updated) && finalized {
            inner.objects.remove(&key);
        } else {
            inner.objects.insert(key, value);
        }

        Ok(updated)
    }

    async fn update_status<T: Object>(&self, obj: &T) -> Result<T, Error> {
        let mut inner = self.lock();
        let key = Self::check_version(&inner, obj)?;

        let status = serde_json::to_value(obj)
            .map_err(Error::Serialize)?
            .get("status")
            .cloned()
            .unwrap_or(Value::Null);

        inner.version += 1;
        inner.writes += 1;
        let version = inner.version.to_string();

        let stored = inner
            .objects
            .get_mut(&key)
            .ok_or_else(|| Error::Conflict(key.1.to_owned(), key.2.to_owned()))?;

        stored["status"] = status;
        stored["metadata"]["resourceVersion"] = Value::String(version);

        serde_json::from_value(stored.to_owned()).map_err(Error::Serialize)
    }

    async fn record<T: Object>(
        &self,
        _obj: &T,
        level: Level,
        action: &str,
        message: &str,
    ) -> Result<(), Error> {
        self.lock()
            .events
            .push((level, action.to_string(), message.to_string()));
        Ok(())
    }
}
