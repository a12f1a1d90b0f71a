//! # Reference module
//!
//! This module provide the resolution of fields sourced from the external
//! name of other managed resources of the same namespace

use kube::ResourceExt;
use tracing::debug;

use crate::svc::{
    crd::{Reference, Selector},
    k8s::{
        resource,
        store::{Object, Store},
    },
    managed::Error,
};

// -----------------------------------------------------------------------------
// Resolver structure

pub struct Resolver<'a, S: Store> {
    store: &'a S,
    namespace: String,
    /// uid of the controller of the object being resolved
    controller: Option<String>,
}

impl<'a, S: Store> Resolver<'a, S> {
    pub fn new(store: &'a S, namespace: impl Into<String>, controller: Option<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
            controller,
        }
    }

    /// returns the uid of the controller of the given object, if any
    pub fn controller_of<T: Object>(obj: &T) -> Option<String> {
        obj.owner_references()
            .iter()
            .find(|owner| owner.controller == Some(true))
            .map(|owner| owner.uid.to_owned())
    }

    async fn fetch<T: Object>(&self, field: &'static str, name: &str) -> Result<String, Error> {
        let obj: T = self
            .store
            .get(&self.namespace, name)
            .await?
            .ok_or_else(|| Error::Reference {
                field,
                reason: format!(
                    "referenced {} '{}/{}' does not exist",
                    T::kind(&()),
                    self.namespace,
                    name
                ),
            })?;

        resource::external_name(&obj)
            .map(ToString::to_string)
            .ok_or_else(|| Error::Reference {
                field,
                reason: format!(
                    "referenced {} '{}/{}' has no external name yet",
                    T::kind(&()),
                    self.namespace,
                    name
                ),
            })
    }

    /// returns candidates matching the selector which have an external name,
    /// sorted by name
    async fn select<T: Object>(&self, selector: &Selector) -> Result<Vec<(String, String)>, Error> {
        let mut candidates: Vec<(String, String)> = self
            .store
            .list::<T>(&self.namespace, &selector.match_labels)
            .await?
            .iter()
            .filter(|obj| {
                selector.match_controller_ref != Some(true)
                    || (self.controller.is_some() && Self::controller_of(*obj) == self.controller)
            })
            .filter_map(|obj| {
                resource::external_name(obj).map(|external| (obj.name_any(), external.to_string()))
            })
            .collect();

        candidates.sort();
        Ok(candidates)
    }

    /// fill the value from the reference or the selector if it is empty, the
    /// chosen object is pinned in the reference
    pub async fn resolve<T: Object>(
        &self,
        field: &'static str,
        value: &mut Option<String>,
        reference: &mut Option<Reference>,
        selector: Option<&Selector>,
    ) -> Result<(), Error> {
        if value.as_deref().is_some_and(|v| !v.is_empty()) {
            return Ok(());
        }

        if let Some(Reference { name }) = reference.as_ref() {
            *value = Some(self.fetch::<T>(field, name).await?);
            return Ok(());
        }

        let Some(selector) = selector else {
            return Ok(());
        };

        let (name, external) = self
            .select::<T>(selector)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Reference {
                field,
                reason: format!("no {} matches the selector", T::kind(&())),
            })?;

        debug!(
            kind = T::kind(&()).to_string(),
            namespace = &self.namespace,
            name = &name,
            field = field,
            "Selected referenced object"
        );

        *value = Some(external);
        *reference = Some(Reference { name });
        Ok(())
    }

    /// multi-valued version of [`Resolver::resolve`], references keep the
    /// order given by the user and selected objects are sorted by name
    pub async fn resolve_many<T: Object>(
        &self,
        field: &'static str,
        values: &mut Option<Vec<String>>,
        references: &mut Vec<Reference>,
        selector: Option<&Selector>,
    ) -> Result<(), Error> {
        if values.as_ref().is_some_and(|v| !v.is_empty()) {
            return Ok(());
        }

        if !references.is_empty() {
            let mut resolved = Vec::with_capacity(references.len());
            for Reference { name } in references.iter() {
                resolved.push(self.fetch::<T>(field, name).await?);
            }

            *values = Some(resolved);
            return Ok(());
        }

        let Some(selector) = selector else {
            return Ok(());
        };

        let candidates = self.select::<T>(selector).await?;
        if candidates.is_empty() {
            return Err(Error::Reference {
                field,
                reason: format!("no {} matches the selector", T::kind(&())),
            });
        }

        let (names, externals): (Vec<_>, Vec<_>) = candidates.into_iter().unzip();
        *values = Some(externals);
        *references = names.into_iter().map(|name| Reference { name }).collect();
        Ok(())
    }
}
