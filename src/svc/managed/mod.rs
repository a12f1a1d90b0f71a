//! # Managed resource module
//!
//! This module provide the generic engine reconciling a kubernetes object with
//! the cloud resource it represents. The engine is kind-agnostic, everything
//! specific to a kind goes through the hooks of the [`External`] trait.

use std::collections::BTreeMap;

use async_trait::async_trait;
use kube::CustomResourceExt;

use crate::svc::{
    aws::{self, docdb::DocDb},
    crd::{Condition, ResourceSpec, Tag},
    k8s::store::{Object, SecretStore, Store},
};

pub mod condition;
pub mod connection;
pub mod controller;
pub mod error;
pub mod initializer;
pub mod password;
pub mod reconciler;
pub mod reference;
pub mod registry;
pub mod tags;

pub use error::Error;

// -----------------------------------------------------------------------------
// Types

/// keys and values published in the connection secret
pub type ConnectionDetails = BTreeMap<String, String>;

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Observation {
    pub exists: bool,
    pub up_to_date: bool,
    /// human readable summary of the drift
    pub diff: String,
    pub connection: ConnectionDetails,
}

impl Observation {
    pub fn absent() -> Self {
        Self::default()
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Creation {
    pub connection: ConnectionDetails,
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Update {
    pub connection: ConnectionDetails,
}

/// collaborators available to hooks
#[derive(Clone, Copy)]
pub struct Hook<'a> {
    pub cloud: &'a dyn DocDb,
    pub secrets: &'a dyn SecretStore,
}

// -----------------------------------------------------------------------------
// Managed trait

/// accessors shared by every managed resource
pub trait Managed: Object + CustomResourceExt + PartialEq {
    fn resource(&self) -> &ResourceSpec;

    /// returns the aws region of the resource, the default one of the process
    /// is used if none
    fn region(&self) -> Option<&str>;

    fn tags(&self) -> &[Tag];

    fn tags_mut(&mut self) -> &mut Vec<Tag>;

    fn conditions(&self) -> &[Condition];

    fn conditions_mut(&mut self) -> &mut Vec<Condition>;
}

// -----------------------------------------------------------------------------
// External trait

/// hooks plugged into the reconciliation pipeline of a kind, each one
/// translates between the object and the request or response of the api call
/// made at that step
#[async_trait]
pub trait External: Managed {
    type DescribeInput: Default + Send + Sync;
    type DescribeOutput: Send + Sync;
    type CreateInput: Default + Send + Sync;
    type CreateOutput: Send + Sync;
    type UpdateInput: Default + Send + Sync;
    type UpdateOutput: Send + Sync;
    type DeleteInput: Default + Send + Sync;

    /// aws error codes meaning that the resource does not exist
    const NOT_FOUND: &'static [&'static str];

    async fn describe(
        cloud: &dyn DocDb,
        input: Self::DescribeInput,
    ) -> Result<Self::DescribeOutput, aws::Error>;

    async fn create(
        cloud: &dyn DocDb,
        input: Self::CreateInput,
    ) -> Result<Self::CreateOutput, aws::Error>;

    async fn update(
        cloud: &dyn DocDb,
        input: Self::UpdateInput,
    ) -> Result<Self::UpdateOutput, aws::Error>;

    async fn delete(cloud: &dyn DocDb, input: Self::DeleteInput) -> Result<(), aws::Error>;

    /// set the identifier of the describe request
    fn pre_observe(&self, input: &mut Self::DescribeInput) -> Result<(), Error>;

    /// keep only the record matching the external name
    fn filter_list(&self, output: Self::DescribeOutput) -> Self::DescribeOutput;

    fn is_empty(output: &Self::DescribeOutput) -> bool;

    /// fill unset optional fields of the spec from the observed record, fields
    /// set by the user are never overridden
    fn late_initialize(&mut self, output: &Self::DescribeOutput) -> Result<(), Error>;

    /// copy the observed record into the status
    fn generate_observation(&mut self, output: &Self::DescribeOutput);

    /// returns if the resource matches the spec and a summary of the drift
    async fn is_up_to_date(
        &self,
        hook: &Hook<'_>,
        output: &Self::DescribeOutput,
    ) -> Result<(bool, String), Error>;

    /// set the ready condition and the connection details
    async fn post_observe(
        &mut self,
        hook: &Hook<'_>,
        output: &Self::DescribeOutput,
        observation: Observation,
    ) -> Result<Observation, Error>;

    async fn pre_create(&self, hook: &Hook<'_>, input: &mut Self::CreateInput)
        -> Result<(), Error>;

    async fn post_create(
        &mut self,
        hook: &Hook<'_>,
        output: &Self::CreateOutput,
        creation: Creation,
    ) -> Result<Creation, Error>;

    async fn pre_update(&self, hook: &Hook<'_>, input: &mut Self::UpdateInput)
        -> Result<(), Error>;

    async fn post_update(
        &mut self,
        hook: &Hook<'_>,
        output: &Self::UpdateOutput,
        update: Update,
    ) -> Result<Update, Error>;

    /// set the identifier of the delete request, returns true to skip the call
    fn pre_delete(&self, input: &mut Self::DeleteInput) -> Result<bool, Error>;

    /// fill reference-bearing fields from the referenced objects
    async fn resolve_references<S: Store>(
        &mut self,
        resolver: &reference::Resolver<'_, S>,
    ) -> Result<(), Error>;
}

// -----------------------------------------------------------------------------
// Late initialization helpers

/// set the field to the observed value if it is unset
pub fn late_init<T: Clone>(field: &mut Option<T>, observed: Option<&T>) {
    if field.is_none() {
        *field = observed.cloned();
    }
}

/// set the list to the observed values if it is unset and the cloud reports
/// some values, an explicit empty list is kept
pub fn late_init_list<T: Clone>(field: &mut Option<Vec<T>>, observed: &[T]) {
    if field.is_none() && !observed.is_empty() {
        *field = Some(observed.to_vec());
    }
}

/// records the field in the diff if the user declared a value that differs
/// from the observed one
pub fn drift<T: PartialEq + std::fmt::Debug>(
    diff: &mut Vec<String>,
    field: &str,
    desired: Option<&T>,
    observed: Option<&T>,
) {
    if let Some(desired) = desired {
        if Some(desired) != observed {
            diff.push(format!("{field}: {observed:?} -> {desired:?}"));
        }
    }
}

/// returns if two lists hold the same values whatever their order
pub fn same_set(a: &[String], b: &[String]) -> bool {
    let mut a: Vec<_> = a.iter().collect();
    let mut b: Vec<_> = b.iter().collect();

    a.sort();
    a.dedup();
    b.sort();
    b.dedup();
    a == b
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn late_init_never_overrides_user_values() {
        let mut port = Some(27018);
        late_init(&mut port, Some(&27017));
        assert_eq!(port, Some(27018));

        let mut window = None;
        late_init(&mut window, Some(&"sun:08:00-sun:08:30".to_string()));
        assert_eq!(window.as_deref(), Some("sun:08:00-sun:08:30"));
    }

    #[test]
    fn late_init_list_keeps_an_explicit_empty_list() {
        let observed = vec!["sg-1".to_string()];

        let mut explicit: Option<Vec<String>> = Some(vec![]);
        late_init_list(&mut explicit, &observed);
        assert_eq!(explicit, Some(vec![]));

        let mut unset: Option<Vec<String>> = None;
        late_init_list(&mut unset, &observed);
        assert_eq!(unset, Some(observed));
    }

    #[test]
    fn same_set_ignores_order() {
        let a = vec!["profiler".to_string(), "audit".to_string()];
        let b = vec!["audit".to_string(), "profiler".to_string()];

        assert!(same_set(&a, &b));
        assert!(!same_set(&a, &b[..1]));
    }

    proptest! {
        #[test]
        fn late_init_is_idempotent(
            field in proptest::option::of(0u16..1024),
            observed in proptest::option::of(0u16..1024),
            list in proptest::option::of(proptest::collection::vec("[a-z]{1,4}", 0..4)),
            observed_list in proptest::collection::vec("[a-z]{1,4}", 0..4),
        ) {
            let (mut field, mut list) = (field, list);
            late_init(&mut field, observed.as_ref());
            late_init_list(&mut list, &observed_list);

            let (once, list_once) = (field, list.to_owned());
            late_init(&mut field, observed.as_ref());
            late_init_list(&mut list, &observed_list);

            prop_assert_eq!(field, once);
            prop_assert_eq!(list, list_once);
        }
    }
}
