//! # Resource module
//!
//! This module provide helpers on kubernetes [`Resource`]

use std::fmt::Debug;

use k8s_openapi::{
    api::core::v1::ObjectReference, apimachinery::pkg::apis::meta::v1::OwnerReference,
    NamespaceResourceScope,
};
use kube::{
    api::{Patch, PatchParams},
    Api, Client, Resource, ResourceExt,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

// -----------------------------------------------------------------------------
// Constants

pub const ANNOTATION_EXTERNAL_NAME: &str = "crossplane.io/external-name";
pub const ANNOTATION_EXTERNAL_CREATE_PENDING: &str = "crossplane.io/external-create-pending";
pub const ANNOTATION_EXTERNAL_CREATE_SUCCEEDED: &str = "crossplane.io/external-create-succeeded";
pub const ANNOTATION_EXTERNAL_CREATE_FAILED: &str = "crossplane.io/external-create-failed";

// -----------------------------------------------------------------------------
// Helpers functions

/// returns if the resource is considered from kubernetes point of view as deleted
pub fn deleted<T>(obj: &T) -> bool
where
    T: Resource,
{
    obj.meta().deletion_timestamp.is_some()
}

/// returns the namespace and name of the kubernetes resource, the namespace
/// is empty for cluster scoped resources.
pub fn namespaced_name<T>(obj: &T) -> (String, String)
where
    T: ResourceExt,
{
    (obj.namespace().unwrap_or_default(), obj.name_any())
}

/// returns the value of the given annotation, an empty value is considered as
/// absent
pub fn annotation<'a, T>(obj: &'a T, key: &str) -> Option<&'a str>
where
    T: Resource,
{
    obj.meta()
        .annotations
        .as_ref()
        .and_then(|annotations| annotations.get(key))
        .map(String::as_str)
        .filter(|value| !value.is_empty())
}

/// set the given annotation and returns if the object has been modified
pub fn set_annotation<T>(obj: &mut T, key: &str, value: &str) -> bool
where
    T: Resource,
{
    let annotations = obj.meta_mut().annotations.get_or_insert_with(Default::default);
    if annotations.get(key).map(String::as_str) == Some(value) {
        return false;
    }

    annotations.insert(key.to_string(), value.to_string());
    true
}

/// returns the identifier of the cloud resource linked to the object
pub fn external_name<T>(obj: &T) -> Option<&str>
where
    T: Resource,
{
    annotation(obj, ANNOTATION_EXTERNAL_NAME)
}

pub fn set_external_name<T>(obj: &mut T, name: &str) -> bool
where
    T: Resource,
{
    set_annotation(obj, ANNOTATION_EXTERNAL_NAME, name)
}

/// returns differnce between the two given object serialize as json patch
pub fn diff<T>(origin: &T, modified: &T) -> Result<json_patch::Patch, serde_json::Error>
where
    T: Serialize,
{
    Ok(json_patch::diff(
        &serde_json::to_value(origin)?,
        &serde_json::to_value(modified)?,
    ))
}

/// make a patch request on the given resource using the given patch
pub async fn patch<T>(client: Client, obj: &T, patch: json_patch::Patch) -> Result<T, kube::Error>
where
    T: Resource<Scope = NamespaceResourceScope> + DeserializeOwned + Serialize + Clone + Debug,
    <T as Resource>::DynamicType: Default,
{
    let (namespace, name) = namespaced_name(obj);

    if patch.0.is_empty() {
        debug!(
            namespace = &namespace,
            name = &name,
            "Skip patch request on resource, no operation to apply"
        );
        return Ok(obj.to_owned());
    }

    debug!(
        namespace = &namespace,
        name = &name,
        operations = patch.0.len(),
        "Execute patch request on resource"
    );

    Api::namespaced(client, &namespace)
        .patch(&name, &PatchParams::default(), &Patch::Json::<T>(patch))
        .await
}

/// returns a owner references object pointing to the given resource, none if
/// the resource has not been persisted yet
pub fn owner_reference<T>(obj: &T) -> Option<OwnerReference>
where
    T: Resource<DynamicType = ()>,
{
    Some(OwnerReference {
        api_version: T::api_version(&()).to_string(),
        block_owner_deletion: Some(true),
        controller: Some(true),
        kind: T::kind(&()).to_string(),
        name: obj.meta().name.to_owned()?,
        uid: obj.meta().uid.to_owned()?,
    })
}

/// returns an object reference pointing to the given resource
pub fn object_reference<T>(obj: &T) -> ObjectReference
where
    T: Resource<DynamicType = ()>,
{
    obj.object_ref(&())
}
