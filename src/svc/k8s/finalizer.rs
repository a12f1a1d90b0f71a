//! # Finalizer module
//!
//! This module provide helpers methods to interact with kubernetes' resource
//! finalizer

use kube::Resource;

// -----------------------------------------------------------------------------
// Constants

/// finalizer protecting the cloud resource of a managed resource
pub const MANAGED_RESOURCE: &str = "finalizer.managedresource.crossplane.io";

// -----------------------------------------------------------------------------
// Helpers functions

/// returns if there is the given finalizer on the resource
pub fn contains<T>(obj: &T, finalizer: &str) -> bool
where
    T: Resource,
{
    obj.meta()
        .finalizers
        .as_ref()
        .is_some_and(|finalizers| finalizers.iter().any(|f| finalizer == f))
}

/// add finalizer to the resource, returns if the resource has been modified
pub fn add<T>(obj: &mut T, finalizer: &str) -> bool
where
    T: Resource,
{
    if contains(obj, finalizer) {
        return false;
    }

    obj.meta_mut()
        .finalizers
        .get_or_insert_with(Vec::new)
        .push(finalizer.into());

    true
}

/// remove finalizer from the resource, returns if the resource has been
/// modified
pub fn remove<T>(obj: &mut T, finalizer: &str) -> bool
where
    T: Resource,
{
    if !contains(obj, finalizer) {
        return false;
    }

    if let Some(finalizers) = obj.meta_mut().finalizers.as_mut() {
        finalizers.retain(|f| f != finalizer);
    }

    true
}
