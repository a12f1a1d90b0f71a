//! # Connection module
//!
//! This module provide the publication of connection details into the secret
//! referenced by `writeConnectionSecretToRef`

use kube::ResourceExt;
use tracing::debug;

use crate::svc::{
    k8s::{resource, store::SecretStore},
    managed::{ConnectionDetails, Error, Managed},
};

// -----------------------------------------------------------------------------
// Constants

pub const ENDPOINT: &str = "endpoint";
pub const PORT: &str = "port";
pub const USERNAME: &str = "username";
pub const PASSWORD: &str = "password";
pub const READER_ENDPOINT: &str = "readerEndpoint";

// -----------------------------------------------------------------------------
// Helpers

/// merge connection details into the secret of the object, the secret is
/// owned by the object, nothing is done without a secret reference or details
pub async fn publish<T: Managed>(
    secrets: &dyn SecretStore,
    obj: &T,
    details: &ConnectionDetails,
) -> Result<bool, Error> {
    let Some(target) = &obj.resource().write_connection_secret_to_ref else {
        return Ok(false);
    };

    if details.is_empty() {
        return Ok(false);
    }

    let namespace = target
        .namespace
        .to_owned()
        .or_else(|| obj.namespace())
        .unwrap_or_default();

    debug!(
        kind = T::kind(&()).to_string(),
        namespace = &namespace,
        name = &target.name,
        keys = details.len(),
        "Publish connection details"
    );

    secrets
        .apply_secret(
            &namespace,
            &target.name,
            details.to_owned(),
            resource::owner_reference(obj),
        )
        .await?;

    Ok(true)
}
