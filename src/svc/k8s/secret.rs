//! # Secret module
//!
//! This module provide helpers to read and write the secrets holding
//! credentials and connection details of managed resources

use std::collections::BTreeMap;

use k8s_openapi::{
    api::core::v1::Secret, apimachinery::pkg::apis::meta::v1::OwnerReference, ByteString,
};
use kube::{
    api::{ObjectMeta, PostParams},
    Api, Client,
};
use tracing::debug;

use crate::svc::k8s::resource;

// -----------------------------------------------------------------------------
// Error enumeration

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to execute request on kubernetes api, {0}")]
    KubeClient(kube::Error),
    #[error("failed to compute diff between the original and modified secret, {0}")]
    Diff(serde_json::Error),
}

impl From<kube::Error> for Error {
    fn from(err: kube::Error) -> Self {
        Self::KubeClient(err)
    }
}

// -----------------------------------------------------------------------------
// Helpers functions

/// returns the content of the secret as utf-8 strings, keys of `stringData`
/// take precedence over `data` ones
pub fn decode(secret: &Secret) -> BTreeMap<String, String> {
    let mut values: BTreeMap<String, String> = secret
        .data
        .iter()
        .flatten()
        .map(|(k, v)| (k.to_owned(), String::from_utf8_lossy(&v.0).to_string()))
        .collect();

    values.extend(secret.string_data.iter().flatten().map(|(k, v)| (k.to_owned(), v.to_owned())));
    values
}

pub fn new(
    namespace: &str,
    name: &str,
    data: &BTreeMap<String, String>,
    owner: Option<OwnerReference>,
) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            owner_references: owner.map(|owner| vec![owner]),
            ..Default::default()
        },
        data: Some(encode(data)),
        ..Default::default()
    }
}

fn encode(data: &BTreeMap<String, String>) -> BTreeMap<String, ByteString> {
    data.iter()
        .map(|(k, v)| (k.to_owned(), ByteString(v.as_bytes().to_vec())))
        .collect()
}

pub async fn get(client: Client, namespace: &str, name: &str) -> Result<Option<Secret>, kube::Error> {
    debug!(
        kind = "Secret",
        namespace = namespace,
        name = name,
        "Execute a request to retrieve secret"
    );

    Api::<Secret>::namespaced(client, namespace).get_opt(name).await
}

/// merge the given keys into the secret, creating it if it does not exist
pub async fn upsert(
    client: Client,
    namespace: &str,
    name: &str,
    data: &BTreeMap<String, String>,
    owner: Option<OwnerReference>,
) -> Result<Secret, Error> {
    let Some(origin) = get(client.to_owned(), namespace, name).await? else {
        debug!(
            kind = "Secret",
            namespace = namespace,
            name = name,
            "Execute a request to create secret"
        );

        return Ok(Api::<Secret>::namespaced(client, namespace)
            .create(&PostParams::default(), &new(namespace, name, data, owner))
            .await?);
    };

    let mut modified = origin.to_owned();
    modified
        .data
        .get_or_insert_with(BTreeMap::new)
        .extend(encode(data));

    if let Some(owner) = owner {
        let owners = modified.metadata.owner_references.get_or_insert_with(Vec::new);
        if !owners.iter().any(|o| o.uid == owner.uid) {
            owners.push(owner);
        }
    }

    let patch = resource::diff(&origin, &modified).map_err(Error::Diff)?;
    Ok(resource::patch(client, &modified, patch).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_data_takes_precedence() {
        let mut secret = new(
            "default",
            "pw",
            &BTreeMap::from([("p".to_string(), "old".to_string())]),
            None,
        );

        secret.string_data = Some(BTreeMap::from([("p".to_string(), "new".to_string())]));

        assert_eq!(decode(&secret).get("p").map(String::as_str), Some("new"));
    }
}
