//! # Custom resource definition module
//!
//! This module provide custom resource definition managed by the controller,
//! their structures and the types shared between them.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::svc::aws::docdb;

pub mod db_cluster;
pub mod db_cluster_parameter_group;
pub mod db_instance;
pub mod db_subnet_group;
pub mod ec2;

// -----------------------------------------------------------------------------
// Constants

pub const GROUP: &str = "docdb.aws.crossplane.io";
pub const VERSION: &str = "v1alpha1";

// -----------------------------------------------------------------------------
// Tag structure

#[derive(JsonSchema, Serialize, Deserialize, PartialEq, Eq, Clone, Debug, Default)]
pub struct Tag {
    #[serde(rename = "key")]
    pub key: String,
    #[serde(rename = "value")]
    pub value: String,
}

impl From<&Tag> for docdb::Tag {
    fn from(tag: &Tag) -> Self {
        Self {
            key: tag.key.to_owned(),
            value: tag.value.to_owned(),
        }
    }
}

impl From<&docdb::Tag> for Tag {
    fn from(tag: &docdb::Tag) -> Self {
        Self {
            key: tag.key.to_owned(),
            value: tag.value.to_owned(),
        }
    }
}

// -----------------------------------------------------------------------------
// Reference structures

/// points to another managed resource of the same namespace by name
#[derive(JsonSchema, Serialize, Deserialize, PartialEq, Eq, Clone, Debug, Default)]
pub struct Reference {
    #[serde(rename = "name")]
    pub name: String,
}

/// selects another managed resource of the same namespace by labels
#[derive(JsonSchema, Serialize, Deserialize, PartialEq, Eq, Clone, Debug, Default)]
pub struct Selector {
    #[serde(rename = "matchLabels", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub match_labels: BTreeMap<String, String>,
    /// restrict candidates to the objects controlled by the same controller
    #[serde(rename = "matchControllerRef", default, skip_serializing_if = "Option::is_none")]
    pub match_controller_ref: Option<bool>,
}

// -----------------------------------------------------------------------------
// Secret structures

#[derive(JsonSchema, Serialize, Deserialize, PartialEq, Eq, Clone, Debug, Default)]
pub struct SecretKeySelector {
    #[serde(rename = "name")]
    pub name: String,
    #[serde(rename = "namespace", default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(rename = "key")]
    pub key: String,
}

#[derive(JsonSchema, Serialize, Deserialize, PartialEq, Eq, Clone, Debug, Default)]
pub struct SecretReference {
    #[serde(rename = "name")]
    pub name: String,
    #[serde(rename = "namespace", default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

// -----------------------------------------------------------------------------
// ResourceSpec structure

#[derive(JsonSchema, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Debug, Default)]
pub enum DeletionPolicy {
    #[default]
    Delete,
    Orphan,
}

/// fields shared by the spec of every managed resource
#[derive(JsonSchema, Serialize, Deserialize, PartialEq, Eq, Clone, Debug, Default)]
pub struct ResourceSpec {
    #[serde(rename = "deletionPolicy", default)]
    pub deletion_policy: DeletionPolicy,
    #[serde(rename = "providerConfigRef", default, skip_serializing_if = "Option::is_none")]
    pub provider_config_ref: Option<Reference>,
    #[serde(
        rename = "writeConnectionSecretToRef",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub write_connection_secret_to_ref: Option<SecretReference>,
}

// -----------------------------------------------------------------------------
// Condition structure

#[derive(JsonSchema, Serialize, Deserialize, PartialEq, Eq, Clone, Debug, Default)]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(rename = "status")]
    pub status: String,
    #[serde(rename = "reason")]
    pub reason: String,
    #[serde(rename = "message", default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(rename = "lastTransitionTime")]
    pub last_transition_time: String,
}
