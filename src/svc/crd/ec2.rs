//! # EC2 custom resources
//!
//! This module provide the network custom resources referenced by documentdb
//! resources. They are reconciled by another provider and only read here to
//! resolve identifiers from their external name.

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::svc::crd::ResourceSpec;

// -----------------------------------------------------------------------------
// SecurityGroup structure

#[derive(CustomResource, JsonSchema, Serialize, Deserialize, PartialEq, Clone, Debug, Default)]
#[kube(group = "ec2.aws.crossplane.io")]
#[kube(version = "v1beta1")]
#[kube(kind = "SecurityGroup")]
#[kube(singular = "securitygroup")]
#[kube(plural = "securitygroups")]
#[kube(namespaced)]
#[kube(derive = "PartialEq")]
pub struct SecurityGroupSpec {
    #[serde(flatten)]
    pub resource: ResourceSpec,
    #[serde(rename = "forProvider", default)]
    pub for_provider: BTreeMap<String, serde_json::Value>,
}

// -----------------------------------------------------------------------------
// Subnet structure

#[derive(CustomResource, JsonSchema, Serialize, Deserialize, PartialEq, Clone, Debug, Default)]
#[kube(group = "ec2.aws.crossplane.io")]
#[kube(version = "v1beta1")]
#[kube(kind = "Subnet")]
#[kube(singular = "subnet")]
#[kube(plural = "subnets")]
#[kube(namespaced)]
#[kube(derive = "PartialEq")]
pub struct SubnetSpec {
    #[serde(flatten)]
    pub resource: ResourceSpec,
    #[serde(rename = "forProvider", default)]
    pub for_provider: BTreeMap<String, serde_json::Value>,
}
