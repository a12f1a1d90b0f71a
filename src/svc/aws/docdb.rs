//! # DocumentDB module
//!
//! This module provide the port used by reconcilers to interact with the aws
//! documentdb api and the request and response structures it exposes

use async_trait::async_trait;

use crate::svc::aws::Error;

// -----------------------------------------------------------------------------
// Shared structures

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl From<(&str, &str)> for Tag {
    fn from((key, value): (&str, &str)) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Endpoint {
    pub address: Option<String>,
    pub port: Option<i32>,
    pub hosted_zone_id: Option<String>,
}

/// log types to enable and to disable on a cluster
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct CloudwatchLogsExportConfiguration {
    pub enable_log_types: Vec<String>,
    pub disable_log_types: Vec<String>,
}

// -----------------------------------------------------------------------------
// Cluster structures

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct DbCluster {
    pub db_cluster_identifier: Option<String>,
    pub db_cluster_arn: Option<String>,
    pub db_cluster_resource_id: Option<String>,
    pub status: Option<String>,
    pub availability_zones: Vec<String>,
    pub backup_retention_period: Option<i32>,
    pub db_cluster_parameter_group: Option<String>,
    pub db_subnet_group: Option<String>,
    pub deletion_protection: Option<bool>,
    pub enabled_cloudwatch_logs_exports: Vec<String>,
    pub endpoint: Option<String>,
    pub reader_endpoint: Option<String>,
    pub hosted_zone_id: Option<String>,
    pub engine: Option<String>,
    pub engine_version: Option<String>,
    pub kms_key_id: Option<String>,
    pub master_username: Option<String>,
    pub port: Option<i32>,
    pub preferred_backup_window: Option<String>,
    pub preferred_maintenance_window: Option<String>,
    pub storage_encrypted: Option<bool>,
    pub vpc_security_group_ids: Vec<String>,
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct DescribeDbClustersInput {
    pub db_cluster_identifier: Option<String>,
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct DescribeDbClustersOutput {
    pub db_clusters: Vec<DbCluster>,
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct CreateDbClusterInput {
    pub db_cluster_identifier: Option<String>,
    pub availability_zones: Option<Vec<String>>,
    pub backup_retention_period: Option<i32>,
    pub db_cluster_parameter_group_name: Option<String>,
    pub db_subnet_group_name: Option<String>,
    pub deletion_protection: Option<bool>,
    pub enable_cloudwatch_logs_exports: Option<Vec<String>>,
    pub engine: Option<String>,
    pub engine_version: Option<String>,
    pub kms_key_id: Option<String>,
    pub master_username: Option<String>,
    pub master_user_password: Option<String>,
    pub port: Option<i32>,
    pub preferred_backup_window: Option<String>,
    pub preferred_maintenance_window: Option<String>,
    pub storage_encrypted: Option<bool>,
    pub tags: Vec<Tag>,
    pub vpc_security_group_ids: Option<Vec<String>>,
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct CreateDbClusterOutput {
    pub db_cluster: Option<DbCluster>,
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct ModifyDbClusterInput {
    pub db_cluster_identifier: Option<String>,
    pub apply_immediately: Option<bool>,
    pub backup_retention_period: Option<i32>,
    pub cloudwatch_logs_export_configuration: Option<CloudwatchLogsExportConfiguration>,
    pub db_cluster_parameter_group_name: Option<String>,
    pub deletion_protection: Option<bool>,
    pub engine_version: Option<String>,
    pub master_user_password: Option<String>,
    pub port: Option<i32>,
    pub preferred_backup_window: Option<String>,
    pub preferred_maintenance_window: Option<String>,
    pub vpc_security_group_ids: Option<Vec<String>>,
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct ModifyDbClusterOutput {
    pub db_cluster: Option<DbCluster>,
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct DeleteDbClusterInput {
    pub db_cluster_identifier: Option<String>,
    pub final_db_snapshot_identifier: Option<String>,
    pub skip_final_snapshot: Option<bool>,
}

// -----------------------------------------------------------------------------
// Cluster parameter group structures

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct DbClusterParameterGroup {
    pub db_cluster_parameter_group_name: Option<String>,
    pub db_cluster_parameter_group_arn: Option<String>,
    pub db_parameter_group_family: Option<String>,
    pub description: Option<String>,
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Parameter {
    pub parameter_name: Option<String>,
    pub parameter_value: Option<String>,
    pub apply_method: Option<String>,
    pub apply_type: Option<String>,
    pub allowed_values: Option<String>,
    pub data_type: Option<String>,
    pub description: Option<String>,
    pub is_modifiable: Option<bool>,
    pub minimum_engine_version: Option<String>,
    pub source: Option<String>,
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct DescribeDbClusterParameterGroupsInput {
    pub db_cluster_parameter_group_name: Option<String>,
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct DescribeDbClusterParameterGroupsOutput {
    pub db_cluster_parameter_groups: Vec<DbClusterParameterGroup>,
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct DescribeDbClusterParametersInput {
    pub db_cluster_parameter_group_name: Option<String>,
    pub source: Option<String>,
    pub marker: Option<String>,
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct DescribeDbClusterParametersOutput {
    pub parameters: Vec<Parameter>,
    pub marker: Option<String>,
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct CreateDbClusterParameterGroupInput {
    pub db_cluster_parameter_group_name: Option<String>,
    pub db_parameter_group_family: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<Tag>,
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct CreateDbClusterParameterGroupOutput {
    pub db_cluster_parameter_group: Option<DbClusterParameterGroup>,
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct ModifyDbClusterParameterGroupInput {
    pub db_cluster_parameter_group_name: Option<String>,
    pub parameters: Vec<Parameter>,
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct ModifyDbClusterParameterGroupOutput {
    pub db_cluster_parameter_group_name: Option<String>,
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct DeleteDbClusterParameterGroupInput {
    pub db_cluster_parameter_group_name: Option<String>,
}

// -----------------------------------------------------------------------------
// Subnet group structures

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct DbSubnetGroup {
    pub db_subnet_group_name: Option<String>,
    pub db_subnet_group_arn: Option<String>,
    pub db_subnet_group_description: Option<String>,
    pub subnet_group_status: Option<String>,
    pub subnet_ids: Vec<String>,
    pub vpc_id: Option<String>,
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct DescribeDbSubnetGroupsInput {
    pub db_subnet_group_name: Option<String>,
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct DescribeDbSubnetGroupsOutput {
    pub db_subnet_groups: Vec<DbSubnetGroup>,
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct CreateDbSubnetGroupInput {
    pub db_subnet_group_name: Option<String>,
    pub db_subnet_group_description: Option<String>,
    pub subnet_ids: Vec<String>,
    pub tags: Vec<Tag>,
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct CreateDbSubnetGroupOutput {
    pub db_subnet_group: Option<DbSubnetGroup>,
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct ModifyDbSubnetGroupInput {
    pub db_subnet_group_name: Option<String>,
    pub db_subnet_group_description: Option<String>,
    pub subnet_ids: Vec<String>,
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct ModifyDbSubnetGroupOutput {
    pub db_subnet_group: Option<DbSubnetGroup>,
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct DeleteDbSubnetGroupInput {
    pub db_subnet_group_name: Option<String>,
}

// -----------------------------------------------------------------------------
// Instance structures

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct DbInstance {
    pub db_instance_identifier: Option<String>,
    pub db_instance_arn: Option<String>,
    pub db_instance_class: Option<String>,
    pub db_instance_status: Option<String>,
    pub db_cluster_identifier: Option<String>,
    pub dbi_resource_id: Option<String>,
    pub auto_minor_version_upgrade: Option<bool>,
    pub availability_zone: Option<String>,
    pub backup_retention_period: Option<i32>,
    pub ca_certificate_identifier: Option<String>,
    pub endpoint: Option<Endpoint>,
    pub engine: Option<String>,
    pub engine_version: Option<String>,
    pub kms_key_id: Option<String>,
    pub preferred_backup_window: Option<String>,
    pub preferred_maintenance_window: Option<String>,
    pub promotion_tier: Option<i32>,
    pub publicly_accessible: Option<bool>,
    pub storage_encrypted: Option<bool>,
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct DescribeDbInstancesInput {
    pub db_instance_identifier: Option<String>,
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct DescribeDbInstancesOutput {
    pub db_instances: Vec<DbInstance>,
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct CreateDbInstanceInput {
    pub db_instance_identifier: Option<String>,
    pub db_instance_class: Option<String>,
    pub db_cluster_identifier: Option<String>,
    pub engine: Option<String>,
    pub auto_minor_version_upgrade: Option<bool>,
    pub availability_zone: Option<String>,
    pub preferred_maintenance_window: Option<String>,
    pub promotion_tier: Option<i32>,
    pub tags: Vec<Tag>,
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct CreateDbInstanceOutput {
    pub db_instance: Option<DbInstance>,
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct ModifyDbInstanceInput {
    pub db_instance_identifier: Option<String>,
    pub db_instance_class: Option<String>,
    pub apply_immediately: Option<bool>,
    pub auto_minor_version_upgrade: Option<bool>,
    pub ca_certificate_identifier: Option<String>,
    pub preferred_maintenance_window: Option<String>,
    pub promotion_tier: Option<i32>,
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct ModifyDbInstanceOutput {
    pub db_instance: Option<DbInstance>,
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct DeleteDbInstanceInput {
    pub db_instance_identifier: Option<String>,
}

// -----------------------------------------------------------------------------
// DocDb trait

/// operations of the documentdb api used by reconcilers, every call is a
/// suspension point that is cancelled when the surrounding future is dropped
#[async_trait]
pub trait DocDb: Send + Sync {
    async fn describe_db_clusters(
        &self,
        input: DescribeDbClustersInput,
    ) -> Result<DescribeDbClustersOutput, Error>;

    async fn create_db_cluster(
        &self,
        input: CreateDbClusterInput,
    ) -> Result<CreateDbClusterOutput, Error>;

    async fn modify_db_cluster(
        &self,
        input: ModifyDbClusterInput,
    ) -> Result<ModifyDbClusterOutput, Error>;

    async fn delete_db_cluster(&self, input: DeleteDbClusterInput) -> Result<(), Error>;

    async fn describe_db_cluster_parameter_groups(
        &self,
        input: DescribeDbClusterParameterGroupsInput,
    ) -> Result<DescribeDbClusterParameterGroupsOutput, Error>;

    async fn describe_db_cluster_parameters(
        &self,
        input: DescribeDbClusterParametersInput,
    ) -> Result<DescribeDbClusterParametersOutput, Error>;

    async fn create_db_cluster_parameter_group(
        &self,
        input: CreateDbClusterParameterGroupInput,
    ) -> Result<CreateDbClusterParameterGroupOutput, Error>;

    async fn modify_db_cluster_parameter_group(
        &self,
        input: ModifyDbClusterParameterGroupInput,
    ) -> Result<ModifyDbClusterParameterGroupOutput, Error>;

    async fn delete_db_cluster_parameter_group(
        &self,
        input: DeleteDbClusterParameterGroupInput,
    ) -> Result<(), Error>;

    async fn describe_db_subnet_groups(
        &self,
        input: DescribeDbSubnetGroupsInput,
    ) -> Result<DescribeDbSubnetGroupsOutput, Error>;

    async fn create_db_subnet_group(
        &self,
        input: CreateDbSubnetGroupInput,
    ) -> Result<CreateDbSubnetGroupOutput, Error>;

    async fn modify_db_subnet_group(
        &self,
        input: ModifyDbSubnetGroupInput,
    ) -> Result<ModifyDbSubnetGroupOutput, Error>;

    async fn delete_db_subnet_group(&self, input: DeleteDbSubnetGroupInput) -> Result<(), Error>;

    async fn describe_db_instances(
        &self,
        input: DescribeDbInstancesInput,
    ) -> Result<DescribeDbInstancesOutput, Error>;

    async fn create_db_instance(
        &self,
        input: CreateDbInstanceInput,
    ) -> Result<CreateDbInstanceOutput, Error>;

    async fn modify_db_instance(
        &self,
        input: ModifyDbInstanceInput,
    ) -> Result<ModifyDbInstanceOutput, Error>;

    async fn delete_db_instance(&self, input: DeleteDbInstanceInput) -> Result<(), Error>;

    async fn list_tags_for_resource(&self, arn: &str) -> Result<Vec<Tag>, Error>;

    async fn add_tags_to_resource(&self, arn: &str, tags: Vec<Tag>) -> Result<(), Error>;

    async fn remove_tags_from_resource(&self, arn: &str, keys: Vec<String>) -> Result<(), Error>;
}
