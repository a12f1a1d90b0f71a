//! # Sdk module
//!
//! This module implements the [`DocDb`] port on top of the official aws sdk

use std::fmt::Debug;

use async_trait::async_trait;
use aws_sdk_docdb::{
    error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
    types,
};
use tracing::trace;

use crate::svc::aws::{
    docdb::{
        CreateDbClusterInput, CreateDbClusterOutput, CreateDbClusterParameterGroupInput,
        CreateDbClusterParameterGroupOutput, CreateDbInstanceInput, CreateDbInstanceOutput,
        CreateDbSubnetGroupInput, CreateDbSubnetGroupOutput, DbCluster, DbClusterParameterGroup,
        DbInstance, DbSubnetGroup, DeleteDbClusterInput, DeleteDbClusterParameterGroupInput,
        DeleteDbInstanceInput, DeleteDbSubnetGroupInput, DescribeDbClusterParameterGroupsInput,
        DescribeDbClusterParameterGroupsOutput, DescribeDbClusterParametersInput,
        DescribeDbClusterParametersOutput, DescribeDbClustersInput, DescribeDbClustersOutput,
        DescribeDbInstancesInput, DescribeDbInstancesOutput, DescribeDbSubnetGroupsInput,
        DescribeDbSubnetGroupsOutput, DocDb, Endpoint, ModifyDbClusterInput,
        ModifyDbClusterOutput, ModifyDbClusterParameterGroupInput,
        ModifyDbClusterParameterGroupOutput, ModifyDbInstanceInput, ModifyDbInstanceOutput,
        ModifyDbSubnetGroupInput, ModifyDbSubnetGroupOutput, Parameter, Tag,
    },
    Error,
};

// -----------------------------------------------------------------------------
// Error conversion

impl<E, R> From<SdkError<E, R>> for Error
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: Debug,
{
    fn from(err: SdkError<E, R>) -> Self {
        match &err {
            SdkError::ServiceError(_) => Self::Api {
                code: err.code().unwrap_or("Unknown").to_string(),
                message: err
                    .message()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| DisplayErrorContext(&err).to_string()),
            },
            SdkError::ConstructionFailure(_) => {
                Self::Configuration(DisplayErrorContext(&err).to_string())
            }
            _ => Self::Transport(DisplayErrorContext(&err).to_string()),
        }
    }
}

// -----------------------------------------------------------------------------
// Conversion helpers

fn owned(value: Option<&str>) -> Option<String> {
    value.map(ToString::to_string)
}

fn non_empty<T>(values: Vec<T>) -> Option<Vec<T>> {
    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}

fn tags(tags: Vec<Tag>) -> Option<Vec<types::Tag>> {
    non_empty(
        tags.into_iter()
            .map(|tag| {
                types::Tag::builder()
                    .key(tag.key)
                    .value(tag.value)
                    .build()
            })
            .collect(),
    )
}

impl From<&types::DbCluster> for DbCluster {
    fn from(cluster: &types::DbCluster) -> Self {
        Self {
            db_cluster_identifier: owned(cluster.db_cluster_identifier()),
            db_cluster_arn: owned(cluster.db_cluster_arn()),
            db_cluster_resource_id: owned(cluster.db_cluster_resource_id()),
            status: owned(cluster.status()),
            availability_zones: cluster.availability_zones().to_vec(),
            backup_retention_period: cluster.backup_retention_period(),
            db_cluster_parameter_group: owned(cluster.db_cluster_parameter_group()),
            db_subnet_group: owned(cluster.db_subnet_group()),
            deletion_protection: cluster.deletion_protection(),
            enabled_cloudwatch_logs_exports: cluster.enabled_cloudwatch_logs_exports().to_vec(),
            endpoint: owned(cluster.endpoint()),
            reader_endpoint: owned(cluster.reader_endpoint()),
            hosted_zone_id: owned(cluster.hosted_zone_id()),
            engine: owned(cluster.engine()),
            engine_version: owned(cluster.engine_version()),
            kms_key_id: owned(cluster.kms_key_id()),
            master_username: owned(cluster.master_username()),
            port: cluster.port(),
            preferred_backup_window: owned(cluster.preferred_backup_window()),
            preferred_maintenance_window: owned(cluster.preferred_maintenance_window()),
            storage_encrypted: cluster.storage_encrypted(),
            vpc_security_group_ids: cluster
                .vpc_security_groups()
                .iter()
                .filter_map(|group| owned(group.vpc_security_group_id()))
                .collect(),
        }
    }
}

impl From<&types::DbClusterParameterGroup> for DbClusterParameterGroup {
    fn from(group: &types::DbClusterParameterGroup) -> Self {
        Self {
            db_cluster_parameter_group_name: owned(group.db_cluster_parameter_group_name()),
            db_cluster_parameter_group_arn: owned(group.db_cluster_parameter_group_arn()),
            db_parameter_group_family: owned(group.db_parameter_group_family()),
            description: owned(group.description()),
        }
    }
}

impl From<&types::Parameter> for Parameter {
    fn from(parameter: &types::Parameter) -> Self {
        Self {
            parameter_name: owned(parameter.parameter_name()),
            parameter_value: owned(parameter.parameter_value()),
            apply_method: parameter.apply_method().map(|m| m.as_str().to_string()),
            apply_type: owned(parameter.apply_type()),
            allowed_values: owned(parameter.allowed_values()),
            data_type: owned(parameter.data_type()),
            description: owned(parameter.description()),
            is_modifiable: parameter.is_modifiable(),
            minimum_engine_version: owned(parameter.minimum_engine_version()),
            source: owned(parameter.source()),
        }
    }
}

impl From<&types::DbSubnetGroup> for DbSubnetGroup {
    fn from(group: &types::DbSubnetGroup) -> Self {
        Self {
            db_subnet_group_name: owned(group.db_subnet_group_name()),
            db_subnet_group_arn: owned(group.db_subnet_group_arn()),
            db_subnet_group_description: owned(group.db_subnet_group_description()),
            subnet_group_status: owned(group.subnet_group_status()),
            subnet_ids: group
                .subnets()
                .iter()
                .filter_map(|subnet| owned(subnet.subnet_identifier()))
                .collect(),
            vpc_id: owned(group.vpc_id()),
        }
    }
}

impl From<&types::DbInstance> for DbInstance {
    fn from(instance: &types::DbInstance) -> Self {
        Self {
            db_instance_identifier: owned(instance.db_instance_identifier()),
            db_instance_arn: owned(instance.db_instance_arn()),
            db_instance_class: owned(instance.db_instance_class()),
            db_instance_status: owned(instance.db_instance_status()),
            db_cluster_identifier: owned(instance.db_cluster_identifier()),
            dbi_resource_id: owned(instance.dbi_resource_id()),
            auto_minor_version_upgrade: instance.auto_minor_version_upgrade(),
            availability_zone: owned(instance.availability_zone()),
            backup_retention_period: instance.backup_retention_period(),
            ca_certificate_identifier: owned(instance.ca_certificate_identifier()),
            endpoint: instance.endpoint().map(|endpoint| Endpoint {
                address: owned(endpoint.address()),
                port: endpoint.port(),
                hosted_zone_id: owned(endpoint.hosted_zone_id()),
            }),
            engine: owned(instance.engine()),
            engine_version: owned(instance.engine_version()),
            kms_key_id: owned(instance.kms_key_id()),
            preferred_backup_window: owned(instance.preferred_backup_window()),
            preferred_maintenance_window: owned(instance.preferred_maintenance_window()),
            promotion_tier: instance.promotion_tier(),
            publicly_accessible: instance.publicly_accessible(),
            storage_encrypted: instance.storage_encrypted(),
        }
    }
}

// -----------------------------------------------------------------------------
// Sdk structure

#[derive(Clone, Debug)]
pub struct Sdk {
    client: aws_sdk_docdb::Client,
}

impl From<aws_sdk_docdb::Client> for Sdk {
    fn from(client: aws_sdk_docdb::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DocDb for Sdk {
    #[cfg_attr(feature = "trace", tracing::instrument(skip(self)))]
    async fn describe_db_clusters(
        &self,
        input: DescribeDbClustersInput,
    ) -> Result<DescribeDbClustersOutput, Error> {
        let output = self
            .client
            .describe_db_clusters()
            .set_db_cluster_identifier(input.db_cluster_identifier)
            .send()
            .await?;

        Ok(DescribeDbClustersOutput {
            db_clusters: output.db_clusters().iter().map(DbCluster::from).collect(),
        })
    }

    #[cfg_attr(feature = "trace", tracing::instrument(skip(self, input)))]
    async fn create_db_cluster(
        &self,
        input: CreateDbClusterInput,
    ) -> Result<CreateDbClusterOutput, Error> {
        let output = self
            .client
            .create_db_cluster()
            .set_db_cluster_identifier(input.db_cluster_identifier)
            .set_availability_zones(input.availability_zones)
            .set_backup_retention_period(input.backup_retention_period)
            .set_db_cluster_parameter_group_name(input.db_cluster_parameter_group_name)
            .set_db_subnet_group_name(input.db_subnet_group_name)
            .set_deletion_protection(input.deletion_protection)
            .set_enable_cloudwatch_logs_exports(input.enable_cloudwatch_logs_exports)
            .set_engine(input.engine)
            .set_engine_version(input.engine_version)
            .set_kms_key_id(input.kms_key_id)
            .set_master_username(input.master_username)
            .set_master_user_password(input.master_user_password)
            .set_port(input.port)
            .set_preferred_backup_window(input.preferred_backup_window)
            .set_preferred_maintenance_window(input.preferred_maintenance_window)
            .set_storage_encrypted(input.storage_encrypted)
            .set_tags(tags(input.tags))
            .set_vpc_security_group_ids(input.vpc_security_group_ids)
            .send()
            .await?;

        Ok(CreateDbClusterOutput {
            db_cluster: output.db_cluster().map(DbCluster::from),
        })
    }

    #[cfg_attr(feature = "trace", tracing::instrument(skip(self, input)))]
    async fn modify_db_cluster(
        &self,
        input: ModifyDbClusterInput,
    ) -> Result<ModifyDbClusterOutput, Error> {
        let logs = input.cloudwatch_logs_export_configuration.map(|config| {
            types::CloudwatchLogsExportConfiguration::builder()
                .set_enable_log_types(Some(config.enable_log_types))
                .set_disable_log_types(Some(config.disable_log_types))
                .build()
        });

        let output = self
            .client
            .modify_db_cluster()
            .set_db_cluster_identifier(input.db_cluster_identifier)
            .set_apply_immediately(input.apply_immediately)
            .set_backup_retention_period(input.backup_retention_period)
            .set_cloudwatch_logs_export_configuration(logs)
            .set_db_cluster_parameter_group_name(input.db_cluster_parameter_group_name)
            .set_deletion_protection(input.deletion_protection)
            .set_engine_version(input.engine_version)
            .set_master_user_password(input.master_user_password)
            .set_port(input.port)
            .set_preferred_backup_window(input.preferred_backup_window)
            .set_preferred_maintenance_window(input.preferred_maintenance_window)
            .set_vpc_security_group_ids(input.vpc_security_group_ids)
            .send()
            .await?;

        Ok(ModifyDbClusterOutput {
            db_cluster: output.db_cluster().map(DbCluster::from),
        })
    }

    #[cfg_attr(feature = "trace", tracing::instrument(skip(self)))]
    async fn delete_db_cluster(&self, input: DeleteDbClusterInput) -> Result<(), Error> {
        self.client
            .delete_db_cluster()
            .set_db_cluster_identifier(input.db_cluster_identifier)
            .set_final_db_snapshot_identifier(input.final_db_snapshot_identifier)
            .set_skip_final_snapshot(input.skip_final_snapshot)
            .send()
            .await?;

        Ok(())
    }

    #[cfg_attr(feature = "trace", tracing::instrument(skip(self)))]
    async fn describe_db_cluster_parameter_groups(
        &self,
        input: DescribeDbClusterParameterGroupsInput,
    ) -> Result<DescribeDbClusterParameterGroupsOutput, Error> {
        let output = self
            .client
            .describe_db_cluster_parameter_groups()
            .set_db_cluster_parameter_group_name(input.db_cluster_parameter_group_name)
            .send()
            .await?;

        Ok(DescribeDbClusterParameterGroupsOutput {
            db_cluster_parameter_groups: output
                .db_cluster_parameter_groups()
                .iter()
                .map(DbClusterParameterGroup::from)
                .collect(),
        })
    }

    #[cfg_attr(feature = "trace", tracing::instrument(skip(self)))]
    async fn describe_db_cluster_parameters(
        &self,
        input: DescribeDbClusterParametersInput,
    ) -> Result<DescribeDbClusterParametersOutput, Error> {
        let output = self
            .client
            .describe_db_cluster_parameters()
            .set_db_cluster_parameter_group_name(input.db_cluster_parameter_group_name)
            .set_source(input.source)
            .set_marker(input.marker)
            .send()
            .await?;

        Ok(DescribeDbClusterParametersOutput {
            parameters: output.parameters().iter().map(Parameter::from).collect(),
            marker: owned(output.marker()),
        })
    }

    #[cfg_attr(feature = "trace", tracing::instrument(skip(self)))]
    async fn create_db_cluster_parameter_group(
        &self,
        input: CreateDbClusterParameterGroupInput,
    ) -> Result<CreateDbClusterParameterGroupOutput, Error> {
        let output = self
            .client
            .create_db_cluster_parameter_group()
            .set_db_cluster_parameter_group_name(input.db_cluster_parameter_group_name)
            .set_db_parameter_group_family(input.db_parameter_group_family)
            .set_description(input.description)
            .set_tags(tags(input.tags))
            .send()
            .await?;

        Ok(CreateDbClusterParameterGroupOutput {
            db_cluster_parameter_group: output
                .db_cluster_parameter_group()
                .map(DbClusterParameterGroup::from),
        })
    }

    #[cfg_attr(feature = "trace", tracing::instrument(skip(self)))]
    async fn modify_db_cluster_parameter_group(
        &self,
        input: ModifyDbClusterParameterGroupInput,
    ) -> Result<ModifyDbClusterParameterGroupOutput, Error> {
        let parameters = input
            .parameters
            .into_iter()
            .map(|parameter| {
                types::Parameter::builder()
                    .set_parameter_name(parameter.parameter_name)
                    .set_parameter_value(parameter.parameter_value)
                    .set_apply_method(parameter.apply_method.as_deref().map(types::ApplyMethod::from))
                    .build()
            })
            .collect();

        let output = self
            .client
            .modify_db_cluster_parameter_group()
            .set_db_cluster_parameter_group_name(input.db_cluster_parameter_group_name)
            .set_parameters(non_empty(parameters))
            .send()
            .await?;

        Ok(ModifyDbClusterParameterGroupOutput {
            db_cluster_parameter_group_name: owned(output.db_cluster_parameter_group_name()),
        })
    }

    #[cfg_attr(feature = "trace", tracing::instrument(skip(self)))]
    async fn delete_db_cluster_parameter_group(
        &self,
        input: DeleteDbClusterParameterGroupInput,
    ) -> Result<(), Error> {
        self.client
            .delete_db_cluster_parameter_group()
            .set_db_cluster_parameter_group_name(input.db_cluster_parameter_group_name)
            .send()
            .await?;

        Ok(())
    }

    #[cfg_attr(feature = "trace", tracing::instrument(skip(self)))]
    async fn describe_db_subnet_groups(
        &self,
        input: DescribeDbSubnetGroupsInput,
    ) -> Result<DescribeDbSubnetGroupsOutput, Error> {
        let output = self
            .client
            .describe_db_subnet_groups()
            .set_db_subnet_group_name(input.db_subnet_group_name)
            .send()
            .await?;

        Ok(DescribeDbSubnetGroupsOutput {
            db_subnet_groups: output
                .db_subnet_groups()
                .iter()
                .map(DbSubnetGroup::from)
                .collect(),
        })
    }

    #[cfg_attr(feature = "trace", tracing::instrument(skip(self)))]
    async fn create_db_subnet_group(
        &self,
        input: CreateDbSubnetGroupInput,
    ) -> Result<CreateDbSubnetGroupOutput, Error> {
        let output = self
            .client
            .create_db_subnet_group()
            .set_db_subnet_group_name(input.db_subnet_group_name)
            .set_db_subnet_group_description(input.db_subnet_group_description)
            .set_subnet_ids(non_empty(input.subnet_ids))
            .set_tags(tags(input.tags))
            .send()
            .await?;

        Ok(CreateDbSubnetGroupOutput {
            db_subnet_group: output.db_subnet_group().map(DbSubnetGroup::from),
        })
    }

    #[cfg_attr(feature = "trace", tracing::instrument(skip(self)))]
    async fn modify_db_subnet_group(
        &self,
        input: ModifyDbSubnetGroupInput,
    ) -> Result<ModifyDbSubnetGroupOutput, Error> {
        let output = self
            .client
            .modify_db_subnet_group()
            .set_db_subnet_group_name(input.db_subnet_group_name)
            .set_db_subnet_group_description(input.db_subnet_group_description)
            .set_subnet_ids(non_empty(input.subnet_ids))
            .send()
            .await?;

        Ok(ModifyDbSubnetGroupOutput {
            db_subnet_group: output.db_subnet_group().map(DbSubnetGroup::from),
        })
    }

    #[cfg_attr(feature = "trace", tracing::instrument(skip(self)))]
    async fn delete_db_subnet_group(&self, input: DeleteDbSubnetGroupInput) -> Result<(), Error> {
        self.client
            .delete_db_subnet_group()
            .set_db_subnet_group_name(input.db_subnet_group_name)
            .send()
            .await?;

        Ok(())
    }

    #[cfg_attr(feature = "trace", tracing::instrument(skip(self)))]
    async fn describe_db_instances(
        &self,
        input: DescribeDbInstancesInput,
    ) -> Result<DescribeDbInstancesOutput, Error> {
        let output = self
            .client
            .describe_db_instances()
            .set_db_instance_identifier(input.db_instance_identifier)
            .send()
            .await?;

        Ok(DescribeDbInstancesOutput {
            db_instances: output.db_instances().iter().map(DbInstance::from).collect(),
        })
    }

    #[cfg_attr(feature = "trace", tracing::instrument(skip(self)))]
    async fn create_db_instance(
        &self,
        input: CreateDbInstanceInput,
    ) -> Result<CreateDbInstanceOutput, Error> {
        let output = self
            .client
            .create_db_instance()
            .set_db_instance_identifier(input.db_instance_identifier)
            .set_db_instance_class(input.db_instance_class)
            .set_db_cluster_identifier(input.db_cluster_identifier)
            .set_engine(input.engine)
            .set_auto_minor_version_upgrade(input.auto_minor_version_upgrade)
            .set_availability_zone(input.availability_zone)
            .set_preferred_maintenance_window(input.preferred_maintenance_window)
            .set_promotion_tier(input.promotion_tier)
            .set_tags(tags(input.tags))
            .send()
            .await?;

        Ok(CreateDbInstanceOutput {
            db_instance: output.db_instance().map(DbInstance::from),
        })
    }

    #[cfg_attr(feature = "trace", tracing::instrument(skip(self)))]
    async fn modify_db_instance(
        &self,
        input: ModifyDbInstanceInput,
    ) -> Result<ModifyDbInstanceOutput, Error> {
        let output = self
            .client
            .modify_db_instance()
            .set_db_instance_identifier(input.db_instance_identifier)
            .set_db_instance_class(input.db_instance_class)
            .set_apply_immediately(input.apply_immediately)
            .set_auto_minor_version_upgrade(input.auto_minor_version_upgrade)
            .set_ca_certificate_identifier(input.ca_certificate_identifier)
            .set_preferred_maintenance_window(input.preferred_maintenance_window)
            .set_promotion_tier(input.promotion_tier)
            .send()
            .await?;

        Ok(ModifyDbInstanceOutput {
            db_instance: output.db_instance().map(DbInstance::from),
        })
    }

    #[cfg_attr(feature = "trace", tracing::instrument(skip(self)))]
    async fn delete_db_instance(&self, input: DeleteDbInstanceInput) -> Result<(), Error> {
        self.client
            .delete_db_instance()
            .set_db_instance_identifier(input.db_instance_identifier)
            .send()
            .await?;

        Ok(())
    }

    #[cfg_attr(feature = "trace", tracing::instrument(skip(self)))]
    async fn list_tags_for_resource(&self, arn: &str) -> Result<Vec<Tag>, Error> {
        let output = self
            .client
            .list_tags_for_resource()
            .resource_name(arn)
            .send()
            .await?;

        trace!(arn = arn, count = output.tag_list().len(), "Retrieve tags of resource");
        Ok(output
            .tag_list()
            .iter()
            .map(|tag| Tag {
                key: tag.key().unwrap_or_default().to_string(),
                value: tag.value().unwrap_or_default().to_string(),
            })
            .collect())
    }

    #[cfg_attr(feature = "trace", tracing::instrument(skip(self)))]
    async fn add_tags_to_resource(&self, arn: &str, tags: Vec<Tag>) -> Result<(), Error> {
        self.client
            .add_tags_to_resource()
            .resource_name(arn)
            .set_tags(self::tags(tags))
            .send()
            .await?;

        Ok(())
    }

    #[cfg_attr(feature = "trace", tracing::instrument(skip(self)))]
    async fn remove_tags_from_resource(&self, arn: &str, keys: Vec<String>) -> Result<(), Error> {
        self.client
            .remove_tags_from_resource()
            .resource_name(arn)
            .set_tag_keys(Some(keys))
            .send()
            .await?;

        Ok(())
    }
}
