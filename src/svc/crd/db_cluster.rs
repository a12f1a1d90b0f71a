//! # DBCluster custom resource
//!
//! This module provide the documentdb cluster custom resource, its definition
//! and the hooks plugged into the managed resource reconciler

use async_trait::async_trait;
use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::svc::{
    aws::{
        self,
        docdb::{
            CloudwatchLogsExportConfiguration, CreateDbClusterInput, CreateDbClusterOutput,
            DbCluster as Cluster, DeleteDbClusterInput, DescribeDbClustersInput,
            DescribeDbClustersOutput, DocDb, ModifyDbClusterInput, ModifyDbClusterOutput,
            Tag as CloudTag,
        },
    },
    crd::{
        db_cluster_parameter_group::DbClusterParameterGroup, db_subnet_group::DbSubnetGroup,
        ec2::SecurityGroup, Condition, Reference, ResourceSpec, SecretKeySelector, Selector, Tag,
    },
    k8s::{resource, store::Store},
    managed::{
        condition, connection, drift, late_init, late_init_list, password, reference::Resolver,
        same_set, tags, ConnectionDetails, Creation, Error, External, Hook, Managed, Observation,
        Update,
    },
};

// -----------------------------------------------------------------------------
// Constants

pub const STATUS_AVAILABLE: &str = "available";
pub const STATUS_CREATING: &str = "creating";
pub const STATUS_DELETING: &str = "deleting";
pub const STATUS_MODIFYING: &str = "modifying";

// -----------------------------------------------------------------------------
// Parameters structure

#[derive(JsonSchema, Serialize, Deserialize, PartialEq, Clone, Debug, Default)]
pub struct DbClusterParameters {
    #[serde(rename = "region", default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(rename = "applyImmediately", default, skip_serializing_if = "Option::is_none")]
    pub apply_immediately: Option<bool>,
    #[serde(rename = "autogeneratePassword", default, skip_serializing_if = "Option::is_none")]
    pub autogenerate_password: Option<bool>,
    #[serde(rename = "availabilityZones", default, skip_serializing_if = "Option::is_none")]
    pub availability_zones: Option<Vec<String>>,
    #[serde(rename = "backupRetentionPeriod", default, skip_serializing_if = "Option::is_none")]
    pub backup_retention_period: Option<i32>,
    #[serde(
        rename = "dbClusterParameterGroupName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub db_cluster_parameter_group_name: Option<String>,
    #[serde(
        rename = "dbClusterParameterGroupNameRef",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub db_cluster_parameter_group_name_ref: Option<Reference>,
    #[serde(
        rename = "dbClusterParameterGroupNameSelector",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub db_cluster_parameter_group_name_selector: Option<Selector>,
    #[serde(rename = "dbSubnetGroupName", default, skip_serializing_if = "Option::is_none")]
    pub db_subnet_group_name: Option<String>,
    #[serde(rename = "dbSubnetGroupNameRef", default, skip_serializing_if = "Option::is_none")]
    pub db_subnet_group_name_ref: Option<Reference>,
    #[serde(
        rename = "dbSubnetGroupNameSelector",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub db_subnet_group_name_selector: Option<Selector>,
    #[serde(rename = "deletionProtection", default, skip_serializing_if = "Option::is_none")]
    pub deletion_protection: Option<bool>,
    #[serde(
        rename = "enableCloudwatchLogsExports",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub enable_cloudwatch_logs_exports: Option<Vec<String>>,
    #[serde(rename = "engine", default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
    #[serde(rename = "engineVersion", default, skip_serializing_if = "Option::is_none")]
    pub engine_version: Option<String>,
    #[serde(
        rename = "finalDBSnapshotIdentifier",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub final_db_snapshot_identifier: Option<String>,
    #[serde(rename = "kmsKeyId", default, skip_serializing_if = "Option::is_none")]
    pub kms_key_id: Option<String>,
    #[serde(
        rename = "masterUserPasswordSecretRef",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub master_user_password_secret_ref: Option<SecretKeySelector>,
    #[serde(rename = "masterUsername", default, skip_serializing_if = "Option::is_none")]
    pub master_username: Option<String>,
    #[serde(rename = "port", default, skip_serializing_if = "Option::is_none")]
    pub port: Option<i32>,
    #[serde(rename = "preferredBackupWindow", default, skip_serializing_if = "Option::is_none")]
    pub preferred_backup_window: Option<String>,
    #[serde(
        rename = "preferredMaintenanceWindow",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub preferred_maintenance_window: Option<String>,
    #[serde(rename = "skipFinalSnapshot", default, skip_serializing_if = "Option::is_none")]
    pub skip_final_snapshot: Option<bool>,
    #[serde(rename = "storageEncrypted", default, skip_serializing_if = "Option::is_none")]
    pub storage_encrypted: Option<bool>,
    #[serde(rename = "tags", default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    #[serde(rename = "vpcSecurityGroupIds", default, skip_serializing_if = "Option::is_none")]
    pub vpc_security_group_ids: Option<Vec<String>>,
    #[serde(rename = "vpcSecurityGroupIdsRefs", default, skip_serializing_if = "Vec::is_empty")]
    pub vpc_security_group_ids_refs: Vec<Reference>,
    #[serde(
        rename = "vpcSecurityGroupIdsSelector",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub vpc_security_group_ids_selector: Option<Selector>,
}

// -----------------------------------------------------------------------------
// Spec structure

#[derive(CustomResource, JsonSchema, Serialize, Deserialize, PartialEq, Clone, Debug, Default)]
#[kube(group = "docdb.aws.crossplane.io")]
#[kube(version = "v1alpha1")]
#[kube(kind = "DBCluster")]
#[kube(root = "DbCluster")]
#[kube(singular = "dbcluster")]
#[kube(plural = "dbclusters")]
#[kube(status = "DbClusterStatus")]
#[kube(namespaced)]
#[kube(derive = "PartialEq")]
pub struct DbClusterSpec {
    #[serde(flatten)]
    pub resource: ResourceSpec,
    #[serde(rename = "forProvider", default)]
    pub for_provider: DbClusterParameters,
}

// -----------------------------------------------------------------------------
// Status structure

#[derive(JsonSchema, Serialize, Deserialize, PartialEq, Clone, Debug, Default)]
pub struct DbClusterObservation {
    #[serde(rename = "dbClusterArn", default, skip_serializing_if = "Option::is_none")]
    pub db_cluster_arn: Option<String>,
    #[serde(rename = "dbClusterResourceId", default, skip_serializing_if = "Option::is_none")]
    pub db_cluster_resource_id: Option<String>,
    #[serde(rename = "status", default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(rename = "endpoint", default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(rename = "readerEndpoint", default, skip_serializing_if = "Option::is_none")]
    pub reader_endpoint: Option<String>,
    #[serde(rename = "hostedZoneId", default, skip_serializing_if = "Option::is_none")]
    pub hosted_zone_id: Option<String>,
    #[serde(rename = "engineVersion", default, skip_serializing_if = "Option::is_none")]
    pub engine_version: Option<String>,
    #[serde(
        rename = "enabledCloudwatchLogsExports",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub enabled_cloudwatch_logs_exports: Vec<String>,
}

#[derive(JsonSchema, Serialize, Deserialize, PartialEq, Clone, Debug, Default)]
pub struct DbClusterStatus {
    #[serde(rename = "atProvider", default)]
    pub at_provider: DbClusterObservation,
    #[serde(rename = "conditions", default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

// -----------------------------------------------------------------------------
// Helpers

/// returns the ready condition matching the state code of the cluster
pub fn ready(status: Option<&str>) -> Condition {
    match status {
        Some(STATUS_AVAILABLE) | Some("backing-up") => condition::available(),
        Some(STATUS_CREATING) => condition::creating(),
        Some(STATUS_DELETING) => condition::deleting(),
        Some(STATUS_MODIFYING)
        | Some("upgrading")
        | Some("maintenance")
        | Some("resetting-master-credentials")
        | Some("renaming") => condition::modifying(),
        _ => condition::unavailable(),
    }
}

/// log types to enable and to disable so that the observed ones match the
/// desired ones, none is computed if the user did not declare the list
pub fn logs_delta(desired: Option<&[String]>, observed: &[String]) -> CloudwatchLogsExportConfiguration {
    let Some(desired) = desired else {
        return CloudwatchLogsExportConfiguration::default();
    };

    CloudwatchLogsExportConfiguration {
        enable_log_types: desired
            .iter()
            .filter(|log| !observed.contains(log))
            .cloned()
            .collect(),
        disable_log_types: observed
            .iter()
            .filter(|log| !desired.contains(log))
            .cloned()
            .collect(),
    }
}

// -----------------------------------------------------------------------------
// DbCluster implementation

impl DbCluster {
    fn external_name(&self) -> Option<String> {
        resource::external_name(self).map(ToString::to_string)
    }

    fn observed(output: &DescribeDbClustersOutput) -> Option<&Cluster> {
        output.db_clusters.first()
    }

    fn arn(&self) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|status| status.at_provider.db_cluster_arn.as_deref())
    }

    fn observed_status(&self) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|status| status.at_provider.status.as_deref())
    }

    fn record(&mut self, cluster: &Cluster) {
        let status = self.status.get_or_insert_with(Default::default);

        status.at_provider = DbClusterObservation {
            db_cluster_arn: cluster.db_cluster_arn.to_owned(),
            db_cluster_resource_id: cluster.db_cluster_resource_id.to_owned(),
            status: cluster.status.to_owned(),
            endpoint: cluster.endpoint.to_owned(),
            reader_endpoint: cluster.reader_endpoint.to_owned(),
            hosted_zone_id: cluster.hosted_zone_id.to_owned(),
            engine_version: cluster.engine_version.to_owned(),
            enabled_cloudwatch_logs_exports: cluster.enabled_cloudwatch_logs_exports.to_owned(),
        };
    }

    fn secret_namespace(&self, selector: &SecretKeySelector) -> String {
        selector
            .namespace
            .to_owned()
            .or_else(|| self.namespace())
            .unwrap_or_default()
    }

    /// returns the master user password held by the source secret
    pub async fn source_password(&self, hook: &Hook<'_>) -> Result<Option<String>, Error> {
        let Some(selector) = &self.spec.for_provider.master_user_password_secret_ref else {
            return Ok(None);
        };

        Ok(hook
            .secrets
            .secret(&self.secret_namespace(selector), &selector.name)
            .await?
            .and_then(|mut data| data.remove(&selector.key))
            .filter(|password| !password.is_empty()))
    }

    /// returns the password published in the connection secret
    pub async fn published_password(&self, hook: &Hook<'_>) -> Result<Option<String>, Error> {
        let Some(target) = &self.spec.resource.write_connection_secret_to_ref else {
            return Ok(None);
        };

        let namespace = target
            .namespace
            .to_owned()
            .or_else(|| self.namespace())
            .unwrap_or_default();

        Ok(hook
            .secrets
            .secret(&namespace, &target.name)
            .await?
            .and_then(|mut data| data.remove(connection::PASSWORD)))
    }

    /// returns the password to create the cluster with, it is generated and
    /// written to the source secret if asked to
    async fn create_password(&self, hook: &Hook<'_>) -> Result<Option<String>, Error> {
        let autogenerate = self.spec.for_provider.autogenerate_password.unwrap_or(false);
        let Some(selector) = &self.spec.for_provider.master_user_password_secret_ref else {
            if autogenerate {
                return Err(Error::Permanent(
                    "autogeneratePassword requires masterUserPasswordSecretRef to be set".into(),
                ));
            }

            return Ok(None);
        };

        if let Some(password) = self.source_password(hook).await? {
            return Ok(Some(password));
        }

        let namespace = self.secret_namespace(selector);
        if !autogenerate {
            return Err(Error::MissingSecret(
                namespace,
                selector.name.to_owned(),
                selector.key.to_owned(),
            ));
        }

        let password = password::generate(password::DEFAULT_LENGTH);
        hook.secrets
            .apply_secret(
                &namespace,
                &selector.name,
                [(selector.key.to_owned(), password.to_owned())].into(),
                None,
            )
            .await?;

        Ok(Some(password))
    }

    /// connection details exposed by the cluster
    async fn connection(
        &self,
        hook: &Hook<'_>,
        cluster: &Cluster,
    ) -> Result<ConnectionDetails, Error> {
        let mut details = ConnectionDetails::new();

        if let Some(endpoint) = &cluster.endpoint {
            details.insert(connection::ENDPOINT.to_string(), endpoint.to_owned());
        }
        if let Some(endpoint) = &cluster.reader_endpoint {
            details.insert(connection::READER_ENDPOINT.to_string(), endpoint.to_owned());
        }
        if let Some(port) = cluster.port {
            details.insert(connection::PORT.to_string(), port.to_string());
        }
        if let Some(username) = self
            .spec
            .for_provider
            .master_username
            .as_ref()
            .or(cluster.master_username.as_ref())
        {
            details.insert(connection::USERNAME.to_string(), username.to_owned());
        }
        if let Some(password) = self.source_password(hook).await? {
            details.insert(connection::PASSWORD.to_string(), password);
        }

        Ok(details)
    }
}

impl Managed for DbCluster {
    fn resource(&self) -> &ResourceSpec {
        &self.spec.resource
    }

    fn region(&self) -> Option<&str> {
        self.spec.for_provider.region.as_deref()
    }

    fn tags(&self) -> &[Tag] {
        &self.spec.for_provider.tags
    }

    fn tags_mut(&mut self) -> &mut Vec<Tag> {
        &mut self.spec.for_provider.tags
    }

    fn conditions(&self) -> &[Condition] {
        self.status
            .as_ref()
            .map_or(&[], |status| status.conditions.as_slice())
    }

    fn conditions_mut(&mut self) -> &mut Vec<Condition> {
        &mut self.status.get_or_insert_with(Default::default).conditions
    }
}

#[async_trait]
impl External for DbCluster {
    type DescribeInput = DescribeDbClustersInput;
    type DescribeOutput = DescribeDbClustersOutput;
    type CreateInput = CreateDbClusterInput;
    type CreateOutput = CreateDbClusterOutput;
    type UpdateInput = ModifyDbClusterInput;
    type UpdateOutput = ModifyDbClusterOutput;
    type DeleteInput = DeleteDbClusterInput;

    const NOT_FOUND: &'static [&'static str] = &["DBClusterNotFoundFault"];

    async fn describe(
        cloud: &dyn DocDb,
        input: Self::DescribeInput,
    ) -> Result<Self::DescribeOutput, aws::Error> {
        cloud.describe_db_clusters(input).await
    }

    async fn create(
        cloud: &dyn DocDb,
        input: Self::CreateInput,
    ) -> Result<Self::CreateOutput, aws::Error> {
        cloud.create_db_cluster(input).await
    }

    async fn update(
        cloud: &dyn DocDb,
        input: Self::UpdateInput,
    ) -> Result<Self::UpdateOutput, aws::Error> {
        cloud.modify_db_cluster(input).await
    }

    async fn delete(cloud: &dyn DocDb, input: Self::DeleteInput) -> Result<(), aws::Error> {
        cloud.delete_db_cluster(input).await
    }

    fn pre_observe(&self, input: &mut Self::DescribeInput) -> Result<(), Error> {
        input.db_cluster_identifier = self.external_name();
        Ok(())
    }

    fn filter_list(&self, mut output: Self::DescribeOutput) -> Self::DescribeOutput {
        let id = self.external_name();
        output
            .db_clusters
            .retain(|cluster| cluster.db_cluster_identifier == id);
        output
    }

    fn is_empty(output: &Self::DescribeOutput) -> bool {
        output.db_clusters.is_empty()
    }

    fn late_initialize(&mut self, output: &Self::DescribeOutput) -> Result<(), Error> {
        let Some(cluster) = Self::observed(output) else {
            return Ok(());
        };

        let spec = &mut self.spec.for_provider;
        late_init_list(&mut spec.availability_zones, &cluster.availability_zones);
        late_init(&mut spec.backup_retention_period, cluster.backup_retention_period.as_ref());
        late_init(
            &mut spec.db_cluster_parameter_group_name,
            cluster.db_cluster_parameter_group.as_ref(),
        );
        late_init(&mut spec.db_subnet_group_name, cluster.db_subnet_group.as_ref());
        late_init(&mut spec.deletion_protection, cluster.deletion_protection.as_ref());
        late_init_list(
            &mut spec.enable_cloudwatch_logs_exports,
            &cluster.enabled_cloudwatch_logs_exports,
        );
        late_init(&mut spec.engine_version, cluster.engine_version.as_ref());
        late_init(&mut spec.kms_key_id, cluster.kms_key_id.as_ref());
        late_init(&mut spec.master_username, cluster.master_username.as_ref());
        late_init(&mut spec.port, cluster.port.as_ref());
        late_init(&mut spec.preferred_backup_window, cluster.preferred_backup_window.as_ref());
        late_init(
            &mut spec.preferred_maintenance_window,
            cluster.preferred_maintenance_window.as_ref(),
        );
        late_init(&mut spec.storage_encrypted, cluster.storage_encrypted.as_ref());
        late_init_list(&mut spec.vpc_security_group_ids, &cluster.vpc_security_group_ids);
        Ok(())
    }

    fn generate_observation(&mut self, output: &Self::DescribeOutput) {
        if let Some(cluster) = Self::observed(output) {
            self.record(cluster);
        }
    }

    async fn is_up_to_date(
        &self,
        hook: &Hook<'_>,
        output: &Self::DescribeOutput,
    ) -> Result<(bool, String), Error> {
        let Some(cluster) = Self::observed(output) else {
            return Ok((false, "cluster is not observed".into()));
        };

        let spec = &self.spec.for_provider;
        let mut diff = vec![];

        drift(
            &mut diff,
            "backupRetentionPeriod",
            spec.backup_retention_period.as_ref(),
            cluster.backup_retention_period.as_ref(),
        );
        drift(
            &mut diff,
            "dbClusterParameterGroupName",
            spec.db_cluster_parameter_group_name.as_ref(),
            cluster.db_cluster_parameter_group.as_ref(),
        );
        drift(
            &mut diff,
            "deletionProtection",
            spec.deletion_protection.as_ref(),
            cluster.deletion_protection.as_ref(),
        );
        drift(&mut diff, "port", spec.port.as_ref(), cluster.port.as_ref());
        drift(
            &mut diff,
            "preferredBackupWindow",
            spec.preferred_backup_window.as_ref(),
            cluster.preferred_backup_window.as_ref(),
        );
        drift(
            &mut diff,
            "preferredMaintenanceWindow",
            spec.preferred_maintenance_window.as_ref(),
            cluster.preferred_maintenance_window.as_ref(),
        );

        if let Some(logs) = &spec.enable_cloudwatch_logs_exports {
            if !same_set(logs, &cluster.enabled_cloudwatch_logs_exports) {
                diff.push(format!(
                    "enableCloudwatchLogsExports: {:?} -> {logs:?}",
                    cluster.enabled_cloudwatch_logs_exports
                ));
            }
        }

        if let Some(groups) = &spec.vpc_security_group_ids {
            if !same_set(groups, &cluster.vpc_security_group_ids) {
                diff.push(format!(
                    "vpcSecurityGroupIds: {:?} -> {groups:?}",
                    cluster.vpc_security_group_ids
                ));
            }
        }

        if spec.master_user_password_secret_ref.is_some()
            && self.spec.resource.write_connection_secret_to_ref.is_some()
        {
            let source = self.source_password(hook).await?;
            if source.is_some() && source != self.published_password(hook).await? {
                diff.push("masterUserPassword: changed".into());
            }
        }

        if let Some(arn) = &cluster.db_cluster_arn {
            let desired: Vec<CloudTag> = spec.tags.iter().map(Into::into).collect();
            let current = hook.cloud.list_tags_for_resource(arn).await?;
            if !tags::up_to_date(&desired, &current) {
                diff.push("tags: changed".into());
            }
        }

        Ok((diff.is_empty(), diff.join(", ")))
    }

    async fn post_observe(
        &mut self,
        hook: &Hook<'_>,
        output: &Self::DescribeOutput,
        mut observation: Observation,
    ) -> Result<Observation, Error> {
        let Some(cluster) = Self::observed(output) else {
            return Ok(observation);
        };

        condition::set(self.conditions_mut(), ready(cluster.status.as_deref()));
        observation.connection = self.connection(hook, cluster).await?;
        Ok(observation)
    }

    async fn pre_create(
        &self,
        hook: &Hook<'_>,
        input: &mut Self::CreateInput,
    ) -> Result<(), Error> {
        let spec = &self.spec.for_provider;

        *input = CreateDbClusterInput {
            db_cluster_identifier: self.external_name(),
            availability_zones: spec.availability_zones.to_owned(),
            backup_retention_period: spec.backup_retention_period,
            db_cluster_parameter_group_name: spec.db_cluster_parameter_group_name.to_owned(),
            db_subnet_group_name: spec.db_subnet_group_name.to_owned(),
            deletion_protection: spec.deletion_protection,
            enable_cloudwatch_logs_exports: spec.enable_cloudwatch_logs_exports.to_owned(),
            engine: spec.engine.to_owned(),
            engine_version: spec.engine_version.to_owned(),
            kms_key_id: spec.kms_key_id.to_owned(),
            master_username: spec.master_username.to_owned(),
            master_user_password: self.create_password(hook).await?,
            port: spec.port,
            preferred_backup_window: spec.preferred_backup_window.to_owned(),
            preferred_maintenance_window: spec.preferred_maintenance_window.to_owned(),
            storage_encrypted: spec.storage_encrypted,
            tags: spec.tags.iter().map(Into::into).collect(),
            vpc_security_group_ids: spec.vpc_security_group_ids.to_owned(),
        };

        Ok(())
    }

    async fn post_create(
        &mut self,
        hook: &Hook<'_>,
        output: &Self::CreateOutput,
        mut creation: Creation,
    ) -> Result<Creation, Error> {
        if let Some(cluster) = &output.db_cluster {
            self.record(cluster);
            creation.connection = self.connection(hook, cluster).await?;
        }

        Ok(creation)
    }

    async fn pre_update(
        &self,
        hook: &Hook<'_>,
        input: &mut Self::UpdateInput,
    ) -> Result<(), Error> {
        let spec = &self.spec.for_provider;
        let observed = self
            .status
            .as_ref()
            .map(|status| status.at_provider.enabled_cloudwatch_logs_exports.as_slice())
            .unwrap_or_default();

        let published = self.published_password(hook).await?;
        let password = self
            .source_password(hook)
            .await?
            .filter(|source| Some(source) != published.as_ref());

        *input = ModifyDbClusterInput {
            db_cluster_identifier: self.external_name(),
            apply_immediately: spec.apply_immediately,
            backup_retention_period: spec.backup_retention_period,
            cloudwatch_logs_export_configuration: Some(logs_delta(
                spec.enable_cloudwatch_logs_exports.as_deref(),
                observed,
            )),
            db_cluster_parameter_group_name: spec.db_cluster_parameter_group_name.to_owned(),
            deletion_protection: spec.deletion_protection,
            engine_version: None,
            master_user_password: password,
            port: spec.port,
            preferred_backup_window: spec.preferred_backup_window.to_owned(),
            preferred_maintenance_window: spec.preferred_maintenance_window.to_owned(),
            vpc_security_group_ids: spec.vpc_security_group_ids.to_owned(),
        };

        Ok(())
    }

    async fn post_update(
        &mut self,
        hook: &Hook<'_>,
        output: &Self::UpdateOutput,
        mut update: Update,
    ) -> Result<Update, Error> {
        if let Some(cluster) = &output.db_cluster {
            self.record(cluster);
            update.connection = self.connection(hook, cluster).await?;
        }

        if let Some(arn) = self.arn() {
            let desired: Vec<CloudTag> = self.spec.for_provider.tags.iter().map(Into::into).collect();
            tags::reconcile(hook.cloud, arn, &desired)
                .await
                .map_err(|err| Error::from(err).phase("update tags"))?;
        }

        Ok(update)
    }

    fn pre_delete(&self, input: &mut Self::DeleteInput) -> Result<bool, Error> {
        if self.observed_status() == Some(STATUS_DELETING) {
            return Ok(true);
        }

        let spec = &self.spec.for_provider;
        let skip_final_snapshot = spec.skip_final_snapshot.unwrap_or(false);
        let has_snapshot = spec
            .final_db_snapshot_identifier
            .as_deref()
            .is_some_and(|id| !id.is_empty());

        if !skip_final_snapshot && !has_snapshot {
            return Err(Error::Permanent(
                "finalDBSnapshotIdentifier is required unless skipFinalSnapshot is true".into(),
            ));
        }

        *input = DeleteDbClusterInput {
            db_cluster_identifier: self.external_name(),
            final_db_snapshot_identifier: spec.final_db_snapshot_identifier.to_owned(),
            skip_final_snapshot: spec.skip_final_snapshot,
        };

        Ok(false)
    }

    async fn resolve_references<S: Store>(&mut self, resolver: &Resolver<'_, S>) -> Result<(), Error> {
        let spec = &mut self.spec.for_provider;

        resolver
            .resolve::<DbClusterParameterGroup>(
                "dbClusterParameterGroupName",
                &mut spec.db_cluster_parameter_group_name,
                &mut spec.db_cluster_parameter_group_name_ref,
                spec.db_cluster_parameter_group_name_selector.as_ref(),
            )
            .await?;

        resolver
            .resolve::<DbSubnetGroup>(
                "dbSubnetGroupName",
                &mut spec.db_subnet_group_name,
                &mut spec.db_subnet_group_name_ref,
                spec.db_subnet_group_name_selector.as_ref(),
            )
            .await?;

        resolver
            .resolve_many::<SecurityGroup>(
                "vpcSecurityGroupIds",
                &mut spec.vpc_security_group_ids,
                &mut spec.vpc_security_group_ids_refs,
                spec.vpc_security_group_ids_selector.as_ref(),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::svc::{aws::fake::FakeDocDb, k8s::memory::MemoryStore};

    fn cluster() -> DbCluster {
        let mut obj = DbCluster::new("c1", Default::default());
        obj.metadata.namespace = Some("default".into());
        resource::set_external_name(&mut obj, "c1");
        obj
    }

    fn observed() -> Cluster {
        Cluster {
            db_cluster_identifier: Some("c1".into()),
            db_cluster_arn: Some("arn:aws:rds:us-east-1:123456789012:cluster:c1".into()),
            status: Some(STATUS_AVAILABLE.into()),
            port: Some(27017),
            backup_retention_period: Some(1),
            enabled_cloudwatch_logs_exports: vec!["audit".into()],
            preferred_maintenance_window: Some("sun:08:00-sun:08:30".into()),
            vpc_security_group_ids: vec!["sg-1".into()],
            ..Default::default()
        }
    }

    #[test]
    fn empty_spec_builds_a_describe_input_from_the_external_name() {
        let obj = cluster();
        let mut input = DescribeDbClustersInput::default();

        obj.pre_observe(&mut input).expect("input to be built");
        assert_eq!(input.db_cluster_identifier.as_deref(), Some("c1"));
    }

    #[test]
    fn filter_list_keeps_the_matching_cluster() {
        let obj = cluster();
        let mut other = observed();
        other.db_cluster_identifier = Some("c2".into());

        let output = obj.filter_list(DescribeDbClustersOutput {
            db_clusters: vec![other, observed()],
        });

        assert_eq!(output.db_clusters, vec![observed()]);
    }

    #[test]
    fn late_initialization_is_idempotent() {
        let mut obj = cluster();
        obj.spec.for_provider.port = Some(27018);
        obj.spec.for_provider.vpc_security_group_ids = Some(vec![]);

        let output = DescribeDbClustersOutput {
            db_clusters: vec![observed()],
        };

        obj.late_initialize(&output).expect("late init to succeed");
        let once = obj.to_owned();
        obj.late_initialize(&output).expect("late init to succeed");

        assert_eq!(obj, once);
        assert_eq!(obj.spec.for_provider.port, Some(27018));
        assert_eq!(obj.spec.for_provider.backup_retention_period, Some(1));
        assert_eq!(obj.spec.for_provider.vpc_security_group_ids, Some(vec![]));
        assert_eq!(
            obj.spec.for_provider.enable_cloudwatch_logs_exports,
            Some(vec!["audit".to_string()])
        );
    }

    #[test]
    fn logs_delta_is_a_set_difference() {
        let desired = vec!["profiler".to_string(), "audit".to_string()];
        let delta = logs_delta(Some(desired.as_slice()), &["audit".to_string()]);

        assert_eq!(delta.enable_log_types, vec!["profiler".to_string()]);
        assert!(delta.disable_log_types.is_empty());

        let delta = logs_delta(Some(&[][..]), &["audit".to_string()]);
        assert_eq!(delta.disable_log_types, vec!["audit".to_string()]);
        assert_eq!(logs_delta(None, &["audit".to_string()]), Default::default());
    }

    #[test]
    fn ready_follows_the_state_code() {
        assert_eq!(ready(Some("available")).reason, condition::REASON_AVAILABLE);
        assert_eq!(ready(Some("creating")).reason, condition::REASON_CREATING);
        assert_eq!(ready(Some("deleting")).reason, condition::REASON_DELETING);
        assert_eq!(ready(Some("modifying")).status, condition::STATUS_TRUE);
        assert_eq!(ready(Some("failed")).reason, condition::REASON_UNAVAILABLE);
    }

    #[tokio::test]
    async fn log_order_does_not_cause_drift() {
        let cloud = FakeDocDb::default();
        let store = MemoryStore::default();
        let hook = Hook {
            cloud: &cloud,
            secrets: &store,
        };

        let mut obj = cluster();
        obj.spec.for_provider.enable_cloudwatch_logs_exports =
            Some(vec!["profiler".into(), "audit".into()]);

        let mut state = observed();
        state.enabled_cloudwatch_logs_exports = vec!["audit".into(), "profiler".into()];
        let output = DescribeDbClustersOutput {
            db_clusters: vec![state],
        };

        let (up_to_date, diff) = obj.is_up_to_date(&hook, &output).await.expect("check to succeed");
        assert!(up_to_date, "{diff}");
    }

    #[tokio::test]
    async fn password_is_sent_only_when_changed() {
        let cloud = FakeDocDb::default();
        let store = MemoryStore::default();
        store.put_secret("default", "pw", &[("p", "topsecret")]);
        store.put_secret("default", "conn", &[(connection::PASSWORD, "topsecret")]);

        let mut obj = cluster();
        obj.spec.for_provider.master_user_password_secret_ref = Some(SecretKeySelector {
            name: "pw".into(),
            namespace: None,
            key: "p".into(),
        });
        obj.spec.resource.write_connection_secret_to_ref = Some(crate::svc::crd::SecretReference {
            name: "conn".into(),
            namespace: None,
        });

        let hook = Hook {
            cloud: &cloud,
            secrets: &store,
        };

        let mut input = ModifyDbClusterInput::default();
        obj.pre_update(&hook, &mut input).await.expect("input to be built");
        assert_eq!(input.master_user_password, None);

        store.put_secret("default", "pw", &[("p", "rotated")]);
        let output = DescribeDbClustersOutput {
            db_clusters: vec![observed()],
        };
        let (up_to_date, _) = obj.is_up_to_date(&hook, &output).await.expect("check to succeed");
        assert!(!up_to_date);

        obj.pre_update(&hook, &mut input).await.expect("input to be built");
        assert_eq!(input.master_user_password.as_deref(), Some("rotated"));
    }

    #[tokio::test]
    async fn password_is_generated_into_the_source_secret() {
        let store = MemoryStore::default();
        let cloud = FakeDocDb::default();
        let hook = Hook {
            cloud: &cloud,
            secrets: &store,
        };

        let mut obj = cluster();
        obj.spec.for_provider.autogenerate_password = Some(true);
        obj.spec.for_provider.master_user_password_secret_ref = Some(SecretKeySelector {
            name: "pw".into(),
            namespace: None,
            key: "p".into(),
        });

        let mut input = CreateDbClusterInput::default();
        obj.pre_create(&hook, &mut input).await.expect("input to be built");

        let generated = input.master_user_password.expect("password to be generated");
        assert_eq!(generated.len(), password::DEFAULT_LENGTH);
        assert_eq!(
            store.secret_data("default", "pw").and_then(|data| data.get("p").cloned()),
            Some(generated)
        );

        obj.spec.for_provider.master_user_password_secret_ref = None;
        let err = obj
            .pre_create(&hook, &mut CreateDbClusterInput::default())
            .await
            .expect_err("autogeneration without secret to fail");
        assert_eq!(err.class(), crate::svc::managed::error::Class::Permanent);
    }

    #[test]
    fn delete_is_skipped_while_deleting() {
        let mut obj = cluster();
        obj.spec.for_provider.skip_final_snapshot = Some(false);

        let err = obj
            .pre_delete(&mut DeleteDbClusterInput::default())
            .expect_err("missing snapshot identifier to fail");
        assert_eq!(err.class(), crate::svc::managed::error::Class::Permanent);

        obj.spec.for_provider.final_db_snapshot_identifier = Some("snap-1".into());
        let mut input = DeleteDbClusterInput::default();
        assert!(!obj.pre_delete(&mut input).expect("input to be built"));
        assert_eq!(input.final_db_snapshot_identifier.as_deref(), Some("snap-1"));
        assert_eq!(input.skip_final_snapshot, Some(false));

        obj.status = Some(DbClusterStatus {
            at_provider: DbClusterObservation {
                status: Some(STATUS_DELETING.into()),
                ..Default::default()
            },
            conditions: vec![],
        });
        assert!(obj.pre_delete(&mut DeleteDbClusterInput::default()).expect("hook to succeed"));
    }
}
