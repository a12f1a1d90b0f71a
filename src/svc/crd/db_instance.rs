//! # DBInstance custom resource
//!
//! This module provide the documentdb instance custom resource, its
//! definition and the hooks plugged into the managed resource reconciler

use async_trait::async_trait;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::svc::{
    aws::{
        self,
        docdb::{
            CreateDbInstanceInput, CreateDbInstanceOutput, DbInstance as Instance,
            DeleteDbInstanceInput, DescribeDbInstancesInput, DescribeDbInstancesOutput, DocDb,
            ModifyDbInstanceInput, ModifyDbInstanceOutput, Tag as CloudTag,
        },
    },
    crd::{db_cluster::DbCluster, Condition, Reference, ResourceSpec, Selector, Tag},
    k8s::{resource, store::Store},
    managed::{
        condition, connection, drift, late_init, reference::Resolver, tags, ConnectionDetails,
        Creation, Error, External, Hook, Managed, Observation, Update,
    },
};

// -----------------------------------------------------------------------------
// Constants

pub const STATUS_AVAILABLE: &str = "available";
pub const STATUS_CREATING: &str = "creating";
pub const STATUS_DELETING: &str = "deleting";

// -----------------------------------------------------------------------------
// Parameters structure

#[derive(JsonSchema, Serialize, Deserialize, PartialEq, Clone, Debug, Default)]
pub struct DbInstanceParameters {
    #[serde(rename = "region", default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(rename = "applyImmediately", default, skip_serializing_if = "Option::is_none")]
    pub apply_immediately: Option<bool>,
    #[serde(
        rename = "autoMinorVersionUpgrade",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub auto_minor_version_upgrade: Option<bool>,
    #[serde(rename = "availabilityZone", default, skip_serializing_if = "Option::is_none")]
    pub availability_zone: Option<String>,
    #[serde(
        rename = "caCertificateIdentifier",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub ca_certificate_identifier: Option<String>,
    #[serde(rename = "dbClusterIdentifier", default, skip_serializing_if = "Option::is_none")]
    pub db_cluster_identifier: Option<String>,
    #[serde(
        rename = "dbClusterIdentifierRef",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub db_cluster_identifier_ref: Option<Reference>,
    #[serde(
        rename = "dbClusterIdentifierSelector",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub db_cluster_identifier_selector: Option<Selector>,
    #[serde(rename = "dbInstanceClass", default)]
    pub db_instance_class: String,
    #[serde(rename = "engine", default)]
    pub engine: String,
    #[serde(
        rename = "preferredMaintenanceWindow",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub preferred_maintenance_window: Option<String>,
    #[serde(rename = "promotionTier", default, skip_serializing_if = "Option::is_none")]
    pub promotion_tier: Option<i32>,
    #[serde(rename = "tags", default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

// -----------------------------------------------------------------------------
// Spec structure

#[derive(CustomResource, JsonSchema, Serialize, Deserialize, PartialEq, Clone, Debug, Default)]
#[kube(group = "docdb.aws.crossplane.io")]
#[kube(version = "v1alpha1")]
#[kube(kind = "DBInstance")]
#[kube(root = "DbInstance")]
#[kube(singular = "dbinstance")]
#[kube(plural = "dbinstances")]
#[kube(status = "DbInstanceStatus")]
#[kube(namespaced)]
#[kube(derive = "PartialEq")]
pub struct DbInstanceSpec {
    #[serde(flatten)]
    pub resource: ResourceSpec,
    #[serde(rename = "forProvider", default)]
    pub for_provider: DbInstanceParameters,
}

// -----------------------------------------------------------------------------
// Status structure

#[derive(JsonSchema, Serialize, Deserialize, PartialEq, Clone, Debug, Default)]
pub struct DbInstanceObservation {
    #[serde(rename = "dbInstanceArn", default, skip_serializing_if = "Option::is_none")]
    pub db_instance_arn: Option<String>,
    #[serde(rename = "dbiResourceId", default, skip_serializing_if = "Option::is_none")]
    pub dbi_resource_id: Option<String>,
    #[serde(rename = "dbInstanceStatus", default, skip_serializing_if = "Option::is_none")]
    pub db_instance_status: Option<String>,
    #[serde(rename = "endpointAddress", default, skip_serializing_if = "Option::is_none")]
    pub endpoint_address: Option<String>,
    #[serde(rename = "endpointPort", default, skip_serializing_if = "Option::is_none")]
    pub endpoint_port: Option<i32>,
    #[serde(rename = "engineVersion", default, skip_serializing_if = "Option::is_none")]
    pub engine_version: Option<String>,
}

#[derive(JsonSchema, Serialize, Deserialize, PartialEq, Clone, Debug, Default)]
pub struct DbInstanceStatus {
    #[serde(rename = "atProvider", default)]
    pub at_provider: DbInstanceObservation,
    #[serde(rename = "conditions", default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

// -----------------------------------------------------------------------------
// Helpers

/// returns the ready condition matching the state code of the instance
pub fn ready(status: Option<&str>) -> Condition {
    match status {
        Some(STATUS_AVAILABLE) | Some("modifying") | Some("backing-up") | Some("maintenance") => {
            condition::available()
        }
        Some(STATUS_CREATING) => condition::creating(),
        Some(STATUS_DELETING) => condition::deleting(),
        _ => condition::unavailable(),
    }
}

// -----------------------------------------------------------------------------
// DbInstance implementation

impl DbInstance {
    fn external_name(&self) -> Option<String> {
        resource::external_name(self).map(ToString::to_string)
    }

    fn observed(output: &DescribeDbInstancesOutput) -> Option<&Instance> {
        output.db_instances.first()
    }

    fn arn(&self) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|status| status.at_provider.db_instance_arn.as_deref())
    }

    fn observed_status(&self) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|status| status.at_provider.db_instance_status.as_deref())
    }

    fn record(&mut self, instance: &Instance) {
        let endpoint = instance.endpoint.as_ref();

        self.status.get_or_insert_with(Default::default).at_provider = DbInstanceObservation {
            db_instance_arn: instance.db_instance_arn.to_owned(),
            dbi_resource_id: instance.dbi_resource_id.to_owned(),
            db_instance_status: instance.db_instance_status.to_owned(),
            endpoint_address: endpoint.and_then(|endpoint| endpoint.address.to_owned()),
            endpoint_port: endpoint.and_then(|endpoint| endpoint.port),
            engine_version: instance.engine_version.to_owned(),
        };
    }

    fn connection(instance: &Instance) -> ConnectionDetails {
        let mut details = ConnectionDetails::new();

        if let Some(endpoint) = &instance.endpoint {
            if let Some(address) = &endpoint.address {
                details.insert(connection::ENDPOINT.to_string(), address.to_owned());
            }
            if let Some(port) = endpoint.port {
                details.insert(connection::PORT.to_string(), port.to_string());
            }
        }

        details
    }
}

impl Managed for DbInstance {
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
impl External for DbInstance {
    type DescribeInput = DescribeDbInstancesInput;
    type DescribeOutput = DescribeDbInstancesOutput;
    type CreateInput = CreateDbInstanceInput;
    type CreateOutput = CreateDbInstanceOutput;
    type UpdateInput = ModifyDbInstanceInput;
    type UpdateOutput = ModifyDbInstanceOutput;
    type DeleteInput = DeleteDbInstanceInput;

    const NOT_FOUND: &'static [&'static str] = &["DBInstanceNotFound", "DBInstanceNotFoundFault"];

    async fn describe(
        cloud: &dyn DocDb,
        input: Self::DescribeInput,
    ) -> Result<Self::DescribeOutput, aws::Error> {
        cloud.describe_db_instances(input).await
    }

    async fn create(
        cloud: &dyn DocDb,
        input: Self::CreateInput,
    ) -> Result<Self::CreateOutput, aws::Error> {
        cloud.create_db_instance(input).await
    }

    async fn update(
        cloud: &dyn DocDb,
        input: Self::UpdateInput,
    ) -> Result<Self::UpdateOutput, aws::Error> {
        cloud.modify_db_instance(input).await
    }

    async fn delete(cloud: &dyn DocDb, input: Self::DeleteInput) -> Result<(), aws::Error> {
        cloud.delete_db_instance(input).await
    }

    fn pre_observe(&self, input: &mut Self::DescribeInput) -> Result<(), Error> {
        input.db_instance_identifier = self.external_name();
        Ok(())
    }

    fn filter_list(&self, mut output: Self::DescribeOutput) -> Self::DescribeOutput {
        let id = self.external_name();
        output
            .db_instances
            .retain(|instance| instance.db_instance_identifier == id);
        output
    }

    fn is_empty(output: &Self::DescribeOutput) -> bool {
        output.db_instances.is_empty()
    }

    fn late_initialize(&mut self, output: &Self::DescribeOutput) -> Result<(), Error> {
        let Some(instance) = Self::observed(output) else {
            return Ok(());
        };

        let spec = &mut self.spec.for_provider;
        late_init(
            &mut spec.auto_minor_version_upgrade,
            instance.auto_minor_version_upgrade.as_ref(),
        );
        late_init(&mut spec.availability_zone, instance.availability_zone.as_ref());
        late_init(
            &mut spec.ca_certificate_identifier,
            instance.ca_certificate_identifier.as_ref(),
        );
        late_init(&mut spec.db_cluster_identifier, instance.db_cluster_identifier.as_ref());
        late_init(
            &mut spec.preferred_maintenance_window,
            instance.preferred_maintenance_window.as_ref(),
        );
        late_init(&mut spec.promotion_tier, instance.promotion_tier.as_ref());

        if spec.db_instance_class.is_empty() {
            spec.db_instance_class = instance.db_instance_class.to_owned().unwrap_or_default();
        }
        if spec.engine.is_empty() {
            spec.engine = instance.engine.to_owned().unwrap_or_default();
        }

        Ok(())
    }

    fn generate_observation(&mut self, output: &Self::DescribeOutput) {
        if let Some(instance) = Self::observed(output) {
            self.record(instance);
        }
    }

    async fn is_up_to_date(
        &self,
        hook: &Hook<'_>,
        output: &Self::DescribeOutput,
    ) -> Result<(bool, String), Error> {
        let Some(instance) = Self::observed(output) else {
            return Ok((false, "instance is not observed".into()));
        };

        let spec = &self.spec.for_provider;
        let mut diff = vec![];

        drift(
            &mut diff,
            "dbInstanceClass",
            Some(&spec.db_instance_class),
            instance.db_instance_class.as_ref(),
        );
        drift(
            &mut diff,
            "autoMinorVersionUpgrade",
            spec.auto_minor_version_upgrade.as_ref(),
            instance.auto_minor_version_upgrade.as_ref(),
        );
        drift(
            &mut diff,
            "caCertificateIdentifier",
            spec.ca_certificate_identifier.as_ref(),
            instance.ca_certificate_identifier.as_ref(),
        );
        drift(
            &mut diff,
            "preferredMaintenanceWindow",
            spec.preferred_maintenance_window.as_ref(),
            instance.preferred_maintenance_window.as_ref(),
        );
        drift(
            &mut diff,
            "promotionTier",
            spec.promotion_tier.as_ref(),
            instance.promotion_tier.as_ref(),
        );

        if let Some(arn) = &instance.db_instance_arn {
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
        _hook: &Hook<'_>,
        output: &Self::DescribeOutput,
        mut observation: Observation,
    ) -> Result<Observation, Error> {
        let Some(instance) = Self::observed(output) else {
            return Ok(observation);
        };

        condition::set(self.conditions_mut(), ready(instance.db_instance_status.as_deref()));
        observation.connection = Self::connection(instance);
        Ok(observation)
    }

    async fn pre_create(
        &self,
        _hook: &Hook<'_>,
        input: &mut Self::CreateInput,
    ) -> Result<(), Error> {
        let spec = &self.spec.for_provider;

        *input = CreateDbInstanceInput {
            db_instance_identifier: self.external_name(),
            db_instance_class: Some(spec.db_instance_class.to_owned()),
            db_cluster_identifier: spec.db_cluster_identifier.to_owned(),
            engine: Some(spec.engine.to_owned()),
            auto_minor_version_upgrade: spec.auto_minor_version_upgrade,
            availability_zone: spec.availability_zone.to_owned(),
            preferred_maintenance_window: spec.preferred_maintenance_window.to_owned(),
            promotion_tier: spec.promotion_tier,
            tags: spec.tags.iter().map(Into::into).collect(),
        };

        Ok(())
    }

    async fn post_create(
        &mut self,
        _hook: &Hook<'_>,
        output: &Self::CreateOutput,
        mut creation: Creation,
    ) -> Result<Creation, Error> {
        if let Some(instance) = &output.db_instance {
            self.record(instance);
            creation.connection = Self::connection(instance);
        }

        Ok(creation)
    }

    async fn pre_update(
        &self,
        _hook: &Hook<'_>,
        input: &mut Self::UpdateInput,
    ) -> Result<(), Error> {
        let spec = &self.spec.for_provider;

        *input = ModifyDbInstanceInput {
            db_instance_identifier: self.external_name(),
            db_instance_class: Some(spec.db_instance_class.to_owned()),
            apply_immediately: spec.apply_immediately,
            auto_minor_version_upgrade: spec.auto_minor_version_upgrade,
            ca_certificate_identifier: spec.ca_certificate_identifier.to_owned(),
            preferred_maintenance_window: spec.preferred_maintenance_window.to_owned(),
            promotion_tier: spec.promotion_tier,
        };

        Ok(())
    }

    async fn post_update(
        &mut self,
        hook: &Hook<'_>,
        output: &Self::UpdateOutput,
        mut update: Update,
    ) -> Result<Update, Error> {
        if let Some(instance) = &output.db_instance {
            self.record(instance);
            update.connection = Self::connection(instance);
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

        input.db_instance_identifier = self.external_name();
        Ok(false)
    }

    async fn resolve_references<S: Store>(&mut self, resolver: &Resolver<'_, S>) -> Result<(), Error> {
        let spec = &mut self.spec.for_provider;

        resolver
            .resolve::<DbCluster>(
                "dbClusterIdentifier",
                &mut spec.db_cluster_identifier,
                &mut spec.db_cluster_identifier_ref,
                spec.db_cluster_identifier_selector.as_ref(),
            )
            .await
    }
}
