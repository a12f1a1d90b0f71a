//! # DBSubnetGroup custom resource
//!
//! This module provide the documentdb subnet group custom resource, its
//! definition and the hooks plugged into the managed resource reconciler

use async_trait::async_trait;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::svc::{
    aws::{
        self,
        docdb::{
            CreateDbSubnetGroupInput, CreateDbSubnetGroupOutput, DbSubnetGroup as Group,
            DeleteDbSubnetGroupInput, DescribeDbSubnetGroupsInput, DescribeDbSubnetGroupsOutput,
            DocDb, ModifyDbSubnetGroupInput, ModifyDbSubnetGroupOutput, Tag as CloudTag,
        },
    },
    crd::{ec2::Subnet, Condition, Reference, ResourceSpec, Selector, Tag},
    k8s::{resource, store::Store},
    managed::{
        condition, late_init_list, reference::Resolver, same_set, tags, Creation, Error,
        External, Hook, Managed, Observation, Update,
    },
};

// -----------------------------------------------------------------------------
// Constants

pub const STATUS_COMPLETE: &str = "Complete";

// -----------------------------------------------------------------------------
// Parameters structure

#[derive(JsonSchema, Serialize, Deserialize, PartialEq, Clone, Debug, Default)]
pub struct DbSubnetGroupParameters {
    #[serde(rename = "region", default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(rename = "description", default)]
    pub description: String,
    #[serde(rename = "subnetIds", default, skip_serializing_if = "Option::is_none")]
    pub subnet_ids: Option<Vec<String>>,
    #[serde(rename = "subnetIdRefs", default, skip_serializing_if = "Vec::is_empty")]
    pub subnet_id_refs: Vec<Reference>,
    #[serde(rename = "subnetIdSelector", default, skip_serializing_if = "Option::is_none")]
    pub subnet_id_selector: Option<Selector>,
    #[serde(rename = "tags", default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

// -----------------------------------------------------------------------------
// Spec structure

#[derive(CustomResource, JsonSchema, Serialize, Deserialize, PartialEq, Clone, Debug, Default)]
#[kube(group = "docdb.aws.crossplane.io")]
#[kube(version = "v1alpha1")]
#[kube(kind = "DBSubnetGroup")]
#[kube(root = "DbSubnetGroup")]
#[kube(singular = "dbsubnetgroup")]
#[kube(plural = "dbsubnetgroups")]
#[kube(status = "DbSubnetGroupStatus")]
#[kube(namespaced)]
#[kube(derive = "PartialEq")]
pub struct DbSubnetGroupSpec {
    #[serde(flatten)]
    pub resource: ResourceSpec,
    #[serde(rename = "forProvider", default)]
    pub for_provider: DbSubnetGroupParameters,
}

// -----------------------------------------------------------------------------
// Status structure

#[derive(JsonSchema, Serialize, Deserialize, PartialEq, Clone, Debug, Default)]
pub struct DbSubnetGroupObservation {
    #[serde(rename = "dbSubnetGroupArn", default, skip_serializing_if = "Option::is_none")]
    pub db_subnet_group_arn: Option<String>,
    #[serde(rename = "subnetGroupStatus", default, skip_serializing_if = "Option::is_none")]
    pub subnet_group_status: Option<String>,
    #[serde(rename = "vpcId", default, skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<String>,
}

#[derive(JsonSchema, Serialize, Deserialize, PartialEq, Clone, Debug, Default)]
pub struct DbSubnetGroupStatus {
    #[serde(rename = "atProvider", default)]
    pub at_provider: DbSubnetGroupObservation,
    #[serde(rename = "conditions", default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

// -----------------------------------------------------------------------------
// DbSubnetGroup implementation

impl DbSubnetGroup {
    fn external_name(&self) -> Option<String> {
        resource::external_name(self).map(ToString::to_string)
    }

    fn arn(&self) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|status| status.at_provider.db_subnet_group_arn.as_deref())
    }

    fn record(&mut self, group: &Group) {
        self.status.get_or_insert_with(Default::default).at_provider = DbSubnetGroupObservation {
            db_subnet_group_arn: group.db_subnet_group_arn.to_owned(),
            subnet_group_status: group.subnet_group_status.to_owned(),
            vpc_id: group.vpc_id.to_owned(),
        };
    }
}

impl Managed for DbSubnetGroup {
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
impl External for DbSubnetGroup {
    type DescribeInput = DescribeDbSubnetGroupsInput;
    type DescribeOutput = DescribeDbSubnetGroupsOutput;
    type CreateInput = CreateDbSubnetGroupInput;
    type CreateOutput = CreateDbSubnetGroupOutput;
    type UpdateInput = ModifyDbSubnetGroupInput;
    type UpdateOutput = ModifyDbSubnetGroupOutput;
    type DeleteInput = DeleteDbSubnetGroupInput;

    const NOT_FOUND: &'static [&'static str] = &["DBSubnetGroupNotFoundFault"];

    async fn describe(
        cloud: &dyn DocDb,
        input: Self::DescribeInput,
    ) -> Result<Self::DescribeOutput, aws::Error> {
        cloud.describe_db_subnet_groups(input).await
    }

    async fn create(
        cloud: &dyn DocDb,
        input: Self::CreateInput,
    ) -> Result<Self::CreateOutput, aws::Error> {
        cloud.create_db_subnet_group(input).await
    }

    async fn update(
        cloud: &dyn DocDb,
        input: Self::UpdateInput,
    ) -> Result<Self::UpdateOutput, aws::Error> {
        cloud.modify_db_subnet_group(input).await
    }

    async fn delete(cloud: &dyn DocDb, input: Self::DeleteInput) -> Result<(), aws::Error> {
        cloud.delete_db_subnet_group(input).await
    }

    fn pre_observe(&self, input: &mut Self::DescribeInput) -> Result<(), Error> {
        input.db_subnet_group_name = self.external_name();
        Ok(())
    }

    fn filter_list(&self, mut output: Self::DescribeOutput) -> Self::DescribeOutput {
        let name = self.external_name();
        output
            .db_subnet_groups
            .retain(|group| group.db_subnet_group_name == name);
        output
    }

    fn is_empty(output: &Self::DescribeOutput) -> bool {
        output.db_subnet_groups.is_empty()
    }

    fn late_initialize(&mut self, output: &Self::DescribeOutput) -> Result<(), Error> {
        let Some(group) = output.db_subnet_groups.first() else {
            return Ok(());
        };

        let spec = &mut self.spec.for_provider;
        if spec.description.is_empty() {
            spec.description = group.db_subnet_group_description.to_owned().unwrap_or_default();
        }
        late_init_list(&mut spec.subnet_ids, &group.subnet_ids);
        Ok(())
    }

    fn generate_observation(&mut self, output: &Self::DescribeOutput) {
        if let Some(group) = output.db_subnet_groups.first() {
            self.record(group);
        }
    }

    async fn is_up_to_date(
        &self,
        hook: &Hook<'_>,
        output: &Self::DescribeOutput,
    ) -> Result<(bool, String), Error> {
        let Some(group) = output.db_subnet_groups.first() else {
            return Ok((false, "subnet group is not observed".into()));
        };

        let spec = &self.spec.for_provider;
        let mut diff = vec![];

        if group.db_subnet_group_description.as_deref() != Some(&spec.description) {
            diff.push(format!(
                "description: {:?} -> {:?}",
                group.db_subnet_group_description, spec.description
            ));
        }

        if let Some(subnets) = &spec.subnet_ids {
            if !same_set(subnets, &group.subnet_ids) {
                diff.push(format!("subnetIds: {:?} -> {subnets:?}", group.subnet_ids));
            }
        }

        if let Some(arn) = &group.db_subnet_group_arn {
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
        observation: Observation,
    ) -> Result<Observation, Error> {
        let ready = match output
            .db_subnet_groups
            .first()
            .and_then(|group| group.subnet_group_status.as_deref())
        {
            Some(STATUS_COMPLETE) => condition::available(),
            _ => condition::unavailable(),
        };

        condition::set(self.conditions_mut(), ready);
        Ok(observation)
    }

    async fn pre_create(
        &self,
        _hook: &Hook<'_>,
        input: &mut Self::CreateInput,
    ) -> Result<(), Error> {
        let spec = &self.spec.for_provider;

        *input = CreateDbSubnetGroupInput {
            db_subnet_group_name: self.external_name(),
            db_subnet_group_description: Some(spec.description.to_owned()),
            subnet_ids: spec.subnet_ids.to_owned().unwrap_or_default(),
            tags: spec.tags.iter().map(Into::into).collect(),
        };

        Ok(())
    }

    async fn post_create(
        &mut self,
        _hook: &Hook<'_>,
        output: &Self::CreateOutput,
        creation: Creation,
    ) -> Result<Creation, Error> {
        if let Some(group) = &output.db_subnet_group {
            self.record(group);
        }

        Ok(creation)
    }

    async fn pre_update(
        &self,
        _hook: &Hook<'_>,
        input: &mut Self::UpdateInput,
    ) -> Result<(), Error> {
        let spec = &self.spec.for_provider;

        *input = ModifyDbSubnetGroupInput {
            db_subnet_group_name: self.external_name(),
            db_subnet_group_description: Some(spec.description.to_owned()),
            subnet_ids: spec.subnet_ids.to_owned().unwrap_or_default(),
        };

        Ok(())
    }

    async fn post_update(
        &mut self,
        hook: &Hook<'_>,
        output: &Self::UpdateOutput,
        update: Update,
    ) -> Result<Update, Error> {
        if let Some(group) = &output.db_subnet_group {
            self.record(group);
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
        input.db_subnet_group_name = self.external_name();
        Ok(false)
    }

    async fn resolve_references<S: Store>(&mut self, resolver: &Resolver<'_, S>) -> Result<(), Error> {
        let spec = &mut self.spec.for_provider;

        resolver
            .resolve_many::<Subnet>(
                "subnetIds",
                &mut spec.subnet_ids,
                &mut spec.subnet_id_refs,
                spec.subnet_id_selector.as_ref(),
            )
            .await
    }
}
