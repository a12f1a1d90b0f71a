//! # DBClusterParameterGroup custom resource
//!
//! This module provide the documentdb cluster parameter group custom
//! resource, its definition and the hooks plugged into the managed resource
//! reconciler

use async_trait::async_trait;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::svc::{
    aws::{
        self,
        docdb::{
            CreateDbClusterParameterGroupInput, CreateDbClusterParameterGroupOutput,
            DbClusterParameterGroup as Group, DeleteDbClusterParameterGroupInput,
            DescribeDbClusterParameterGroupsInput, DescribeDbClusterParametersInput, DocDb,
            ModifyDbClusterParameterGroupInput, ModifyDbClusterParameterGroupOutput, Parameter,
            Tag as CloudTag,
        },
    },
    crd::{Condition, ResourceSpec, Tag},
    k8s::{resource, store::Store},
    managed::{
        condition, reference::Resolver, tags, Creation, Error, External, Hook, Managed,
        Observation, Update,
    },
};

// -----------------------------------------------------------------------------
// Parameters structure

#[derive(JsonSchema, Serialize, Deserialize, PartialEq, Eq, Clone, Debug, Default)]
pub struct CustomParameter {
    #[serde(rename = "parameterName")]
    pub parameter_name: String,
    #[serde(rename = "parameterValue", default, skip_serializing_if = "Option::is_none")]
    pub parameter_value: Option<String>,
    /// `immediate` or `pending-reboot`
    #[serde(rename = "applyMethod", default, skip_serializing_if = "Option::is_none")]
    pub apply_method: Option<String>,
}

impl From<&CustomParameter> for Parameter {
    fn from(parameter: &CustomParameter) -> Self {
        Self {
            parameter_name: Some(parameter.parameter_name.to_owned()),
            parameter_value: parameter.parameter_value.to_owned(),
            apply_method: parameter.apply_method.to_owned(),
            ..Default::default()
        }
    }
}

#[derive(JsonSchema, Serialize, Deserialize, PartialEq, Clone, Debug, Default)]
pub struct DbClusterParameterGroupParameters {
    #[serde(rename = "region", default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(rename = "dbParameterGroupFamily", default)]
    pub db_parameter_group_family: String,
    #[serde(rename = "description", default)]
    pub description: String,
    #[serde(rename = "parameters", default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<CustomParameter>,
    #[serde(rename = "tags", default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

// -----------------------------------------------------------------------------
// Spec structure

#[derive(CustomResource, JsonSchema, Serialize, Deserialize, PartialEq, Clone, Debug, Default)]
#[kube(group = "docdb.aws.crossplane.io")]
#[kube(version = "v1alpha1")]
#[kube(kind = "DBClusterParameterGroup")]
#[kube(root = "DbClusterParameterGroup")]
#[kube(singular = "dbclusterparametergroup")]
#[kube(plural = "dbclusterparametergroups")]
#[kube(status = "DbClusterParameterGroupStatus")]
#[kube(namespaced)]
#[kube(derive = "PartialEq")]
pub struct DbClusterParameterGroupSpec {
    #[serde(flatten)]
    pub resource: ResourceSpec,
    #[serde(rename = "forProvider", default)]
    pub for_provider: DbClusterParameterGroupParameters,
}

// -----------------------------------------------------------------------------
// Status structure

#[derive(JsonSchema, Serialize, Deserialize, PartialEq, Clone, Debug, Default)]
pub struct DbClusterParameterGroupObservation {
    #[serde(
        rename = "dbClusterParameterGroupArn",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub db_cluster_parameter_group_arn: Option<String>,
}

#[derive(JsonSchema, Serialize, Deserialize, PartialEq, Clone, Debug, Default)]
pub struct DbClusterParameterGroupStatus {
    #[serde(rename = "atProvider", default)]
    pub at_provider: DbClusterParameterGroupObservation,
    #[serde(rename = "conditions", default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

// -----------------------------------------------------------------------------
// Observed structure

/// the parameter group as described by aws along with all its parameters
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Observed {
    pub groups: Vec<Group>,
    pub parameters: Vec<Parameter>,
}

/// returns every parameter of the group, following pagination markers
pub async fn parameters(cloud: &dyn DocDb, name: &str) -> Result<Vec<Parameter>, aws::Error> {
    let mut parameters = vec![];
    let mut marker = None;

    loop {
        let output = cloud
            .describe_db_cluster_parameters(DescribeDbClusterParametersInput {
                db_cluster_parameter_group_name: Some(name.to_string()),
                source: None,
                marker,
            })
            .await?;

        parameters.extend(output.parameters);
        marker = output.marker;

        if marker.is_none() {
            return Ok(parameters);
        }
    }
}

// -----------------------------------------------------------------------------
// DbClusterParameterGroup implementation

impl DbClusterParameterGroup {
    fn external_name(&self) -> Option<String> {
        resource::external_name(self).map(ToString::to_string)
    }

    fn arn(&self) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|status| status.at_provider.db_cluster_parameter_group_arn.as_deref())
    }

    fn record(&mut self, group: &Group) {
        self.status
            .get_or_insert_with(Default::default)
            .at_provider
            .db_cluster_parameter_group_arn = group.db_cluster_parameter_group_arn.to_owned();
    }

    fn desired_parameters(&self) -> Vec<Parameter> {
        self.spec
            .for_provider
            .parameters
            .iter()
            .filter(|parameter| parameter.parameter_value.is_some())
            .map(Parameter::from)
            .collect()
    }
}

impl Managed for DbClusterParameterGroup {
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
impl External for DbClusterParameterGroup {
    type DescribeInput = DescribeDbClusterParameterGroupsInput;
    type DescribeOutput = Observed;
    type CreateInput = CreateDbClusterParameterGroupInput;
    type CreateOutput = CreateDbClusterParameterGroupOutput;
    type UpdateInput = ModifyDbClusterParameterGroupInput;
    type UpdateOutput = ModifyDbClusterParameterGroupOutput;
    type DeleteInput = DeleteDbClusterParameterGroupInput;

    const NOT_FOUND: &'static [&'static str] = &[
        "DBParameterGroupNotFound",
        "DBClusterParameterGroupNotFound",
        "DBClusterParameterGroupNotFoundFault",
    ];

    async fn describe(
        cloud: &dyn DocDb,
        input: Self::DescribeInput,
    ) -> Result<Self::DescribeOutput, aws::Error> {
        let name = input.db_cluster_parameter_group_name.to_owned();
        let groups = cloud
            .describe_db_cluster_parameter_groups(input)
            .await?
            .db_cluster_parameter_groups;

        let parameters = match &name {
            Some(name) if !groups.is_empty() => parameters(cloud, name).await?,
            _ => vec![],
        };

        Ok(Observed { groups, parameters })
    }

    async fn create(
        cloud: &dyn DocDb,
        input: Self::CreateInput,
    ) -> Result<Self::CreateOutput, aws::Error> {
        cloud.create_db_cluster_parameter_group(input).await
    }

    async fn update(
        cloud: &dyn DocDb,
        input: Self::UpdateInput,
    ) -> Result<Self::UpdateOutput, aws::Error> {
        // aws refuses a modification without parameters
        if input.parameters.is_empty() {
            return Ok(ModifyDbClusterParameterGroupOutput {
                db_cluster_parameter_group_name: input.db_cluster_parameter_group_name,
            });
        }

        cloud.modify_db_cluster_parameter_group(input).await
    }

    async fn delete(cloud: &dyn DocDb, input: Self::DeleteInput) -> Result<(), aws::Error> {
        cloud.delete_db_cluster_parameter_group(input).await
    }

    fn pre_observe(&self, input: &mut Self::DescribeInput) -> Result<(), Error> {
        input.db_cluster_parameter_group_name = self.external_name();
        Ok(())
    }

    fn filter_list(&self, mut output: Self::DescribeOutput) -> Self::DescribeOutput {
        let name = self.external_name();
        output
            .groups
            .retain(|group| group.db_cluster_parameter_group_name == name);
        output
    }

    fn is_empty(output: &Self::DescribeOutput) -> bool {
        output.groups.is_empty()
    }

    fn late_initialize(&mut self, output: &Self::DescribeOutput) -> Result<(), Error> {
        let spec = &mut self.spec.for_provider;

        if let Some(group) = output.groups.first() {
            if spec.db_parameter_group_family.is_empty() {
                spec.db_parameter_group_family =
                    group.db_parameter_group_family.to_owned().unwrap_or_default();
            }
            if spec.description.is_empty() {
                spec.description = group.description.to_owned().unwrap_or_default();
            }
        }

        for parameter in spec.parameters.iter_mut() {
            let Some(observed) = output
                .parameters
                .iter()
                .find(|p| p.parameter_name.as_deref() == Some(&parameter.parameter_name))
            else {
                continue;
            };

            if parameter.parameter_value.is_none() {
                parameter.parameter_value = observed.parameter_value.to_owned();
            }
            if parameter.apply_method.is_none() {
                parameter.apply_method = observed.apply_method.to_owned();
            }
        }

        Ok(())
    }

    fn generate_observation(&mut self, output: &Self::DescribeOutput) {
        if let Some(group) = output.groups.first() {
            self.record(group);
        }
    }

    async fn is_up_to_date(
        &self,
        hook: &Hook<'_>,
        output: &Self::DescribeOutput,
    ) -> Result<(bool, String), Error> {
        let Some(group) = output.groups.first() else {
            return Ok((false, "parameter group is not observed".into()));
        };

        let spec = &self.spec.for_provider;
        if group.db_parameter_group_family.as_deref() != Some(&spec.db_parameter_group_family) {
            return Err(Error::Permanent(
                "cannot modify family of an existing cluster-parameter-group".into(),
            ));
        }

        if group.description.as_deref() != Some(&spec.description) {
            return Err(Error::Permanent(
                "cannot modify description of an existing cluster-parameter-group".into(),
            ));
        }

        let mut diff = vec![];
        for parameter in &spec.parameters {
            let observed = output
                .parameters
                .iter()
                .find(|p| p.parameter_name.as_deref() == Some(&parameter.parameter_name));

            match (observed, &parameter.parameter_value) {
                (None, None) => {
                    return Err(Error::Permanent(format!(
                        "parameter '{}' is unknown to family '{}' and has no value",
                        parameter.parameter_name, spec.db_parameter_group_family
                    )));
                }
                (None, Some(_)) => diff.push(format!("{}: missing", parameter.parameter_name)),
                (Some(observed), Some(value)) if observed.parameter_value.as_ref() != Some(value) => {
                    diff.push(format!(
                        "{}: {:?} -> {value:?}",
                        parameter.parameter_name, observed.parameter_value
                    ));
                }
                _ => {}
            }
        }

        if let Some(arn) = &group.db_cluster_parameter_group_arn {
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
        _output: &Self::DescribeOutput,
        observation: Observation,
    ) -> Result<Observation, Error> {
        condition::set(self.conditions_mut(), condition::available());
        Ok(observation)
    }

    async fn pre_create(
        &self,
        _hook: &Hook<'_>,
        input: &mut Self::CreateInput,
    ) -> Result<(), Error> {
        let spec = &self.spec.for_provider;

        *input = CreateDbClusterParameterGroupInput {
            db_cluster_parameter_group_name: self.external_name(),
            db_parameter_group_family: Some(spec.db_parameter_group_family.to_owned()),
            description: Some(spec.description.to_owned()),
            tags: spec.tags.iter().map(Into::into).collect(),
        };

        Ok(())
    }

    async fn post_create(
        &mut self,
        hook: &Hook<'_>,
        output: &Self::CreateOutput,
        creation: Creation,
    ) -> Result<Creation, Error> {
        if let Some(group) = &output.db_cluster_parameter_group {
            self.record(group);
        }

        let parameters = self.desired_parameters();
        if !parameters.is_empty() {
            hook.cloud
                .modify_db_cluster_parameter_group(ModifyDbClusterParameterGroupInput {
                    db_cluster_parameter_group_name: self.external_name(),
                    parameters,
                })
                .await
                .map_err(|err| Error::from(err).phase("post-create"))?;
        }

        Ok(creation)
    }

    async fn pre_update(
        &self,
        _hook: &Hook<'_>,
        input: &mut Self::UpdateInput,
    ) -> Result<(), Error> {
        *input = ModifyDbClusterParameterGroupInput {
            db_cluster_parameter_group_name: self.external_name(),
            parameters: self.desired_parameters(),
        };

        Ok(())
    }

    async fn post_update(
        &mut self,
        hook: &Hook<'_>,
        _output: &Self::UpdateOutput,
        update: Update,
    ) -> Result<Update, Error> {
        if let Some(arn) = self.arn() {
            let desired: Vec<CloudTag> = self.spec.for_provider.tags.iter().map(Into::into).collect();
            tags::reconcile(hook.cloud, arn, &desired)
                .await
                .map_err(|err| Error::from(err).phase("update tags"))?;
        }

        Ok(update)
    }

    fn pre_delete(&self, input: &mut Self::DeleteInput) -> Result<bool, Error> {
        input.db_cluster_parameter_group_name = self.external_name();
        Ok(false)
    }

    async fn resolve_references<S: Store>(&mut self, _resolver: &Resolver<'_, S>) -> Result<(), Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::svc::{
        aws::fake::{Call, FakeDocDb, PARAMETERS_PAGE_SIZE},
        k8s::memory::MemoryStore,
        managed::error::Class,
    };

    fn parameter(name: &str, value: &str, source: &str) -> Parameter {
        Parameter {
            parameter_name: Some(name.into()),
            parameter_value: Some(value.into()),
            apply_method: Some("pending-reboot".into()),
            source: Some(source.into()),
            ..Default::default()
        }
    }

    fn group(family: &str) -> DbClusterParameterGroup {
        let mut obj = DbClusterParameterGroup::new("pg1", Default::default());
        obj.metadata.namespace = Some("default".into());
        resource::set_external_name(&mut obj, "pg1");
        obj.spec.for_provider.db_parameter_group_family = family.into();
        obj.spec.for_provider.description = "custom".into();
        obj
    }

    fn cloud() -> FakeDocDb {
        let cloud = FakeDocDb::default();
        cloud.put_parameter_group(
            Group {
                db_cluster_parameter_group_name: Some("pg1".into()),
                db_parameter_group_family: Some("docdb4.0".into()),
                description: Some("custom".into()),
                ..Default::default()
            },
            vec![
                parameter("tls", "enabled", "system"),
                parameter("ttl_monitor", "enabled", "system"),
                parameter("audit_logs", "disabled", "system"),
                parameter("profiler", "disabled", "system"),
                parameter("profiler_threshold_ms", "100", "system"),
            ],
        );
        cloud
    }

    async fn observe(cloud: &FakeDocDb, obj: &DbClusterParameterGroup) -> Observed {
        let mut input = DescribeDbClusterParameterGroupsInput::default();
        obj.pre_observe(&mut input).expect("input to be built");

        let output = DbClusterParameterGroup::describe(cloud, input)
            .await
            .expect("describe to succeed");
        obj.filter_list(output)
    }

    #[tokio::test]
    async fn describe_follows_pagination() {
        let cloud = cloud();
        let output = observe(&cloud, &group("docdb4.0")).await;

        assert_eq!(output.groups.len(), 1);
        assert_eq!(output.parameters.len(), 5);
        assert!(output.parameters.len() > PARAMETERS_PAGE_SIZE);
    }

    #[tokio::test]
    async fn family_mismatch_is_a_permanent_error() {
        let cloud = cloud();
        let store = MemoryStore::default();
        let hook = Hook {
            cloud: &cloud,
            secrets: &store,
        };

        let obj = group("docdb5.0");
        let output = observe(&cloud, &obj).await;
        cloud.clear_calls();

        let err = obj
            .is_up_to_date(&hook, &output)
            .await
            .expect_err("family mismatch to fail");

        assert_eq!(err.class(), Class::Permanent);
        assert_eq!(
            err.to_string(),
            "cannot modify family of an existing cluster-parameter-group"
        );
        assert!(cloud.mutations().is_empty());
    }

    #[tokio::test]
    async fn only_declared_parameters_are_compared() {
        let cloud = cloud();
        let store = MemoryStore::default();
        let hook = Hook {
            cloud: &cloud,
            secrets: &store,
        };

        let mut obj = group("docdb4.0");
        obj.spec.for_provider.parameters = vec![
            CustomParameter {
                parameter_name: "tls".into(),
                parameter_value: Some("disabled".into()),
                apply_method: None,
            },
            CustomParameter {
                parameter_name: "profiler".into(),
                parameter_value: None,
                apply_method: None,
            },
        ];

        let output = observe(&cloud, &obj).await;
        obj.late_initialize(&output).expect("late init to succeed");

        assert_eq!(
            obj.spec.for_provider.parameters[1].parameter_value.as_deref(),
            Some("disabled")
        );
        assert_eq!(
            obj.spec.for_provider.parameters[0].apply_method.as_deref(),
            Some("pending-reboot")
        );

        let (up_to_date, diff) = obj.is_up_to_date(&hook, &output).await.expect("check to succeed");
        assert!(!up_to_date);
        assert!(diff.starts_with("tls"), "{diff}");

        let mut input = ModifyDbClusterParameterGroupInput::default();
        obj.pre_update(&hook, &mut input).await.expect("input to be built");
        let output = DbClusterParameterGroup::update(&cloud, input)
            .await
            .expect("update to succeed");
        assert_eq!(output.db_cluster_parameter_group_name.as_deref(), Some("pg1"));

        let observed = observe(&cloud, &obj).await;
        let (up_to_date, diff) = obj.is_up_to_date(&hook, &observed).await.expect("check to succeed");
        assert!(up_to_date, "{diff}");
    }

    #[tokio::test]
    async fn update_without_parameters_is_not_sent() {
        let cloud = cloud();

        DbClusterParameterGroup::update(
            &cloud,
            ModifyDbClusterParameterGroupInput {
                db_cluster_parameter_group_name: Some("pg1".into()),
                parameters: vec![],
            },
        )
        .await
        .expect("update to succeed");

        assert!(!cloud
            .calls()
            .iter()
            .any(|call| matches!(call, Call::ModifyDbClusterParameterGroup(_))));
    }

    #[tokio::test]
    async fn unknown_parameter_without_value_is_a_permanent_error() {
        let cloud = cloud();
        let store = MemoryStore::default();
        let hook = Hook {
            cloud: &cloud,
            secrets: &store,
        };

        let mut obj = group("docdb4.0");
        obj.spec.for_provider.parameters = vec![CustomParameter {
            parameter_name: "not_in_cloud".into(),
            parameter_value: None,
            apply_method: None,
        }];

        let output = observe(&cloud, &obj).await;
        obj.late_initialize(&output).expect("late init to succeed");
        assert!(obj.spec.for_provider.parameters[0].parameter_value.is_none());
        cloud.clear_calls();

        let err = obj
            .is_up_to_date(&hook, &output)
            .await
            .expect_err("unknown parameter to fail");

        assert_eq!(err.class(), Class::Permanent);
        assert!(err.to_string().contains("not_in_cloud"), "{err}");
        assert!(cloud.mutations().is_empty());
    }
}
