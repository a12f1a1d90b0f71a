//! # Fake module
//!
//! This module provide an in-memory documentdb api recording every call, it
//! is used to exercise reconcilers without reaching aws

use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;

use crate::svc::aws::{
    client::Connect,
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
// Constants

pub const PARAMETERS_PAGE_SIZE: usize = 2;

// -----------------------------------------------------------------------------
// Call enumeration

#[derive(Clone, PartialEq, Debug)]
pub enum Call {
    DescribeDbClusters(DescribeDbClustersInput),
    CreateDbCluster(CreateDbClusterInput),
    ModifyDbCluster(ModifyDbClusterInput),
    DeleteDbCluster(DeleteDbClusterInput),
    DescribeDbClusterParameterGroups(DescribeDbClusterParameterGroupsInput),
    DescribeDbClusterParameters(DescribeDbClusterParametersInput),
    CreateDbClusterParameterGroup(CreateDbClusterParameterGroupInput),
    ModifyDbClusterParameterGroup(ModifyDbClusterParameterGroupInput),
    DeleteDbClusterParameterGroup(DeleteDbClusterParameterGroupInput),
    DescribeDbSubnetGroups(DescribeDbSubnetGroupsInput),
    CreateDbSubnetGroup(CreateDbSubnetGroupInput),
    ModifyDbSubnetGroup(ModifyDbSubnetGroupInput),
    DeleteDbSubnetGroup(DeleteDbSubnetGroupInput),
    DescribeDbInstances(DescribeDbInstancesInput),
    CreateDbInstance(CreateDbInstanceInput),
    ModifyDbInstance(ModifyDbInstanceInput),
    DeleteDbInstance(DeleteDbInstanceInput),
    ListTagsForResource(String),
    AddTagsToResource(String, Vec<Tag>),
    RemoveTagsFromResource(String, Vec<String>),
}

impl Call {
    /// returns if the call may change the state of a cloud resource
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            Self::DescribeDbClusters(_)
                | Self::DescribeDbClusterParameterGroups(_)
                | Self::DescribeDbClusterParameters(_)
                | Self::DescribeDbSubnetGroups(_)
                | Self::DescribeDbInstances(_)
                | Self::ListTagsForResource(_)
        )
    }
}

// -----------------------------------------------------------------------------
// FakeDocDb structure

#[derive(Default, Debug)]
struct State {
    clusters: BTreeMap<String, DbCluster>,
    groups: BTreeMap<String, DbClusterParameterGroup>,
    parameters: HashMap<String, Vec<Parameter>>,
    subnet_groups: BTreeMap<String, DbSubnetGroup>,
    instances: BTreeMap<String, DbInstance>,
    tags: HashMap<String, Vec<Tag>>,
    calls: Vec<Call>,
    failures: HashMap<&'static str, Error>,
}

#[derive(Default, Debug)]
pub struct FakeDocDb {
    state: Mutex<State>,
}

pub fn cluster_arn(id: &str) -> String {
    format!("arn:aws:rds:us-east-1:123456789012:cluster:{id}")
}

pub fn parameter_group_arn(name: &str) -> String {
    format!("arn:aws:rds:us-east-1:123456789012:cluster-pg:{name}")
}

pub fn subnet_group_arn(name: &str) -> String {
    format!("arn:aws:rds:us-east-1:123456789012:subgrp:{name}")
}

pub fn instance_arn(id: &str) -> String {
    format!("arn:aws:rds:us-east-1:123456789012:db:{id}")
}

fn identifier(value: &Option<String>) -> String {
    value.to_owned().unwrap_or_default()
}

impl FakeDocDb {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// registers the call, then returns the injected failure of the operation
    /// if any
    fn enter(&self, operation: &'static str, call: Call) -> Result<MutexGuard<'_, State>, Error> {
        let mut state = self.lock();
        state.calls.push(call);

        match state.failures.remove(operation) {
            Some(err) => Err(err),
            None => Ok(state),
        }
    }

    /// the next call of the given operation returns the error
    pub fn fail(&self, operation: &'static str, err: Error) {
        self.lock().failures.insert(operation, err);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.to_owned()
    }

    pub fn mutations(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutation).collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn put_cluster(&self, cluster: DbCluster) {
        let id = identifier(&cluster.db_cluster_identifier);
        let mut cluster = cluster;
        cluster.db_cluster_arn.get_or_insert_with(|| cluster_arn(&id));
        self.lock().clusters.insert(id, cluster);
    }

    pub fn cluster(&self, id: &str) -> Option<DbCluster> {
        self.lock().clusters.get(id).cloned()
    }

    pub fn set_cluster_status(&self, id: &str, status: &str) {
        if let Some(cluster) = self.lock().clusters.get_mut(id) {
            cluster.status = Some(status.to_string());
        }
    }

    pub fn remove_cluster(&self, id: &str) {
        self.lock().clusters.remove(id);
    }

    pub fn put_parameter_group(&self, group: DbClusterParameterGroup, parameters: Vec<Parameter>) {
        let name = identifier(&group.db_cluster_parameter_group_name);
        let mut group = group;
        group
            .db_cluster_parameter_group_arn
            .get_or_insert_with(|| parameter_group_arn(&name));

        let mut state = self.lock();
        state.groups.insert(name.to_owned(), group);
        state.parameters.insert(name, parameters);
    }

    pub fn parameters(&self, name: &str) -> Vec<Parameter> {
        self.lock().parameters.get(name).cloned().unwrap_or_default()
    }

    pub fn put_subnet_group(&self, group: DbSubnetGroup) {
        let name = identifier(&group.db_subnet_group_name);
        let mut group = group;
        group
            .db_subnet_group_arn
            .get_or_insert_with(|| subnet_group_arn(&name));
        self.lock().subnet_groups.insert(name, group);
    }

    pub fn put_instance(&self, instance: DbInstance) {
        let id = identifier(&instance.db_instance_identifier);
        let mut instance = instance;
        instance.db_instance_arn.get_or_insert_with(|| instance_arn(&id));
        self.lock().instances.insert(id, instance);
    }

    pub fn instance(&self, id: &str) -> Option<DbInstance> {
        self.lock().instances.get(id).cloned()
    }

    pub fn put_tags(&self, arn: &str, tags: Vec<Tag>) {
        self.lock().tags.insert(arn.to_string(), tags);
    }

    pub fn tags(&self, arn: &str) -> Vec<Tag> {
        self.lock().tags.get(arn).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl DocDb for FakeDocDb {
    async fn describe_db_clusters(
        &self,
        input: DescribeDbClustersInput,
    ) -> Result<DescribeDbClustersOutput, Error> {
        let state = self.enter("DescribeDBClusters", Call::DescribeDbClusters(input.to_owned()))?;

        let db_clusters = match &input.db_cluster_identifier {
            None => state.clusters.values().cloned().collect(),
            Some(id) => match state.clusters.get(id) {
                Some(cluster) => vec![cluster.to_owned()],
                None => {
                    return Err(Error::api(
                        "DBClusterNotFoundFault",
                        &format!("DBCluster {id} not found."),
                    ))
                }
            },
        };

        Ok(DescribeDbClustersOutput { db_clusters })
    }

    async fn create_db_cluster(
        &self,
        input: CreateDbClusterInput,
    ) -> Result<CreateDbClusterOutput, Error> {
        let mut state = self.enter("CreateDBCluster", Call::CreateDbCluster(input.to_owned()))?;
        let id = identifier(&input.db_cluster_identifier);

        if state.clusters.contains_key(&id) {
            return Err(Error::api(
                "DBClusterAlreadyExistsFault",
                &format!("DB Cluster {id} already exists"),
            ));
        }

        let cluster = DbCluster {
            db_cluster_identifier: Some(id.to_owned()),
            db_cluster_arn: Some(cluster_arn(&id)),
            db_cluster_resource_id: Some(format!("cluster-{id}")),
            status: Some("creating".to_string()),
            availability_zones: input.availability_zones.unwrap_or_default(),
            backup_retention_period: input.backup_retention_period.or(Some(1)),
            db_cluster_parameter_group: input
                .db_cluster_parameter_group_name
                .or_else(|| Some("default.docdb5.0".to_string())),
            db_subnet_group: input.db_subnet_group_name.or_else(|| Some("default".to_string())),
            deletion_protection: input.deletion_protection.or(Some(false)),
            enabled_cloudwatch_logs_exports: input.enable_cloudwatch_logs_exports.unwrap_or_default(),
            endpoint: Some(format!("{id}.cluster-abc.us-east-1.docdb.amazonaws.com")),
            reader_endpoint: Some(format!("{id}.cluster-ro-abc.us-east-1.docdb.amazonaws.com")),
            hosted_zone_id: Some("ZNKXH85TT8WVW".to_string()),
            engine: input.engine,
            engine_version: input.engine_version.or_else(|| Some("5.0.0".to_string())),
            kms_key_id: input.kms_key_id,
            master_username: input.master_username,
            port: input.port.or(Some(27017)),
            preferred_backup_window: input
                .preferred_backup_window
                .or_else(|| Some("07:00-07:30".to_string())),
            preferred_maintenance_window: input
                .preferred_maintenance_window
                .or_else(|| Some("sun:08:00-sun:08:30".to_string())),
            storage_encrypted: input.storage_encrypted.or(Some(false)),
            vpc_security_group_ids: input.vpc_security_group_ids.unwrap_or_default(),
        };

        state.tags.insert(cluster_arn(&id), input.tags);
        state.clusters.insert(id, cluster.to_owned());

        Ok(CreateDbClusterOutput {
            db_cluster: Some(cluster),
        })
    }

    async fn modify_db_cluster(
        &self,
        input: ModifyDbClusterInput,
    ) -> Result<ModifyDbClusterOutput, Error> {
        let mut state = self.enter("ModifyDBCluster", Call::ModifyDbCluster(input.to_owned()))?;
        let id = identifier(&input.db_cluster_identifier);

        let cluster = state.clusters.get_mut(&id).ok_or_else(|| {
            Error::api("DBClusterNotFoundFault", &format!("DBCluster {id} not found."))
        })?;

        if let Some(value) = input.backup_retention_period {
            cluster.backup_retention_period = Some(value);
        }
        if let Some(value) = input.db_cluster_parameter_group_name {
            cluster.db_cluster_parameter_group = Some(value);
        }
        if let Some(value) = input.deletion_protection {
            cluster.deletion_protection = Some(value);
        }
        if let Some(value) = input.engine_version {
            cluster.engine_version = Some(value);
        }
        if let Some(value) = input.port {
            cluster.port = Some(value);
        }
        if let Some(value) = input.preferred_backup_window {
            cluster.preferred_backup_window = Some(value);
        }
        if let Some(value) = input.preferred_maintenance_window {
            cluster.preferred_maintenance_window = Some(value);
        }
        if let Some(value) = input.vpc_security_group_ids {
            cluster.vpc_security_group_ids = value;
        }
        if let Some(config) = input.cloudwatch_logs_export_configuration {
            let logs = &mut cluster.enabled_cloudwatch_logs_exports;
            logs.retain(|log| !config.disable_log_types.contains(log));
            for log in config.enable_log_types {
                if !logs.contains(&log) {
                    logs.push(log);
                }
            }
        }

        Ok(ModifyDbClusterOutput {
            db_cluster: Some(cluster.to_owned()),
        })
    }

    async fn delete_db_cluster(&self, input: DeleteDbClusterInput) -> Result<(), Error> {
        let mut state = self.enter("DeleteDBCluster", Call::DeleteDbCluster(input.to_owned()))?;
        let id = identifier(&input.db_cluster_identifier);

        let cluster = state.clusters.get_mut(&id).ok_or_else(|| {
            Error::api("DBClusterNotFoundFault", &format!("DBCluster {id} not found."))
        })?;

        cluster.status = Some("deleting".to_string());
        Ok(())
    }

    async fn describe_db_cluster_parameter_groups(
        &self,
        input: DescribeDbClusterParameterGroupsInput,
    ) -> Result<DescribeDbClusterParameterGroupsOutput, Error> {
        let state = self.enter(
            "DescribeDBClusterParameterGroups",
            Call::DescribeDbClusterParameterGroups(input.to_owned()),
        )?;

        let db_cluster_parameter_groups = match &input.db_cluster_parameter_group_name {
            None => state.groups.values().cloned().collect(),
            Some(name) => match state.groups.get(name) {
                Some(group) => vec![group.to_owned()],
                None => {
                    return Err(Error::api(
                        "DBParameterGroupNotFound",
                        &format!("DBClusterParameterGroup not found: {name}"),
                    ))
                }
            },
        };

        Ok(DescribeDbClusterParameterGroupsOutput {
            db_cluster_parameter_groups,
        })
    }

    async fn describe_db_cluster_parameters(
        &self,
        input: DescribeDbClusterParametersInput,
    ) -> Result<DescribeDbClusterParametersOutput, Error> {
        let state = self.enter(
            "DescribeDBClusterParameters",
            Call::DescribeDbClusterParameters(input.to_owned()),
        )?;

        let name = identifier(&input.db_cluster_parameter_group_name);
        let parameters = state.parameters.get(&name).ok_or_else(|| {
            Error::api(
                "DBParameterGroupNotFound",
                &format!("DBClusterParameterGroup not found: {name}"),
            )
        })?;

        let offset = input
            .marker
            .as_deref()
            .and_then(|marker| marker.parse::<usize>().ok())
            .unwrap_or(0);

        let end = (offset + PARAMETERS_PAGE_SIZE).min(parameters.len());
        let marker = (end < parameters.len()).then(|| end.to_string());

        Ok(DescribeDbClusterParametersOutput {
            parameters: parameters[offset.min(end)..end].to_vec(),
            marker,
        })
    }

    async fn create_db_cluster_parameter_group(
        &self,
        input: CreateDbClusterParameterGroupInput,
    ) -> Result<CreateDbClusterParameterGroupOutput, Error> {
        let mut state = self.enter(
            "CreateDBClusterParameterGroup",
            Call::CreateDbClusterParameterGroup(input.to_owned()),
        )?;

        let name = identifier(&input.db_cluster_parameter_group_name);
        if state.groups.contains_key(&name) {
            return Err(Error::api(
                "DBParameterGroupAlreadyExists",
                &format!("Parameter group {name} already exists"),
            ));
        }

        let group = DbClusterParameterGroup {
            db_cluster_parameter_group_name: Some(name.to_owned()),
            db_cluster_parameter_group_arn: Some(parameter_group_arn(&name)),
            db_parameter_group_family: input.db_parameter_group_family,
            description: input.description,
        };

        state.tags.insert(parameter_group_arn(&name), input.tags);
        state.parameters.insert(name.to_owned(), vec![]);
        state.groups.insert(name, group.to_owned());

        Ok(CreateDbClusterParameterGroupOutput {
            db_cluster_parameter_group: Some(group),
        })
    }

    async fn modify_db_cluster_parameter_group(
        &self,
        input: ModifyDbClusterParameterGroupInput,
    ) -> Result<ModifyDbClusterParameterGroupOutput, Error> {
        let mut state = self.enter(
            "ModifyDBClusterParameterGroup",
            Call::ModifyDbClusterParameterGroup(input.to_owned()),
        )?;

        let name = identifier(&input.db_cluster_parameter_group_name);
        let parameters = state.parameters.get_mut(&name).ok_or_else(|| {
            Error::api(
                "DBParameterGroupNotFound",
                &format!("DBClusterParameterGroup not found: {name}"),
            )
        })?;

        for parameter in input.parameters {
            match parameters
                .iter_mut()
                .find(|p| p.parameter_name == parameter.parameter_name)
            {
                Some(existing) => {
                    existing.parameter_value = parameter.parameter_value;
                    existing.apply_method = parameter.apply_method;
                    existing.source = Some("user".to_string());
                }
                None => parameters.push(Parameter {
                    source: Some("user".to_string()),
                    ..parameter
                }),
            }
        }

        Ok(ModifyDbClusterParameterGroupOutput {
            db_cluster_parameter_group_name: Some(name),
        })
    }

    async fn delete_db_cluster_parameter_group(
        &self,
        input: DeleteDbClusterParameterGroupInput,
    ) -> Result<(), Error> {
        let mut state = self.enter(
            "DeleteDBClusterParameterGroup",
            Call::DeleteDbClusterParameterGroup(input.to_owned()),
        )?;

        let name = identifier(&input.db_cluster_parameter_group_name);
        if state.groups.remove(&name).is_none() {
            return Err(Error::api(
                "DBParameterGroupNotFound",
                &format!("DBClusterParameterGroup not found: {name}"),
            ));
        }

        state.parameters.remove(&name);
        Ok(())
    }

    async fn describe_db_subnet_groups(
        &self,
        input: DescribeDbSubnetGroupsInput,
    ) -> Result<DescribeDbSubnetGroupsOutput, Error> {
        let state = self.enter(
            "DescribeDBSubnetGroups",
            Call::DescribeDbSubnetGroups(input.to_owned()),
        )?;

        let db_subnet_groups = match &input.db_subnet_group_name {
            None => state.subnet_groups.values().cloned().collect(),
            Some(name) => match state.subnet_groups.get(name) {
                Some(group) => vec![group.to_owned()],
                None => {
                    return Err(Error::api(
                        "DBSubnetGroupNotFoundFault",
                        &format!("DB subnet group '{name}' not found."),
                    ))
                }
            },
        };

        Ok(DescribeDbSubnetGroupsOutput { db_subnet_groups })
    }

    async fn create_db_subnet_group(
        &self,
        input: CreateDbSubnetGroupInput,
    ) -> Result<CreateDbSubnetGroupOutput, Error> {
        let mut state = self.enter(
            "CreateDBSubnetGroup",
            Call::CreateDbSubnetGroup(input.to_owned()),
        )?;

        let name = identifier(&input.db_subnet_group_name);
        if state.subnet_groups.contains_key(&name) {
            return Err(Error::api(
                "DBSubnetGroupAlreadyExists",
                &format!("The DB subnet group '{name}' already exists."),
            ));
        }

        let group = DbSubnetGroup {
            db_subnet_group_name: Some(name.to_owned()),
            db_subnet_group_arn: Some(subnet_group_arn(&name)),
            db_subnet_group_description: input.db_subnet_group_description,
            subnet_group_status: Some("Complete".to_string()),
            subnet_ids: input.subnet_ids,
            vpc_id: Some("vpc-0a1b2c3d".to_string()),
        };

        state.tags.insert(subnet_group_arn(&name), input.tags);
        state.subnet_groups.insert(name, group.to_owned());

        Ok(CreateDbSubnetGroupOutput {
            db_subnet_group: Some(group),
        })
    }

    async fn modify_db_subnet_group(
        &self,
        input: ModifyDbSubnetGroupInput,
    ) -> Result<ModifyDbSubnetGroupOutput, Error> {
        let mut state = self.enter(
            "ModifyDBSubnetGroup",
            Call::ModifyDbSubnetGroup(input.to_owned()),
        )?;

        let name = identifier(&input.db_subnet_group_name);
        let group = state.subnet_groups.get_mut(&name).ok_or_else(|| {
            Error::api(
                "DBSubnetGroupNotFoundFault",
                &format!("DB subnet group '{name}' not found."),
            )
        })?;

        if input.db_subnet_group_description.is_some() {
            group.db_subnet_group_description = input.db_subnet_group_description;
        }
        group.subnet_ids = input.subnet_ids;

        Ok(ModifyDbSubnetGroupOutput {
            db_subnet_group: Some(group.to_owned()),
        })
    }

    async fn delete_db_subnet_group(&self, input: DeleteDbSubnetGroupInput) -> Result<(), Error> {
        let mut state = self.enter(
            "DeleteDBSubnetGroup",
            Call::DeleteDbSubnetGroup(input.to_owned()),
        )?;

        let name = identifier(&input.db_subnet_group_name);
        match state.subnet_groups.remove(&name) {
            Some(_) => Ok(()),
            None => Err(Error::api(
                "DBSubnetGroupNotFoundFault",
                &format!("DB subnet group '{name}' not found."),
            )),
        }
    }

    async fn describe_db_instances(
        &self,
        input: DescribeDbInstancesInput,
    ) -> Result<DescribeDbInstancesOutput, Error> {
        let state = self.enter(
            "DescribeDBInstances",
            Call::DescribeDbInstances(input.to_owned()),
        )?;

        let db_instances = match &input.db_instance_identifier {
            None => state.instances.values().cloned().collect(),
            Some(id) => match state.instances.get(id) {
                Some(instance) => vec![instance.to_owned()],
                None => {
                    return Err(Error::api(
                        "DBInstanceNotFound",
                        &format!("DBInstance {id} not found."),
                    ))
                }
            },
        };

        Ok(DescribeDbInstancesOutput { db_instances })
    }

    async fn create_db_instance(
        &self,
        input: CreateDbInstanceInput,
    ) -> Result<CreateDbInstanceOutput, Error> {
        let mut state = self.enter("CreateDBInstance", Call::CreateDbInstance(input.to_owned()))?;
        let id = identifier(&input.db_instance_identifier);

        if state.instances.contains_key(&id) {
            return Err(Error::api(
                "DBInstanceAlreadyExists",
                &format!("DB instance {id} already exists"),
            ));
        }

        let instance = DbInstance {
            db_instance_identifier: Some(id.to_owned()),
            db_instance_arn: Some(instance_arn(&id)),
            db_instance_class: input.db_instance_class,
            db_instance_status: Some("creating".to_string()),
            db_cluster_identifier: input.db_cluster_identifier,
            dbi_resource_id: Some(format!("db-{id}")),
            auto_minor_version_upgrade: input.auto_minor_version_upgrade.or(Some(true)),
            availability_zone: input.availability_zone.or_else(|| Some("us-east-1a".to_string())),
            ca_certificate_identifier: Some("rds-ca-rsa2048-g1".to_string()),
            endpoint: Some(Endpoint {
                address: Some(format!("{id}.abc.us-east-1.docdb.amazonaws.com")),
                port: Some(27017),
                hosted_zone_id: Some("ZNKXH85TT8WVW".to_string()),
            }),
            engine: input.engine,
            preferred_maintenance_window: input
                .preferred_maintenance_window
                .or_else(|| Some("sun:08:00-sun:08:30".to_string())),
            promotion_tier: input.promotion_tier.or(Some(1)),
            ..Default::default()
        };

        state.tags.insert(instance_arn(&id), input.tags);
        state.instances.insert(id, instance.to_owned());

        Ok(CreateDbInstanceOutput {
            db_instance: Some(instance),
        })
    }

    async fn modify_db_instance(
        &self,
        input: ModifyDbInstanceInput,
    ) -> Result<ModifyDbInstanceOutput, Error> {
        let mut state = self.enter("ModifyDBInstance", Call::ModifyDbInstance(input.to_owned()))?;
        let id = identifier(&input.db_instance_identifier);

        let instance = state.instances.get_mut(&id).ok_or_else(|| {
            Error::api("DBInstanceNotFound", &format!("DBInstance {id} not found."))
        })?;

        if let Some(value) = input.db_instance_class {
            instance.db_instance_class = Some(value);
        }
        if let Some(value) = input.auto_minor_version_upgrade {
            instance.auto_minor_version_upgrade = Some(value);
        }
        if let Some(value) = input.ca_certificate_identifier {
            instance.ca_certificate_identifier = Some(value);
        }
        if let Some(value) = input.preferred_maintenance_window {
            instance.preferred_maintenance_window = Some(value);
        }
        if let Some(value) = input.promotion_tier {
            instance.promotion_tier = Some(value);
        }

        Ok(ModifyDbInstanceOutput {
            db_instance: Some(instance.to_owned()),
        })
    }

    async fn delete_db_instance(&self, input: DeleteDbInstanceInput) -> Result<(), Error> {
        let mut state = self.enter("DeleteDBInstance", Call::DeleteDbInstance(input.to_owned()))?;
        let id = identifier(&input.db_instance_identifier);

        let instance = state.instances.get_mut(&id).ok_or_else(|| {
            Error::api("DBInstanceNotFound", &format!("DBInstance {id} not found."))
        })?;

        instance.db_instance_status = Some("deleting".to_string());
        Ok(())
    }

    async fn list_tags_for_resource(&self, arn: &str) -> Result<Vec<Tag>, Error> {
        let state = self.enter(
            "ListTagsForResource",
            Call::ListTagsForResource(arn.to_string()),
        )?;

        Ok(state.tags.get(arn).cloned().unwrap_or_default())
    }

    async fn add_tags_to_resource(&self, arn: &str, tags: Vec<Tag>) -> Result<(), Error> {
        let mut state = self.enter(
            "AddTagsToResource",
            Call::AddTagsToResource(arn.to_string(), tags.to_owned()),
        )?;

        let current = state.tags.entry(arn.to_string()).or_default();
        for tag in tags {
            current.retain(|t| t.key != tag.key);
            current.push(tag);
        }

        Ok(())
    }

    async fn remove_tags_from_resource(&self, arn: &str, keys: Vec<String>) -> Result<(), Error> {
        let mut state = self.enter(
            "RemoveTagsFromResource",
            Call::RemoveTagsFromResource(arn.to_string(), keys.to_owned()),
        )?;

        if let Some(current) = state.tags.get_mut(arn) {
            current.retain(|t| !keys.contains(&t.key));
        }

        Ok(())
    }
}

// -----------------------------------------------------------------------------
// FakeConnector structure

/// connector always returning the same fake client, regions asked for are
/// recorded
#[derive(Default, Debug)]
pub struct FakeConnector {
    pub docdb: Arc<FakeDocDb>,
    regions: Mutex<Vec<Option<String>>>,
}

impl FakeConnector {
    pub fn regions(&self) -> Vec<Option<String>> {
        self.regions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .to_owned()
    }
}

#[async_trait]
impl Connect for FakeConnector {
    async fn connect(&self, region: Option<&str>) -> Result<Arc<dyn DocDb>, Error> {
        self.regions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(region.map(ToString::to_string));

        Ok(self.docdb.to_owned())
    }
}
