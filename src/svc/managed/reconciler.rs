//! # Reconciler module
//!
//! This module provide the kind-agnostic reconciliation pipeline of managed
//! resources: load, finalizer, initialize, resolve references, connect,
//! observe then create, update or delete the cloud resource and report
//! conditions in the status

use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use kube::ResourceExt;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::svc::{
    aws::client::Connect,
    crd::DeletionPolicy,
    k8s::{
        finalizer,
        recorder::Level,
        resource,
        store::{self, Store},
    },
    managed::{
        condition, connection,
        error::PHASE_RESOLVE_REFERENCES,
        initializer::{self, Initializer, NameAsExternalName, Tagger},
        reference::Resolver,
        Creation, Error, External, Hook, Managed, Observation, Update,
    },
};

// -----------------------------------------------------------------------------
// Constants

pub const REASON_CREATED: &str = "CreatedExternalResource";
pub const REASON_UPDATED: &str = "UpdatedExternalResource";
pub const REASON_DELETED: &str = "DeletedExternalResource";
pub const REASON_CANNOT_CREATE: &str = "CannotCreateExternalResource";
pub const REASON_CANNOT_UPDATE: &str = "CannotUpdateExternalResource";
pub const REASON_CANNOT_DELETE: &str = "CannotDeleteExternalResource";
pub const REASON_CANNOT_RESOLVE: &str = "CannotResolveReferences";
pub const REASON_CANNOT_OBSERVE: &str = "CannotObserveExternalResource";

// -----------------------------------------------------------------------------
// Options structure

#[derive(Clone, Debug)]
pub struct Options {
    /// delay before observing again a resource that needs no action
    pub poll_interval: Duration,
    /// provider config used to tag resources without `providerConfigRef`
    pub provider_config: String,
}

// -----------------------------------------------------------------------------
// Outcome enumeration

/// what the scheduler should do once the reconciliation succeeded
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Outcome {
    /// wait for the next event on the object
    Done,
    /// reconcile again as soon as possible
    Requeue,
    RequeueAfter(Duration),
}

struct Step {
    outcome: Outcome,
    /// the finalizer has been removed, the object may not exist anymore
    finalized: bool,
}

impl Step {
    fn poll(interval: Duration) -> Self {
        Self {
            outcome: Outcome::RequeueAfter(interval),
            finalized: false,
        }
    }
}

// -----------------------------------------------------------------------------
// Helpers

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn status<T: Managed>(obj: &T) -> Result<Value, Error> {
    Ok(serde_json::to_value(obj)
        .map_err(store::Error::Serialize)?
        .get("status")
        .cloned()
        .unwrap_or(Value::Null))
}

// -----------------------------------------------------------------------------
// Pipeline structure

pub struct Pipeline<'a, S: Store> {
    store: &'a S,
    connector: &'a dyn Connect,
    options: &'a Options,
}

impl<'a, S: Store> Pipeline<'a, S> {
    pub fn new(store: &'a S, connector: &'a dyn Connect, options: &'a Options) -> Self {
        Self {
            store,
            connector,
            options,
        }
    }

    /// reconcile the object identified by the given namespace and name, errors
    /// are reported in the `Synced` condition before being returned
    pub async fn reconcile<T: External>(&self, namespace: &str, name: &str) -> Result<Outcome, Error> {
        let Some(mut obj) = self.store.get::<T>(namespace, name).await? else {
            debug!(
                kind = T::kind(&()).to_string(),
                namespace = namespace,
                name = name,
                "Object does not exist anymore, skip reconciliation"
            );
            return Ok(Outcome::Done);
        };

        if !finalizer::contains(&obj, finalizer::MANAGED_RESOURCE) {
            if resource::deleted(&obj) {
                return Ok(Outcome::Done);
            }

            finalizer::add(&mut obj, finalizer::MANAGED_RESOURCE);
            self.store.update(&obj).await?;
            return Ok(Outcome::Requeue);
        }

        let observed = status(&obj)?;
        let result = self.run(&mut obj).await;

        match result {
            Ok(Step {
                outcome,
                finalized,
            }) => {
                if !finalized {
                    self.persist_status(&mut obj, &observed).await?;
                }

                Ok(outcome)
            }
            Err(err) if err.is_conflict() => Err(err),
            Err(err) => {
                condition::set(obj.conditions_mut(), err.synced());
                if let Err(status_err) = self.persist_status(&mut obj, &observed).await {
                    warn!(
                        kind = T::kind(&()).to_string(),
                        namespace = namespace,
                        name = name,
                        error = status_err.to_string(),
                        "Could not report reconciliation error in status"
                    );
                }

                Err(err)
            }
        }
    }

    async fn run<T: External>(&self, obj: &mut T) -> Result<Step, Error> {
        let deleting = resource::deleted(obj);

        if !deleting {
            let tagger = Tagger::new(self.options.provider_config.to_owned());
            let initializers: [&dyn Initializer<T>; 2] = [&NameAsExternalName, &tagger];
            if initializer::chain(&initializers, obj) {
                self.persist(obj).await.map_err(|err| err.phase("initialize"))?;
            }

            self.resolve_references(obj).await?;
        }

        let cloud = self
            .connector
            .connect(obj.region())
            .await
            .map_err(|err| Error::from(err).phase("connect"))?;

        let hook = Hook {
            cloud: cloud.as_ref(),
            secrets: self.store,
        };

        let observation = match self.observe(obj, &hook).await {
            Ok(observation) => observation,
            Err(err) => {
                self.event(obj, Level::Warning, REASON_CANNOT_OBSERVE, &err.to_string())
                    .await;
                return Err(err);
            }
        };

        if deleting {
            return self.delete(obj, &hook, &observation).await;
        }

        if !observation.exists {
            return self.create(obj, &hook).await;
        }

        if observation.up_to_date {
            connection::publish(hook.secrets, obj, &observation.connection)
                .await
                .map_err(|err| err.phase("publish connection"))?;

            condition::set(obj.conditions_mut(), condition::reconcile_success());
            return Ok(Step::poll(self.options.poll_interval));
        }

        self.update(obj, &hook, observation).await
    }

    async fn resolve_references<T: External>(&self, obj: &mut T) -> Result<(), Error> {
        let namespace = obj.namespace().unwrap_or_default();
        let resolver = Resolver::new(self.store, namespace, Resolver::<S>::controller_of(obj));
        let origin = obj.to_owned();

        if let Err(err) = obj.resolve_references(&resolver).await {
            self.event(obj, Level::Warning, REASON_CANNOT_RESOLVE, &err.to_string())
                .await;
            return Err(err.phase(PHASE_RESOLVE_REFERENCES));
        }

        if *obj != origin {
            self.persist(obj)
                .await
                .map_err(|err| err.phase(PHASE_RESOLVE_REFERENCES))?;
        }

        Ok(())
    }

    async fn observe<T: External>(&self, obj: &mut T, hook: &Hook<'_>) -> Result<Observation, Error> {
        if resource::external_name(obj).is_none() {
            return Ok(Observation::absent());
        }

        let mut input = T::DescribeInput::default();
        obj.pre_observe(&mut input)
            .map_err(|err| err.or_phase("pre-observe"))?;

        let output = match T::describe(hook.cloud, input).await {
            Ok(output) => output,
            Err(err) if err.is_code(T::NOT_FOUND) => return Ok(Observation::absent()),
            Err(err) => return Err(Error::from(err).phase("describe")),
        };

        let output = obj.filter_list(output);
        if T::is_empty(&output) {
            return Ok(Observation::absent());
        }

        let origin = obj.to_owned();
        obj.late_initialize(&output)
            .map_err(|err| err.or_phase("late-init"))?;

        if *obj != origin {
            debug!(
                kind = T::kind(&()).to_string(),
                namespace = obj.namespace().unwrap_or_default(),
                name = obj.name_any(),
                "Persist late initialized fields"
            );

            self.persist(obj).await.map_err(|err| err.phase("late-init"))?;
        }

        obj.generate_observation(&output);

        let (up_to_date, diff) = obj
            .is_up_to_date(hook, &output)
            .await
            .map_err(|err| err.or_phase("isUpToDate check"))?;

        if !up_to_date {
            info!(
                kind = T::kind(&()).to_string(),
                namespace = obj.namespace().unwrap_or_default(),
                name = obj.name_any(),
                diff = &diff,
                "External resource is not up to date"
            );
        }

        let observation = Observation {
            exists: true,
            up_to_date,
            diff,
            connection: Default::default(),
        };

        obj.post_observe(hook, &output, observation)
            .await
            .map_err(|err| err.or_phase("post-observe"))
    }

    async fn create<T: External>(&self, obj: &mut T, hook: &Hook<'_>) -> Result<Step, Error> {
        let mut input = T::CreateInput::default();
        obj.pre_create(hook, &mut input)
            .await
            .map_err(|err| err.or_phase("pre-create"))?;

        resource::set_annotation(obj, resource::ANNOTATION_EXTERNAL_CREATE_PENDING, &now());
        self.persist(obj).await.map_err(|err| err.phase("create"))?;

        let output = match T::create(hook.cloud, input).await {
            Ok(output) => Some(output),
            Err(err) if err.is_already_exists() => {
                info!(
                    kind = T::kind(&()).to_string(),
                    namespace = obj.namespace().unwrap_or_default(),
                    name = obj.name_any(),
                    "External resource already exists, adopt it"
                );
                None
            }
            Err(err) => {
                let err = Error::from(err).phase("create");

                resource::set_annotation(obj, resource::ANNOTATION_EXTERNAL_CREATE_FAILED, &now());
                if let Err(persist_err) = self.persist(obj).await {
                    warn!(
                        kind = T::kind(&()).to_string(),
                        namespace = obj.namespace().unwrap_or_default(),
                        name = obj.name_any(),
                        error = persist_err.to_string(),
                        "Could not record the failed creation"
                    );
                }

                self.event(obj, Level::Warning, REASON_CANNOT_CREATE, &err.to_string())
                    .await;
                return Err(err);
            }
        };

        let creation = match output {
            Some(output) => obj
                .post_create(hook, &output, Creation::default())
                .await
                .map_err(|err| err.or_phase("post-create"))?,
            None => Creation::default(),
        };

        resource::set_annotation(obj, resource::ANNOTATION_EXTERNAL_CREATE_SUCCEEDED, &now());
        self.persist(obj).await.map_err(|err| err.phase("post-create"))?;

        self.event(
            obj,
            Level::Normal,
            REASON_CREATED,
            "Successfully requested creation of external resource",
        )
        .await;

        connection::publish(hook.secrets, obj, &creation.connection)
            .await
            .map_err(|err| err.phase("publish connection"))?;

        condition::set(obj.conditions_mut(), condition::creating());
        condition::set(obj.conditions_mut(), condition::reconcile_success());
        Ok(Step::poll(self.options.poll_interval))
    }

    async fn update<T: External>(
        &self,
        obj: &mut T,
        hook: &Hook<'_>,
        observation: Observation,
    ) -> Result<Step, Error> {
        let mut input = T::UpdateInput::default();
        obj.pre_update(hook, &mut input)
            .await
            .map_err(|err| err.or_phase("pre-update"))?;

        let output = match T::update(hook.cloud, input).await {
            Ok(output) => output,
            Err(err) => {
                let err = Error::from(err).phase("update");
                self.event(obj, Level::Warning, REASON_CANNOT_UPDATE, &err.to_string())
                    .await;
                return Err(err);
            }
        };

        let update = obj
            .post_update(hook, &output, Update::default())
            .await
            .map_err(|err| err.or_phase("post-update"))?;

        self.event(
            obj,
            Level::Normal,
            REASON_UPDATED,
            "Successfully requested update of external resource",
        )
        .await;

        let mut details = observation.connection;
        details.extend(update.connection);
        connection::publish(hook.secrets, obj, &details)
            .await
            .map_err(|err| err.phase("publish connection"))?;

        condition::set(obj.conditions_mut(), condition::reconcile_success());
        Ok(Step::poll(self.options.poll_interval))
    }

    async fn delete<T: External>(
        &self,
        obj: &mut T,
        hook: &Hook<'_>,
        observation: &Observation,
    ) -> Result<Step, Error> {
        if !observation.exists || obj.resource().deletion_policy == DeletionPolicy::Orphan {
            info!(
                kind = T::kind(&()).to_string(),
                namespace = obj.namespace().unwrap_or_default(),
                name = obj.name_any(),
                orphan = observation.exists,
                "Release managed resource"
            );

            finalizer::remove(obj, finalizer::MANAGED_RESOURCE);
            self.store.update(&*obj).await?;

            return Ok(Step {
                outcome: Outcome::Done,
                finalized: true,
            });
        }

        let mut input = T::DeleteInput::default();
        let skip = obj
            .pre_delete(&mut input)
            .map_err(|err| err.or_phase("pre-delete"))?;

        if skip {
            debug!(
                kind = T::kind(&()).to_string(),
                namespace = obj.namespace().unwrap_or_default(),
                name = obj.name_any(),
                "External resource is already being deleted"
            );
        } else {
            match T::delete(hook.cloud, input).await {
                Ok(()) => {
                    self.event(
                        obj,
                        Level::Normal,
                        REASON_DELETED,
                        "Successfully requested deletion of external resource",
                    )
                    .await;
                }
                Err(err) if err.is_code(T::NOT_FOUND) => {}
                Err(err) => {
                    let err = Error::from(err).phase("delete");
                    self.event(obj, Level::Warning, REASON_CANNOT_DELETE, &err.to_string())
                        .await;
                    return Err(err);
                }
            }
        }

        condition::set(obj.conditions_mut(), condition::deleting());
        condition::set(obj.conditions_mut(), condition::reconcile_success());
        Ok(Step::poll(self.options.poll_interval))
    }

    /// write metadata and spec of the object, the in-memory status is kept as
    /// the api server returns the stored one
    async fn persist<T: Managed>(&self, obj: &mut T) -> Result<(), Error> {
        let status = status(obj)?;
        let updated = self.store.update(&*obj).await?;

        let mut value = serde_json::to_value(&updated).map_err(store::Error::Serialize)?;
        if let Some(map) = value.as_object_mut() {
            match status {
                Value::Null => map.remove("status"),
                status => map.insert("status".to_string(), status),
            };
        }

        *obj = serde_json::from_value(value).map_err(store::Error::Serialize)?;
        Ok(())
    }

    async fn persist_status<T: Managed>(&self, obj: &mut T, observed: &Value) -> Result<(), Error> {
        if status(obj)? == *observed {
            return Ok(());
        }

        *obj = self.store.update_status(&*obj).await?;
        Ok(())
    }

    /// record an event, failures are only logged
    async fn event<T: Managed>(&self, obj: &T, level: Level, reason: &str, message: &str) {
        if let Err(err) = self.store.record(obj, level, reason, message).await {
            warn!(
                kind = T::kind(&()).to_string(),
                namespace = obj.namespace().unwrap_or_default(),
                name = obj.name_any(),
                reason = reason,
                error = err.to_string(),
                "Could not record event"
            );
        }
    }
}
