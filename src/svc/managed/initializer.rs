//! # Initializer module
//!
//! This module provide the initializers run on a managed resource before each
//! reconciliation, they only mutate the in-memory object and report whether
//! it needs to be persisted

use kube::ResourceExt;

use crate::svc::{
    crd::Tag,
    k8s::resource,
    managed::Managed,
};

// -----------------------------------------------------------------------------
// Constants

pub const TAG_KIND: &str = "crossplane-kind";
pub const TAG_NAME: &str = "crossplane-name";
pub const TAG_PROVIDER_CONFIG: &str = "crossplane-providerconfig";

// -----------------------------------------------------------------------------
// Initializer trait

pub trait Initializer<T: Managed>: Send + Sync {
    /// returns true if the object has been modified
    fn initialize(&self, obj: &mut T) -> bool;
}

// -----------------------------------------------------------------------------
// NameAsExternalName structure

/// use the name of the object as the identifier of the cloud resource if none
/// has been given
#[derive(Clone, Copy, Debug, Default)]
pub struct NameAsExternalName;

impl<T: Managed> Initializer<T> for NameAsExternalName {
    fn initialize(&self, obj: &mut T) -> bool {
        if resource::external_name(obj).is_some() {
            return false;
        }

        let name = obj.name_any();
        resource::set_external_name(obj, &name)
    }
}

// -----------------------------------------------------------------------------
// Tagger structure

/// inject tags identifying the object owning the cloud resource, tags already
/// set by the user win
#[derive(Clone, Debug)]
pub struct Tagger {
    pub provider_config: String,
}

impl Tagger {
    pub fn new(provider_config: impl Into<String>) -> Self {
        Self {
            provider_config: provider_config.into(),
        }
    }

    pub fn tags<T: Managed>(&self, obj: &T) -> Vec<Tag> {
        let kind = format!(
            "{}.{}",
            T::kind(&()).to_lowercase(),
            T::group(&())
        );

        let provider_config = obj
            .resource()
            .provider_config_ref
            .as_ref()
            .map_or(self.provider_config.as_str(), |r| r.name.as_str())
            .to_string();

        vec![
            Tag {
                key: TAG_KIND.to_string(),
                value: kind,
            },
            Tag {
                key: TAG_NAME.to_string(),
                value: obj.name_any(),
            },
            Tag {
                key: TAG_PROVIDER_CONFIG.to_string(),
                value: provider_config,
            },
        ]
    }
}

impl<T: Managed> Initializer<T> for Tagger {
    fn initialize(&self, obj: &mut T) -> bool {
        let mut modified = false;

        for tag in self.tags(obj) {
            let tags = obj.tags_mut();
            if tags.iter().any(|t| t.key == tag.key) {
                continue;
            }

            tags.push(tag);
            modified = true;
        }

        modified
    }
}

// -----------------------------------------------------------------------------
// Helpers

/// run every initializer even if a previous one modified the object
pub fn chain<T: Managed>(initializers: &[&dyn Initializer<T>], obj: &mut T) -> bool {
    initializers
        .iter()
        .fold(false, |modified, initializer| initializer.initialize(obj) || modified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::svc::crd::{db_subnet_group::DbSubnetGroup, Reference};

    fn group() -> DbSubnetGroup {
        let mut obj = DbSubnetGroup::new("sg1", Default::default());
        obj.metadata.namespace = Some("default".into());
        obj
    }

    #[test]
    fn name_is_used_as_external_name_once() {
        let mut obj = group();

        assert!(Initializer::<DbSubnetGroup>::initialize(&NameAsExternalName, &mut obj));
        assert_eq!(resource::external_name(&obj), Some("sg1"));

        resource::set_external_name(&mut obj, "renamed");
        assert!(!Initializer::<DbSubnetGroup>::initialize(&NameAsExternalName, &mut obj));
        assert_eq!(resource::external_name(&obj), Some("renamed"));
    }

    #[test]
    fn tagger_keeps_user_tags() {
        let mut obj = group();
        obj.spec.resource.provider_config_ref = Some(Reference {
            name: "aws-prod".into(),
        });
        obj.spec.for_provider.tags = vec![Tag {
            key: TAG_NAME.into(),
            value: "custom".into(),
        }];

        let tagger = Tagger::new("default");
        assert!(Initializer::<DbSubnetGroup>::initialize(&tagger, &mut obj));
        assert!(!Initializer::<DbSubnetGroup>::initialize(&tagger, &mut obj));

        let tags = &obj.spec.for_provider.tags;
        assert_eq!(tags.len(), 3);
        assert_eq!(tags[0].value, "custom");
        assert!(tags.contains(&Tag {
            key: TAG_KIND.into(),
            value: "dbsubnetgroup.docdb.aws.crossplane.io".into(),
        }));
        assert!(tags.contains(&Tag {
            key: TAG_PROVIDER_CONFIG.into(),
            value: "aws-prod".into(),
        }));
    }

    #[test]
    fn chain_reports_any_modification() {
        let mut obj = group();
        let tagger = Tagger::new("default");
        let initializers: [&dyn Initializer<DbSubnetGroup>; 2] = [&NameAsExternalName, &tagger];

        assert!(chain(&initializers, &mut obj));
        assert!(!chain(&initializers, &mut obj));
    }
}
