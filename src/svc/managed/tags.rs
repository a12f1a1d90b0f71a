//! # Tags module
//!
//! This module provide the computation of the difference between the desired
//! tags of a resource and the ones observed on aws, and its application

use std::collections::BTreeMap;

use tracing::debug;

use crate::svc::aws::{
    self,
    docdb::{DocDb, Tag},
};

// -----------------------------------------------------------------------------
// Diff structure

/// tags to add and keys to remove, a tag whose value changed appears in both
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Diff {
    pub add: Vec<Tag>,
    pub remove: Vec<String>,
}

impl Diff {
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}

// -----------------------------------------------------------------------------
// Helpers

fn index(tags: &[Tag]) -> BTreeMap<&str, &str> {
    tags.iter()
        .map(|tag| (tag.key.as_str(), tag.value.as_str()))
        .collect()
}

/// returns the operations bringing current tags to the desired ones, the order
/// of desired tags is kept for additions and the one of current tags for
/// removals
pub fn diff(desired: &[Tag], current: &[Tag]) -> Diff {
    let wanted = index(desired);
    let observed = index(current);

    let mut result = Diff::default();
    for tag in current {
        if wanted.get(tag.key.as_str()) != Some(&tag.value.as_str())
            && !result.remove.contains(&tag.key)
        {
            result.remove.push(tag.key.to_owned());
        }
    }

    for (key, value) in &wanted {
        if observed.get(key) != Some(value) {
            result.add.push(Tag::from((*key, *value)));
        }
    }

    let position = |key: &str| desired.iter().position(|tag| tag.key == key);
    result.add.sort_by_key(|tag| position(&tag.key));
    result
}

/// returns the tags obtained once the diff is applied on the current ones
pub fn apply(current: &[Tag], diff: &Diff) -> Vec<Tag> {
    let mut tags: Vec<Tag> = current
        .iter()
        .filter(|tag| !diff.remove.contains(&tag.key))
        .cloned()
        .collect();

    for tag in &diff.add {
        tags.retain(|t| t.key != tag.key);
        tags.push(tag.to_owned());
    }

    tags
}

pub fn up_to_date(desired: &[Tag], current: &[Tag]) -> bool {
    diff(desired, current).is_empty()
}

/// fetch the tags of the resource and issue at most one removal then one
/// addition to make them match the desired ones
pub async fn reconcile(cloud: &dyn DocDb, arn: &str, desired: &[Tag]) -> Result<Diff, aws::Error> {
    let current = cloud.list_tags_for_resource(arn).await?;
    let diff = diff(desired, &current);

    if !diff.remove.is_empty() {
        debug!(arn = arn, keys = ?diff.remove, "Remove tags from resource");
        cloud
            .remove_tags_from_resource(arn, diff.remove.to_owned())
            .await?;
    }

    if !diff.add.is_empty() {
        debug!(arn = arn, count = diff.add.len(), "Add tags to resource");
        cloud.add_tags_to_resource(arn, diff.add.to_owned()).await?;
    }

    Ok(diff)
}
