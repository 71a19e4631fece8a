//! Group reconciler

use anyhow::Result;
use declarative::{ActionResult, Entity, ObservedState, Reconciler, Step};
use occkit::{Client, GroupListing, OutputClass};

use super::judge;
use crate::params::GroupSpec;

const EXISTS: &str = "The group has already been created.";
const MISSING: &str = "The group does not exist (anymore).";

pub struct GroupReconciler<'a> {
    client: &'a Client,
}

impl<'a> GroupReconciler<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }
}

impl Reconciler for GroupReconciler<'_> {
    type Entity = GroupSpec;
    type Snapshot = GroupListing;

    fn noun(&self) -> &'static str {
        "group"
    }

    fn list(&self) -> Result<GroupListing> {
        Ok(self.client.list_groups()?)
    }

    fn observe(&self, snapshot: &GroupListing, group: &GroupSpec) -> Result<ObservedState> {
        Ok(if snapshot.contains(group.name()) {
            ObservedState::Present
        } else {
            ObservedState::Absent
        })
    }

    fn create(&self, group: &GroupSpec) -> Result<ActionResult> {
        let outcome = self
            .client
            .add_group(group.name(), group.display_name.as_deref())?;
        Ok(judge(
            self.client,
            &outcome,
            "Group was successfully created.",
            OutputClass::AlreadyExists,
            EXISTS,
        ))
    }

    // Toggles are rejected by the executor before any step runs
    fn enable(&self, group: &GroupSpec) -> Result<ActionResult> {
        Ok(self.unsupported(group))
    }

    fn disable(&self, group: &GroupSpec) -> Result<ActionResult> {
        Ok(self.unsupported(group))
    }

    fn remove(&self, group: &GroupSpec) -> Result<ActionResult> {
        let outcome = self.client.delete_group(group.name())?;
        Ok(judge(
            self.client,
            &outcome,
            "Group was successfully removed.",
            OutputClass::Missing,
            MISSING,
        ))
    }

    fn converge(&self, _: &GroupListing, _: &GroupSpec, _: bool) -> Result<Option<ActionResult>> {
        Ok(None)
    }

    fn supports_toggle(&self) -> bool {
        false
    }

    fn already(&self, step: Step, _group: &GroupSpec) -> ActionResult {
        match step {
            Step::AlreadyAbsent => ActionResult::unchanged(MISSING),
            _ => ActionResult::unchanged(EXISTS),
        }
    }
}
