//! Reconciler trait for idempotent state management
//!
//! A [`Reconciler`] knows how to observe and mutate one kind of entity
//! (apps, users, groups). The executor asks the planner which steps to run
//! and calls back into the reconciler for each one.

use crate::planner::Step;
use crate::types::{ActionResult, DesiredState, ObservedState};
use anyhow::Result;

/// A declared entity
pub trait Entity {
    /// Unique key; empty means the declaration is skipped
    fn name(&self) -> &str;

    /// Target state
    fn desired_state(&self) -> DesiredState;
}

/// Capabilities for one entity kind
///
/// Mutations return an [`ActionResult`] rather than an error when the
/// command ran but failed; `Err` is reserved for conditions like an
/// undecodable listing. The executor turns any `Err` into a failed result
/// for that entity only.
///
/// # Example
///
/// ```ignore
/// struct GroupReconciler<'a> { client: &'a Client }
///
/// impl Reconciler for GroupReconciler<'_> {
///     type Entity = GroupSpec;
///     type Snapshot = GroupListing;
///
///     fn noun(&self) -> &'static str { "group" }
///     fn list(&self) -> Result<GroupListing> { Ok(self.client.list_groups()?) }
///     fn observe(&self, s: &GroupListing, g: &GroupSpec) -> Result<ObservedState> {
///         Ok(if s.contains(g.name()) { ObservedState::Present } else { ObservedState::Absent })
///     }
///     // ...
/// }
/// ```
pub trait Reconciler {
    /// Declared entity type
    type Entity: Entity;

    /// Observed state of all entities of this kind, listed once per run
    type Snapshot;

    /// Singular noun used in messages ("app", "user", "group")
    fn noun(&self) -> &'static str;

    /// List the current state
    fn list(&self) -> Result<Self::Snapshot>;

    /// Observe one entity within the snapshot
    fn observe(&self, snapshot: &Self::Snapshot, entity: &Self::Entity) -> Result<ObservedState>;

    /// Create the entity
    fn create(&self, entity: &Self::Entity) -> Result<ActionResult>;

    /// Enable the entity
    fn enable(&self, entity: &Self::Entity) -> Result<ActionResult>;

    /// Disable the entity
    fn disable(&self, entity: &Self::Entity) -> Result<ActionResult>;

    /// Remove the entity
    fn remove(&self, entity: &Self::Entity) -> Result<ActionResult>;

    /// Converge attributes; `None` when there is nothing to report
    ///
    /// `created` is true when the entity was created earlier in this run.
    fn converge(
        &self,
        snapshot: &Self::Snapshot,
        entity: &Self::Entity,
        created: bool,
    ) -> Result<Option<ActionResult>>;

    /// Whether enabled/disabled are meaningful for this kind
    fn supports_toggle(&self) -> bool {
        true
    }

    /// Result for a step that found the state already satisfied
    fn already(&self, step: Step, _entity: &Self::Entity) -> ActionResult {
        let noun = self.noun();
        let msg = match step {
            Step::AlreadyEnabled => format!("The {noun} is already enabled."),
            Step::AlreadyDisabled => format!("The {noun} is already disabled."),
            Step::AlreadyAbsent => format!("The {noun} does not exist (anymore)."),
            _ => format!("The {noun} has already been created."),
        };
        ActionResult::unchanged(msg)
    }

    /// Result for a desired state this kind does not support
    fn unsupported(&self, entity: &Self::Entity) -> ActionResult {
        ActionResult::failed(format!(
            "State '{}' is not supported for {}s.",
            entity.desired_state(),
            self.noun()
        ))
    }
}
