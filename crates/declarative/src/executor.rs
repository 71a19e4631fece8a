//! Execution engine - reconciles declared entities one at a time
//!
//! Entities are processed sequentially in declaration order. A failure on
//! one entity never aborts the batch; only a failed listing does.

use crate::context::ProgressCallback;
use crate::planner::{Step, plan};
use crate::resource::{Entity, Reconciler};
use crate::types::{ActionResult, AggregateResult, EntityReport};
use anyhow::{Context, Result};
use std::collections::HashSet;

/// Reconcile all `entities` and fold their results.
///
/// Entries with an empty name are skipped silently; later duplicates of a
/// name are skipped with a warning.
pub fn reconcile<R, P>(
    reconciler: &R,
    entities: &[R::Entity],
    progress: &mut P,
) -> Result<AggregateResult>
where
    R: Reconciler,
    P: ProgressCallback,
{
    let noun = reconciler.noun();
    let snapshot = reconciler
        .list()
        .with_context(|| format!("Failed to list {noun}s"))?;

    progress.on_run_start(noun, entities.len());

    let mut seen: HashSet<&str> = HashSet::new();
    let mut aggregate = AggregateResult::default();

    for entity in entities {
        // Reported under the exact name the reconciler acts on
        let name = entity.name();
        if name.trim().is_empty() {
            log::debug!("skipping {noun} without a name");
            continue;
        }
        if !seen.insert(name) {
            log::warn!("skipping duplicate {noun} '{name}'");
            continue;
        }

        progress.on_entity_start(noun, name);
        let result = reconcile_entity(reconciler, &snapshot, entity);
        progress.on_entity_complete(name, &result);
        aggregate.push(EntityReport::new(name, result));
    }

    progress.on_run_complete(&aggregate);
    Ok(aggregate)
}

/// Reconcile a single entity against a snapshot.
pub fn reconcile_entity<R: Reconciler>(
    reconciler: &R,
    snapshot: &R::Snapshot,
    entity: &R::Entity,
) -> ActionResult {
    let desired = entity.desired_state();
    if desired.is_toggle() && !reconciler.supports_toggle() {
        return reconciler.unsupported(entity);
    }

    let observed = match reconciler.observe(snapshot, entity) {
        Ok(observed) => observed,
        Err(e) => return ActionResult::failed(format!("{e:#}")),
    };

    let mut result = ActionResult::default();
    let mut created = false;

    for step in plan(desired, observed) {
        let outcome = match step {
            Step::Create => reconciler.create(entity).map(Some),
            Step::Enable => reconciler.enable(entity).map(Some),
            Step::Disable => reconciler.disable(entity).map(Some),
            Step::Remove => reconciler.remove(entity).map(Some),
            Step::Converge => reconciler.converge(snapshot, entity, created),
            noop => Ok(Some(reconciler.already(noop, entity))),
        };
        let outcome = outcome.unwrap_or_else(|e| Some(ActionResult::failed(format!("{e:#}"))));
        let Some(outcome) = outcome else {
            continue;
        };

        let failed = outcome.failed;
        if step == Step::Create {
            created = !failed;
        }
        result.merge(outcome);

        // Nothing else can succeed on an entity that does not exist
        if step == Step::Create && failed {
            break;
        }
    }

    result
}
