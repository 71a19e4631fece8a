//! Progress hooks
//!
//! These traits allow the reconciliation engine to report progress without
//! depending on a specific UI.

use crate::types::{ActionResult, AggregateResult};

/// Progress callback for reconciliation runs
///
/// Implement this trait to receive progress updates during execution.
pub trait ProgressCallback {
    /// Called once before any entity is processed
    fn on_run_start(&mut self, noun: &str, count: usize);

    /// Called when starting to reconcile a single entity
    fn on_entity_start(&mut self, noun: &str, name: &str);

    /// Called when an entity's result is final
    fn on_entity_complete(&mut self, name: &str, result: &ActionResult);

    /// Called once after the last entity
    fn on_run_complete(&mut self, result: &AggregateResult);
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_run_start(&mut self, _noun: &str, _count: usize) {}
    fn on_entity_start(&mut self, _noun: &str, _name: &str) {}
    fn on_entity_complete(&mut self, _name: &str, _result: &ActionResult) {}
    fn on_run_complete(&mut self, _result: &AggregateResult) {}
}

/// Progress callback that writes to the `log` facade
pub struct LogProgress;

impl ProgressCallback for LogProgress {
    fn on_run_start(&mut self, noun: &str, count: usize) {
        log::info!("reconciling {count} {noun}(s)");
    }

    fn on_entity_start(&mut self, noun: &str, name: &str) {
        log::debug!("{noun} {name}");
    }

    fn on_entity_complete(&mut self, name: &str, result: &ActionResult) {
        if result.failed {
            log::warn!("{name}: {}", result.msg);
        } else {
            log::info!(
                "{name}: {} {}",
                if result.changed { "changed" } else { "ok" },
                result.msg
            );
        }
    }

    fn on_run_complete(&mut self, result: &AggregateResult) {
        log::debug!(
            "done: changed={} failed={} entities={}",
            result.changed,
            result.failed,
            result.len()
        );
    }
}
