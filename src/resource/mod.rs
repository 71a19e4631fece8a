//! Reconcilers for Nextcloud entities
//!
//! Each kind implements [`declarative::Reconciler`] over an
//! [`occkit::Client`]:
//! - Observation comes from one listing per run
//! - Mutations are single occ commands
//! - A non-zero exit is judged through the client's output classifier

use declarative::ActionResult;
use occkit::{Client, CommandOutcome, OutputClass};
use serde_json::Value;

pub mod app;
pub mod group;
pub mod user;

pub use app::AppReconciler;
pub use group::GroupReconciler;
pub use user::UserReconciler;

/// Turn a mutation's outcome into a result.
///
/// Exit 0 is a change. A non-zero exit whose output falls into `benign` is
/// an unchanged no-op reported as `benign_msg`. Anything else fails with
/// occ's own text.
pub fn judge(
    client: &Client,
    outcome: &CommandOutcome,
    success_msg: &str,
    benign: OutputClass,
    benign_msg: &str,
) -> ActionResult {
    if outcome.success() {
        return ActionResult::changed(success_msg);
    }
    match client.classify(outcome) {
        Some(hit) if hit.class == benign => {
            log::debug!("treating '{}' as {}", hit.line, benign.description());
            ActionResult::unchanged(benign_msg)
        }
        _ => ActionResult::failed(failure_text(outcome)),
    }
}

/// Like [`judge`] for commands without a benign failure mode
pub fn expect_success(outcome: &CommandOutcome, success_msg: &str) -> ActionResult {
    if outcome.success() {
        ActionResult::changed(success_msg)
    } else {
        ActionResult::failed(failure_text(outcome))
    }
}

fn failure_text(outcome: &CommandOutcome) -> String {
    let msg = outcome.message();
    if msg.is_empty() {
        format!("occ exited with code {}", outcome.exit_code)
    } else {
        msg
    }
}

/// Render a scalar setting value the way occ stores it.
///
/// Booleans follow Nextcloud's `yes`/`no` convention. Structured values
/// have no string form and yield `None`.
pub fn setting_value(value: &Value, allow_numbers: bool) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(true) => Some("yes".to_string()),
        Value::Bool(false) => Some("no".to_string()),
        Value::Number(n) if allow_numbers => Some(n.to_string()),
        _ => None,
    }
}

/// Join names as `a, b, c`
pub fn join(names: &[String]) -> String {
    names.join(", ")
}
