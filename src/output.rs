//! Module result envelope
//!
//! Every run prints exactly one JSON object on stdout, the shape Ansible
//! expects from a module. Optional members are omitted when unset.

use declarative::{AggregateResult, EntityReport};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Serialize)]
pub struct ModuleResult {
    pub changed: bool,
    pub failed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,

    /// Per-entity results in declaration order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<Vec<EntityReport>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updates: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub applications: Option<BTreeMap<String, String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<serde_json::Value>,
}

impl ModuleResult {
    pub fn ok(msg: impl Into<String>) -> Self {
        Self {
            msg: Some(msg.into()),
            ..Default::default()
        }
    }

    pub fn changed(msg: impl Into<String>) -> Self {
        Self {
            changed: true,
            msg: Some(msg.into()),
            ..Default::default()
        }
    }

    pub fn failed(msg: impl Into<String>) -> Self {
        Self {
            failed: true,
            msg: Some(msg.into()),
            ..Default::default()
        }
    }

    /// Envelope for a top-level error, with the full context chain
    pub fn from_error(err: &anyhow::Error) -> Self {
        Self::failed(format!("{err:#}"))
    }

    pub fn with_diff(mut self, diff: Option<String>) -> Self {
        self.diff = diff;
        self
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"changed": false, "failed": true, "msg": "could not encode result: {e}"}}"#)
        })
    }
}

impl From<AggregateResult> for ModuleResult {
    fn from(aggregate: AggregateResult) -> Self {
        Self {
            changed: aggregate.changed,
            failed: aggregate.failed,
            state: Some(aggregate.state),
            ..Default::default()
        }
    }
}
