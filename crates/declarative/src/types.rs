//! Core types for idempotent reconciliation

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// State an entity is declared to be in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DesiredState {
    /// Exists, enabled or not
    #[default]
    Present,
    /// Exists and is enabled
    Enabled,
    /// Exists and is disabled
    Disabled,
    /// Does not exist
    Absent,
}

impl DesiredState {
    /// Lowercase name as used in parameters
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Enabled => "enabled",
            Self::Disabled => "disabled",
            Self::Absent => "absent",
        }
    }

    /// Whether this state asks for an enabled/disabled toggle
    pub fn is_toggle(&self) -> bool {
        matches!(self, Self::Enabled | Self::Disabled)
    }
}

impl fmt::Display for DesiredState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State an entity was observed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObservedState {
    /// Not there
    Absent,
    /// There, enabled-ness unknown or not applicable
    Present,
    /// There and enabled
    Enabled,
    /// There and disabled
    Disabled,
}

impl ObservedState {
    /// Whether the entity exists at all
    pub fn exists(&self) -> bool {
        !matches!(self, Self::Absent)
    }
}

/// Outcome of reconciling one entity
///
/// Several steps on one entity fold into a single result with [`merge`].
///
/// [`merge`]: ActionResult::merge
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    /// At least one step failed
    pub failed: bool,
    /// At least one mutating command succeeded
    pub changed: bool,
    /// Human-readable account of what happened
    pub msg: String,
}

impl ActionResult {
    /// A mutation took effect
    pub fn changed(msg: impl Into<String>) -> Self {
        Self {
            failed: false,
            changed: true,
            msg: msg.into(),
        }
    }

    /// Nothing needed doing
    pub fn unchanged(msg: impl Into<String>) -> Self {
        Self {
            failed: false,
            changed: false,
            msg: msg.into(),
        }
    }

    /// A step failed
    pub fn failed(msg: impl Into<String>) -> Self {
        Self {
            failed: true,
            changed: false,
            msg: msg.into(),
        }
    }

    /// Fold a later step into this result
    pub fn merge(&mut self, other: Self) {
        self.failed |= other.failed;
        self.changed |= other.changed;
        if other.msg.is_empty() {
            return;
        }
        if self.msg.is_empty() {
            self.msg = other.msg;
        } else {
            if !self.msg.ends_with(' ') && !other.msg.starts_with(' ') {
                self.msg.push(' ');
            }
            self.msg.push_str(&other.msg);
        }
    }

    /// Builder form of [`merge`](Self::merge)
    pub fn and(mut self, other: Self) -> Self {
        self.merge(other);
        self
    }
}

/// Result for one named entity, serialized as `{name: result}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityReport {
    /// Entity name
    pub name: String,
    /// Folded result
    pub result: ActionResult,
}

impl EntityReport {
    /// Pair a name with its result
    pub fn new(name: impl Into<String>, result: ActionResult) -> Self {
        Self {
            name: name.into(),
            result,
        }
    }
}

impl Serialize for EntityReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.name, &self.result)?;
        map.end()
    }
}

/// Folded result of one module run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregateResult {
    /// Any entity changed
    pub changed: bool,
    /// Any entity failed
    pub failed: bool,
    /// Per-entity results in declaration order
    pub state: Vec<EntityReport>,
}

impl AggregateResult {
    /// Append one entity's result
    pub fn push(&mut self, report: EntityReport) {
        self.changed |= report.result.changed;
        self.failed |= report.result.failed;
        self.state.push(report);
    }

    /// Number of entities reported
    pub fn len(&self) -> usize {
        self.state.len()
    }

    /// Whether no entity was reported
    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    /// Look up an entity's result
    pub fn get(&self, name: &str) -> Option<&ActionResult> {
        self.state.iter().find(|r| r.name == name).map(|r| &r.result)
    }
}

impl FromIterator<EntityReport> for AggregateResult {
    fn from_iter<I: IntoIterator<Item = EntityReport>>(iter: I) -> Self {
        let mut out = Self::default();
        for report in iter {
            out.push(report);
        }
        out
    }
}
