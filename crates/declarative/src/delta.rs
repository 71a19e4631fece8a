//! Set delta - membership changes between a desired and an actual set

use serde::Serialize;
use std::collections::BTreeSet;

/// Changes needed to turn `current` into `desired`, restricted to `valid`
///
/// All lists are sorted and free of duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SetDelta {
    /// Desired and valid but not current
    pub to_add: Vec<String>,
    /// Current but not desired
    pub to_remove: Vec<String>,
    /// Desired but not valid; skipped
    pub invalid: Vec<String>,
    /// Desired, valid and already current
    pub retained: Vec<String>,
}

impl SetDelta {
    /// Compute the delta.
    ///
    /// `valid` is the universe of names that may be added (e.g. existing
    /// groups). Names in `current` are removable regardless of `valid`.
    pub fn compute<'a, D, C, V>(desired: D, current: C, valid: V) -> Self
    where
        D: IntoIterator<Item = &'a str>,
        C: IntoIterator<Item = &'a str>,
        V: IntoIterator<Item = &'a str>,
    {
        let desired: BTreeSet<&str> = desired.into_iter().filter(|s| !s.is_empty()).collect();
        let current: BTreeSet<&str> = current.into_iter().collect();
        let valid: BTreeSet<&str> = valid.into_iter().collect();

        let owned = |set: BTreeSet<&str>| -> Vec<String> { set.into_iter().map(str::to_string).collect() };

        Self {
            to_add: owned(
                desired
                    .iter()
                    .filter(|d| valid.contains(*d) && !current.contains(*d))
                    .copied()
                    .collect(),
            ),
            to_remove: owned(current.difference(&desired).copied().collect()),
            invalid: owned(desired.difference(&valid).copied().collect()),
            retained: owned(
                desired
                    .iter()
                    .filter(|d| valid.contains(*d) && current.contains(*d))
                    .copied()
                    .collect(),
            ),
        }
    }

    /// Whether nothing has to be added or removed
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}
