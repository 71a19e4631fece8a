//! Step planner - maps (desired, observed) to the corrective steps
//!
//! The planner is pure: it never touches the system. Steps come out in the
//! order they must run for one entity: existence first, then the
//! enabled/disabled toggle, then attribute convergence.

use crate::types::{DesiredState, ObservedState};
use serde::Serialize;

/// One step of reconciling an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Create the entity
    Create,
    /// Enable the entity
    Enable,
    /// Disable the entity
    Disable,
    /// Remove the entity
    Remove,
    /// Converge attributes (settings, membership, display name)
    Converge,
    /// Nothing to do: already exists
    AlreadyPresent,
    /// Nothing to do: already enabled
    AlreadyEnabled,
    /// Nothing to do: already disabled
    AlreadyDisabled,
    /// Nothing to do: already gone
    AlreadyAbsent,
}

impl Step {
    /// Whether this step runs a mutating command
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::Create | Self::Enable | Self::Disable | Self::Remove
        )
    }

    /// Whether this step only reports an already-satisfied state
    pub fn is_noop(&self) -> bool {
        matches!(
            self,
            Self::AlreadyPresent | Self::AlreadyEnabled | Self::AlreadyDisabled | Self::AlreadyAbsent
        )
    }
}

/// Plan the steps taking `observed` to `desired`.
pub fn plan(desired: DesiredState, observed: ObservedState) -> Vec<Step> {
    use DesiredState as D;
    use ObservedState as O;
    use Step::{
        AlreadyAbsent, AlreadyDisabled, AlreadyEnabled, AlreadyPresent, Converge, Create, Disable,
        Enable, Remove,
    };

    match (desired, observed) {
        (D::Present, O::Absent) => vec![Create, Converge],
        (D::Present, _) => vec![AlreadyPresent, Converge],

        (D::Enabled, O::Absent) => vec![Create, Enable, Converge],
        (D::Enabled, O::Enabled) => vec![AlreadyEnabled, Converge],
        (D::Enabled, O::Present | O::Disabled) => vec![Enable, Converge],

        (D::Disabled, O::Absent) => vec![Create, Disable, Converge],
        (D::Disabled, O::Disabled) => vec![AlreadyDisabled, Converge],
        (D::Disabled, O::Present | O::Enabled) => vec![Disable, Converge],

        (D::Absent, O::Absent) => vec![AlreadyAbsent],
        (D::Absent, _) => vec![Remove],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Step::*;

    const DESIRED: [DesiredState; 4] = [
        DesiredState::Present,
        DesiredState::Enabled,
        DesiredState::Disabled,
        DesiredState::Absent,
    ];
    const OBSERVED: [ObservedState; 4] = [
        ObservedState::Absent,
        ObservedState::Present,
        ObservedState::Enabled,
        ObservedState::Disabled,
    ];

    #[test]
    fn test_present() {
        assert_eq!(plan(DesiredState::Present, ObservedState::Absent), vec![Create, Converge]);
        for observed in [ObservedState::Present, ObservedState::Enabled, ObservedState::Disabled] {
            assert_eq!(plan(DesiredState::Present, observed), vec![AlreadyPresent, Converge]);
        }
    }

    #[test]
    fn test_enabled() {
        assert_eq!(
            plan(DesiredState::Enabled, ObservedState::Absent),
            vec![Create, Enable, Converge]
        );
        assert_eq!(
            plan(DesiredState::Enabled, ObservedState::Disabled),
            vec![Enable, Converge]
        );
        assert_eq!(
            plan(DesiredState::Enabled, ObservedState::Enabled),
            vec![AlreadyEnabled, Converge]
        );
    }

    #[test]
    fn test_disabled() {
        assert_eq!(
            plan(DesiredState::Disabled, ObservedState::Absent),
            vec![Create, Disable, Converge]
        );
        assert_eq!(
            plan(DesiredState::Disabled, ObservedState::Enabled),
            vec![Disable, Converge]
        );
        assert_eq!(
            plan(DesiredState::Disabled, ObservedState::Disabled),
            vec![AlreadyDisabled, Converge]
        );
    }

    #[test]
    fn test_absent() {
        assert_eq!(plan(DesiredState::Absent, ObservedState::Absent), vec![AlreadyAbsent]);
        for observed in [ObservedState::Present, ObservedState::Enabled, ObservedState::Disabled] {
            assert_eq!(plan(DesiredState::Absent, observed), vec![Remove]);
        }
    }

    #[test]
    fn test_exhaustive_ordering() {
        for desired in DESIRED {
            for observed in OBSERVED {
                let steps = plan(desired, observed);
                assert!(!steps.is_empty(), "{desired:?}/{observed:?}");

                // Create always comes first and only for absent entities
                if let Some(pos) = steps.iter().position(|s| *s == Create) {
                    assert_eq!(pos, 0);
                    assert_eq!(observed, ObservedState::Absent);
                }
                // Converge is always last when present
                if let Some(pos) = steps.iter().position(|s| *s == Converge) {
                    assert_eq!(pos, steps.len() - 1);
                    assert_ne!(desired, DesiredState::Absent);
                }
                // Never both a mutation and a no-op marker
                let mutates = steps.iter().any(Step::is_mutation);
                let noop = steps.iter().any(Step::is_noop);
                assert!(!(mutates && noop), "{desired:?}/{observed:?}");
            }
        }
    }

    #[test]
    fn test_satisfied_states_never_mutate() {
        let satisfied = [
            (DesiredState::Present, ObservedState::Present),
            (DesiredState::Enabled, ObservedState::Enabled),
            (DesiredState::Disabled, ObservedState::Disabled),
            (DesiredState::Absent, ObservedState::Absent),
        ];
        for (desired, observed) in satisfied {
            assert!(!plan(desired, observed).iter().any(Step::is_mutation));
        }
    }
}
