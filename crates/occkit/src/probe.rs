//! Installation-state probe.
//!
//! Every module starts here. `occ check` is cheap and prints the same
//! "not installed" and "require upgrade" banners as every other command, so
//! it doubles as a gate before any listing or mutation happens.

use crate::backend::Backend;
use crate::classify::{Classifier, OutputClass, extract_exception};
use crate::error::Result;
use crate::types::{CommandOutcome, Invocation};
use serde::Serialize;

/// What the probe found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "msg", rename_all = "snake_case")]
pub enum ProbeState {
    /// `<working_dir>/occ` does not exist
    NotPresent,
    /// Files are in place but setup has not run; carries occ's text
    NotInstalled(String),
    /// Core or an app must be upgraded first; carries occ's text
    NeedsUpgrade(String),
    /// Ready for administration
    Installed,
    /// occ failed for an unrecognised reason
    Unhealthy(String),
}

impl ProbeState {
    /// Whether modules may proceed.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Installed)
    }

    /// Whether this state must be reported as a failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::NotPresent | Self::Unhealthy(_))
    }

    /// Message for the module result.
    pub fn message(&self) -> String {
        match self {
            Self::NotPresent => "missing occ".to_string(),
            Self::NotInstalled(msg) | Self::NeedsUpgrade(msg) | Self::Unhealthy(msg) => {
                msg.clone()
            }
            Self::Installed => String::new(),
        }
    }
}

/// Map the outcome of any occ command to an installation state.
pub fn interpret(outcome: &CommandOutcome, classifier: &Classifier) -> ProbeState {
    let text = outcome.combined();
    let markers = [OutputClass::NotInstalled, OutputClass::NeedsUpgrade];
    match classifier.find_any(&text, &markers) {
        Some(hit) if hit.class == OutputClass::NotInstalled => {
            ProbeState::NotInstalled(outcome.message())
        }
        Some(_) => ProbeState::NeedsUpgrade(outcome.message()),
        None if outcome.success() => ProbeState::Installed,
        None => ProbeState::Unhealthy(extract_exception(&text).unwrap_or_else(|| outcome.message())),
    }
}

/// Determine the installation state.
pub fn probe(backend: &dyn Backend, classifier: &Classifier) -> Result<ProbeState> {
    if !backend.is_available() {
        return Ok(ProbeState::NotPresent);
    }
    let outcome = backend.run(&Invocation::new("check").json_output())?;
    let state = interpret(&outcome, classifier);
    log::debug!("probe: {state:?}");
    Ok(state)
}

/// Probe, and run `occ upgrade` once when allowed and needed.
pub fn gate(backend: &dyn Backend, classifier: &Classifier, auto_upgrade: bool) -> Result<ProbeState> {
    let state = probe(backend, classifier)?;
    if !auto_upgrade || !matches!(state, ProbeState::NeedsUpgrade(_)) {
        return Ok(state);
    }

    log::info!("upgrading Nextcloud before continuing");
    let outcome = backend.run(&Invocation::new("upgrade"))?;
    if !outcome.success() {
        let text = outcome.combined();
        return Ok(ProbeState::Unhealthy(
            extract_exception(&text).unwrap_or_else(|| outcome.message()),
        ));
    }
    probe(backend, classifier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::scripted::ScriptedBackend;

    const NOT_INSTALLED: &str =
        "Nextcloud is not installed - only a limited number of commands are available";
    const NEEDS_UPGRADE: &str = "Nextcloud or one of the apps require upgrade - only a limited number of commands are available\nYou may use your browser or the occ upgrade command to do the upgrade";

    #[test]
    fn test_missing_occ() {
        let backend = ScriptedBackend::unavailable();
        let state = probe(&backend, &Classifier::default()).unwrap();
        assert_eq!(state, ProbeState::NotPresent);
        assert!(state.is_failure());
        assert_eq!(state.message(), "missing occ");
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn test_installed() {
        let backend = ScriptedBackend::new().on("check", 0, "[]\n", "");
        let state = probe(&backend, &Classifier::default()).unwrap();
        assert!(state.is_ready());
        assert_eq!(backend.calls(), vec!["check"]);
    }

    #[test]
    fn test_not_installed_even_on_success() {
        let backend = ScriptedBackend::new().on("check", 0, NOT_INSTALLED, "");
        let state = probe(&backend, &Classifier::default()).unwrap();
        assert_eq!(state, ProbeState::NotInstalled(NOT_INSTALLED.to_string()));
        assert!(!state.is_failure());
    }

    #[test]
    fn test_needs_upgrade_on_stderr() {
        let backend = ScriptedBackend::new().on("check", 1, "", NEEDS_UPGRADE);
        let state = probe(&backend, &Classifier::default()).unwrap();
        assert!(matches!(state, ProbeState::NeedsUpgrade(_)));
        assert!(!state.is_failure());
    }

    #[test]
    fn test_unhandled_exception() {
        let out = "An unhandled exception has been thrown:\nException: Database error\nStack trace:\n#0 {main}";
        let backend = ScriptedBackend::new().on("check", 255, out, "");
        let state = probe(&backend, &Classifier::default()).unwrap();
        assert_eq!(state, ProbeState::Unhealthy("Exception: Database error".into()));
    }

    #[test]
    fn test_unrecognised_failure_is_verbatim() {
        let backend = ScriptedBackend::new().on("check", 1, "  Something broke  \n", "");
        let state = probe(&backend, &Classifier::default()).unwrap();
        assert_eq!(state, ProbeState::Unhealthy("Something broke".into()));
        assert!(state.is_failure());
    }

    #[test]
    fn test_gate_without_auto_upgrade() {
        let backend = ScriptedBackend::new().on("check", 1, NEEDS_UPGRADE, "");
        let state = gate(&backend, &Classifier::default(), false).unwrap();
        assert!(matches!(state, ProbeState::NeedsUpgrade(_)));
        assert_eq!(backend.calls().len(), 1);
    }

    #[test]
    fn test_gate_upgrades_and_reprobes() {
        let backend = ScriptedBackend::new()
            .on("check", 1, NEEDS_UPGRADE, "")
            .on("check", 0, "[]", "")
            .on("upgrade", 0, "Update successful", "");
        let state = gate(&backend, &Classifier::default(), true).unwrap();
        assert!(state.is_ready());
        assert_eq!(
            backend.calls(),
            vec![
                "check",
                "upgrade",
                "check"
            ]
        );
    }

    #[test]
    fn test_gate_failed_upgrade() {
        let backend = ScriptedBackend::new()
            .on("check", 1, NEEDS_UPGRADE, "")
            .on("upgrade", 1, "", "Upgrade failed");
        let state = gate(&backend, &Classifier::default(), true).unwrap();
        assert_eq!(state, ProbeState::Unhealthy("Upgrade failed".into()));
    }
}
