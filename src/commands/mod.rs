//! One runner per Ansible module
//!
//! Every runner follows the same shape: probe gate, list, reconcile,
//! aggregate. Runners take an already-built [`Client`] so tests can drive
//! them against a fake instance.

pub mod apps;
pub mod config;
pub mod groups;
pub mod occ;
pub mod update_apps;
pub mod users;

use anyhow::{Context, Result};
use occkit::{Client, ProbeState};
use std::path::Path;

use crate::cli::Module;
use crate::output::ModuleResult;
use crate::params::{self, CommonParams};

/// Load the parameters for `module` and run it against the real occ.
pub fn run(module: Module, args_file: Option<&Path>) -> Result<ModuleResult> {
    log::debug!("running module {}", module.name());
    match module {
        Module::Apps => {
            let params: params::AppsParams = params::load(args_file)?;
            apps::run(&client_for(&params.common), &params)
        }
        Module::Users => {
            let params: params::UsersParams = params::load(args_file)?;
            users::run(&client_for(&params.common), &params)
        }
        Module::Groups => {
            let params: params::GroupsParams = params::load(args_file)?;
            groups::run(&client_for(&params.common), &params)
        }
        Module::Occ => {
            let params: params::OccParams = params::load(args_file)?;
            occ::run(&client_for(&params.common), &params)
        }
        Module::UpdateApps => {
            let params: params::UpdateAppsParams = params::load(args_file)?;
            update_apps::run(&client_for(&params.common), &params)
        }
        Module::Config => {
            let params: params::ConfigParams = params::load(args_file)?;
            config::run(&client_for(&params.common), &params)
        }
    }
}

fn client_for(common: &CommonParams) -> Client {
    Client::new(&common.working_dir, &common.owner)
}

/// Probe the instance, upgrading first when allowed.
///
/// Returns the envelope to report when the module must stop here: a failure
/// when occ is missing or broken, an unchanged result carrying occ's text
/// when the instance is not installed or still needs an upgrade.
pub fn gate(client: &Client, auto_upgrade: bool) -> Result<Option<ModuleResult>> {
    let state = client
        .gate(auto_upgrade)
        .context("Could not determine the installation state")?;
    Ok(match state {
        ProbeState::Installed => None,
        ProbeState::NotPresent | ProbeState::Unhealthy(_) => {
            Some(ModuleResult::failed(state.message()))
        }
        ProbeState::NotInstalled(_) | ProbeState::NeedsUpgrade(_) => {
            log::warn!("{}", state.message());
            Some(ModuleResult::ok(state.message()))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeNextcloud;

    #[test]
    fn test_gate_passes_installed() {
        let client = FakeNextcloud::new().client();
        assert!(gate(&client, false).unwrap().is_none());
    }

    #[test]
    fn test_gate_fails_without_occ() {
        let client = FakeNextcloud::new().missing_occ().client();
        let stop = gate(&client, false).unwrap().unwrap();
        assert!(stop.failed);
        assert_eq!(stop.msg.as_deref(), Some("missing occ"));
    }

    #[test]
    fn test_gate_reports_not_installed_without_failing() {
        let client = FakeNextcloud::new().not_installed().client();
        let stop = gate(&client, false).unwrap().unwrap();
        assert!(!stop.failed);
        assert!(!stop.changed);
        assert!(stop.msg.unwrap().starts_with("Nextcloud is not installed"));
    }

    #[test]
    fn test_gate_upgrades_when_allowed() {
        let fake = FakeNextcloud::new().needing_upgrade();
        let client = fake.client();

        let stop = gate(&client, false).unwrap().unwrap();
        assert!(!stop.failed);
        assert!(stop.msg.unwrap().contains("require upgrade"));

        assert!(gate(&client, true).unwrap().is_none());
        assert!(fake.calls().contains(&"upgrade".to_string()));
    }
}
