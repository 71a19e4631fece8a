//! `update-apps` module: report or apply app store updates

use anyhow::{Context, Result};
use declarative::{ActionResult, AggregateResult, EntityReport};
use occkit::{AvailableUpdate, Client};
use std::collections::BTreeMap;

use crate::output::ModuleResult;
use crate::params::{UpdateAppsParams, UpdateState};

pub fn run(client: &Client, params: &UpdateAppsParams) -> Result<ModuleResult> {
    if let Some(stop) = super::gate(client, params.common.auto_upgrade)? {
        return Ok(stop);
    }
    let updates = client
        .available_updates()
        .context("Could not check for app updates")?;
    let applications: BTreeMap<String, String> = updates
        .iter()
        .map(|u| (u.app.clone(), u.version.clone()))
        .collect();
    log::info!("{} app update(s) available", updates.len());

    let mut result = match params.state {
        _ if updates.is_empty() => ModuleResult::ok("All apps are up to date."),
        UpdateState::Check => ModuleResult::ok(format!(
            "Updates available for: {}.",
            crate::resource::join(&names(&updates))
        )),
        UpdateState::Update => {
            let aggregate: AggregateResult = updates
                .iter()
                .map(|update| update_one(client, update).map(|r| EntityReport::new(&update.app, r)))
                .collect::<Result<_>>()?;
            aggregate.into()
        }
    };
    result.updates = Some(!updates.is_empty());
    result.applications = Some(applications);
    Ok(result)
}

fn names(updates: &[AvailableUpdate]) -> Vec<String> {
    updates.iter().map(|u| u.app.clone()).collect()
}

/// Each app is judged by its own exit code
fn update_one(client: &Client, update: &AvailableUpdate) -> Result<ActionResult> {
    let outcome = client.update_app(&update.app)?;
    Ok(if outcome.success() {
        ActionResult::changed(format!("successfully updated to version {}.", update.version))
    } else {
        log::warn!("app:update {} failed: {}", update.app, outcome.message());
        ActionResult::failed(format!("update to version {} failed.", update.version))
    })
}
