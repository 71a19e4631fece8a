//! `occ` module: status, check, install, upgrade and background job mode

use anyhow::{Context, Result};
use occkit::classify::extract_exception;
use occkit::{BackgroundMode, Client, OutputClass, ProbeState};
use std::fs;

use crate::output::ModuleResult;
use crate::params::{OccCommand, OccParams};
use crate::paths::Layout;

/// Installer errors worth surfacing verbatim
const INSTALL_ERRORS: &[OutputClass] = &[
    OutputClass::CommandNotDefined,
    OutputClass::UnsupportedDatabase,
    OutputClass::SymlinkRejected,
];

pub fn run(client: &Client, params: &OccParams) -> Result<ModuleResult> {
    log::info!("occ {}", params.command);
    match params.command {
        OccCommand::Status => status(client),
        OccCommand::Check => check(client),
        OccCommand::Install => install(client, params),
        OccCommand::Upgrade => upgrade(client),
        OccCommand::Background(mode) => background(client, mode, params.common.auto_upgrade),
    }
}

fn status(client: &Client) -> Result<ModuleResult> {
    if !client.is_available() {
        return Ok(ModuleResult::failed(ProbeState::NotPresent.message()));
    }
    let report = client.status().context("Could not read the instance status")?;
    let mut result = ModuleResult::ok(format!(
        "{} {} (installed: {}, maintenance: {})",
        report.productname, report.versionstring, report.installed, report.maintenance
    ));
    result.status = Some(serde_json::to_value(&report)?);
    Ok(result)
}

fn check(client: &Client) -> Result<ModuleResult> {
    if !client.is_available() {
        return Ok(ModuleResult::failed(ProbeState::NotPresent.message()));
    }
    let outcome = client.check()?;
    let msg = outcome.message().replace("<br/>", " ");
    Ok(if outcome.success() {
        ModuleResult::ok(msg)
    } else {
        ModuleResult::failed(msg)
    })
}

fn install(client: &Client, params: &OccParams) -> Result<ModuleResult> {
    if !client.is_available() {
        return Ok(ModuleResult::failed(ProbeState::NotPresent.message()));
    }
    let report = client.status().context("Could not read the instance status")?;
    if report.installed {
        return Ok(ModuleResult::ok(format!(
            "Nextcloud {} already installed.",
            report.versionstring
        )));
    }

    let outcome = client.maintenance_install(&params.install_options())?;
    if !outcome.success() {
        let text = outcome.combined();
        let msg = client
            .classifier()
            .find_any(&text, INSTALL_ERRORS)
            .map(|hit| hit.line)
            .or_else(|| extract_exception(&text))
            .unwrap_or_else(|| outcome.message());
        return Ok(ModuleResult::failed(msg));
    }

    keep_initial_config(client, &Layout::new(client.working_dir()))?;
    Ok(ModuleResult::changed("database was successfully created."))
}

/// Keep a copy of the freshly written `config.php` and its JSON rendering.
fn keep_initial_config(client: &Client, layout: &Layout) -> Result<()> {
    let config = layout.config_php();
    if config.exists() {
        let backup = layout.install_backup();
        fs::copy(&config, &backup)
            .with_context(|| format!("Could not back up {}", config.display()))?;
    }

    let system = client.system_config()?;
    let json = layout.config_json();
    let text = serde_json::to_string_pretty(&system)? + "\n";
    fs::write(&json, text).with_context(|| format!("Could not write {}", json.display()))
}

fn upgrade(client: &Client) -> Result<ModuleResult> {
    let state = client.probe()?;
    match state {
        ProbeState::NeedsUpgrade(_) => {
            let outcome = client.upgrade()?;
            if outcome.success() {
                Ok(ModuleResult::changed(outcome.message()))
            } else {
                let text = outcome.combined();
                Ok(ModuleResult::failed(
                    extract_exception(&text).unwrap_or_else(|| outcome.message()),
                ))
            }
        }
        ProbeState::Installed => Ok(ModuleResult::ok("Nextcloud is up to date.")),
        ProbeState::NotInstalled(_) => Ok(ModuleResult::ok(state.message())),
        ProbeState::NotPresent | ProbeState::Unhealthy(_) => {
            Ok(ModuleResult::failed(state.message()))
        }
    }
}

fn background(client: &Client, mode: BackgroundMode, auto_upgrade: bool) -> Result<ModuleResult> {
    if let Some(stop) = super::gate(client, auto_upgrade)? {
        return Ok(stop);
    }
    let current = client.app_config("core", "backgroundjobs_mode")?;
    if current.as_deref() == Some(mode.as_str()) {
        return Ok(ModuleResult::ok(format!(
            "Background jobs already run in '{mode}' mode."
        )));
    }

    log::info!("switching background jobs from {current:?} to {mode}");
    let outcome = client.set_background_mode(mode)?;
    Ok(if outcome.success() {
        ModuleResult::changed(outcome.message())
    } else {
        ModuleResult::failed(outcome.message())
    })
}
