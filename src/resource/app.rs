//! App reconciler
//!
//! `app:install` fetches from the app store and enables in one go, so a
//! freshly created app only needs an explicit toggle when it should end up
//! disabled or restricted to groups.

use anyhow::Result;
use declarative::{ActionResult, Entity, ObservedState, Reconciler, Step};
use occkit::{AppListing, Client, OutputClass};

use super::{expect_success, join, judge, setting_value};
use crate::params::AppSpec;

const INSTALLED: &str = "The app has already been installed.";
const MISSING: &str = "The app does not exist (anymore).";

pub struct AppReconciler<'a> {
    client: &'a Client,
}

impl<'a> AppReconciler<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Apply `config:app:set` for every setting that differs
    fn apply_settings(&self, app: &AppSpec) -> Result<Option<ActionResult>> {
        let mut updated = Vec::new();
        let mut result = ActionResult::default();

        for (key, value) in &app.settings {
            let Some(value) = setting_value(value, false) else {
                log::warn!(
                    "{}: skipping setting '{key}', only strings and booleans are supported",
                    app.name
                );
                continue;
            };
            if self.client.app_config(&app.name, key)?.as_deref() == Some(value.as_str()) {
                continue;
            }
            let outcome = self.client.set_app_config(&app.name, key, &value)?;
            if outcome.success() {
                updated.push(key.clone());
            } else {
                result.merge(expect_success(&outcome, ""));
            }
        }

        if !updated.is_empty() {
            result.merge(ActionResult::changed(format!(
                "Settings updated: {}.",
                join(&updated)
            )));
        }
        Ok((result != ActionResult::default()).then_some(result))
    }
}

impl Reconciler for AppReconciler<'_> {
    type Entity = AppSpec;
    type Snapshot = AppListing;

    fn noun(&self) -> &'static str {
        "app"
    }

    fn list(&self) -> Result<AppListing> {
        Ok(self.client.list_apps()?)
    }

    fn observe(&self, snapshot: &AppListing, app: &AppSpec) -> Result<ObservedState> {
        Ok(if snapshot.is_enabled(app.name()) {
            ObservedState::Enabled
        } else if snapshot.is_disabled(app.name()) {
            ObservedState::Disabled
        } else {
            ObservedState::Absent
        })
    }

    fn create(&self, app: &AppSpec) -> Result<ActionResult> {
        let outcome = self.client.install_app(app.name())?;
        Ok(judge(
            self.client,
            &outcome,
            "App was successfully created.",
            OutputClass::AlreadyExists,
            INSTALLED,
        ))
    }

    fn enable(&self, app: &AppSpec) -> Result<ActionResult> {
        let outcome = self.client.enable_app(app.name(), &app.groups)?;
        Ok(expect_success(&outcome, "App was successfully enabled."))
    }

    fn disable(&self, app: &AppSpec) -> Result<ActionResult> {
        let outcome = self.client.disable_app(app.name())?;
        Ok(judge(
            self.client,
            &outcome,
            "App was successfully disabled.",
            OutputClass::Missing,
            "The app is already disabled.",
        ))
    }

    fn remove(&self, app: &AppSpec) -> Result<ActionResult> {
        let outcome = self.client.remove_app(app.name())?;
        Ok(judge(
            self.client,
            &outcome,
            "App was successfully removed.",
            OutputClass::Missing,
            MISSING,
        ))
    }

    fn converge(&self, _: &AppListing, app: &AppSpec, _created: bool) -> Result<Option<ActionResult>> {
        self.apply_settings(app)
    }

    fn already(&self, step: Step, _app: &AppSpec) -> ActionResult {
        match step {
            Step::AlreadyEnabled => ActionResult::unchanged("The app is already enabled."),
            Step::AlreadyDisabled => ActionResult::unchanged("The app is already disabled."),
            Step::AlreadyAbsent => ActionResult::unchanged(MISSING),
            _ => ActionResult::unchanged(INSTALLED),
        }
    }
}
