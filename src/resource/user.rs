//! User reconciler
//!
//! Passwords only ever reach occ through the `OC_PASS` overlay of the child
//! process. Attribute convergence runs in a fixed order: password reset,
//! display name, group membership, per-app settings.

use anyhow::Result;
use declarative::{ActionResult, Entity, ObservedState, Reconciler, SetDelta, Step};
use occkit::{Client, GroupListing, OutputClass, UserListing};

use super::{expect_success, join, judge, setting_value};
use crate::params::UserSpec;

const EXISTS: &str = "The user has already been created.";
const MISSING: &str = "The user does not exist (anymore).";

/// Users and groups, listed once per run
#[derive(Debug, Clone, Default)]
pub struct UserSnapshot {
    pub users: UserListing,
    pub groups: GroupListing,
}

pub struct UserReconciler<'a> {
    client: &'a Client,
}

impl<'a> UserReconciler<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    fn reset_password(&self, user: &UserSpec) -> Result<ActionResult> {
        let Some(password) = user.password.as_deref().filter(|p| !p.is_empty()) else {
            return Ok(ActionResult::failed("A password is required to reset it."));
        };
        let outcome = self.client.reset_password(user.name(), password)?;
        Ok(expect_success(&outcome, "Password was successfully reset."))
    }

    fn update_display_name(&self, snapshot: &UserSnapshot, user: &UserSpec) -> Result<Option<ActionResult>> {
        let Some(wanted) = user.display_name.as_deref() else {
            return Ok(None);
        };
        if snapshot.users.display_name(user.name()) == Some(wanted) {
            return Ok(None);
        }
        let outcome = self
            .client
            .set_user_setting(user.name(), "settings", "display_name", wanted)?;
        Ok(Some(expect_success(&outcome, "Display name updated.")))
    }

    /// Bring group membership in line with `groups`
    fn sync_groups(
        &self,
        snapshot: &UserSnapshot,
        user: &UserSpec,
        wanted: &[String],
        created: bool,
    ) -> Result<Option<ActionResult>> {
        let uid = user.name();
        // Memberships come from user:info; group:list only names valid targets
        let current = if created {
            Vec::new()
        } else {
            self.client.user_info(uid)?.groups
        };
        let delta = SetDelta::compute(
            wanted.iter().map(String::as_str),
            current.iter().map(String::as_str),
            snapshot.groups.groups.keys().map(String::as_str),
        );
        log::debug!("{uid}: group delta {delta:?}");

        let mut result = ActionResult::default();
        let mut added = Vec::new();
        let mut removed = Vec::new();

        for gid in &delta.to_add {
            let outcome = self.client.add_to_group(gid, uid)?;
            if outcome.success() {
                added.push(gid.clone());
            } else {
                log::warn!("{uid}: could not join group {gid}: {}", outcome.message());
                result.merge(ActionResult::failed(format!(
                    "Could not add to group {gid}: {}",
                    outcome.message()
                )));
            }
        }
        for gid in &delta.to_remove {
            let outcome = self.client.remove_from_group(gid, uid)?;
            if outcome.success() {
                removed.push(gid.clone());
            } else {
                log::warn!("{uid}: could not leave group {gid}: {}", outcome.message());
                result.merge(ActionResult::failed(format!(
                    "Could not remove from group {gid}: {}",
                    outcome.message()
                )));
            }
        }

        if !added.is_empty() {
            result.merge(ActionResult::changed(format!(" Added to group(s): {}.", join(&added))));
        }
        if !removed.is_empty() {
            result.merge(ActionResult::changed(format!(
                " Removed from group(s): {}.",
                join(&removed)
            )));
        }
        if !delta.invalid.is_empty() {
            result.merge(ActionResult::unchanged(format!(
                "Group(s) {} does not exist, was skipped.",
                join(&delta.invalid)
            )));
        }
        Ok((result != ActionResult::default()).then_some(result))
    }

    /// Get-compare-set for per-app user settings; failures only warn
    fn apply_settings(&self, user: &UserSpec) -> Result<Option<ActionResult>> {
        let uid = user.name();
        let mut updated = Vec::new();

        for entry in &user.settings {
            for (app, values) in entry {
                let Some(values) = values.as_object() else {
                    log::warn!("{uid}: settings for '{app}' must be a mapping, skipping");
                    continue;
                };
                for (key, value) in values {
                    let Some(value) = setting_value(value, true) else {
                        log::warn!("{uid}: skipping setting {app}.{key} with a structured value");
                        continue;
                    };
                    if self.client.user_setting(uid, app, key)?.as_deref() == Some(value.as_str()) {
                        continue;
                    }
                    let outcome = self.client.set_user_setting(uid, app, key, &value)?;
                    if outcome.success() {
                        updated.push(format!("{app}.{key}"));
                    } else {
                        log::warn!("{uid}: could not set {app}.{key}: {}", outcome.message());
                    }
                }
            }
        }

        Ok((!updated.is_empty())
            .then(|| ActionResult::changed(format!("Settings updated: {}.", join(&updated)))))
    }
}

impl Reconciler for UserReconciler<'_> {
    type Entity = UserSpec;
    type Snapshot = UserSnapshot;

    fn noun(&self) -> &'static str {
        "user"
    }

    fn list(&self) -> Result<UserSnapshot> {
        Ok(UserSnapshot {
            users: self.client.list_users()?,
            groups: self.client.list_groups()?,
        })
    }

    fn observe(&self, snapshot: &UserSnapshot, user: &UserSpec) -> Result<ObservedState> {
        if !snapshot.users.contains(user.name()) {
            return Ok(ObservedState::Absent);
        }
        if !user.desired_state().is_toggle() {
            return Ok(ObservedState::Present);
        }
        let info = self.client.user_info(user.name())?;
        Ok(if info.enabled {
            ObservedState::Enabled
        } else {
            ObservedState::Disabled
        })
    }

    fn create(&self, user: &UserSpec) -> Result<ActionResult> {
        let Some(password) = user.password.as_deref().filter(|p| !p.is_empty()) else {
            return Ok(ActionResult::failed("A password is required to create the user."));
        };
        let outcome = self
            .client
            .add_user(user.name(), password, user.display_name.as_deref())?;
        Ok(judge(
            self.client,
            &outcome,
            "User was successfully created.",
            OutputClass::AlreadyExists,
            EXISTS,
        ))
    }

    fn enable(&self, user: &UserSpec) -> Result<ActionResult> {
        let outcome = self.client.enable_user(user.name())?;
        Ok(expect_success(&outcome, "User was successfully enabled."))
    }

    fn disable(&self, user: &UserSpec) -> Result<ActionResult> {
        let outcome = self.client.disable_user(user.name())?;
        Ok(expect_success(&outcome, "User was successfully disabled."))
    }

    fn remove(&self, user: &UserSpec) -> Result<ActionResult> {
        let outcome = self.client.delete_user(user.name())?;
        Ok(judge(
            self.client,
            &outcome,
            "User was successfully removed.",
            OutputClass::Missing,
            MISSING,
        ))
    }

    fn converge(
        &self,
        snapshot: &UserSnapshot,
        user: &UserSpec,
        created: bool,
    ) -> Result<Option<ActionResult>> {
        let mut result: Option<ActionResult> = None;
        let mut fold = |step: Option<ActionResult>| {
            if let Some(step) = step {
                result.get_or_insert_with(ActionResult::default).merge(step);
            }
        };

        if !created && user.resetpassword {
            fold(Some(self.reset_password(user)?));
        }
        if !created {
            fold(self.update_display_name(snapshot, user)?);
        }
        if let Some(groups) = &user.groups {
            fold(self.sync_groups(snapshot, user, groups, created)?);
        }
        fold(self.apply_settings(user)?);

        Ok(result)
    }

    fn already(&self, step: Step, _user: &UserSpec) -> ActionResult {
        match step {
            Step::AlreadyEnabled => ActionResult::unchanged("The user is already enabled."),
            Step::AlreadyDisabled => ActionResult::unchanged("The user is already disabled."),
            Step::AlreadyAbsent => ActionResult::unchanged(MISSING),
            _ => ActionResult::unchanged(EXISTS),
        }
    }
}
