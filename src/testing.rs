//! In-memory Nextcloud for tests
//!
//! [`FakeNextcloud`] implements [`occkit::backend::Backend`] and keeps the
//! state a real instance would: apps, users, groups, app config, user
//! settings and the `system` configuration. Commands answer with the same
//! texts and exit codes occ uses, so reconciliation runs end to end.

use occkit::backend::Backend;
use occkit::{Client, CommandOutcome, Invocation, PASSWORD_ENV};
use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

const NOT_INSTALLED: &str =
    "Nextcloud is not installed - only a limited number of commands are available";
const NEEDS_UPGRADE: &str = "Nextcloud or one of the apps require upgrade - only a limited number of commands are available\nYou may use your browser or the occ upgrade command to do the upgrade";
const BROKEN_CONFIG: &str = "An unhandled exception has been thrown:\nParseError: syntax error, unexpected token \"}\" in /var/www/nextcloud/config/config.php on line 12";

#[derive(Debug, Clone)]
struct User {
    display_name: String,
    enabled: bool,
    password: String,
}

#[derive(Debug, Default)]
struct State {
    present: bool,
    installed: bool,
    needs_upgrade: bool,
    broken: bool,
    break_on_import: bool,
    store: BTreeSet<String>,
    enabled: BTreeMap<String, String>,
    disabled: BTreeMap<String, String>,
    updates: BTreeMap<String, String>,
    users: BTreeMap<String, User>,
    groups: BTreeMap<String, Vec<String>>,
    app_config: BTreeMap<(String, String), String>,
    user_settings: BTreeMap<(String, String, String), String>,
    system: Map<String, Value>,
    failures: Vec<(String, CommandOutcome)>,
    calls: Vec<String>,
}

/// A stateful stand-in for `occ`
#[derive(Clone)]
pub struct FakeNextcloud {
    root: PathBuf,
    state: Arc<Mutex<State>>,
}

fn ok(stdout: impl Into<String>) -> CommandOutcome {
    CommandOutcome::new(0, stdout, "")
}

fn fail(stdout: impl Into<String>) -> CommandOutcome {
    CommandOutcome::new(1, stdout, "")
}

/// PHP prints an empty associative array as `[]`
fn php_json(map: &Map<String, Value>) -> Value {
    if map.is_empty() {
        json!([])
    } else {
        Value::Object(map.clone())
    }
}

impl FakeNextcloud {
    /// An installed instance with nothing in it
    pub fn new() -> Self {
        Self::at(Path::new("/var/www/nextcloud"))
    }

    /// An installed instance rooted at `root`
    pub fn at(root: &Path) -> Self {
        let state = State {
            present: true,
            installed: true,
            ..Default::default()
        };
        Self {
            root: root.to_path_buf(),
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn client(&self) -> Client {
        Client::with_backend(Box::new(self.clone()))
    }

    // ------------------------------------------------------------------
    // Setup
    // ------------------------------------------------------------------

    pub fn missing_occ(self) -> Self {
        self.lock().present = false;
        self
    }

    pub fn not_installed(self) -> Self {
        self.lock().installed = false;
        self
    }

    pub fn needing_upgrade(self) -> Self {
        self.lock().needs_upgrade = true;
        self
    }

    /// `config:import` succeeds but leaves a configuration occ cannot load
    pub fn breaking_on_import(self) -> Self {
        self.lock().break_on_import = true;
        self
    }

    /// An app that `app:install` can fetch
    pub fn with_store_app(self, app: &str) -> Self {
        self.lock().store.insert(app.to_string());
        self
    }

    pub fn with_app(self, app: &str, enabled: bool) -> Self {
        {
            let mut state = self.lock();
            state.store.insert(app.to_string());
            if enabled {
                state.enabled.insert(app.to_string(), "1.0.0".to_string());
            } else {
                state.disabled.insert(app.to_string(), "1.0.0".to_string());
            }
        }
        self
    }

    pub fn with_update(self, app: &str, version: &str) -> Self {
        self.lock()
            .updates
            .insert(app.to_string(), version.to_string());
        self
    }

    pub fn with_app_config(self, app: &str, key: &str, value: &str) -> Self {
        self.lock()
            .app_config
            .insert((app.to_string(), key.to_string()), value.to_string());
        self
    }

    pub fn with_user(self, uid: &str, display_name: &str) -> Self {
        self.lock().users.insert(
            uid.to_string(),
            User {
                display_name: display_name.to_string(),
                enabled: true,
                password: String::new(),
            },
        );
        self
    }

    pub fn with_disabled_user(self, uid: &str) -> Self {
        let fake = self.with_user(uid, uid);
        if let Some(user) = fake.lock().users.get_mut(uid) {
            user.enabled = false;
        }
        fake
    }

    pub fn with_group(self, gid: &str, members: &[&str]) -> Self {
        self.lock().groups.insert(
            gid.to_string(),
            members.iter().map(|m| (*m).to_string()).collect(),
        );
        self
    }

    /// Answer commands starting with `prefix` with a canned failure
    pub fn failing(self, prefix: &str, code: i32, stdout: &str) -> Self {
        self.lock()
            .failures
            .push((prefix.to_string(), CommandOutcome::new(code, stdout, "")));
        self
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Calls that would change the instance
    pub fn mutations(&self) -> Vec<String> {
        const READS: &[&str] = &[
            "check",
            "status",
            "app:list",
            "user:list",
            "user:info",
            "group:list",
            "config:list",
            "config:app:get",
            "update:check",
            "app:getpath",
        ];
        self.calls()
            .into_iter()
            .filter(|call| {
                let command = call.split_whitespace().next().unwrap_or_default();
                let is_setting_read = command == "user:setting" && call.split_whitespace().count() < 5;
                !READS.contains(&command) && !is_setting_read
            })
            .collect()
    }

    pub fn is_installed(&self) -> bool {
        self.lock().installed
    }

    pub fn has_group(&self, gid: &str) -> bool {
        self.lock().groups.contains_key(gid)
    }

    pub fn drop_group(&self, gid: &str) {
        self.lock().groups.remove(gid);
    }

    pub fn members(&self, gid: &str) -> Vec<String> {
        self.lock().groups.get(gid).cloned().unwrap_or_default()
    }

    pub fn has_user(&self, uid: &str) -> bool {
        self.lock().users.contains_key(uid)
    }

    pub fn user_enabled(&self, uid: &str) -> Option<bool> {
        self.lock().users.get(uid).map(|u| u.enabled)
    }

    pub fn display_name(&self, uid: &str) -> Option<String> {
        self.lock().users.get(uid).map(|u| u.display_name.clone())
    }

    pub fn password(&self, uid: &str) -> Option<String> {
        self.lock().users.get(uid).map(|u| u.password.clone())
    }

    /// `Some(true)` enabled, `Some(false)` disabled, `None` not installed
    pub fn app_state(&self, app: &str) -> Option<bool> {
        let state = self.lock();
        if state.enabled.contains_key(app) {
            Some(true)
        } else if state.disabled.contains_key(app) {
            Some(false)
        } else {
            None
        }
    }

    pub fn app_version(&self, app: &str) -> Option<String> {
        let state = self.lock();
        state
            .enabled
            .get(app)
            .or_else(|| state.disabled.get(app))
            .cloned()
    }

    pub fn app_config(&self, app: &str, key: &str) -> Option<String> {
        self.lock()
            .app_config
            .get(&(app.to_string(), key.to_string()))
            .cloned()
    }

    pub fn user_setting(&self, uid: &str, app: &str, key: &str) -> Option<String> {
        self.lock()
            .user_settings
            .get(&(uid.to_string(), app.to_string(), key.to_string()))
            .cloned()
    }

    pub fn system(&self, key: &str) -> Option<Value> {
        self.lock().system.get(key).cloned()
    }

    // ------------------------------------------------------------------
    // Command handling
    // ------------------------------------------------------------------

    fn handle(&self, command: &str, args: &[String], env: &[(String, String)]) -> CommandOutcome {
        let mut state = self.lock();
        let password = env
            .iter()
            .find(|(k, _)| k == PASSWORD_ENV)
            .map(|(_, v)| v.clone());

        if !state.installed && !matches!(command, "check" | "status" | "maintenance:install") {
            return CommandOutcome::new(1, NOT_INSTALLED, format!("Command \"{command}\" is not defined."));
        }
        if state.installed && state.needs_upgrade && !matches!(command, "check" | "status" | "upgrade") {
            return CommandOutcome::new(1, NEEDS_UPGRADE, "");
        }

        let positional: Vec<&str> = args
            .iter()
            .map(String::as_str)
            .filter(|a| !a.starts_with("--"))
            .collect();
        let option = |name: &str| -> Option<String> {
            let prefix = format!("--{name}=");
            args.iter()
                .find_map(|a| a.strip_prefix(&prefix).map(str::to_string))
        };
        let first = positional.first().copied().unwrap_or_default().to_string();

        match command {
            "check" => {
                if !state.installed {
                    ok(NOT_INSTALLED)
                } else if state.needs_upgrade {
                    fail(NEEDS_UPGRADE)
                } else if state.broken {
                    fail(BROKEN_CONFIG)
                } else {
                    ok("[]")
                }
            }
            "status" => {
                if state.broken {
                    return fail(BROKEN_CONFIG);
                }
                ok(json!({
                    "installed": state.installed,
                    "version": "28.0.1.1",
                    "versionstring": "28.0.1",
                    "edition": "",
                    "maintenance": false,
                    "needsDbUpgrade": state.needs_upgrade,
                    "productname": "Nextcloud",
                })
                .to_string())
            }
            "upgrade" => {
                if !state.needs_upgrade {
                    return ok("No upgrade required.");
                }
                state.needs_upgrade = false;
                ok("Update successful")
            }
            "maintenance:install" => {
                if state.installed {
                    return fail("Command \"maintenance:install\" is not defined.");
                }
                if let Some(db) = option("database").filter(|db| db == "oracle") {
                    return fail(format!("Database {db} is not supported."));
                }
                if option("admin-pass").is_none() {
                    return fail("Set an admin password.");
                }
                state.installed = true;
                state.system.insert("installed".into(), json!(true));
                if let Some(db) = option("database") {
                    state.system.insert("dbtype".into(), json!(db));
                }
                drop(state);
                self.write_config_php();
                ok("Nextcloud was successfully installed")
            }
            "config:list" => ok(json!({ "system": Value::Object(state.system.clone()) }).to_string()),
            "config:import" => {
                let text = match std::fs::read_to_string(&first) {
                    Ok(text) => text,
                    Err(e) => return fail(format!("File {first} could not be read: {e}")),
                };
                let doc: Value = match serde_json::from_str(&text) {
                    Ok(doc) => doc,
                    Err(_) => return fail("Unable to parse the config file"),
                };
                if let Some(system) = doc.get("system").and_then(Value::as_object) {
                    for (k, v) in system {
                        state.system.insert(k.clone(), v.clone());
                    }
                }
                if state.break_on_import {
                    state.broken = true;
                }
                drop(state);
                self.write_config_php();
                ok("Config successfully imported from: ".to_string() + &first)
            }
            "app:list" => {
                let enabled: Map<String, Value> =
                    state.enabled.iter().map(|(k, v)| (k.clone(), json!(v))).collect();
                let disabled: Map<String, Value> =
                    state.disabled.iter().map(|(k, v)| (k.clone(), json!(v))).collect();
                ok(format!(
                    "The current PHP memory limit is below the recommended value of 512MB.\n{}",
                    json!({"enabled": php_json(&enabled), "disabled": php_json(&disabled)})
                ))
            }
            "app:install" => {
                if state.enabled.contains_key(&first) || state.disabled.contains_key(&first) {
                    return fail(format!("{first} already installed"));
                }
                if !state.store.contains(&first) {
                    return fail(format!("Could not download app {first}"));
                }
                state.enabled.insert(first.clone(), "1.0.0".into());
                ok(format!("{first} 1.0.0 installed\n{first} enabled"))
            }
            "app:enable" => {
                if !state.enabled.contains_key(&first) && !state.disabled.contains_key(&first) {
                    if !state.store.contains(&first) {
                        return fail(format!("Could not download app {first}"));
                    }
                    state.disabled.insert(first.clone(), "1.0.0".into());
                }
                let groups: Vec<&str> = args
                    .windows(2)
                    .filter(|w| w[0] == "--groups")
                    .map(|w| w[1].as_str())
                    .collect();
                if let Some(version) = state.disabled.remove(&first) {
                    state.enabled.insert(first.clone(), version);
                }
                let value = if groups.is_empty() {
                    "yes".to_string()
                } else {
                    json!(groups).to_string()
                };
                state.app_config.insert((first.clone(), "enabled".into()), value);
                ok(format!("{first} enabled"))
            }
            "app:disable" => match state.enabled.remove(&first) {
                Some(version) => {
                    state.disabled.insert(first.clone(), version);
                    state.app_config.insert((first.clone(), "enabled".into()), "no".into());
                    ok(format!("{first} disabled"))
                }
                None => fail(format!("No such app enabled: {first}")),
            },
            "app:remove" => {
                let removed = state.enabled.remove(&first).or_else(|| state.disabled.remove(&first));
                match removed {
                    Some(_) => ok(format!("{first} disabled\n{first} removed")),
                    None => fail(format!("{first} is not installed")),
                }
            }
            "app:update" => match state.updates.remove(&first) {
                Some(version) => {
                    if let Some(v) = state.enabled.get_mut(&first) {
                        v.clone_from(&version);
                    }
                    ok(format!("{first} new version available: {version}\n{first} updated"))
                }
                None => fail(format!("{first} is up to date")),
            },
            "update:check" => {
                let mut lines: Vec<String> = state
                    .updates
                    .iter()
                    .map(|(app, version)| format!("Update for {app} to version {version} is available."))
                    .collect();
                if lines.is_empty() {
                    lines.push("Everything up to date".into());
                }
                ok(lines.join("\n"))
            }
            "config:app:get" => {
                let key = positional.get(1).copied().unwrap_or_default();
                match state.app_config.get(&(first.clone(), key.to_string())) {
                    Some(value) => ok(value.clone()),
                    None => fail(""),
                }
            }
            "config:app:set" => {
                let key = positional.get(1).copied().unwrap_or_default().to_string();
                let value = args
                    .iter()
                    .position(|a| a == "--value")
                    .and_then(|i| args.get(i + 1))
                    .cloned()
                    .unwrap_or_default();
                let msg = format!(
                    "Config value '{key}' for app '{first}' is now set to '{value}', stored as string in fast cache"
                );
                state.app_config.insert((first, key), value);
                ok(msg)
            }
            "user:list" => {
                let users: Map<String, Value> = state
                    .users
                    .iter()
                    .map(|(uid, user)| (uid.clone(), json!(user.display_name)))
                    .collect();
                ok(php_json(&users).to_string())
            }
            "user:info" => match state.users.get(&first) {
                Some(user) => {
                    let groups: Vec<&String> = state
                        .groups
                        .iter()
                        .filter(|(_, members)| members.contains(&first))
                        .map(|(gid, _)| gid)
                        .collect();
                    ok(json!({
                        "user_id": first,
                        "display_name": user.display_name,
                        "email": null,
                        "enabled": user.enabled,
                        "groups": groups,
                        "quota": "none",
                        "last_seen": "1970-01-01T00:00:00+00:00",
                        "backend": "Database",
                    })
                    .to_string())
                }
                None => fail("user not found"),
            },
            "user:add" => {
                let Some(password) = password.filter(|p| !p.is_empty()) else {
                    return fail("--password-from-env given, but OC_PASS is empty!");
                };
                if state.users.contains_key(&first) {
                    return fail(format!("The user \"{first}\" already exists."));
                }
                let display_name = option("display-name").unwrap_or_else(|| first.clone());
                state.users.insert(
                    first.clone(),
                    User {
                        display_name,
                        enabled: true,
                        password,
                    },
                );
                ok(format!("The user \"{first}\" was created successfully"))
            }
            "user:resetpassword" => {
                let Some(password) = password.filter(|p| !p.is_empty()) else {
                    return fail("--password-from-env given, but OC_PASS is empty!");
                };
                match state.users.get_mut(&first) {
                    Some(user) => {
                        user.password = password;
                        ok(format!("Successfully reset password for {first}"))
                    }
                    None => fail("User does not exist"),
                }
            }
            "user:delete" => match state.users.remove(&first) {
                Some(_) => {
                    for members in state.groups.values_mut() {
                        members.retain(|m| *m != first);
                    }
                    ok("User deleted.")
                }
                None => fail("User does not exist"),
            },
            "user:enable" | "user:disable" => {
                let enable = command == "user:enable";
                match state.users.get_mut(&first) {
                    Some(user) => {
                        user.enabled = enable;
                        ok(format!(
                            "The specified user is {}",
                            if enable { "enabled" } else { "disabled" }
                        ))
                    }
                    None => fail("User does not exist"),
                }
            }
            "user:setting" => {
                let app = positional.get(1).copied().unwrap_or_default().to_string();
                let key = positional.get(2).copied().unwrap_or_default().to_string();
                let Some(user) = state.users.get(&first).cloned() else {
                    return fail(format!("The user \"{first}\" does not exist."));
                };
                if let Some(value) = positional.get(3) {
                    if app == "settings" && key == "display_name" {
                        if let Some(user) = state.users.get_mut(&first) {
                            user.display_name = (*value).to_string();
                        }
                    } else {
                        state
                            .user_settings
                            .insert((first, app, key), (*value).to_string());
                    }
                    return ok("");
                }
                if app == "settings" && key == "display_name" {
                    return ok(user.display_name);
                }
                match state.user_settings.get(&(first.clone(), app, key)) {
                    Some(value) => ok(value.clone()),
                    None => fail(format!("The setting does not exist for user \"{first}\".")),
                }
            }
            "group:list" => {
                let groups: Map<String, Value> = state
                    .groups
                    .iter()
                    .map(|(gid, members)| (gid.clone(), json!(members)))
                    .collect();
                ok(php_json(&groups).to_string())
            }
            "group:add" => {
                if state.groups.contains_key(&first) {
                    return fail(format!("Group \"{first}\" already exists."));
                }
                state.groups.insert(first.clone(), Vec::new());
                ok(format!("Created group \"{first}\""))
            }
            "group:delete" => {
                if first == "admin" {
                    return fail("Group \"admin\" could not be deleted.");
                }
                match state.groups.remove(&first) {
                    Some(_) => ok(format!("Group \"{first}\" was removed")),
                    None => fail(format!("Group \"{first}\" does not exist.")),
                }
            }
            "group:adduser" | "group:removeuser" => {
                let uid = positional.get(1).copied().unwrap_or_default().to_string();
                if !state.users.contains_key(&uid) {
                    return fail("user not found");
                }
                let Some(members) = state.groups.get_mut(&first) else {
                    return fail("group not found");
                };
                if command == "group:adduser" {
                    if !members.contains(&uid) {
                        members.push(uid);
                    }
                } else {
                    members.retain(|m| *m != uid);
                }
                ok("")
            }
            other => match other.strip_prefix("background:") {
                Some(mode @ ("ajax" | "cron" | "webcron")) => {
                    state
                        .app_config
                        .insert(("core".into(), "backgroundjobs_mode".into()), mode.to_string());
                    ok(format!("Set mode for background jobs to '{mode}'"))
                }
                _ => fail(format!("Command \"{other}\" is not defined.")),
            },
        }
    }

    /// Mirror the system configuration into `config/config.php`
    fn write_config_php(&self) {
        let dir = self.root.join("config");
        if !dir.is_dir() {
            return;
        }
        let system = Value::Object(self.lock().system.clone());
        let text = format!(
            "<?php\n$CONFIG = {};\n",
            serde_json::to_string_pretty(&system).unwrap()
        );
        std::fs::write(dir.join("config.php"), text).unwrap();
    }
}

impl Default for FakeNextcloud {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for FakeNextcloud {
    fn is_available(&self) -> bool {
        self.lock().present
    }

    fn working_dir(&self) -> &Path {
        &self.root
    }

    fn run(&self, invocation: &Invocation) -> occkit::Result<CommandOutcome> {
        let summary = invocation.summary();
        let canned = {
            let mut state = self.lock();
            state.calls.push(summary.clone());
            state
                .failures
                .iter()
                .find(|(prefix, _)| summary.starts_with(prefix.as_str()))
                .map(|(_, outcome)| outcome.clone())
        };
        if let Some(outcome) = canned {
            return Ok(outcome);
        }

        // argv after the subcommand, with the fixed flags dropped
        let args: Vec<String> = invocation
            .occ_args()
            .iter()
            .skip(1)
            .map(occkit::types::Arg::render)
            .filter(|a| a != "--no-ansi" && a != "--output=json")
            .collect();
        Ok(self.handle(invocation.command(), &args, invocation.env_overlay()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fake_round_trip() {
        let fake = FakeNextcloud::new().with_group("admin", &[]);
        let client = fake.client();
        assert!(client.probe().unwrap().is_ready());

        let outcome = client.add_user("bob", "secret", Some("Bob")).unwrap();
        assert!(outcome.success());
        assert!(client.add_to_group("admin", "bob").unwrap().success());

        let groups = client.list_groups().unwrap();
        assert_eq!(groups.members("admin"), ["bob".to_string()]);
        assert_eq!(fake.password("bob").as_deref(), Some("secret"));
        assert_eq!(fake.mutations(), vec!["user:add --password-from-env --display-name=Bob bob", "group:adduser admin bob"]);
    }

    #[test]
    fn test_empty_listings_use_php_arrays() {
        let client = FakeNextcloud::new().client();
        assert!(client.list_apps().unwrap().enabled.is_empty());
        assert!(client.list_users().unwrap().users.is_empty());
        assert!(client.list_groups().unwrap().groups.is_empty());
    }
}
