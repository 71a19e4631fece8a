//! Queries of the current Nextcloud state.
//!
//! List commands are called with `--output=json`. occ may print warnings
//! (e.g. about the PHP memory limit) before the JSON body; those lines are
//! skipped. Output that is empty or not JSON is an error, never "nothing
//! there".

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::types::{
    AppListing, AvailableUpdate, GroupListing, Invocation, StatusReport, UserInfo, UserListing,
};
use regex::Regex;
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::sync::LazyLock;

/// Notice `user:setting` prints for a key that is not set
const SETTING_UNSET: &str = "The setting does not exist for user";

static UPDATE_LINE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"Update for (?P<app>.*) to version (?P<version>.*) is available").ok()
});

/// Slice `text` from the first line that opens a JSON value.
pub fn json_body(text: &str) -> Option<&str> {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let trimmed = line.trim_start();
        if trimmed.starts_with('{') || trimmed.starts_with('[') {
            return Some(&text[offset..]);
        }
        offset += line.len();
    }
    None
}

/// Decode the first JSON value in a command's stdout.
pub fn decode<T: DeserializeOwned>(command: &str, stdout: &str) -> Result<T> {
    if stdout.trim().is_empty() {
        return Err(Error::EmptyOutput {
            command: command.to_string(),
        });
    }
    let body = json_body(stdout).unwrap_or(stdout);
    serde_json::Deserializer::from_str(body)
        .into_iter::<T>()
        .next()
        .unwrap_or_else(|| serde_json::from_str::<T>(""))
        .map_err(|source| Error::Decode {
            command: command.to_string(),
            source,
        })
}

/// Run a JSON query and decode its output.
fn query<T: DeserializeOwned>(backend: &dyn Backend, invocation: &Invocation) -> Result<T> {
    let outcome = backend.run(invocation)?;
    if !outcome.success() {
        return Err(Error::CommandFailed {
            command: invocation.command().to_string(),
            message: outcome.message(),
        });
    }
    decode(invocation.command(), &outcome.stdout)
}

/// Enabled and disabled apps.
pub fn list_apps(backend: &dyn Backend) -> Result<AppListing> {
    query(backend, &Invocation::new("app:list").json_output())
}

/// Users and their display names.
pub fn list_users(backend: &dyn Backend) -> Result<UserListing> {
    query(backend, &Invocation::new("user:list").json_output())
}

/// Groups and their members.
pub fn list_groups(backend: &dyn Backend) -> Result<GroupListing> {
    query(backend, &Invocation::new("group:list").json_output())
}

/// Details of a single user.
pub fn user_info(backend: &dyn Backend, uid: &str) -> Result<UserInfo> {
    query(backend, &Invocation::new("user:info").arg(uid).json_output())
}

/// Instance status.
pub fn status(backend: &dyn Backend) -> Result<StatusReport> {
    query(backend, &Invocation::new("status").json_output())
}

/// The `system` section of the live configuration.
pub fn system_config(backend: &dyn Backend) -> Result<serde_json::Value> {
    query(backend, &Invocation::new("config:list").arg("system"))
}

/// Apps with updates available in the app store.
pub fn available_updates(backend: &dyn Backend) -> Result<Vec<AvailableUpdate>> {
    let invocation = Invocation::new("update:check");
    let outcome = backend.run(&invocation)?;
    if !outcome.success() {
        return Err(Error::CommandFailed {
            command: invocation.command().to_string(),
            message: outcome.message(),
        });
    }
    Ok(parse_updates(&outcome.stdout))
}

/// Extract app updates from `update:check` text.
pub fn parse_updates(text: &str) -> Vec<AvailableUpdate> {
    let Some(re) = UPDATE_LINE.as_ref() else {
        return Vec::new();
    };
    text.lines()
        .filter_map(|line| re.captures(line.trim()))
        .map(|caps| AvailableUpdate {
            app: caps["app"].trim().to_string(),
            version: caps["version"].trim().to_string(),
        })
        .collect()
}

/// Installed path of an app, `None` when occ does not know it.
pub fn app_path(backend: &dyn Backend, app: &str) -> Result<Option<PathBuf>> {
    let outcome = backend.run(&Invocation::new("app:getpath").arg(app))?;
    let path = outcome.stdout.trim();
    if !outcome.success() || path.is_empty() {
        return Ok(None);
    }
    Ok(Some(PathBuf::from(path)))
}

/// Read an app config value, `None` when unset.
pub fn app_config(backend: &dyn Backend, app: &str, key: &str) -> Result<Option<String>> {
    read_value(backend, &Invocation::new("config:app:get").args([app, key]))
}

/// Read a per-user setting, `None` when unset.
pub fn user_setting(backend: &dyn Backend, uid: &str, app: &str, key: &str) -> Result<Option<String>> {
    read_value(backend, &Invocation::new("user:setting").args([uid, app, key]))
}

/// Run a single-value getter.
///
/// occ reports an unset value with exit code 1 and either no output or
/// `user:setting`'s "does not exist" notice. Anything else that fails, such
/// as an unhandled exception, is an error.
fn read_value(backend: &dyn Backend, invocation: &Invocation) -> Result<Option<String>> {
    let outcome = backend.run(invocation)?;
    if outcome.success() {
        return Ok(Some(trim_newline(&outcome.stdout)));
    }
    let message = outcome.message();
    if outcome.exit_code == 1 && (message.is_empty() || message.contains(SETTING_UNSET)) {
        return Ok(None);
    }
    Err(Error::CommandFailed {
        command: invocation.command().to_string(),
        message,
    })
}

fn trim_newline(s: &str) -> String {
    s.trim_end_matches(['\n', '\r']).to_string()
}
