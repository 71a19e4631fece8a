//! Module parameters
//!
//! Ansible hands binary modules a path to a JSON file holding the task
//! arguments plus its own `_ansible_*` keys. The same document can be given
//! as TOML (by extension) or piped on stdin. Unknown keys are ignored.

use declarative::{DesiredState, Entity};
use occkit::{BackgroundMode, InstallOptions};
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Wrapper key used by some Ansible invocation styles
const MODULE_ARGS_KEY: &str = "ANSIBLE_MODULE_ARGS";

#[derive(Debug, thiserror::Error)]
pub enum ParamsError {
    #[error("Could not read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not read parameters from stdin")]
    Stdin(#[source] std::io::Error),

    #[error("Invalid JSON parameters")]
    Json(#[from] serde_json::Error),

    #[error("Invalid TOML parameters")]
    Toml(#[from] toml::de::Error),
}

/// Load module parameters from `path`, or stdin when `None`.
pub fn load<T: DeserializeOwned>(path: Option<&Path>) -> Result<T, ParamsError> {
    let (text, is_toml) = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(|source| ParamsError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            let is_toml = path.extension().is_some_and(|ext| ext == "toml");
            (text, is_toml)
        }
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .map_err(ParamsError::Stdin)?;
            (text, false)
        }
    };
    parse(&text, is_toml)
}

/// Parse a parameter document.
pub fn parse<T: DeserializeOwned>(text: &str, is_toml: bool) -> Result<T, ParamsError> {
    if is_toml {
        return Ok(toml::from_str(text)?);
    }
    let text = if text.trim().is_empty() { "{}" } else { text };
    let mut value: serde_json::Value = serde_json::from_str(text)?;
    if let Some(inner) = value.get_mut(MODULE_ARGS_KEY) {
        value = inner.take();
    }
    Ok(serde_json::from_value(value)?)
}

fn default_owner() -> String {
    "www-data".to_string()
}

fn default_mode() -> String {
    "0640".to_string()
}

/// Parameters every module accepts
#[derive(Debug, Clone, Deserialize)]
pub struct CommonParams {
    /// Nextcloud installation directory
    pub working_dir: PathBuf,

    /// Web server user occ runs as
    #[serde(default = "default_owner")]
    pub owner: String,

    /// Run `occ upgrade` when the instance requires it
    #[serde(default)]
    pub auto_upgrade: bool,
}

// ============================================================================
// Apps
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct AppsParams {
    #[serde(flatten)]
    pub common: CommonParams,

    #[serde(default)]
    pub apps: Vec<AppSpec>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppSpec {
    #[serde(default, deserialize_with = "entity_name")]
    pub name: String,

    #[serde(default, deserialize_with = "null_default")]
    pub state: DesiredState,

    /// `config:app:set` key/value pairs
    #[serde(default)]
    pub settings: BTreeMap<String, serde_json::Value>,

    /// Restrict the app to these groups when enabling
    #[serde(default)]
    pub groups: Vec<String>,
}

impl Entity for AppSpec {
    fn name(&self) -> &str {
        &self.name
    }

    fn desired_state(&self) -> DesiredState {
        self.state
    }
}

// ============================================================================
// Users
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct UsersParams {
    #[serde(flatten)]
    pub common: CommonParams,

    #[serde(default)]
    pub users: Vec<UserSpec>,
}

#[derive(Clone, Default, Deserialize)]
pub struct UserSpec {
    #[serde(default, deserialize_with = "entity_name")]
    pub name: String,

    #[serde(default, deserialize_with = "null_default")]
    pub state: DesiredState,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default)]
    pub display_name: Option<String>,

    /// Reset the password of an existing user
    #[serde(default)]
    pub resetpassword: bool,

    /// Group memberships; `None` leaves membership alone
    #[serde(default)]
    pub groups: Option<Vec<String>>,

    /// Per-app user settings, `[{app: {key: value}}]`
    #[serde(default, deserialize_with = "one_or_many")]
    pub settings: Vec<BTreeMap<String, serde_json::Value>>,
}

impl fmt::Debug for UserSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserSpec")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("password", &self.password.as_ref().map(|_| occkit::types::MASK))
            .field("display_name", &self.display_name)
            .field("resetpassword", &self.resetpassword)
            .field("groups", &self.groups)
            .field("settings", &self.settings)
            .finish()
    }
}

impl Entity for UserSpec {
    fn name(&self) -> &str {
        &self.name
    }

    fn desired_state(&self) -> DesiredState {
        self.state
    }
}

/// Treat an explicit `null` like a missing key
fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Entity names are trimmed; `null` reads as empty and the entry is skipped
fn entity_name<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let name: String = null_default(deserializer)?;
    Ok(name.trim().to_string())
}

/// Accept a single map as a one-element list
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<BTreeMap<String, serde_json::Value>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(BTreeMap<String, serde_json::Value>),
        Many(Vec<BTreeMap<String, serde_json::Value>>),
        Nothing(()),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(map) => vec![map],
        OneOrMany::Many(list) => list,
        OneOrMany::Nothing(()) => Vec::new(),
    })
}

// ============================================================================
// Groups
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct GroupsParams {
    #[serde(flatten)]
    pub common: CommonParams,

    #[serde(default)]
    pub groups: Vec<GroupSpec>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupSpec {
    #[serde(default, deserialize_with = "entity_name")]
    pub name: String,

    #[serde(default, deserialize_with = "null_default")]
    pub state: DesiredState,

    #[serde(default)]
    pub display_name: Option<String>,
}

impl Entity for GroupSpec {
    fn name(&self) -> &str {
        &self.name
    }

    fn desired_state(&self) -> DesiredState {
        self.state
    }
}

// ============================================================================
// occ lifecycle
// ============================================================================

/// Lifecycle commands of the `occ` module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum OccCommand {
    Status,
    Check,
    Install,
    Upgrade,
    Background(BackgroundMode),
}

impl OccCommand {
    pub fn as_string(&self) -> String {
        match self {
            Self::Status => "status".to_string(),
            Self::Check => "check".to_string(),
            Self::Install => "maintenance:install".to_string(),
            Self::Upgrade => "upgrade".to_string(),
            Self::Background(mode) => format!("background:{mode}"),
        }
    }
}

impl TryFrom<String> for OccCommand {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.trim() {
            "status" => Ok(Self::Status),
            "check" => Ok(Self::Check),
            "maintenance:install" => Ok(Self::Install),
            "upgrade" => Ok(Self::Upgrade),
            other => other
                .strip_prefix("background:")
                .and_then(BackgroundMode::parse)
                .map(Self::Background)
                .ok_or_else(|| format!("unsupported occ command '{other}'")),
        }
    }
}

impl From<OccCommand> for String {
    fn from(command: OccCommand) -> Self {
        command.as_string()
    }
}

impl fmt::Display for OccCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OccParams {
    #[serde(flatten)]
    pub common: CommonParams,

    pub command: OccCommand,

    #[serde(default)]
    pub data_dir: Option<String>,

    #[serde(default)]
    pub database: DatabaseParams,

    #[serde(default)]
    pub admin: AdminParams,
}

#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseParams {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub hostname: Option<String>,
    #[serde(deserialize_with = "port")]
    pub port: Option<u16>,
    pub schema: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl fmt::Debug for DatabaseParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseParams")
            .field("type", &self.kind)
            .field("hostname", &self.hostname)
            .field("port", &self.port)
            .field("schema", &self.schema)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct AdminParams {
    pub username: Option<String>,
    pub password: Option<String>,
    pub email: Option<String>,
}

impl fmt::Debug for AdminParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminParams")
            .field("username", &self.username)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Ansible passes ports as numbers or strings
fn port<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u16),
        Text(String),
    }

    match Option::<Port>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Port::Number(n)) => Ok(Some(n)),
        Some(Port::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(Port::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("invalid port '{s}'"))),
    }
}

impl OccParams {
    /// Options for `maintenance:install`
    pub fn install_options(&self) -> InstallOptions {
        InstallOptions {
            database: self.database.kind.clone(),
            database_name: self.database.schema.clone(),
            database_host: self.database.hostname.clone(),
            database_port: self.database.port,
            database_user: self.database.username.clone(),
            database_pass: self.database.password.clone(),
            admin_user: self.admin.username.clone(),
            admin_pass: self.admin.password.clone(),
            admin_email: self.admin.email.clone(),
            data_dir: self.data_dir.clone(),
            ..Default::default()
        }
    }
}

// ============================================================================
// App updates
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateState {
    #[default]
    Check,
    Update,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateAppsParams {
    #[serde(flatten)]
    pub common: CommonParams,

    #[serde(default)]
    pub state: UpdateState,
}

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ConfigParams {
    #[serde(flatten)]
    pub common: CommonParams,

    /// Group owning `config.php`
    #[serde(default = "default_owner")]
    pub group: String,

    /// Declarative option tree
    #[serde(default)]
    pub config_parameters: serde_json::Value,

    #[serde(default)]
    pub trusted_domains: Vec<String>,

    /// Include a side-by-side diff in the result
    #[serde(default)]
    pub diff_output: bool,

    /// Octal mode for `config.php`
    #[serde(default = "default_mode")]
    pub mode: String,
}
