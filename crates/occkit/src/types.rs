//! Core types for driving occ.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Placeholder printed instead of secret argument values.
pub const MASK: &str = "********";

/// Raw result of one external command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutcome {
    /// Exit code, `-1` when the process was killed by a signal
    pub exit_code: i32,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
}

impl CommandOutcome {
    /// Create an outcome from its parts.
    pub fn new(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Whether the command exited 0.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Stdout and stderr joined by a newline.
    pub fn combined(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }

    /// Trimmed, non-empty output streams joined for display.
    pub fn message(&self) -> String {
        [self.stdout.trim(), self.stderr.trim()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A single command-line argument, possibly secret.
#[derive(Clone, PartialEq, Eq)]
pub enum Arg {
    /// Logged verbatim
    Plain(String),
    /// Logged as `prefix********`
    Secret {
        /// Visible part, e.g. `--admin-pass=`
        prefix: String,
        /// Hidden part
        value: String,
    },
}

impl Arg {
    /// The argument as passed to the process.
    pub fn render(&self) -> String {
        match self {
            Self::Plain(s) => s.clone(),
            Self::Secret { prefix, value } => format!("{prefix}{value}"),
        }
    }

    /// The argument as written to logs.
    pub fn masked(&self) -> String {
        match self {
            Self::Plain(s) => s.clone(),
            Self::Secret { prefix, .. } => format!("{prefix}{MASK}"),
        }
    }
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.masked())
    }
}

impl From<&str> for Arg {
    fn from(s: &str) -> Self {
        Self::Plain(s.to_string())
    }
}

impl From<String> for Arg {
    fn from(s: String) -> Self {
        Self::Plain(s)
    }
}

/// One occ subcommand with its arguments and environment overlay.
///
/// `--no-ansi` is always passed; `--output=json` only when requested.
#[derive(Clone, PartialEq, Eq)]
pub struct Invocation {
    command: String,
    args: Vec<Arg>,
    json: bool,
    env: Vec<(String, String)>,
}

impl Invocation {
    /// Start an invocation of an occ subcommand.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            json: false,
            env: Vec::new(),
        }
    }

    /// Append a positional argument or flag.
    pub fn arg(mut self, arg: impl Into<Arg>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Append `--name=value` with the value hidden from logs.
    pub fn secret_option(mut self, name: &str, value: impl Into<String>) -> Self {
        self.args.push(Arg::Secret {
            prefix: format!("--{name}="),
            value: value.into(),
        });
        self
    }

    /// Request machine-readable output.
    pub fn json_output(mut self) -> Self {
        self.json = true;
        self
    }

    /// Set a variable on the child process only.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// The occ subcommand name.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Whether `--output=json` is requested.
    pub fn wants_json(&self) -> bool {
        self.json
    }

    /// Environment overlay.
    pub fn env_overlay(&self) -> &[(String, String)] {
        &self.env
    }

    /// Full occ argument list: subcommand, fixed flags, then arguments.
    pub fn occ_args(&self) -> Vec<Arg> {
        let mut out = vec![Arg::Plain(self.command.clone()), Arg::from("--no-ansi")];
        if self.json {
            out.push(Arg::from("--output=json"));
        }
        out.extend(self.args.iter().cloned());
        out
    }

    /// Subcommand and arguments, masked, without the fixed flags.
    pub fn summary(&self) -> String {
        std::iter::once(self.command.clone())
            .chain(self.args.iter().map(Arg::masked))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// The occ arguments as a masked, space-separated string.
    pub fn display(&self) -> String {
        self.occ_args()
            .iter()
            .map(Arg::masked)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let env: Vec<&str> = self.env.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("Invocation")
            .field("args", &self.display())
            .field("env", &env)
            .finish()
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// PHP encodes an empty associative array as `[]`.
#[derive(Deserialize)]
#[serde(untagged)]
enum PhpMap<V> {
    Map(BTreeMap<String, V>),
    List(Vec<serde_json::Value>),
}

/// Deserialize a JSON object that may arrive as an empty list.
pub fn php_map<'de, D, V>(deserializer: D) -> Result<BTreeMap<String, V>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    match Option::<PhpMap<V>>::deserialize(deserializer)? {
        None => Ok(BTreeMap::new()),
        Some(PhpMap::Map(map)) => Ok(map),
        Some(PhpMap::List(list)) if list.is_empty() => Ok(BTreeMap::new()),
        Some(PhpMap::List(_)) => Err(de::Error::custom("expected an object, found a list")),
    }
}

/// Output of `app:list`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppListing {
    /// Enabled apps and their versions
    #[serde(default, deserialize_with = "php_map")]
    pub enabled: BTreeMap<String, Option<String>>,
    /// Installed but disabled apps
    #[serde(default, deserialize_with = "php_map")]
    pub disabled: BTreeMap<String, Option<String>>,
}

impl AppListing {
    /// Whether the app is enabled.
    pub fn is_enabled(&self, app: &str) -> bool {
        self.enabled.contains_key(app)
    }

    /// Whether the app is installed but disabled.
    pub fn is_disabled(&self, app: &str) -> bool {
        self.disabled.contains_key(app)
    }

    /// Whether the app is installed at all.
    pub fn contains(&self, app: &str) -> bool {
        self.is_enabled(app) || self.is_disabled(app)
    }
}

/// Output of `user:list`: user id to display name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserListing {
    /// Users keyed by id
    #[serde(deserialize_with = "php_map")]
    pub users: BTreeMap<String, String>,
}

impl UserListing {
    /// Whether the user exists.
    pub fn contains(&self, uid: &str) -> bool {
        self.users.contains_key(uid)
    }

    /// Display name of a user.
    pub fn display_name(&self, uid: &str) -> Option<&str> {
        self.users.get(uid).map(String::as_str)
    }
}

/// Output of `group:list`: group id to member ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupListing {
    /// Groups keyed by id
    #[serde(deserialize_with = "php_map")]
    pub groups: BTreeMap<String, Vec<String>>,
}

impl GroupListing {
    /// Whether the group exists.
    pub fn contains(&self, gid: &str) -> bool {
        self.groups.contains_key(gid)
    }

    /// Members of a group.
    pub fn members(&self, gid: &str) -> &[String] {
        self.groups.get(gid).map_or(&[], Vec::as_slice)
    }

    /// Groups the user belongs to, sorted.
    pub fn groups_of(&self, uid: &str) -> Vec<String> {
        self.groups
            .iter()
            .filter(|(_, members)| members.iter().any(|m| m == uid))
            .map(|(gid, _)| gid.clone())
            .collect()
    }
}

/// Output of `user:info`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserInfo {
    /// User id
    pub user_id: String,
    /// Display name
    pub display_name: String,
    /// Email address
    pub email: Option<String>,
    /// Whether the account is enabled
    pub enabled: bool,
    /// Group memberships
    pub groups: Vec<String>,
    /// Storage quota
    pub quota: Option<String>,
    /// Last login
    pub last_seen: Option<String>,
    /// User backend
    pub backend: Option<String>,
}

/// Output of `status`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusReport {
    /// Whether the instance has been set up
    pub installed: bool,
    /// Full version, e.g. `28.0.1.1`
    pub version: String,
    /// Marketing version, e.g. `28.0.1`
    pub versionstring: String,
    /// Edition
    pub edition: String,
    /// Whether maintenance mode is on
    pub maintenance: bool,
    /// Whether `occ upgrade` is pending
    #[serde(rename = "needsDbUpgrade")]
    pub needs_db_upgrade: bool,
    /// Product name
    pub productname: String,
}

/// An app with a newer version available in the app store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableUpdate {
    /// App id
    pub app: String,
    /// Version offered
    pub version: String,
}

/// Background job execution modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundMode {
    /// Run jobs on page loads
    Ajax,
    /// System cron
    Cron,
    /// External HTTP trigger
    Webcron,
}

impl BackgroundMode {
    /// Value stored in `core backgroundjobs_mode`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ajax => "ajax",
            Self::Cron => "cron",
            Self::Webcron => "webcron",
        }
    }

    /// Parse a mode name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "ajax" => Some(Self::Ajax),
            "cron" => Some(Self::Cron),
            "webcron" => Some(Self::Webcron),
            _ => None,
        }
    }
}

impl fmt::Display for BackgroundMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters for `maintenance:install`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallOptions {
    /// Database type (`mysql`, `pgsql`, `sqlite`, ...)
    pub database: Option<String>,
    /// Database name
    pub database_name: Option<String>,
    /// Database host
    pub database_host: Option<String>,
    /// Database port
    pub database_port: Option<u16>,
    /// Database user
    pub database_user: Option<String>,
    /// Database password
    pub database_pass: Option<String>,
    /// Table prefix
    pub database_table_prefix: Option<String>,
    /// Admin account name
    pub admin_user: Option<String>,
    /// Admin account password
    pub admin_pass: Option<String>,
    /// Admin email
    pub admin_email: Option<String>,
    /// Data directory
    pub data_dir: Option<String>,
}

impl InstallOptions {
    /// Build the `maintenance:install` invocation, hiding passwords.
    pub fn invocation(&self) -> Invocation {
        let mut inv = Invocation::new("maintenance:install");
        let plain = [
            ("database", self.database.clone()),
            ("database-name", self.database_name.clone()),
            ("database-host", self.database_host.clone()),
            ("database-port", self.database_port.map(|p| p.to_string())),
            ("database-user", self.database_user.clone()),
            ("database-table-prefix", self.database_table_prefix.clone()),
            ("admin-user", self.admin_user.clone()),
            ("admin-email", self.admin_email.clone()),
            ("data-dir", self.data_dir.clone()),
        ];
        for (name, value) in plain {
            if let Some(value) = value {
                inv = inv.arg(format!("--{name}={value}"));
            }
        }
        if let Some(pass) = &self.database_pass {
            inv = inv.secret_option("database-pass", pass.clone());
        }
        if let Some(pass) = &self.admin_pass {
            inv = inv.secret_option("admin-pass", pass.clone());
        }
        inv
    }
}
