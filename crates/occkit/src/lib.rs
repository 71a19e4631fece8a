//! # occkit
//!
//! Pure Rust library for driving the Nextcloud `occ` console.
//!
//! This crate provides functionality for:
//! - Running occ subcommands as the web server user, with secrets kept out
//!   of logs and out of the parent environment
//! - Probing whether an instance is installed, unconfigured or awaiting an
//!   upgrade
//! - Listing apps, users and groups from occ's JSON output
//! - Classifying occ's prose output through a pluggable pattern table
//!
//! ## Example
//!
//! ```no_run
//! use occkit::Client;
//!
//! let client = Client::new("/var/www/nextcloud", "www-data");
//!
//! let state = client.gate(false).expect("probe failed");
//! if state.is_ready() {
//!     let apps = client.list_apps().expect("app:list failed");
//!     for app in apps.enabled.keys() {
//!         println!("enabled: {app}");
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod classify;
pub mod error;
pub mod lister;
pub mod probe;
pub mod types;

pub use classify::{Classification, Classifier, OutputClass, Rule};
pub use error::{Error, Result};
pub use probe::ProbeState;
pub use types::{
    AppListing, AvailableUpdate, BackgroundMode, CommandOutcome, GroupListing, InstallOptions,
    Invocation, StatusReport, UserInfo, UserListing,
};

use backend::{Backend, occ::OccBackend};
use std::path::{Path, PathBuf};

/// Environment variable occ reads passwords from.
pub const PASSWORD_ENV: &str = "OC_PASS";

/// High-level client for one Nextcloud installation.
///
/// Mutations return the raw [`CommandOutcome`]; deciding whether a non-zero
/// exit is benign is left to the caller, typically via [`Client::classify`].
pub struct Client {
    backend: Box<dyn Backend>,
    classifier: Classifier,
}

impl Client {
    /// Create a client running occ in `working_dir` as `owner`.
    pub fn new(working_dir: impl Into<PathBuf>, owner: &str) -> Self {
        Self::with_backend(Box::new(OccBackend::new(working_dir, owner)))
    }

    /// Create a client with a custom backend (useful for testing).
    pub fn with_backend(backend: Box<dyn Backend>) -> Self {
        Self {
            backend,
            classifier: Classifier::default(),
        }
    }

    /// Replace the output classification table.
    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Check if occ is present.
    pub fn is_available(&self) -> bool {
        self.backend.is_available()
    }

    /// The installation directory.
    pub fn working_dir(&self) -> &Path {
        self.backend.working_dir()
    }

    /// The output classification table.
    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Classify a command outcome.
    pub fn classify(&self, outcome: &CommandOutcome) -> Option<Classification> {
        self.classifier.classify_outcome(outcome)
    }

    /// Run an arbitrary invocation.
    pub fn run(&self, invocation: &Invocation) -> Result<CommandOutcome> {
        self.backend.run(invocation)
    }

    // =========================================================================
    // Probe
    // =========================================================================

    /// Determine the installation state.
    pub fn probe(&self) -> Result<ProbeState> {
        probe::probe(self.backend.as_ref(), &self.classifier)
    }

    /// Probe, upgrading first when `auto_upgrade` is set and needed.
    pub fn gate(&self, auto_upgrade: bool) -> Result<ProbeState> {
        probe::gate(self.backend.as_ref(), &self.classifier, auto_upgrade)
    }

    /// Run `occ check`.
    pub fn check(&self) -> Result<CommandOutcome> {
        self.run(&Invocation::new("check"))
    }

    /// Read `occ status`.
    pub fn status(&self) -> Result<StatusReport> {
        lister::status(self.backend.as_ref())
    }

    /// Run `occ upgrade`.
    pub fn upgrade(&self) -> Result<CommandOutcome> {
        self.run(&Invocation::new("upgrade"))
    }

    /// Run `occ maintenance:install`.
    pub fn maintenance_install(&self, options: &InstallOptions) -> Result<CommandOutcome> {
        self.run(&options.invocation())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Enabled and disabled apps.
    pub fn list_apps(&self) -> Result<AppListing> {
        lister::list_apps(self.backend.as_ref())
    }

    /// Users and display names.
    pub fn list_users(&self) -> Result<UserListing> {
        lister::list_users(self.backend.as_ref())
    }

    /// Groups and members.
    pub fn list_groups(&self) -> Result<GroupListing> {
        lister::list_groups(self.backend.as_ref())
    }

    /// Details of one user.
    pub fn user_info(&self, uid: &str) -> Result<UserInfo> {
        lister::user_info(self.backend.as_ref(), uid)
    }

    /// Apps with pending updates.
    pub fn available_updates(&self) -> Result<Vec<AvailableUpdate>> {
        lister::available_updates(self.backend.as_ref())
    }

    /// Installed path of an app.
    pub fn app_path(&self, app: &str) -> Result<Option<PathBuf>> {
        lister::app_path(self.backend.as_ref(), app)
    }

    /// The `system` configuration section.
    pub fn system_config(&self) -> Result<serde_json::Value> {
        lister::system_config(self.backend.as_ref())
    }

    /// Read an app config value.
    pub fn app_config(&self, app: &str, key: &str) -> Result<Option<String>> {
        lister::app_config(self.backend.as_ref(), app, key)
    }

    /// Read a per-user setting.
    pub fn user_setting(&self, uid: &str, app: &str, key: &str) -> Result<Option<String>> {
        lister::user_setting(self.backend.as_ref(), uid, app, key)
    }

    // =========================================================================
    // Apps
    // =========================================================================

    /// Install (and enable) an app from the app store.
    pub fn install_app(&self, app: &str) -> Result<CommandOutcome> {
        self.run(&Invocation::new("app:install").arg(app))
    }

    /// Enable an app, optionally only for some groups.
    pub fn enable_app(&self, app: &str, groups: &[String]) -> Result<CommandOutcome> {
        let mut inv = Invocation::new("app:enable").arg(app);
        for group in groups {
            inv = inv.arg("--groups").arg(group.as_str());
        }
        self.run(&inv)
    }

    /// Disable an app.
    pub fn disable_app(&self, app: &str) -> Result<CommandOutcome> {
        self.run(&Invocation::new("app:disable").arg(app))
    }

    /// Remove an app.
    pub fn remove_app(&self, app: &str) -> Result<CommandOutcome> {
        self.run(&Invocation::new("app:remove").arg(app))
    }

    /// Update one app.
    pub fn update_app(&self, app: &str) -> Result<CommandOutcome> {
        self.run(&Invocation::new("app:update").arg(app))
    }

    /// Write an app config value.
    pub fn set_app_config(&self, app: &str, key: &str, value: &str) -> Result<CommandOutcome> {
        self.run(
            &Invocation::new("config:app:set")
                .args([app, key, "--value"])
                .arg(value),
        )
    }

    /// Switch the background job mode.
    pub fn set_background_mode(&self, mode: BackgroundMode) -> Result<CommandOutcome> {
        self.run(&Invocation::new(format!("background:{mode}")))
    }

    /// Import a JSON configuration file.
    pub fn import_config(&self, path: &Path) -> Result<CommandOutcome> {
        self.run(&Invocation::new("config:import").arg(path.display().to_string()))
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Create a user; the password travels in the child's environment.
    pub fn add_user(
        &self,
        uid: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<CommandOutcome> {
        let mut inv = Invocation::new("user:add")
            .env(PASSWORD_ENV, password)
            .arg("--password-from-env");
        if let Some(name) = display_name {
            inv = inv.arg(format!("--display-name={name}"));
        }
        self.run(&inv.arg(uid))
    }

    /// Reset a user's password.
    pub fn reset_password(&self, uid: &str, password: &str) -> Result<CommandOutcome> {
        self.run(
            &Invocation::new("user:resetpassword")
                .env(PASSWORD_ENV, password)
                .args(["--password-from-env", uid]),
        )
    }

    /// Delete a user.
    pub fn delete_user(&self, uid: &str) -> Result<CommandOutcome> {
        self.run(&Invocation::new("user:delete").arg(uid))
    }

    /// Enable a user.
    pub fn enable_user(&self, uid: &str) -> Result<CommandOutcome> {
        self.run(&Invocation::new("user:enable").arg(uid))
    }

    /// Disable a user.
    pub fn disable_user(&self, uid: &str) -> Result<CommandOutcome> {
        self.run(&Invocation::new("user:disable").arg(uid))
    }

    /// Write a per-user setting.
    pub fn set_user_setting(
        &self,
        uid: &str,
        app: &str,
        key: &str,
        value: &str,
    ) -> Result<CommandOutcome> {
        self.run(&Invocation::new("user:setting").args([uid, app, key, value]))
    }

    // =========================================================================
    // Groups
    // =========================================================================

    /// Create a group.
    pub fn add_group(&self, gid: &str, display_name: Option<&str>) -> Result<CommandOutcome> {
        let mut inv = Invocation::new("group:add");
        if let Some(name) = display_name {
            inv = inv.arg(format!("--display-name={name}"));
        }
        self.run(&inv.arg(gid))
    }

    /// Delete a group.
    pub fn delete_group(&self, gid: &str) -> Result<CommandOutcome> {
        self.run(&Invocation::new("group:delete").arg(gid))
    }

    /// Add a user to a group.
    pub fn add_to_group(&self, gid: &str, uid: &str) -> Result<CommandOutcome> {
        self.run(&Invocation::new("group:adduser").args([gid, uid]))
    }

    /// Remove a user from a group.
    pub fn remove_from_group(&self, gid: &str, uid: &str) -> Result<CommandOutcome> {
        self.run(&Invocation::new("group:removeuser").args([gid, uid]))
    }
}
