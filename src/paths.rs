//! Installation layout and scratch locations
//!
//! Everything the modules touch on disk lives below the Nextcloud working
//! directory, except the private scratch directory used while building a
//! configuration document.
//!
//! # Environment Variables
//!
//! - `NEXTCLOUD_OCC_TMP_DIR` - Override the scratch root (default `/run/.ansible`)

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Environment variable for the scratch root override
pub const ENV_TMP_DIR: &str = "NEXTCLOUD_OCC_TMP_DIR";

/// Default scratch root
pub const DEFAULT_TMP_DIR: &str = "/run/.ansible";

/// Paths inside one Nextcloud installation
#[derive(Debug, Clone)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: working_dir.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_dir(&self) -> PathBuf {
        self.root.join("config")
    }

    /// Live configuration, `config/config.php`
    pub fn config_php(&self) -> PathBuf {
        self.config_dir().join("config.php")
    }

    /// Last applied document, `config/ansible.json`
    pub fn snapshot(&self) -> PathBuf {
        self.config_dir().join("ansible.json")
    }

    /// Transient backup of `config.php` taken during a sync
    pub fn config_backup(&self, pid: u32) -> PathBuf {
        self.config_dir().join(format!("config.{pid}.bck"))
    }

    /// Transient backup of the snapshot taken during a sync
    pub fn snapshot_backup(&self, pid: u32) -> PathBuf {
        self.config_dir().join(format!("ansible.{pid}.bck"))
    }

    /// Copy of `config.php` kept after `maintenance:install`
    pub fn install_backup(&self) -> PathBuf {
        self.config_dir().join("config.bck")
    }

    /// `config:list system` dump written after `maintenance:install`
    pub fn config_json(&self) -> PathBuf {
        self.config_dir().join("config.json")
    }
}

/// Scratch root for private work directories
///
/// Priority:
/// 1. `NEXTCLOUD_OCC_TMP_DIR` env var
/// 2. `/run/.ansible`
pub fn tmp_root() -> PathBuf {
    if let Ok(dir) = std::env::var(ENV_TMP_DIR) {
        if !dir.is_empty() {
            log::debug!("Using scratch dir from {ENV_TMP_DIR}: {dir}");
            return PathBuf::from(dir);
        }
    }
    PathBuf::from(DEFAULT_TMP_DIR)
}

/// Create a private work directory below `root`, removed on drop
pub fn work_dir(root: &Path) -> Result<tempfile::TempDir> {
    std::fs::create_dir_all(root)
        .with_context(|| format!("Could not create {}", root.display()))?;
    tempfile::Builder::new()
        .prefix("nextcloud.")
        .tempdir_in(root)
        .with_context(|| format!("Could not create a work directory in {}", root.display()))
}
