//! Config synchronizer
//!
//! Applies a declarative option tree to `config/config.php` through
//! `occ config:import`, guarded by a copy-validate-rollback protocol:
//!
//! 1. Render the document into a private work directory
//! 2. Compare its checksum with the last applied snapshot (`ansible.json`)
//! 3. Back up `config.php` and the snapshot
//! 4. Install the new snapshot and import it
//! 5. Validate with `occ status`; on failure restore both backups
//!
//! Whatever the outcome, `config.php` ends up with the requested owner,
//! group and mode unless the run failed.

pub mod diff;
pub mod document;
pub mod ownership;

use anyhow::{Context, Result};
use occkit::classify::extract_exception;
use occkit::{Client, Invocation};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use crate::output::ModuleResult;
use crate::paths::{self, Layout};
pub use document::ConfigDocument;

pub const MSG_UNCHANGED: &str = "The configuration has not been changed.";
pub const MSG_UPDATED: &str = "The configuration has been successfully updated.";
pub const MSG_CREATED: &str = "The configuration was successfully created.";

/// Everything a sync needs besides the client
#[derive(Debug, Clone)]
pub struct SyncOptions<'a> {
    pub parameters: &'a Value,
    pub trusted_domains: &'a [String],
    pub diff_output: bool,
    pub owner: &'a str,
    pub group: &'a str,
    pub mode: u32,
    /// Parent of the private work directory
    pub tmp_root: PathBuf,
}

/// Content checksum of a file, `None` when it does not exist
pub fn checksum(path: &Path) -> Result<Option<String>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(blake3::hash(&bytes).to_hex().to_string())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("Could not read {}", path.display())),
    }
}

/// Synchronize the configuration.
pub fn sync(client: &Client, layout: &Layout, options: &SyncOptions<'_>) -> Result<ModuleResult> {
    log::debug!("synchronizing the configuration of {}", layout.root().display());
    let document = ConfigDocument::build(options.parameters, options.trusted_domains);
    let text = document.render().context("Could not encode the configuration")?;

    let work = paths::work_dir(&options.tmp_root)?;
    let staged = work.path().join("ansible.json");
    fs::write(&staged, &text).with_context(|| format!("Could not write {}", staged.display()))?;

    let snapshot = layout.snapshot();
    let new_sum = checksum(&staged)?;
    let old_sum = checksum(&snapshot)?;
    log::debug!("checksums: staged={new_sum:?} snapshot={old_sum:?}");

    let mut result = if new_sum == old_sum {
        ModuleResult::ok(MSG_UNCHANGED)
    } else {
        let diff = if options.diff_output {
            let old_text = fs::read_to_string(&snapshot).unwrap_or_default();
            Some(diff::side_by_side(&old_text, &text, diff::DEFAULT_WIDTH))
        } else {
            None
        };

        let backup = Backup::take(layout, std::process::id())?;
        match apply(client, layout, &staged) {
            Ok(None) => {
                backup.discard()?;
                let msg = if old_sum.is_none() { MSG_CREATED } else { MSG_UPDATED };
                ModuleResult::changed(msg).with_diff(diff)
            }
            Ok(Some(error)) => {
                log::warn!("rolling back configuration: {error}");
                backup.restore()?;
                return Ok(ModuleResult::failed(error).with_diff(diff));
            }
            Err(e) => {
                backup.restore()?;
                return Err(e);
            }
        }
    };

    if ownership::enforce(&layout.config_php(), options.owner, options.group, options.mode)? {
        result.changed = true;
    }
    Ok(result)
}

/// Install the staged document and validate it; `Some` carries the failure
fn apply(client: &Client, layout: &Layout, staged: &Path) -> Result<Option<String>> {
    let snapshot = layout.snapshot();
    fs::copy(staged, &snapshot)
        .with_context(|| format!("Could not install {}", snapshot.display()))?;

    let import = client.import_config(&snapshot)?;
    if !import.success() {
        return Ok(Some(format!(
            "The configuration could not be imported: {}",
            import.message()
        )));
    }

    let status = client.run(&Invocation::new("status"))?;
    if !status.success() {
        let text = status.combined();
        let error = extract_exception(&text).unwrap_or_else(|| status.message());
        return Ok(Some(format!("The configuration holds a fatal error: {error}")));
    }
    Ok(None)
}

/// Copies of `config.php` and the snapshot taken before an import
struct Backup {
    config: PathBuf,
    config_copy: Option<PathBuf>,
    snapshot: PathBuf,
    snapshot_copy: Option<PathBuf>,
}

impl Backup {
    fn take(layout: &Layout, pid: u32) -> Result<Self> {
        let keep = |from: PathBuf, to: PathBuf| -> Result<Option<PathBuf>> {
            if !from.exists() {
                return Ok(None);
            }
            fs::copy(&from, &to).with_context(|| {
                format!("Could not back up {} to {}", from.display(), to.display())
            })?;
            Ok(Some(to))
        };
        Ok(Self {
            config_copy: keep(layout.config_php(), layout.config_backup(pid))?,
            snapshot_copy: keep(layout.snapshot(), layout.snapshot_backup(pid))?,
            config: layout.config_php(),
            snapshot: layout.snapshot(),
        })
    }

    /// Put both files back the way they were
    fn restore(&self) -> Result<()> {
        if let Some(copy) = &self.config_copy {
            fs::copy(copy, &self.config)
                .with_context(|| format!("Could not restore {}", self.config.display()))?;
        }
        match &self.snapshot_copy {
            Some(copy) => {
                fs::copy(copy, &self.snapshot)
                    .with_context(|| format!("Could not restore {}", self.snapshot.display()))?;
            }
            None if self.snapshot.exists() => fs::remove_file(&self.snapshot)?,
            None => {}
        }
        self.discard()
    }

    fn discard(&self) -> Result<()> {
        for copy in [&self.config_copy, &self.snapshot_copy].into_iter().flatten() {
            fs::remove_file(copy)
                .with_context(|| format!("Could not remove {}", copy.display()))?;
        }
        Ok(())
    }
}
