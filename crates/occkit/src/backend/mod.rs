//! Backend abstraction for running occ.
//!
//! The [`Backend`] trait defines how an [`Invocation`] reaches the console,
//! allowing for different implementations (real `sudo php occ`, scripted
//! responses for testing).

pub mod occ;

#[cfg(any(test, feature = "test-support"))]
pub mod scripted;

use crate::error::Result;
use crate::types::{CommandOutcome, Invocation};
use std::path::Path;

/// Backend trait for occ execution.
///
/// A command that runs and exits non-zero is an `Ok` outcome. Only failing
/// to start the process is an error.
pub trait Backend: Send + Sync {
    /// Check if the `occ` entry point exists.
    fn is_available(&self) -> bool;

    /// The Nextcloud installation directory.
    fn working_dir(&self) -> &Path;

    /// Run one occ subcommand.
    fn run(&self, invocation: &Invocation) -> Result<CommandOutcome>;
}

/// Get the default backend for an installation.
pub fn default_backend(working_dir: impl Into<std::path::PathBuf>, owner: &str) -> occ::OccBackend {
    occ::OccBackend::new(working_dir, owner)
}
