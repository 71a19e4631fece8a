//! Error types for occ operations.
//!
//! Only conditions that stop a run are errors here. A command that ran and
//! exited non-zero is not an error: it comes back as a
//! [`CommandOutcome`](crate::types::CommandOutcome) and the caller decides
//! what it means (see [`Classifier`](crate::classify::Classifier)).

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while driving `occ`.
#[derive(Debug, Error)]
pub enum Error {
    /// The `occ` entry point does not exist in the installation directory
    #[error("missing occ: {}", .0.display())]
    OccNotFound(PathBuf),

    /// The process could not be started at all
    #[error("failed to execute {program}: {source}")]
    Spawn {
        /// Program that could not be started
        program: String,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// A query command exited non-zero where output was required
    #[error("occ {command} failed: {message}")]
    CommandFailed {
        /// The occ subcommand
        command: String,
        /// Message taken from the command output
        message: String,
    },

    /// A machine-readable command produced output that is not valid JSON
    #[error("could not decode output of occ {command}: {source}")]
    Decode {
        /// The occ subcommand
        command: String,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// A machine-readable command produced no output at all
    #[error("occ {command} returned no output")]
    EmptyOutput {
        /// The occ subcommand
        command: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error means the installation itself is unusable.
    pub fn is_environment(&self) -> bool {
        matches!(self, Self::OccNotFound(_) | Self::Spawn { .. })
    }

    /// Whether this error is a decoding defect rather than an occ failure.
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. } | Self::EmptyOutput { .. })
    }
}

/// Result type for occ operations.
pub type Result<T> = std::result::Result<T, Error>;
