//! Real occ backend using `sudo --user <owner> php occ`.

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::types::{Arg, CommandOutcome, Invocation};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Backend that executes the installation's `occ` as the web server user.
#[derive(Debug, Clone)]
pub struct OccBackend {
    /// Nextcloud installation directory
    working_dir: PathBuf,
    /// Account occ must run as; empty runs as the current user
    owner: String,
    /// PHP interpreter
    php: String,
}

impl OccBackend {
    /// Create a backend for the installation in `working_dir`.
    pub fn new(working_dir: impl Into<PathBuf>, owner: &str) -> Self {
        Self {
            working_dir: working_dir.into(),
            owner: owner.to_string(),
            php: "php".to_string(),
        }
    }

    /// Use a different PHP interpreter.
    pub fn with_php(mut self, php: impl Into<String>) -> Self {
        self.php = php.into();
        self
    }

    /// Path of the `occ` entry point.
    pub fn occ_path(&self) -> PathBuf {
        self.working_dir.join("occ")
    }

    /// Full argument vector for an invocation, including the privilege switch.
    pub fn command_line(&self, invocation: &Invocation) -> Vec<Arg> {
        let mut argv: Vec<Arg> = Vec::new();
        if !self.owner.is_empty() {
            argv.extend(["sudo", "--user", self.owner.as_str()].map(Arg::from));
            let preserved: Vec<&str> = invocation
                .env_overlay()
                .iter()
                .map(|(k, _)| k.as_str())
                .collect();
            if !preserved.is_empty() {
                argv.push(Arg::Plain(format!("--preserve-env={}", preserved.join(","))));
            }
        }
        argv.push(Arg::Plain(self.php.clone()));
        argv.push(Arg::from("occ"));
        argv.extend(invocation.occ_args());
        argv
    }
}

impl Backend for OccBackend {
    fn is_available(&self) -> bool {
        self.occ_path().is_file()
    }

    fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    fn run(&self, invocation: &Invocation) -> Result<CommandOutcome> {
        if !self.is_available() {
            return Err(Error::OccNotFound(self.occ_path()));
        }
        execute(
            &self.command_line(invocation),
            &self.working_dir,
            invocation.env_overlay(),
        )
    }
}

/// Run a command in `cwd` with an environment overlay and capture its output.
///
/// The overlay is applied to the child only. A non-zero exit is returned as
/// an outcome and logged with secret arguments masked.
pub fn execute(argv: &[Arg], cwd: &Path, env: &[(String, String)]) -> Result<CommandOutcome> {
    let Some((program, args)) = argv.split_first() else {
        return Err(Error::Spawn {
            program: String::new(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command"),
        });
    };

    let shown = argv.iter().map(Arg::masked).collect::<Vec<_>>().join(" ");
    log::debug!("running: {shown}");

    let output = Command::new(program.render())
        .args(args.iter().map(Arg::render))
        .current_dir(cwd)
        .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .output()
        .map_err(|source| Error::Spawn {
            program: program.masked(),
            source,
        })?;

    let outcome = CommandOutcome {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };

    if !outcome.success() {
        log::warn!("command exited {}: {shown}", outcome.exit_code);
        log::debug!("stdout: {}", outcome.stdout.trim_end());
        log::debug!("stderr: {}", outcome.stderr.trim_end());
    }

    Ok(outcome)
}
