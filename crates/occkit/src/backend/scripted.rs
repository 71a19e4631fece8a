//! Backend that replays canned outcomes, for tests.

use crate::backend::Backend;
use crate::error::Result;
use crate::types::{CommandOutcome, Invocation};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Replays outcomes matched by invocation prefix and records every call.
pub struct ScriptedBackend {
    working_dir: PathBuf,
    available: bool,
    responses: Mutex<Vec<(String, Vec<CommandOutcome>)>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            working_dir: PathBuf::from("/var/www/nextcloud"),
            available: true,
            responses: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    /// Answer invocations whose display starts with `prefix`.
    ///
    /// Repeated registrations for one prefix are consumed in order; the
    /// last one sticks.
    pub fn on(self, prefix: &str, exit_code: i32, stdout: &str, stderr: &str) -> Self {
        {
            let mut responses = self.responses.lock().unwrap();
            let outcome = CommandOutcome::new(exit_code, stdout, stderr);
            match responses.iter_mut().find(|(p, _)| p == prefix) {
                Some((_, queue)) => queue.push(outcome),
                None => responses.push((prefix.to_string(), vec![outcome])),
            }
        }
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Backend for ScriptedBackend {
    fn is_available(&self) -> bool {
        self.available
    }

    fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    fn run(&self, invocation: &Invocation) -> Result<CommandOutcome> {
        let shown = invocation.summary();
        self.calls.lock().unwrap().push(shown.clone());

        let mut responses = self.responses.lock().unwrap();
        let hit = responses
            .iter_mut()
            .filter(|(prefix, _)| shown.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len());
        Ok(match hit {
            Some((_, queue)) if queue.len() > 1 => queue.remove(0),
            Some((_, queue)) => queue[0].clone(),
            None => CommandOutcome::new(1, "", format!("unscripted: {shown}")),
        })
    }
}
