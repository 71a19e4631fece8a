//! Output classification for occ free-text output.
//!
//! Most occ subcommands only speak prose. Deciding whether a non-zero exit
//! means "already done" or "really broken" comes down to matching known
//! phrases. The phrases live in one versionable table of
//! (pattern, [`OutputClass`]) rules so they can be updated without
//! touching reconciliation logic.
//!
//! Rules are tried in table order. The first rule that matches any line
//! wins, so more specific phrases must come first.

use crate::types::CommandOutcome;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// What a piece of occ output means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputClass {
    /// Nextcloud files exist but the instance has not been set up
    NotInstalled,
    /// Core or apps need `occ upgrade` before most commands work
    NeedsUpgrade,
    /// The entity to create is already there
    AlreadyExists,
    /// The entity to remove or disable is not there
    Missing,
    /// The subcommand is not available in this state
    CommandNotDefined,
    /// The requested database backend is not supported
    UnsupportedDatabase,
    /// The installer refuses a symlinked data directory
    SymlinkRejected,
}

impl OutputClass {
    /// Whether this class reflects an already-satisfied desired state.
    pub fn is_benign(&self) -> bool {
        matches!(self, Self::AlreadyExists | Self::Missing)
    }

    /// Short human-readable description.
    pub fn description(&self) -> &'static str {
        match self {
            Self::NotInstalled => "Nextcloud is not installed",
            Self::NeedsUpgrade => "Nextcloud requires an upgrade",
            Self::AlreadyExists => "already exists",
            Self::Missing => "does not exist",
            Self::CommandNotDefined => "command not available",
            Self::UnsupportedDatabase => "database not supported",
            Self::SymlinkRejected => "symlinks not allowed",
        }
    }
}

/// A single classification rule.
#[derive(Debug, Clone)]
pub struct Rule {
    pattern: Regex,
    class: OutputClass,
}

impl Rule {
    /// Compile a rule from a regular expression.
    pub fn new(pattern: &str, class: OutputClass) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            class,
        })
    }

    /// The class this rule assigns.
    pub fn class(&self) -> OutputClass {
        self.class
    }
}

/// A successful classification: the class and the line that matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Assigned class
    pub class: OutputClass,
    /// Trimmed output line that triggered the match
    pub line: String,
}

/// Phrases known from occ 25 - 30.
const BUILTIN_RULES: &[(&str, OutputClass)] = &[
    (r"Nextcloud is not installed", OutputClass::NotInstalled),
    (r"(?i)require upgrade", OutputClass::NeedsUpgrade),
    (r#"Command ".*" is not defined"#, OutputClass::CommandNotDefined),
    (r"Database .* is not supported", OutputClass::UnsupportedDatabase),
    (r"Following symlinks is not allowed", OutputClass::SymlinkRejected),
    (r#"Group ".*" already exists"#, OutputClass::AlreadyExists),
    (r#"The user ".*" already exists"#, OutputClass::AlreadyExists),
    (r"(?i)already installed", OutputClass::AlreadyExists),
    (r#"Group ".*" does not exist"#, OutputClass::Missing),
    (r"(?i)group not found", OutputClass::Missing),
    (r#"(?i)user (".*" )?does not exist"#, OutputClass::Missing),
    (r"No such app enabled", OutputClass::Missing),
    (r"(?i)^(app )?\S+ is not installed", OutputClass::Missing),
];

static BUILTIN: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    BUILTIN_RULES
        .iter()
        .filter_map(|(pattern, class)| match Rule::new(pattern, *class) {
            Ok(rule) => Some(rule),
            Err(e) => {
                log::error!("invalid builtin output pattern {pattern:?}: {e}");
                None
            }
        })
        .collect()
});

static UNHANDLED_EXCEPTION: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?m)An unhandled exception has been thrown:\s*\n(?P<exception>.+)$").ok()
});

/// Ordered table of classification rules.
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Vec<Rule>,
}

impl Classifier {
    /// Create a classifier from an explicit rule table.
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// The builtin rule table.
    pub fn builtin() -> Self {
        Self::new(BUILTIN.clone())
    }

    /// Add a rule with higher precedence than all existing ones.
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.insert(0, rule);
        self
    }

    /// Number of rules in the table.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Classify free text, line by line.
    pub fn classify(&self, text: &str) -> Option<Classification> {
        self.rules.iter().find_map(|rule| {
            text.lines()
                .map(str::trim)
                .find(|line| rule.pattern.is_match(line))
                .map(|line| Classification {
                    class: rule.class,
                    line: line.to_string(),
                })
        })
    }

    /// Classify the combined stdout and stderr of a command.
    pub fn classify_outcome(&self, outcome: &CommandOutcome) -> Option<Classification> {
        self.classify(&outcome.combined())
    }

    /// Find the first line matching one of the rules for `class`.
    pub fn find(&self, text: &str, class: OutputClass) -> Option<String> {
        self.rules
            .iter()
            .filter(|rule| rule.class == class)
            .find_map(|rule| {
                text.lines()
                    .map(str::trim)
                    .find(|line| rule.pattern.is_match(line))
                    .map(str::to_string)
            })
    }

    /// Find the first line matching any of `classes`, in rule order.
    pub fn find_any(&self, text: &str, classes: &[OutputClass]) -> Option<Classification> {
        self.rules
            .iter()
            .filter(|rule| classes.contains(&rule.class))
            .find_map(|rule| {
                text.lines()
                    .map(str::trim)
                    .find(|line| rule.pattern.is_match(line))
                    .map(|line| Classification {
                        class: rule.class,
                        line: line.to_string(),
                    })
            })
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Pull the first line of an "unhandled exception" block out of occ output.
pub fn extract_exception(text: &str) -> Option<String> {
    UNHANDLED_EXCEPTION
        .as_ref()?
        .captures(text)
        .and_then(|caps| caps.name("exception"))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}
