use colored::Colorize;

use crate::output::ModuleResult;
use crate::sync::diff::DEFAULT_WIDTH;

/// Column of the gutter in a side-by-side diff row
const DIFF_GUTTER: usize = (DEFAULT_WIDTH - 3) / 2 + 1;

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    println!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", title.cyan().bold());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// Word for the overall outcome
fn verdict(result: &ModuleResult) -> &'static str {
    match (result.failed, result.changed) {
        (true, _) => "failed",
        (false, true) => "changed",
        (false, false) => "ok",
    }
}

/// Human-readable rendering of a module result
pub fn summary(module: &str, result: &ModuleResult) {
    header(&format!("nextcloud {module}: {}", verdict(result)));

    if let Some(msg) = result.msg.as_deref().filter(|m| !m.is_empty()) {
        match verdict(result) {
            "failed" => error(msg),
            "changed" => success(msg),
            _ => dim(msg),
        }
    }

    if let Some(state) = result.state.as_ref().filter(|s| !s.is_empty()) {
        section("Entities");
        for report in state {
            let line = format!("{}: {}", report.name.bold(), report.result.msg);
            if report.result.failed {
                error(&line);
            } else if report.result.changed {
                success(&line);
            } else {
                dim(&format!("{}: {}", report.name, report.result.msg));
            }
        }
    }

    if let Some(applications) = &result.applications {
        section("Updates");
        if applications.is_empty() {
            dim("none");
        }
        for (app, version) in applications {
            kv(app, version);
        }
    }

    if let Some(status) = result.status.as_ref().and_then(|s| s.as_object()) {
        section("Status");
        for (key, value) in status {
            let value = value
                .as_str()
                .map_or_else(|| value.to_string(), str::to_string);
            kv(key, &value);
        }
    }

    if let Some(diff) = &result.diff {
        section("Diff");
        for line in diff.lines() {
            match line.chars().nth(DIFF_GUTTER) {
                Some('|') => println!("{}", line.yellow()),
                Some('<' | '>') => println!("{}", line.cyan()),
                _ => println!("{line}"),
            }
        }
    }
    println!();
}
