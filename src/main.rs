mod cli;
mod commands;
mod output;
mod params;
mod paths;
mod resource;
mod sync;
#[cfg(test)]
mod testing;
mod ui;

use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command, OutputFormat};
use output::ModuleResult;
use std::io;

/// Overrides the `-v`/`-q` log filter, e.g. `occkit=trace`
const LOG_ENV: &str = "NEXTCLOUD_OCC_LOG";

fn main() {
    let cli = Cli::parse_from(cli::effective_args(std::env::args_os()));

    // Initialize logging based on verbosity; stdout is reserved for the result
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    let mut logger = env_logger::Builder::new();
    logger
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .target(env_logger::Target::Stderr);
    if let Ok(filters) = std::env::var(LOG_ENV) {
        logger.parse_filters(&filters);
    }
    logger.init();

    let Some((module, args)) = cli.command.module() else {
        if let Command::Completions { shell } = &cli.command {
            let mut cmd = Cli::command();
            generate(*shell, &mut cmd, "nextcloud-occ", &mut io::stdout());
        }
        return;
    };

    let result = commands::run(module, args.args_file.as_deref()).unwrap_or_else(|e| {
        log::error!("{} failed: {e:#}", module.name());
        ModuleResult::from_error(&e)
    });

    match cli.format {
        OutputFormat::Json => println!("{}", result.to_json()),
        OutputFormat::Human => ui::summary(module.name(), &result),
    }

    if result.failed {
        std::process::exit(1);
    }
}
