use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "nextcloud-occ")]
#[command(version)]
#[command(about = "Idempotent Nextcloud administration through occ", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Result format on stdout
    #[arg(long, value_enum, default_value_t = OutputFormat::Json, global = true)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One JSON object, as Ansible expects
    Json,
    /// Colored summary for terminals
    Human,
}

#[derive(Subcommand)]
pub enum Command {
    /// Install, enable, disable or remove apps
    Apps(ModuleArgs),

    /// Manage user accounts
    Users(ModuleArgs),

    /// Create or delete groups
    Groups(ModuleArgs),

    /// Status, check, install, upgrade and background job mode
    Occ(ModuleArgs),

    /// Check for or apply app updates
    UpdateApps(ModuleArgs),

    /// Synchronize config.php from an option tree
    Config(ModuleArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct ModuleArgs {
    /// Module arguments (JSON, or TOML with a .toml extension); stdin when omitted
    pub args_file: Option<PathBuf>,
}

impl Command {
    /// The module to run and its arguments, `None` for utility commands
    pub fn module(&self) -> Option<(Module, &ModuleArgs)> {
        match self {
            Self::Apps(args) => Some((Module::Apps, args)),
            Self::Users(args) => Some((Module::Users, args)),
            Self::Groups(args) => Some((Module::Groups, args)),
            Self::Occ(args) => Some((Module::Occ, args)),
            Self::UpdateApps(args) => Some((Module::UpdateApps, args)),
            Self::Config(args) => Some((Module::Config, args)),
            Self::Completions { .. } => None,
        }
    }
}

/// The Ansible modules this binary implements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Module {
    Apps,
    Users,
    Groups,
    Occ,
    UpdateApps,
    Config,
}

impl Module {
    pub const ALL: [Self; 6] = [
        Self::Apps,
        Self::Users,
        Self::Groups,
        Self::Occ,
        Self::UpdateApps,
        Self::Config,
    ];

    /// Subcommand name
    pub fn name(self) -> &'static str {
        match self {
            Self::Apps => "apps",
            Self::Users => "users",
            Self::Groups => "groups",
            Self::Occ => "occ",
            Self::UpdateApps => "update-apps",
            Self::Config => "config",
        }
    }

    /// Name of the Ansible module, also accepted as `argv[0]`
    pub fn ansible_name(self) -> &'static str {
        match self {
            Self::Apps => "nextcloud_apps",
            Self::Users => "nextcloud_users",
            Self::Groups => "nextcloud_groups",
            Self::Occ => "nextcloud_occ",
            Self::UpdateApps => "nextcloud_update_apps",
            Self::Config => "nextcloud_config",
        }
    }

    /// Module selected by the program name, e.g. a `nextcloud_users` symlink
    pub fn from_program(program: &Path) -> Option<Self> {
        let stem = program.file_stem()?.to_str()?;
        Self::ALL.into_iter().find(|m| m.ansible_name() == stem)
    }
}

/// Insert the subcommand when invoked through a module-named symlink.
pub fn effective_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut args: Vec<OsString> = args.into_iter().collect();
    let module = args
        .first()
        .and_then(|program| Module::from_program(Path::new(program)));
    if let Some(module) = module {
        args.insert(1, OsString::from(module.name()));
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn os(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_module_from_program_name() {
        assert_eq!(
            Module::from_program(Path::new("/usr/share/ansible/plugins/modules/nextcloud_users")),
            Some(Module::Users)
        );
        assert_eq!(
            Module::from_program(Path::new("nextcloud_update_apps")),
            Some(Module::UpdateApps)
        );
        assert_eq!(Module::from_program(Path::new("/usr/bin/nextcloud-occ")), None);
    }

    #[test]
    fn test_multi_call_dispatch() {
        let args = effective_args(os(&["/opt/bin/nextcloud_groups", "-v", "/tmp/args"]));
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.verbose, 1);
        let (module, module_args) = cli.command.module().unwrap();
        assert_eq!(module, Module::Groups);
        assert_eq!(module_args.args_file.as_deref(), Some(Path::new("/tmp/args")));
    }

    #[test]
    fn test_plain_invocation_is_untouched() {
        let args = effective_args(os(&["nextcloud-occ", "update-apps", "--format", "human"]));
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.format, OutputFormat::Human);
        let (module, module_args) = cli.command.module().unwrap();
        assert_eq!(module, Module::UpdateApps);
        assert!(module_args.args_file.is_none());
    }

    #[test]
    fn test_completions_are_not_a_module() {
        let cli = Cli::try_parse_from(os(&["nextcloud-occ", "completions", "bash"])).unwrap();
        assert!(cli.command.module().is_none());
    }
}
