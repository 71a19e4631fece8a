//! `config` module: synchronize `config.php` from an option tree

use anyhow::Result;
use occkit::Client;

use crate::output::ModuleResult;
use crate::params::ConfigParams;
use crate::paths::{self, Layout};
use crate::sync::{self, SyncOptions, ownership};

pub fn run(client: &Client, params: &ConfigParams) -> Result<ModuleResult> {
    run_in(client, params, paths::tmp_root())
}

fn run_in(client: &Client, params: &ConfigParams, tmp_root: std::path::PathBuf) -> Result<ModuleResult> {
    let mode = ownership::parse_mode(&params.mode)?;
    if let Some(stop) = super::gate(client, params.common.auto_upgrade)? {
        return Ok(stop);
    }

    let layout = Layout::new(client.working_dir());
    let options = SyncOptions {
        parameters: &params.config_parameters,
        trusted_domains: &params.trusted_domains,
        diff_output: params.diff_output,
        owner: &params.common.owner,
        group: &params.group,
        mode,
        tmp_root,
    };
    sync::sync(client, &layout, &options)
}
