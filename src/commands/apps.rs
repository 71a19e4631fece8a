//! `apps` module: install, enable, disable and remove apps

use anyhow::Result;
use declarative::{LogProgress, reconcile};
use occkit::Client;

use crate::output::ModuleResult;
use crate::params::AppsParams;
use crate::resource::AppReconciler;

pub fn run(client: &Client, params: &AppsParams) -> Result<ModuleResult> {
    if let Some(stop) = super::gate(client, params.common.auto_upgrade)? {
        return Ok(stop);
    }
    let aggregate = reconcile(&AppReconciler::new(client), &params.apps, &mut LogProgress)?;
    Ok(aggregate.into())
}
