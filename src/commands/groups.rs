//! `groups` module: create and delete groups

use anyhow::Result;
use declarative::{LogProgress, reconcile};
use occkit::Client;

use crate::output::ModuleResult;
use crate::params::GroupsParams;
use crate::resource::GroupReconciler;

pub fn run(client: &Client, params: &GroupsParams) -> Result<ModuleResult> {
    if let Some(stop) = super::gate(client, params.common.auto_upgrade)? {
        return Ok(stop);
    }
    let aggregate = reconcile(&GroupReconciler::new(client), &params.groups, &mut LogProgress)?;
    Ok(aggregate.into())
}
