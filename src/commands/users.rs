//! `users` module: accounts, passwords, display names, groups and settings

use anyhow::Result;
use declarative::{LogProgress, reconcile};
use occkit::Client;

use crate::output::ModuleResult;
use crate::params::UsersParams;
use crate::resource::UserReconciler;

pub fn run(client: &Client, params: &UsersParams) -> Result<ModuleResult> {
    if let Some(stop) = super::gate(client, params.common.auto_upgrade)? {
        return Ok(stop);
    }
    let aggregate = reconcile(&UserReconciler::new(client), &params.users, &mut LogProgress)?;
    Ok(aggregate.into())
}
