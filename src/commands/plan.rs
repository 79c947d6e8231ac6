use clap::Args;
use serde::Serialize;

use flowship::artifact::{self, REMOTE_ARCHIVE_NAME};
use flowship::deploy::{self, DeployPlan};

use super::{load_context, CmdResult};

#[derive(Args)]
pub struct PlanArgs {}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanOutput {
    command: &'static str,
    target: String,
    archive_name: &'static str,
    archive_path: String,
    plan: DeployPlan,
}

/// Print the remote deploy steps in order with their failure modes.
pub fn run(_args: PlanArgs, global: &super::GlobalArgs) -> CmdResult<PlanOutput> {
    let ctx = load_context(global)?;

    Ok((
        PlanOutput {
            command: "plan",
            target: ctx.remote.address(),
            archive_name: REMOTE_ARCHIVE_NAME,
            archive_path: artifact::remote_archive_path(&ctx.remote),
            plan: deploy::plan(&ctx),
        },
        0,
    ))
}
