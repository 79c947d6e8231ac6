use clap::Args;
use serde::Serialize;

use flowship::builder::{self, BuilderDecision};

use super::{load_context, CmdResult};

#[derive(Args)]
pub struct BuilderArgs {}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuilderOutput {
    command: &'static str,
    host_platform: String,
    decision: BuilderDecision,
}

/// Show which build backend a release would use, without building.
pub fn run(_args: BuilderArgs, global: &super::GlobalArgs) -> CmdResult<BuilderOutput> {
    let ctx = load_context(global)?;
    let decision = builder::decide(&ctx)?;

    Ok((
        BuilderOutput {
            command: "builder",
            host_platform: builder::host_platform(),
            decision,
        },
        0,
    ))
}
