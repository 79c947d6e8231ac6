use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use flowship::http::ProbeClient;
use flowship::release::{Release, ReleaseOptions, ReleaseReport};

use super::{connect, load_cases, load_context, select_identities, CmdResult};

#[derive(Args)]
pub struct ReleaseArgs {
    /// Reuse the image already present locally instead of building
    #[arg(long)]
    skip_build: bool,

    /// Stop after the build; do not touch the remote host
    #[arg(long)]
    skip_deploy: bool,

    /// Skip the health gate and the conformance suite
    #[arg(long)]
    skip_tests: bool,

    /// Only test these identities (repeatable)
    #[arg(long = "identity", value_name = "NAME")]
    identities: Vec<String>,

    /// Replace the built-in conformance suite with a JSON file
    #[arg(long, value_name = "FILE")]
    suite: Option<PathBuf>,
}

#[derive(Serialize)]
#[serde(tag = "command")]
pub enum ReleaseOutput {
    #[serde(rename = "release")]
    Release { report: ReleaseReport },
}

pub fn run(args: ReleaseArgs, global: &super::GlobalArgs) -> CmdResult<ReleaseOutput> {
    let ctx = load_context(global)?;
    let identities = select_identities(&ctx, &args.identities)?;
    let cases = load_cases(&ctx, args.suite.as_deref())?;
    let session = connect(&ctx);
    let probe = ProbeClient::new(ctx.timeouts.probe)?;

    let release = Release {
        ctx: &ctx,
        session: &session,
        probe: &probe,
        cases: &cases,
        identities: &identities,
    };
    let report = release.run(ReleaseOptions {
        skip_build: args.skip_build,
        skip_deploy: args.skip_deploy,
        skip_tests: args.skip_tests,
    })?;

    let exit_code = report.verdict.exit_code;
    Ok((ReleaseOutput::Release { report }, exit_code))
}
