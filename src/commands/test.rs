use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use flowship::http::ProbeClient;
use flowship::release::{self, StageRecord, TestReport};

use super::{load_cases, load_context, select_identities, CmdResult};

#[derive(Args)]
pub struct TestArgs {
    /// Only test these identities (repeatable)
    #[arg(long = "identity", value_name = "NAME")]
    identities: Vec<String>,

    /// Replace the built-in conformance suite with a JSON file
    #[arg(long, value_name = "FILE")]
    suite: Option<PathBuf>,

    /// Probe immediately instead of waiting for the settle interval
    #[arg(long)]
    no_settle: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestOutput {
    command: &'static str,
    base_url: String,
    stages: Vec<StageRecord>,
    report: TestReport,
}

/// Health gate and conformance suite against an already-deployed service.
pub fn run(args: TestArgs, global: &super::GlobalArgs) -> CmdResult<TestOutput> {
    let mut ctx = load_context(global)?;
    if args.no_settle {
        ctx.api.settle = std::time::Duration::ZERO;
    }

    let identities = select_identities(&ctx, &args.identities)?;
    let cases = load_cases(&ctx, args.suite.as_deref())?;
    let probe = ProbeClient::new(ctx.timeouts.probe)?;

    let mut stages = Vec::new();
    let report = release::verify(&ctx, &probe, &cases, &identities, &mut stages)?;
    let exit_code = report.verdict.exit_code;

    Ok((
        TestOutput {
            command: "test",
            base_url: ctx.api.base_url.clone(),
            stages,
            report,
        },
        exit_code,
    ))
}
