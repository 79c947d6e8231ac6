use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::GlobalArgs;

mod commands;
mod output;
mod tty;

use commands::{builder, plan, release, test};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "flowship")]
#[command(version = VERSION)]
#[command(about = "Build, ship and verify a containerized service release")]
struct Cli {
    /// Release configuration file
    #[arg(long, global = true, value_name = "FILE", default_value = flowship::config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build, transfer, deploy and verify a release
    Release(release::ReleaseArgs),
    /// Run the health gate and conformance suite against the live service
    Test(test::TestArgs),
    /// Show the build backend a release would use
    Builder(builder::BuilderArgs),
    /// Show the remote deploy steps
    Plan(plan::PlanArgs),
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let global = GlobalArgs { config: cli.config };

    let (json_result, exit_code) = commands::run_json(cli.command, &global);

    if let Err(err) = output::print_json_result(json_result) {
        eprintln!("{}", err);
        return std::process::ExitCode::from(1);
    }

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
