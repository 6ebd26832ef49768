use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::GlobalArgs;

mod commands;
mod output;
mod tty;

use commands::{archive, plan, run, tag, trigger};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "packrelease")]
#[command(version = VERSION)]
#[command(about = "Package a directory into a zip and publish it as a GitHub release")]
struct Cli {
    /// Config file (defaults to ./packrelease.json when present)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decide whether an event activates the pipeline
    Trigger(trigger::TriggerArgs),
    /// Build the zip archive only
    Archive(archive::ArchiveArgs),
    /// Show what a run would do without side effects
    Plan(plan::PlanArgs),
    /// Archive, create the release and upload the asset
    Run(run::RunArgs),
    /// Print the tag and name derived from a run identifier
    Tag(tag::TagArgs),
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let global = GlobalArgs { config: cli.config };

    let (json_result, exit_code) = commands::run_json(cli.command, &global);

    if output::print_json_result(json_result).is_err() {
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
