use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use packrelease::archive::{self, ArchiveSummary};

use super::{current_dir, load_config, CmdResult, GlobalArgs};

#[derive(Args, Debug)]
pub struct ArchiveArgs {
    /// Directory to package (overrides sourceDir)
    #[arg(long, value_name = "DIR")]
    pub source: Option<PathBuf>,

    /// Archive file to write (overrides archivePath)
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Serialize)]
#[serde(tag = "command")]
pub enum ArchiveOutput {
    #[serde(rename = "archive")]
    Build { archive: ArchiveSummary },
}

pub fn run(args: ArchiveArgs, global: &GlobalArgs) -> CmdResult<ArchiveOutput> {
    let cwd = current_dir()?;
    let mut config = load_config(global, &cwd)?;
    if let Some(source) = args.source {
        config.source_dir = source.display().to_string();
    }
    if let Some(output) = args.output {
        config.archive_path = output.display().to_string();
    }
    config.validate()?;

    let archive = archive::build(&config.source_path(&cwd), &config.archive_destination(&cwd))?;
    Ok((ArchiveOutput::Build { archive }, 0))
}
