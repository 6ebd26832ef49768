use clap::Args;
use serde::Serialize;

use packrelease::release::ReleaseSpec;

use super::{current_dir, load_config, CmdResult, GlobalArgs};

#[derive(Args, Debug)]
pub struct TagArgs {
    /// Workflow run identifier
    pub run_id: String,
}

#[derive(Serialize)]
#[serde(tag = "command")]
pub enum TagOutput {
    #[serde(rename = "tag")]
    Derive { release: ReleaseSpec },
}

pub fn run(args: TagArgs, global: &GlobalArgs) -> CmdResult<TagOutput> {
    let cwd = current_dir()?;
    let config = load_config(global, &cwd)?;
    let release = ReleaseSpec::from_run_id(&args.run_id, &config.body)?;
    Ok((TagOutput::Derive { release }, 0))
}
