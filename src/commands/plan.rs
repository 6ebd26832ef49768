use clap::Args;
use serde::Serialize;

use packrelease::config;
use packrelease::release::{self, PlanPrerequisites, PublishOptions, PublishPlan};

use super::{current_dir, env_var, load_config, CmdResult, GlobalArgs};

#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Workflow run identifier. Defaults to GITHUB_RUN_ID
    #[arg(long)]
    pub run_id: Option<String>,

    /// Target repository as OWNER/NAME. Defaults to GITHUB_REPOSITORY
    #[arg(long, value_name = "OWNER/NAME")]
    pub repo: Option<String>,

    /// Environment variable holding the access token
    #[arg(long, value_name = "VAR")]
    pub token_env: Option<String>,
}

#[derive(Serialize)]
#[serde(tag = "command")]
pub enum PlanOutput {
    #[serde(rename = "plan")]
    Plan { plan: PublishPlan },
}

pub fn run(args: PlanArgs, global: &GlobalArgs) -> CmdResult<PlanOutput> {
    let cwd = current_dir()?;
    let mut config = load_config(global, &cwd)?;
    if let Some(repo) = args.repo {
        config.github.repository = Some(repo);
    }
    if let Some(token_env) = args.token_env {
        config.github.token_env = token_env;
    }
    config.validate()?;

    let run_id = config::resolve_run_id(args.run_id.as_deref(), env_var)?;
    let options = PublishOptions::from_config(&config, &cwd, &run_id)?;

    let token_env = &config.github.token_env;
    let prerequisites = PlanPrerequisites {
        token_env: env_var(token_env)
            .filter(|v| !v.trim().is_empty())
            .is_none()
            .then(|| token_env.clone()),
        repository_missing: config.github.repository.is_none(),
    };

    let plan = release::plan(&options, &prerequisites)?;
    Ok((PlanOutput::Plan { plan }, 0))
}
