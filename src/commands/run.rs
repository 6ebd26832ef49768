use clap::Args;
use serde::Serialize;

use packrelease::config;
use packrelease::github::{GitHubClient, Token};
use packrelease::release::{self, PublishOptions, PublishRun};
use packrelease::trigger::TriggerDecision;

use super::trigger::{self as trigger_cmd, TriggerArgs};
use super::{current_dir, env_var, load_config, CmdResult, GlobalArgs, EXIT_RUN_FAILED};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Workflow run identifier. Defaults to GITHUB_RUN_ID
    #[arg(long)]
    pub run_id: Option<String>,

    /// Target repository as OWNER/NAME. Defaults to GITHUB_REPOSITORY
    #[arg(long, value_name = "OWNER/NAME")]
    pub repo: Option<String>,

    /// Environment variable holding the access token
    #[arg(long, value_name = "VAR")]
    pub token_env: Option<String>,

    /// Evaluate the trigger from the GitHub Actions environment first and
    /// skip the run when it does not activate
    #[arg(long)]
    pub check_trigger: bool,
}

#[derive(Serialize)]
#[serde(tag = "command")]
pub enum RunOutput {
    #[serde(rename = "run")]
    Run {
        activated: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        trigger: Option<TriggerDecision>,
        #[serde(skip_serializing_if = "Option::is_none")]
        run: Option<PublishRun>,
    },
}

pub fn run(args: RunArgs, global: &GlobalArgs) -> CmdResult<RunOutput> {
    let cwd = current_dir()?;
    let mut config = load_config(global, &cwd)?;
    if let Some(repo) = args.repo {
        config.github.repository = Some(repo);
    }
    if let Some(token_env) = args.token_env {
        config.github.token_env = token_env;
    }
    config.validate()?;

    let trigger = if args.check_trigger {
        let decision = trigger_cmd::decide(&TriggerArgs::default(), &config, &cwd)?;
        if !decision.activated {
            return Ok((
                RunOutput::Run {
                    activated: false,
                    trigger: Some(decision),
                    run: None,
                },
                0,
            ));
        }
        Some(decision)
    } else {
        None
    };

    let run_id = config::resolve_run_id(args.run_id.as_deref(), env_var)?;
    let options = PublishOptions::from_config(&config, &cwd, &run_id)?;

    let token = Token::from_env_with(&config.github.token_env, env_var)?;
    let client = GitHubClient::new(&config.github, token)?;

    let run = release::run(&options, &client)?;
    let exit_code = if run.succeeded() { 0 } else { EXIT_RUN_FAILED };

    Ok((
        RunOutput::Run {
            activated: true,
            trigger,
            run: Some(run),
        },
        exit_code,
    ))
}
