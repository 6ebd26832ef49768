use std::path::{Path, PathBuf};

use clap::Args;
use serde::Serialize;
use serde_json::Value;

use packrelease::config::PublishConfig;
use packrelease::trigger::{self, TriggerDecision, TriggerEvent};
use packrelease::utils::io;
use packrelease::Error;

use super::{current_dir, env_var, load_config, CmdResult, GlobalArgs};

#[derive(Args, Debug, Default)]
pub struct TriggerArgs {
    /// Event name (push, workflow_dispatch). Defaults to GITHUB_EVENT_NAME
    #[arg(long)]
    pub event_name: Option<String>,

    /// Git ref the event applies to (e.g. refs/heads/main)
    #[arg(long = "ref", value_name = "REF")]
    pub git_ref: Option<String>,

    /// Path to the webhook payload JSON
    #[arg(long, value_name = "FILE")]
    pub event_path: Option<PathBuf>,

    /// Base commit for a local diff (requires --head)
    #[arg(long, requires = "head")]
    pub base: Option<String>,

    /// Head commit for a local diff (requires --base)
    #[arg(long, requires = "base")]
    pub head: Option<String>,
}

#[derive(Serialize)]
#[serde(tag = "command")]
pub enum TriggerOutput {
    #[serde(rename = "trigger")]
    Evaluate { decision: TriggerDecision },
}

pub fn run(args: TriggerArgs, global: &GlobalArgs) -> CmdResult<TriggerOutput> {
    let cwd = current_dir()?;
    let config = load_config(global, &cwd)?;
    config.validate()?;

    let decision = decide(&args, &config, &cwd)?;
    Ok((TriggerOutput::Evaluate { decision }, 0))
}

/// Evaluate the trigger for the event described by `args`.
pub(crate) fn decide(
    args: &TriggerArgs,
    config: &PublishConfig,
    cwd: &Path,
) -> packrelease::Result<TriggerDecision> {
    let event = resolve_event(args, cwd)?;
    let decision = trigger::evaluate(&event, &config.trigger.branch, &config.watch_patterns());
    log_decision(&decision);
    Ok(decision)
}

fn resolve_event(args: &TriggerArgs, cwd: &Path) -> packrelease::Result<TriggerEvent> {
    if let (Some(base), Some(head)) = (&args.base, &args.head) {
        return trigger::event_from_git(cwd, base, head, args.git_ref.as_deref());
    }

    match &args.event_name {
        Some(name) => {
            let payload = match &args.event_path {
                Some(path) => {
                    let content = io::read_file(path, "read event payload")?;
                    serde_json::from_str(&content).map_err(|e| {
                        Error::validation_invalid_json(e, Some(format!("parse {}", path.display())))
                    })?
                }
                None => Value::Null,
            };
            trigger::event_from_payload(name, args.git_ref.as_deref(), &payload)
        }
        None => trigger::event_from_github_env(env_var),
    }
}

fn log_decision(decision: &TriggerDecision) {
    if decision.activated {
        packrelease::log_status!("trigger", "Activated ({:?})", decision.reason);
    } else {
        packrelease::log_status!("trigger", "Not activated ({:?})", decision.reason);
    }
}
