use std::path::{Path, PathBuf};

use packrelease::config::{self, PublishConfig};

pub type CmdResult<T> = packrelease::Result<(T, i32)>;

/// Exit code for a pipeline run that finished without full success.
pub const EXIT_RUN_FAILED: i32 = 20;

pub(crate) struct GlobalArgs {
    pub config: Option<PathBuf>,
}

pub(crate) fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

pub(crate) fn current_dir() -> packrelease::Result<PathBuf> {
    std::env::current_dir().map_err(|e| {
        packrelease::Error::internal_io(e.to_string(), Some("resolve working directory".to_string()))
    })
}

/// Defaults, then the config file, then the GitHub Actions environment.
/// CLI flags are layered on top by each command before validation.
pub(crate) fn load_config(global: &GlobalArgs, cwd: &Path) -> packrelease::Result<PublishConfig> {
    let mut config = config::load(global.config.as_deref(), cwd)?;
    config.apply_env(env_var);
    Ok(config)
}

pub mod archive;
pub mod plan;
pub mod run;
pub mod tag;
pub mod trigger;

/// Dispatch a command to its handler and map result to JSON.
macro_rules! dispatch {
    ($args:expr, $global:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args, $global))
    };
}

pub(crate) fn run_json(
    command: crate::Commands,
    global: &GlobalArgs,
) -> (packrelease::Result<serde_json::Value>, i32) {
    crate::tty::status("packrelease is working...");

    match command {
        crate::Commands::Trigger(args) => dispatch!(args, global, trigger),
        crate::Commands::Archive(args) => dispatch!(args, global, archive),
        crate::Commands::Plan(args) => dispatch!(args, global, plan),
        crate::Commands::Run(args) => dispatch!(args, global, run),
        crate::Commands::Tag(args) => dispatch!(args, global, tag),
    }
}
