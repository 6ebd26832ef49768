//! Layered configuration for the publish pipeline.
//!
//! Precedence, lowest first: built-in defaults, `packrelease.json`,
//! environment (GitHub Actions variables), CLI flags.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::utils::io;

pub const CONFIG_FILE: &str = "packrelease.json";

pub const ENV_REPOSITORY: &str = "GITHUB_REPOSITORY";
pub const ENV_API_URL: &str = "GITHUB_API_URL";
pub const ENV_RUN_ID: &str = "GITHUB_RUN_ID";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PublishConfig {
    #[serde(default = "default_source_dir")]
    pub source_dir: String,

    #[serde(default = "default_archive_path")]
    pub archive_path: String,

    #[serde(default = "default_asset_name")]
    pub asset_name: String,

    #[serde(default = "default_content_type")]
    pub content_type: String,

    #[serde(default = "default_body")]
    pub body: String,

    #[serde(default)]
    pub trigger: TriggerSettings,

    #[serde(default)]
    pub github: GitHubSettings,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            source_dir: default_source_dir(),
            archive_path: default_archive_path(),
            asset_name: default_asset_name(),
            content_type: default_content_type(),
            body: default_body(),
            trigger: TriggerSettings::default(),
            github: GitHubSettings::default(),
        }
    }
}

/// When a repository event activates the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TriggerSettings {
    #[serde(default = "default_branch")]
    pub branch: String,

    /// Glob patterns for changed paths. Empty means "anything under sourceDir".
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<String>,
}

impl Default for TriggerSettings {
    fn default() -> Self {
        Self {
            branch: default_branch(),
            paths: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GitHubSettings {
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// `owner/name` of the repository receiving the release.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,

    /// Name of the environment variable holding the access token.
    #[serde(default = "default_token_env")]
    pub token_env: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GitHubSettings {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            repository: None,
            token_env: default_token_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl GitHubSettings {
    /// Split `owner/name`, validating both halves are present.
    pub fn owner_and_repo(&self) -> Result<(&str, &str)> {
        let repository = self.repository.as_deref().ok_or_else(|| {
            Error::config_missing_key("github.repository", None)
                .with_hint(format!("Pass --repo OWNER/NAME or set {}", ENV_REPOSITORY))
        })?;

        match repository.split_once('/') {
            Some((owner, name))
                if !owner.is_empty() && !name.is_empty() && !name.contains('/') =>
            {
                Ok((owner, name))
            }
            _ => Err(Error::config_invalid_value(
                "github.repository",
                Some(repository.to_string()),
                "Expected OWNER/NAME",
            )),
        }
    }
}

fn default_source_dir() -> String {
    "examples".to_string()
}

fn default_archive_path() -> String {
    "examples.zip".to_string()
}

fn default_asset_name() -> String {
    "examples.zip".to_string()
}

fn default_content_type() -> String {
    "application/zip".to_string()
}

fn default_body() -> String {
    "Packaged example files".to_string()
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

fn default_timeout_secs() -> u64 {
    300
}

// =============================================================================
// Loading
// =============================================================================

/// Load config from an explicit file, or `packrelease.json` in `cwd` when
/// present, falling back to defaults.
pub fn load(explicit: Option<&Path>, cwd: &Path) -> Result<PublishConfig> {
    let path = match explicit {
        Some(path) => {
            if !path.is_file() {
                return Err(Error::config_missing_key(
                    "config",
                    Some(path.display().to_string()),
                )
                .with_hint("The file passed to --config does not exist"));
            }
            path.to_path_buf()
        }
        None => {
            let candidate = cwd.join(CONFIG_FILE);
            if !candidate.is_file() {
                return Ok(PublishConfig::default());
            }
            candidate
        }
    };

    let content = io::read_file(&path, &format!("read {}", path.display()))?;
    let config = from_str(&content, &path.display().to_string())?;
    log_status!("config", "Loaded {}", path.display());
    Ok(config)
}

pub fn from_str(content: &str, origin: &str) -> Result<PublishConfig> {
    serde_json::from_str(content).map_err(|e| Error::config_invalid_json(origin, e))
}

impl PublishConfig {
    /// Overlay GitHub Actions environment values that are not set in the file.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.github.repository.is_none() {
            self.github.repository = lookup(ENV_REPOSITORY).filter(|v| !v.trim().is_empty());
        }
        if let Some(api_url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            if self.github.api_url == default_api_url() {
                self.github.api_url = api_url;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        let required = [
            ("sourceDir", &self.source_dir),
            ("archivePath", &self.archive_path),
            ("assetName", &self.asset_name),
            ("contentType", &self.content_type),
            ("trigger.branch", &self.trigger.branch),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(Error::config_invalid_value(
                    key,
                    Some(value.clone()),
                    "Value must not be empty",
                ));
            }
        }

        if self.asset_name.contains('/') || self.asset_name.contains('\\') {
            return Err(Error::config_invalid_value(
                "assetName",
                Some(self.asset_name.clone()),
                "Asset name must be a bare filename",
            ));
        }

        if self.github.timeout_secs == 0 {
            return Err(Error::config_invalid_value(
                "github.timeoutSecs",
                Some("0".to_string()),
                "Timeout must be at least one second",
            ));
        }

        if self.github.repository.is_some() {
            self.github.owner_and_repo()?;
        }

        Ok(())
    }

    /// Source directory with `~` expanded, resolved against `cwd`.
    pub fn source_path(&self, cwd: &Path) -> PathBuf {
        resolve_path(&self.source_dir, cwd)
    }

    /// Archive destination with `~` expanded, resolved against `cwd`.
    pub fn archive_destination(&self, cwd: &Path) -> PathBuf {
        resolve_path(&self.archive_path, cwd)
    }

    /// Glob patterns a changed path must match to activate the pipeline.
    pub fn watch_patterns(&self) -> Vec<String> {
        if self.trigger.paths.is_empty() {
            vec![format!("{}/**", normalize_dir(&self.source_dir))]
        } else {
            self.trigger.paths.clone()
        }
    }
}

/// Strip a leading `./` and trailing separators from a repo-relative directory.
pub fn normalize_dir(dir: &str) -> String {
    let mut dir = dir.trim();
    while let Some(rest) = dir.strip_prefix("./") {
        dir = rest;
    }
    dir.trim_end_matches('/').to_string()
}

fn resolve_path(raw: &str, cwd: &Path) -> PathBuf {
    let expanded = shellexpand::tilde(raw);
    let path = Path::new(expanded.as_ref());
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

/// Run identifier from the CLI flag, else `GITHUB_RUN_ID`.
pub fn resolve_run_id<F>(flag: Option<&str>, lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    flag.map(str::to_string)
        .or_else(|| lookup(ENV_RUN_ID))
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| {
            Error::validation_missing_argument(vec!["run_id".to_string()])
                .with_hint(format!("Pass --run-id or set {}", ENV_RUN_ID))
        })
}
