//! Decides whether a repository event activates the publish pipeline.
//!
//! A manual invocation always activates. A push activates only when it lands
//! on the configured branch and touches at least one watched path.

use std::collections::BTreeSet;
use std::path::Path;

use glob_match::glob_match;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::git;
use crate::utils::io;

pub const ENV_EVENT_NAME: &str = "GITHUB_EVENT_NAME";
pub const ENV_EVENT_PATH: &str = "GITHUB_EVENT_PATH";
pub const ENV_REF: &str = "GITHUB_REF";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    Push,
    Manual,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerEvent {
    pub kind: TriggerKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changed_paths: Vec<String>,
}

impl TriggerEvent {
    pub fn manual() -> Self {
        Self {
            kind: TriggerKind::Manual,
            git_ref: None,
            changed_paths: Vec::new(),
        }
    }

    pub fn push(git_ref: impl Into<String>, changed_paths: Vec<String>) -> Self {
        Self {
            kind: TriggerKind::Push,
            git_ref: Some(git_ref.into()),
            changed_paths,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerReason {
    Manual,
    PathsChanged,
    BranchMismatch,
    NoMatchingPaths,
}

#[derive(Debug, Clone, Serialize)]
pub struct TriggerDecision {
    pub activated: bool,
    pub reason: TriggerReason,
    pub event: TriggerKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<String>,
    pub patterns: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matched_paths: Vec<String>,
}

/// Evaluate an event against the main branch and watched path patterns.
pub fn evaluate(event: &TriggerEvent, branch: &str, patterns: &[String]) -> TriggerDecision {
    let decision = |activated, reason, matched_paths| TriggerDecision {
        activated,
        reason,
        event: event.kind,
        git_ref: event.git_ref.clone(),
        patterns: patterns.to_vec(),
        matched_paths,
    };

    if event.kind == TriggerKind::Manual {
        return decision(true, TriggerReason::Manual, Vec::new());
    }

    let on_branch = event
        .git_ref
        .as_deref()
        .is_some_and(|git_ref| branch_matches(git_ref, branch));
    if !on_branch {
        return decision(false, TriggerReason::BranchMismatch, Vec::new());
    }

    let matched: Vec<String> = event
        .changed_paths
        .iter()
        .map(|p| normalize_path(p))
        .filter(|p| patterns.iter().any(|pattern| path_matches(pattern, p)))
        .collect();

    if matched.is_empty() {
        decision(false, TriggerReason::NoMatchingPaths, matched)
    } else {
        decision(true, TriggerReason::PathsChanged, matched)
    }
}

/// `main` matches both `main` and `refs/heads/main`.
pub fn branch_matches(git_ref: &str, branch: &str) -> bool {
    let git_ref = git_ref.trim();
    let branch = branch.trim().trim_start_matches("refs/heads/");
    git_ref == branch || git_ref.strip_prefix("refs/heads/") == Some(branch)
}

/// A path matches `dir/**` when it sits under `dir` or names `dir` itself.
pub fn path_matches(pattern: &str, path: &str) -> bool {
    if glob_match(pattern, path) {
        return true;
    }
    pattern
        .strip_suffix("/**")
        .is_some_and(|dir| path == dir)
}

fn normalize_path(path: &str) -> String {
    let mut path = path.trim();
    while let Some(rest) = path.strip_prefix("./") {
        path = rest;
    }
    path.to_string()
}

// =============================================================================
// Event sources
// =============================================================================

/// Rebuild the triggering event from the GitHub Actions environment.
pub fn event_from_github_env<F>(lookup: F) -> Result<TriggerEvent>
where
    F: Fn(&str) -> Option<String>,
{
    let event_name = lookup(ENV_EVENT_NAME)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| {
            Error::validation_missing_argument(vec![ENV_EVENT_NAME.to_string()])
                .with_hint("Pass --event-name or run inside GitHub Actions")
        })?;

    let payload = match lookup(ENV_EVENT_PATH).filter(|v| !v.trim().is_empty()) {
        Some(path) => {
            let content = io::read_file(Path::new(&path), "read event payload")?;
            serde_json::from_str(&content).map_err(|e| {
                Error::validation_invalid_json(e, Some(format!("parse {}", path)))
            })?
        }
        None => Value::Null,
    };

    event_from_payload(&event_name, lookup(ENV_REF).as_deref(), &payload)
}

/// Build an event from an event name, optional ref and webhook payload.
///
/// Push payloads contribute the union of every commit's added, modified and
/// removed paths.
pub fn event_from_payload(
    event_name: &str,
    git_ref: Option<&str>,
    payload: &Value,
) -> Result<TriggerEvent> {
    let git_ref = git_ref
        .filter(|r| !r.trim().is_empty())
        .map(str::to_string)
        .or_else(|| payload.get("ref").and_then(Value::as_str).map(str::to_string));

    match event_name.trim() {
        "workflow_dispatch" | "manual" => Ok(TriggerEvent {
            kind: TriggerKind::Manual,
            git_ref,
            changed_paths: Vec::new(),
        }),
        "push" => {
            let git_ref = git_ref.ok_or_else(|| {
                Error::validation_missing_argument(vec![ENV_REF.to_string()])
            })?;
            Ok(TriggerEvent::push(git_ref, changed_paths_from_payload(payload)))
        }
        other => Err(Error::validation_invalid_argument(
            "event_name",
            format!("Unsupported trigger event '{}'", other),
            Some(other.to_string()),
            Some(vec!["push".to_string(), "workflow_dispatch".to_string()]),
        )),
    }
}

fn changed_paths_from_payload(payload: &Value) -> Vec<String> {
    let mut paths = BTreeSet::new();
    let commits = payload
        .get("commits")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    for commit in commits {
        for key in ["added", "modified", "removed"] {
            if let Some(files) = commit.get(key).and_then(Value::as_array) {
                paths.extend(files.iter().filter_map(Value::as_str).map(str::to_string));
            }
        }
    }

    paths.into_iter().collect()
}

/// Rebuild a push event from a local `base..head` diff.
///
/// `git_ref` defaults to the repository's current branch.
pub fn event_from_git(
    repo: &Path,
    base: &str,
    head: &str,
    git_ref: Option<&str>,
) -> Result<TriggerEvent> {
    let git_ref = match git_ref {
        Some(r) => r.to_string(),
        None => git::current_branch(repo)?,
    };
    let paths = git::changed_paths(repo, base, head)?;
    Ok(TriggerEvent::push(git_ref, paths))
}
