//! Git queries used to reconstruct push events outside of CI.

use std::path::Path;

use crate::error::{Error, Result};
use crate::utils::command;

fn git(repo: &Path, args: &[&str], context: &str) -> Result<String> {
    command::run_in(repo, "git", args, context).map_err(|e| {
        let detail = e
            .details
            .get("error")
            .and_then(|v| v.as_str())
            .unwrap_or(e.message.as_str())
            .to_string();
        Error::git_command_failed(detail)
    })
}

/// Paths changed between two revisions, relative to the repository root.
pub fn changed_paths(repo: &Path, base: &str, head: &str) -> Result<Vec<String>> {
    let output = git(repo, &["diff", "--name-only", base, head], "git diff")?;
    Ok(output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

pub fn current_branch(repo: &Path) -> Result<String> {
    git(repo, &["rev-parse", "--abbrev-ref", "HEAD"], "git rev-parse")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::process::Command;
    use tempfile::TempDir;

    fn sh(dir: &Path, args: &[&str]) -> bool {
        Command::new("git")
            .args(args)
            .current_dir(dir)
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn init_repo() -> Option<TempDir> {
        let dir = TempDir::new().unwrap();
        let ok = sh(dir.path(), &["init", "-q", "-b", "main"])
            && sh(dir.path(), &["config", "user.email", "ci@example.com"])
            && sh(dir.path(), &["config", "user.name", "CI"]);
        ok.then_some(dir)
    }

    #[test]
    fn diff_lists_changed_files() {
        // Skip silently where git is unavailable.
        let Some(dir) = init_repo() else { return };
        let root = dir.path();

        fs::write(root.join("README.md"), "readme").unwrap();
        assert!(sh(root, &["add", "."]));
        assert!(sh(root, &["commit", "-q", "-m", "first"]));

        fs::create_dir_all(root.join("examples/sub")).unwrap();
        fs::write(root.join("examples/sub/b.txt"), "b").unwrap();
        assert!(sh(root, &["add", "."]));
        assert!(sh(root, &["commit", "-q", "-m", "second"]));

        let paths = changed_paths(root, "HEAD~1", "HEAD").unwrap();
        assert_eq!(paths, vec!["examples/sub/b.txt"]);
        assert_eq!(current_branch(root).unwrap(), "main");
    }

    #[test]
    fn bad_revision_is_a_git_error() {
        let Some(dir) = init_repo() else { return };
        let err = changed_paths(dir.path(), "nope", "HEAD").unwrap_err();
        assert_eq!(err.code.as_str(), "git.command_failed");
    }
}
