use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::thread;

use packrelease::archive;
use packrelease::config::PublishConfig;
use packrelease::engine::pipeline::PipelineRunStatus;
use packrelease::error::PlatformRejectionDetails;
use packrelease::release::{
    self, AssetUpload, CreatedRelease, PublishOptions, ReleasePlatform, ReleaseSpec, UploadedAsset,
};
use packrelease::{Error, Result};
use tempfile::TempDir;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Create(ReleaseSpec),
    Upload {
        tag: String,
        name: String,
        content_type: String,
        path: PathBuf,
        archive_existed: bool,
    },
}

/// In-memory platform that records calls and enforces tag uniqueness.
#[derive(Default)]
struct RecordingPlatform {
    calls: Mutex<Vec<Call>>,
    tags: Mutex<HashSet<String>>,
    fail_upload: bool,
}

impl RecordingPlatform {
    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

impl ReleasePlatform for RecordingPlatform {
    fn create_release(&self, spec: &ReleaseSpec) -> Result<CreatedRelease> {
        self.calls.lock().unwrap().push(Call::Create(spec.clone()));
        let id = {
            let mut tags = self.tags.lock().unwrap();
            if !tags.insert(spec.tag.clone()) {
                return Err(Error::release_tag_exists(&spec.tag, "already_exists"));
            }
            tags.len() as u64
        };
        Ok(CreatedRelease {
            id,
            tag: spec.tag.clone(),
            upload_url: format!("https://uploads.example.com/releases/{}/assets{{?name,label}}", id),
            html_url: None,
        })
    }

    fn upload_asset(&self, release: &CreatedRelease, asset: &AssetUpload) -> Result<UploadedAsset> {
        self.calls.lock().unwrap().push(Call::Upload {
            tag: release.tag.clone(),
            name: asset.name.clone(),
            content_type: asset.content_type.clone(),
            path: asset.path.clone(),
            archive_existed: asset.path.is_file(),
        });
        if self.fail_upload {
            return Err(Error::asset_upload_failed(PlatformRejectionDetails {
                operation: "asset.upload".to_string(),
                status: Some(500),
                tag: Some(release.tag.clone()),
                body: "server error".to_string(),
            }));
        }
        Ok(UploadedAsset {
            id: release.id * 10,
            name: asset.name.clone(),
            size: fs::metadata(&asset.path).map(|m| m.len()).unwrap_or(0),
            download_url: None,
        })
    }
}

fn repo_with_examples() -> TempDir {
    let dir = TempDir::new().unwrap();
    let examples = dir.path().join("examples");
    fs::create_dir_all(examples.join("sub")).unwrap();
    fs::write(examples.join("a.txt"), "alpha").unwrap();
    fs::write(examples.join("sub/b.txt"), "beta").unwrap();
    dir
}

fn options_for(cwd: &Path, run_id: &str) -> PublishOptions {
    PublishOptions::from_config(&PublishConfig::default(), cwd, run_id).unwrap()
}

#[test]
fn archive_contains_exactly_the_directory_files() {
    let repo = repo_with_examples();
    let summary = archive::build(&repo.path().join("examples"), &repo.path().join("examples.zip"))
        .unwrap();

    assert_eq!(summary.entries, vec!["a.txt", "sub/b.txt"]);
    assert_eq!(
        archive::list_entries(&repo.path().join("examples.zip")).unwrap(),
        vec!["a.txt", "sub/b.txt"]
    );
}

#[test]
fn run_publishes_release_named_after_run_id() {
    let repo = repo_with_examples();
    let platform = RecordingPlatform::default();

    let run = release::run(&options_for(repo.path(), "12345"), &platform).unwrap();

    assert!(run.succeeded());
    assert_eq!(run.tag, "12345");
    assert_eq!(
        platform.calls(),
        vec![
            Call::Create(ReleaseSpec {
                tag: "12345".to_string(),
                name: "Release 12345".to_string(),
                body: "Packaged example files".to_string(),
                prerelease: false,
                draft: false,
            }),
            Call::Upload {
                tag: "12345".to_string(),
                name: "examples.zip".to_string(),
                content_type: "application/zip".to_string(),
                path: repo.path().join("examples.zip"),
                archive_existed: true,
            },
        ]
    );
    let asset = run.asset.unwrap();
    assert_eq!(asset.size, run.archive.unwrap().bytes);
}

#[test]
fn missing_directory_fails_before_any_release() {
    let repo = TempDir::new().unwrap();
    let platform = RecordingPlatform::default();

    let run = release::run(&options_for(repo.path(), "7"), &platform).unwrap();

    assert_eq!(run.result.status, PipelineRunStatus::Failed);
    assert!(platform.calls().is_empty());
    assert_eq!(run.result.summary.failed, 1);
    assert_eq!(run.result.summary.skipped, 2);
    assert!(!repo.path().join("examples.zip").exists());
}

#[test]
fn consecutive_runs_publish_independent_releases() {
    let repo = repo_with_examples();
    let platform = RecordingPlatform::default();

    let first = release::run(&options_for(repo.path(), "100"), &platform).unwrap();
    let second = release::run(&options_for(repo.path(), "101"), &platform).unwrap();

    assert!(first.succeeded());
    assert!(second.succeeded());
    assert_eq!(first.release.unwrap().tag, "100");
    assert_eq!(second.release.unwrap().tag, "101");

    let uploads: Vec<String> = platform
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            Call::Upload { tag, .. } => Some(tag),
            Call::Create(_) => None,
        })
        .collect();
    assert_eq!(uploads, vec!["100", "101"]);
}

#[test]
fn concurrent_runs_do_not_interfere() {
    let repos = [repo_with_examples(), repo_with_examples()];
    fs::write(repos[1].path().join("examples/only-in-101.txt"), "x").unwrap();
    let platform = RecordingPlatform::default();

    let runs: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = repos
            .iter()
            .zip(["100", "101"])
            .map(|(repo, run_id)| {
                let platform = &platform;
                scope.spawn(move || release::run(&options_for(repo.path(), run_id), platform).unwrap())
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for (run, (repo, run_id)) in runs.iter().zip(repos.iter().zip(["100", "101"])) {
        assert!(run.succeeded());
        assert_eq!(run.release.as_ref().unwrap().tag, run_id);
        assert_eq!(
            run.archive.as_ref().unwrap().path,
            repo.path().join("examples.zip").display().to_string()
        );
    }
    assert_eq!(runs[0].archive.as_ref().unwrap().file_count, 2);
    assert_eq!(runs[1].archive.as_ref().unwrap().file_count, 3);

    let mut uploads: Vec<(String, PathBuf)> = platform
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            Call::Upload { tag, path, .. } => Some((tag, path)),
            Call::Create(_) => None,
        })
        .collect();
    uploads.sort();
    assert_eq!(
        uploads,
        vec![
            ("100".to_string(), repos[0].path().join("examples.zip")),
            ("101".to_string(), repos[1].path().join("examples.zip")),
        ]
    );
}

#[test]
fn reused_run_id_is_rejected_without_upload() {
    let repo = repo_with_examples();
    let platform = RecordingPlatform::default();

    release::run(&options_for(repo.path(), "55"), &platform).unwrap();
    let again = release::run(&options_for(repo.path(), "55"), &platform).unwrap();

    // Archive succeeded, release failed, upload skipped.
    assert_eq!(again.result.status, PipelineRunStatus::PartialSuccess);
    let error = again.result.steps[1].error.as_ref().unwrap();
    assert_eq!(error.code, "release.tag_exists");
    assert_eq!(again.result.steps[2].status, PipelineRunStatus::Skipped);
    assert_eq!(platform.calls().len(), 3);
}

#[test]
fn upload_failure_keeps_release_and_names_it() {
    let repo = repo_with_examples();
    let platform = RecordingPlatform {
        fail_upload: true,
        ..RecordingPlatform::default()
    };

    let run = release::run(&options_for(repo.path(), "900"), &platform).unwrap();

    assert!(!run.succeeded());
    assert_eq!(run.result.status, PipelineRunStatus::PartialSuccess);
    assert_eq!(run.release.as_ref().unwrap().tag, "900");
    assert!(run.asset.is_none());
    assert!(run
        .result
        .summary
        .next_actions
        .iter()
        .any(|action| action.contains("'900'")));
}

#[test]
fn plan_previews_without_touching_anything() {
    let repo = repo_with_examples();
    let options = options_for(repo.path(), "12345");

    let plan = release::plan(&options, &release::PlanPrerequisites::default()).unwrap();

    assert_eq!(plan.release.tag, "12345");
    assert_eq!(plan.release.name, "Release 12345");
    assert_eq!(plan.asset_name, "examples.zip");
    assert_eq!(plan.steps.len(), 3);
    assert!(!options.archive_path.exists());
}
