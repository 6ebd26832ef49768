//! Release creation and asset publishing.
//!
//! The publish flow is fixed: build the archive, create a release tagged with
//! the run identifier, then upload the archive as the release's asset.

mod executor;
mod pipeline;
mod types;

pub use pipeline::{plan, publish_steps, run, PlanPrerequisites, PublishPlan, PublishRun};
pub use types::{
    validate_run_id, AssetUpload, CreatedRelease, PublishOptions, ReleasePlatform, ReleaseSpec,
    UploadedAsset,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PublishConfig;
    use crate::engine::pipeline::{PipelineRunStatus, PipelineStepStatus};
    use crate::error::{Error, PlatformRejectionDetails, Result};
    use std::sync::Mutex;
    use std::path::Path;
    use tempfile::TempDir;

    #[derive(Default)]
    struct FakePlatform {
        calls: Mutex<Vec<String>>,
        fail_upload: bool,
    }

    impl ReleasePlatform for FakePlatform {
        fn create_release(&self, spec: &ReleaseSpec) -> Result<CreatedRelease> {
            self.calls.lock().unwrap().push(format!("create:{}", spec.tag));
            Ok(CreatedRelease {
                id: 1,
                tag: spec.tag.clone(),
                upload_url: "https://uploads.example.com/assets{?name,label}".to_string(),
                html_url: None,
            })
        }

        fn upload_asset(&self, release: &CreatedRelease, asset: &AssetUpload) -> Result<UploadedAsset> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("upload:{}:{}", release.tag, asset.name));
            if self.fail_upload {
                return Err(Error::asset_upload_failed(PlatformRejectionDetails {
                    operation: "asset.upload".to_string(),
                    status: Some(502),
                    tag: Some(release.tag.clone()),
                    body: String::new(),
                }));
            }
            let size = std::fs::metadata(&asset.path).map(|m| m.len()).unwrap_or(0);
            Ok(UploadedAsset {
                id: 9,
                name: asset.name.clone(),
                size,
                download_url: None,
            })
        }
    }

    fn workspace() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("examples/sub")).unwrap();
        std::fs::write(dir.path().join("examples/a.txt"), "a").unwrap();
        std::fs::write(dir.path().join("examples/sub/b.txt"), "b").unwrap();
        dir
    }

    fn options(cwd: &Path, run_id: &str) -> PublishOptions {
        PublishOptions::from_config(&PublishConfig::default(), cwd, run_id).unwrap()
    }

    #[test]
    fn successful_run_archives_then_creates_then_uploads() {
        let dir = workspace();
        let platform = FakePlatform::default();

        let run = run(&options(dir.path(), "12345"), &platform).unwrap();

        assert!(run.succeeded());
        assert_eq!(
            *platform.calls.lock().unwrap(),
            vec!["create:12345", "upload:12345:examples.zip"]
        );
        assert_eq!(run.archive.unwrap().entries, vec!["a.txt", "sub/b.txt"]);
        assert_eq!(run.release.unwrap().tag, "12345");
        assert!(run.asset.unwrap().size > 0);
        assert!(run.result.summary.next_actions.is_empty());
    }

    #[test]
    fn missing_source_never_reaches_platform() {
        let dir = TempDir::new().unwrap();
        let platform = FakePlatform::default();

        let run = run(&options(dir.path(), "1"), &platform).unwrap();

        assert_eq!(run.result.status, PipelineRunStatus::Failed);
        assert!(platform.calls.lock().unwrap().is_empty());
        assert_eq!(
            run.result.steps[0].error.as_ref().unwrap().code,
            "archive.source_missing"
        );
        assert_eq!(run.result.steps[1].status, PipelineRunStatus::Skipped);
        assert_eq!(run.result.steps[2].status, PipelineRunStatus::Skipped);
        assert!(run.release.is_none());
    }

    #[test]
    fn upload_failure_leaves_release_and_reports_it() {
        let dir = workspace();
        let platform = FakePlatform {
            fail_upload: true,
            ..FakePlatform::default()
        };

        let run = run(&options(dir.path(), "55"), &platform).unwrap();

        assert_eq!(run.result.status, PipelineRunStatus::PartialSuccess);
        assert_eq!(run.release.as_ref().unwrap().tag, "55");
        assert!(run.asset.is_none());
        assert!(run.result.summary.next_actions[0].contains("'55'"));
    }

    #[test]
    fn plan_has_no_side_effects_and_flags_prerequisites() {
        let dir = workspace();
        let opts = options(dir.path(), "12345");
        let prerequisites = PlanPrerequisites {
            token_env: Some("GITHUB_TOKEN".to_string()),
            repository_missing: false,
        };

        let plan = plan(&opts, &prerequisites).unwrap();

        assert_eq!(plan.release.tag, "12345");
        assert_eq!(plan.release.name, "Release 12345");
        let ids: Vec<_> = plan.steps.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["archive", "release", "upload"]);
        assert_eq!(plan.steps[0].status, PipelineStepStatus::Ready);
        assert_eq!(plan.steps[1].missing, vec!["GITHUB_TOKEN".to_string()]);
        assert!(!opts.archive_path.exists());
    }

    #[test]
    fn plan_warns_when_archive_lands_in_source() {
        let dir = workspace();
        let mut opts = options(dir.path(), "1");
        opts.archive_path = opts.source_dir.join("examples.zip");

        let plan = plan(&opts, &PlanPrerequisites::default()).unwrap();
        assert_eq!(plan.warnings.len(), 1);
    }
}
