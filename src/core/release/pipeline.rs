use chrono::Utc;
use serde::Serialize;

use crate::archive::ArchiveSummary;
use crate::engine::pipeline::{
    self, PipelineCapabilityResolver, PipelinePlanStep, PipelineRunResult, PipelineRunStatus,
    PipelineStep,
};
use crate::error::Result;

use super::executor::PublishStepExecutor;
use super::types::{
    CreatedRelease, PublishOptions, PublishStepType, ReleasePlatform, ReleaseSpec, UploadedAsset,
};

const FIELD: &str = "publish.steps";

#[derive(Debug, Clone, Serialize)]
pub struct PublishPlan {
    pub run_id: String,
    pub release: ReleaseSpec,
    pub source_dir: String,
    pub archive_path: String,
    pub asset_name: String,
    pub content_type: String,
    pub steps: Vec<PipelinePlanStep>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublishRun {
    pub run_id: String,
    pub tag: String,
    pub started_at: String,
    pub finished_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive: Option<ArchiveSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release: Option<CreatedRelease>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset: Option<UploadedAsset>,
    pub result: PipelineRunResult,
}

impl PublishRun {
    pub fn succeeded(&self) -> bool {
        self.result.status == PipelineRunStatus::Success
    }
}

fn step(step_type: PublishStepType, id: &str, label: String, needs: &[&str]) -> PipelineStep {
    PipelineStep {
        id: id.to_string(),
        step_type: step_type.as_str().to_string(),
        label: Some(label),
        needs: needs.iter().map(|n| n.to_string()).collect(),
        config: Default::default(),
    }
}

/// The fixed publish flow: archive, then release, then upload.
pub fn publish_steps(options: &PublishOptions) -> Vec<PipelineStep> {
    vec![
        step(
            PublishStepType::Archive,
            "archive",
            format!(
                "Zip {} into {}",
                options.source_dir.display(),
                options.archive_path.display()
            ),
            &[],
        ),
        step(
            PublishStepType::ReleaseCreate,
            "release",
            format!("Create release '{}' (Release {})", options.run_id, options.run_id),
            &["archive"],
        ),
        step(
            PublishStepType::AssetUpload,
            "upload",
            format!("Upload {} as {}", options.asset_name, options.content_type),
            &["release"],
        ),
    ]
}

/// Prerequisites the plan reports as missing instead of failing outright.
#[derive(Debug, Clone, Default)]
pub struct PlanPrerequisites {
    pub token_env: Option<String>,
    pub repository_missing: bool,
}

struct PrerequisiteResolver<'a> {
    options: &'a PublishOptions,
    prerequisites: &'a PlanPrerequisites,
}

impl PipelineCapabilityResolver for PrerequisiteResolver<'_> {
    fn missing(&self, step_type: &str) -> Vec<String> {
        let mut missing = Vec::new();
        match PublishStepType::from_str(step_type) {
            Some(PublishStepType::Archive) => {
                if !self.options.source_dir.is_dir() {
                    missing.push(format!("sourceDir ({})", self.options.source_dir.display()));
                }
            }
            Some(PublishStepType::ReleaseCreate) | Some(PublishStepType::AssetUpload) => {
                if let Some(var) = &self.prerequisites.token_env {
                    missing.push(var.clone());
                }
                if self.prerequisites.repository_missing {
                    missing.push("github.repository".to_string());
                }
            }
            None => missing.push(format!("unknown step type '{}'", step_type)),
        }
        missing
    }
}

/// Preview a run without touching the filesystem or the platform.
pub fn plan(options: &PublishOptions, prerequisites: &PlanPrerequisites) -> Result<PublishPlan> {
    let release = ReleaseSpec::from_run_id(&options.run_id, &options.body)?;
    let resolver = PrerequisiteResolver {
        options,
        prerequisites,
    };
    let planned = pipeline::plan(&publish_steps(options), &resolver, FIELD)?;

    let mut warnings = planned.warnings;
    if options.archive_path.starts_with(&options.source_dir) {
        warnings.push("Archive path lies inside the source directory and will be excluded".to_string());
    }

    Ok(PublishPlan {
        run_id: options.run_id.clone(),
        release,
        source_dir: options.source_dir.display().to_string(),
        archive_path: options.archive_path.display().to_string(),
        asset_name: options.asset_name.clone(),
        content_type: options.content_type.clone(),
        steps: planned.steps,
        warnings,
    })
}

/// Execute the publish flow against `platform`.
///
/// Step failures are recorded in the returned run rather than returned as
/// errors; only malformed step graphs produce `Err`.
pub fn run(options: &PublishOptions, platform: &dyn ReleasePlatform) -> Result<PublishRun> {
    let started_at = Utc::now().to_rfc3339();
    let executor = PublishStepExecutor::new(options, platform);

    let mut result = pipeline::run(&publish_steps(options), &executor, FIELD)?;
    let context = executor.into_context();

    result.summary.next_actions = next_actions(&result, context.release.as_ref());

    Ok(PublishRun {
        run_id: options.run_id.clone(),
        tag: options.run_id.clone(),
        started_at,
        finished_at: Utc::now().to_rfc3339(),
        archive: context.archive,
        release: context.release,
        asset: context.asset,
        result,
    })
}

fn next_actions(result: &PipelineRunResult, release: Option<&CreatedRelease>) -> Vec<String> {
    match (&result.status, release) {
        (PipelineRunStatus::Success, _) => Vec::new(),
        (PipelineRunStatus::PartialSuccess, Some(release)) => vec![
            format!(
                "Release '{}' (id {}) was left without its asset; delete it manually if unwanted",
                release.tag, release.id
            ),
            "Re-trigger the pipeline to publish a fresh release with a new run identifier"
                .to_string(),
        ],
        _ => vec![
            "Fix the reported error and re-trigger the pipeline with a new run identifier"
                .to_string(),
        ],
    }
}
