use std::path::PathBuf;
use std::sync::Mutex;

use crate::archive::{self, ArchiveSummary};
use crate::engine::pipeline::{
    PipelineRunStatus, PipelineStep, PipelineStepExecutor, PipelineStepResult,
};
use crate::error::{Error, Result};

use super::types::{
    AssetUpload, CreatedRelease, PublishOptions, PublishStepType, ReleasePlatform, ReleaseSpec,
    UploadedAsset,
};

/// Values produced by earlier steps and consumed by later ones.
#[derive(Debug, Default)]
pub(crate) struct PublishContext {
    pub archive: Option<ArchiveSummary>,
    pub release: Option<CreatedRelease>,
    pub asset: Option<UploadedAsset>,
}

pub(crate) struct PublishStepExecutor<'a> {
    options: &'a PublishOptions,
    platform: &'a dyn ReleasePlatform,
    pub(crate) context: Mutex<PublishContext>,
}

impl<'a> PublishStepExecutor<'a> {
    pub fn new(options: &'a PublishOptions, platform: &'a dyn ReleasePlatform) -> Self {
        Self {
            options,
            platform,
            context: Mutex::new(PublishContext::default()),
        }
    }

    pub fn into_context(self) -> PublishContext {
        self.context
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn step_result(step: &PipelineStep, data: serde_json::Value) -> PipelineStepResult {
        PipelineStepResult {
            id: step.id.clone(),
            step_type: step.step_type.clone(),
            status: PipelineRunStatus::Success,
            warnings: Vec::new(),
            hints: Vec::new(),
            data: Some(data),
            error: None,
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, PublishContext>> {
        self.context
            .lock()
            .map_err(|_| Error::internal_unexpected("Publish context lock poisoned"))
    }

    fn run_archive(&self, step: &PipelineStep) -> Result<PipelineStepResult> {
        let summary = archive::build(&self.options.source_dir, &self.options.archive_path)?;
        let data = to_json(&summary, "archive output")?;
        self.lock()?.archive = Some(summary);
        Ok(Self::step_result(step, data))
    }

    fn run_release_create(&self, step: &PipelineStep) -> Result<PipelineStepResult> {
        if self.lock()?.archive.is_none() {
            return Err(Error::internal_unexpected(
                "Release creation requested before the archive was built",
            ));
        }

        let spec = ReleaseSpec::from_run_id(&self.options.run_id, &self.options.body)?;
        let created = self.platform.create_release(&spec)?;
        log_status!("release", "Created release '{}' (id {})", created.tag, created.id);

        let data = to_json(&created, "release output")?;
        self.lock()?.release = Some(created);
        Ok(Self::step_result(step, data))
    }

    fn run_asset_upload(&self, step: &PipelineStep) -> Result<PipelineStepResult> {
        let (release, archive_path) = {
            let ctx = self.lock()?;
            let release = ctx.release.clone().ok_or_else(|| {
                Error::internal_unexpected("Asset upload requested before a release was created")
            })?;
            let archive_path = ctx
                .archive
                .as_ref()
                .map(|a| PathBuf::from(&a.path))
                .unwrap_or_else(|| self.options.archive_path.clone());
            (release, archive_path)
        };

        let upload = AssetUpload {
            name: self.options.asset_name.clone(),
            content_type: self.options.content_type.clone(),
            path: archive_path,
        };
        let uploaded = self.platform.upload_asset(&release, &upload)?;
        log_status!("upload", "Attached {} to release '{}'", uploaded.name, release.tag);

        let data = to_json(&uploaded, "upload output")?;
        self.lock()?.asset = Some(uploaded);
        Ok(Self::step_result(step, data))
    }
}

impl PipelineStepExecutor for PublishStepExecutor<'_> {
    fn execute_step(&self, step: &PipelineStep) -> Result<PipelineStepResult> {
        match PublishStepType::from_str(&step.step_type) {
            Some(PublishStepType::Archive) => self.run_archive(step),
            Some(PublishStepType::ReleaseCreate) => self.run_release_create(step),
            Some(PublishStepType::AssetUpload) => self.run_asset_upload(step),
            None => Err(Error::validation_invalid_argument(
                "publish.steps",
                format!("Unknown step type '{}'", step.step_type),
                Some(step.id.clone()),
                None,
            )),
        }
    }
}

fn to_json<T: serde::Serialize>(value: &T, context: &str) -> Result<serde_json::Value> {
    serde_json::to_value(value)
        .map_err(|e| Error::internal_json(e.to_string(), Some(context.to_string())))
}
