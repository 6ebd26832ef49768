use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::PublishConfig;
use crate::error::{Error, Result};

/// Internal step types for the publish pipeline. The flow itself is fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PublishStepType {
    Archive,
    ReleaseCreate,
    AssetUpload,
}

impl PublishStepType {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            PublishStepType::Archive => "archive",
            PublishStepType::ReleaseCreate => "release.create",
            PublishStepType::AssetUpload => "asset.upload",
        }
    }

    pub(crate) fn from_str(s: &str) -> Option<Self> {
        match s {
            "archive" => Some(PublishStepType::Archive),
            "release.create" => Some(PublishStepType::ReleaseCreate),
            "asset.upload" => Some(PublishStepType::AssetUpload),
            _ => None,
        }
    }
}

/// Fully resolved inputs for one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct PublishOptions {
    pub run_id: String,
    pub source_dir: PathBuf,
    pub archive_path: PathBuf,
    pub asset_name: String,
    pub content_type: String,
    pub body: String,
}

impl PublishOptions {
    /// Resolve config paths against `cwd` and bind them to a run identifier.
    pub fn from_config(config: &PublishConfig, cwd: &Path, run_id: &str) -> Result<Self> {
        config.validate()?;
        let run_id = validate_run_id(run_id)?;
        Ok(Self {
            run_id: run_id.to_string(),
            source_dir: config.source_path(cwd),
            archive_path: config.archive_destination(cwd),
            asset_name: config.asset_name.clone(),
            content_type: config.content_type.clone(),
            body: config.body.clone(),
        })
    }
}

/// Release record to be created on the hosting platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseSpec {
    pub tag: String,
    pub name: String,
    pub body: String,
    pub prerelease: bool,
    pub draft: bool,
}

impl ReleaseSpec {
    /// Derive the release record for a pipeline run.
    ///
    /// The tag is the run identifier itself, so distinct runs never share a tag.
    pub fn from_run_id(run_id: &str, body: &str) -> Result<Self> {
        let run_id = validate_run_id(run_id)?;
        Ok(Self {
            tag: run_id.to_string(),
            name: format!("Release {}", run_id),
            body: body.to_string(),
            prerelease: false,
            draft: false,
        })
    }
}

pub fn validate_run_id(run_id: &str) -> Result<&str> {
    let trimmed = run_id.trim();
    if trimmed.is_empty() {
        return Err(Error::validation_missing_argument(vec!["run_id".to_string()])
            .with_hint("Pass --run-id or set GITHUB_RUN_ID"));
    }
    if trimmed.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(Error::validation_invalid_argument(
            "run_id",
            "Run identifier must not contain whitespace or control characters",
            Some(trimmed.to_string()),
            None,
        ));
    }
    Ok(trimmed)
}

/// Handle returned by the platform once a release exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedRelease {
    pub id: u64,
    pub tag: String,
    /// Upload target for assets (may be an RFC 6570 URI template).
    pub upload_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
}

/// Asset to attach to a created release.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetUpload {
    pub name: String,
    pub content_type: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedAsset {
    pub id: u64,
    pub name: String,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

/// Hosting platform operations used by the publish pipeline.
///
/// One platform handle may serve several runs at once, each on its own thread.
pub trait ReleasePlatform: Send + Sync {
    fn create_release(&self, spec: &ReleaseSpec) -> Result<CreatedRelease>;
    fn upload_asset(&self, release: &CreatedRelease, asset: &AssetUpload) -> Result<UploadedAsset>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_types_round_trip() {
        for ty in [
            PublishStepType::Archive,
            PublishStepType::ReleaseCreate,
            PublishStepType::AssetUpload,
        ] {
            assert_eq!(PublishStepType::from_str(ty.as_str()), Some(ty));
        }
        assert_eq!(PublishStepType::from_str("publish.github"), None);
    }

    #[test]
    fn options_resolve_paths_against_cwd() {
        let options =
            PublishOptions::from_config(&PublishConfig::default(), Path::new("/repo"), " 77 ")
                .unwrap();
        assert_eq!(options.run_id, "77");
        assert_eq!(options.source_dir, PathBuf::from("/repo/examples"));
        assert_eq!(options.archive_path, PathBuf::from("/repo/examples.zip"));
        assert_eq!(options.content_type, "application/zip");
    }

    #[test]
    fn tag_and_name_derive_from_run_id() {
        let spec = ReleaseSpec::from_run_id("12345", "Packaged example files").unwrap();
        assert_eq!(spec.tag, "12345");
        assert_eq!(spec.name, "Release 12345");
        assert_eq!(spec.body, "Packaged example files");
        assert!(!spec.prerelease);
        assert!(!spec.draft);
    }

    #[test]
    fn distinct_run_ids_yield_distinct_tags() {
        let a = ReleaseSpec::from_run_id("100", "b").unwrap();
        let b = ReleaseSpec::from_run_id("101", "b").unwrap();
        assert_ne!(a.tag, b.tag);
    }

    #[test]
    fn run_id_is_trimmed() {
        let spec = ReleaseSpec::from_run_id("  42\n", "b").unwrap();
        assert_eq!(spec.tag, "42");
        assert_eq!(spec.name, "Release 42");
    }

    #[test]
    fn empty_run_id_is_rejected() {
        let err = ReleaseSpec::from_run_id("   ", "b").unwrap_err();
        assert_eq!(err.code.as_str(), "validation.missing_argument");
    }

    #[test]
    fn run_id_with_inner_whitespace_is_rejected() {
        let err = ReleaseSpec::from_run_id("12 34", "b").unwrap_err();
        assert_eq!(err.code.as_str(), "validation.invalid_argument");
    }
}
