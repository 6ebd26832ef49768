mod codes;

pub use codes::all_codes;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigMissingKey,
    ConfigInvalidJson,
    ConfigInvalidValue,

    ValidationMissingArgument,
    ValidationInvalidArgument,
    ValidationInvalidJson,

    ArchiveSourceMissing,
    ArchiveSourceEmpty,
    ArchiveWriteFailed,

    ReleaseCreateFailed,
    ReleaseTagExists,
    ReleaseAuthFailed,

    AssetUploadFailed,

    GitCommandFailed,

    InternalIoError,
    InternalJsonError,
    InternalUnexpected,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigMissingKey => "config.missing_key",
            ErrorCode::ConfigInvalidJson => "config.invalid_json",
            ErrorCode::ConfigInvalidValue => "config.invalid_value",

            ErrorCode::ValidationMissingArgument => "validation.missing_argument",
            ErrorCode::ValidationInvalidArgument => "validation.invalid_argument",
            ErrorCode::ValidationInvalidJson => "validation.invalid_json",

            ErrorCode::ArchiveSourceMissing => "archive.source_missing",
            ErrorCode::ArchiveSourceEmpty => "archive.source_empty",
            ErrorCode::ArchiveWriteFailed => "archive.write_failed",

            ErrorCode::ReleaseCreateFailed => "release.create_failed",
            ErrorCode::ReleaseTagExists => "release.tag_exists",
            ErrorCode::ReleaseAuthFailed => "release.auth_failed",

            ErrorCode::AssetUploadFailed => "asset.upload_failed",

            ErrorCode::GitCommandFailed => "git.command_failed",

            ErrorCode::InternalIoError => "internal.io_error",
            ErrorCode::InternalJsonError => "internal.json_error",
            ErrorCode::InternalUnexpected => "internal.unexpected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    pub details: Value,
    pub hints: Vec<Hint>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMissingKeyDetails {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidJsonDetails {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidValueDetails {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub problem: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingArgumentDetails {
    pub args: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidArgumentDetails {
    pub field: String,
    pub problem: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tried: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveSourceDetails {
    pub source_dir: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveWriteDetails {
    pub destination: String,
    pub error: String,
}

/// Response details for a rejected platform call.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformRejectionDetails {
    pub operation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    pub body: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalIoErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalJsonErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

fn to_details<T: Serialize>(details: T) -> Value {
    serde_json::to_value(details).unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            hints: Vec::new(),
        }
    }

    pub fn validation_missing_argument(args: Vec<String>) -> Self {
        Self::new(
            ErrorCode::ValidationMissingArgument,
            "Missing required argument",
            to_details(MissingArgumentDetails { args }),
        )
    }

    pub fn validation_invalid_argument(
        field: impl Into<String>,
        problem: impl Into<String>,
        id: Option<String>,
        tried: Option<Vec<String>>,
    ) -> Self {
        let details = to_details(InvalidArgumentDetails {
            field: field.into(),
            problem: problem.into(),
            id,
            tried,
        });

        Self::new(
            ErrorCode::ValidationInvalidArgument,
            "Invalid argument",
            details,
        )
    }

    pub fn validation_invalid_json(err: serde_json::Error, context: Option<String>) -> Self {
        let details = serde_json::json!({
            "error": err.to_string(),
            "context": context,
        });

        Self::new(ErrorCode::ValidationInvalidJson, "Invalid JSON", details)
    }

    pub fn config_missing_key(key: impl Into<String>, path: Option<String>) -> Self {
        let details = to_details(ConfigMissingKeyDetails {
            key: key.into(),
            path,
        });

        Self::new(
            ErrorCode::ConfigMissingKey,
            "Missing required configuration key",
            details,
        )
    }

    pub fn config_invalid_json(path: impl Into<String>, err: serde_json::Error) -> Self {
        let details = to_details(ConfigInvalidJsonDetails {
            path: path.into(),
            error: err.to_string(),
        });

        Self::new(
            ErrorCode::ConfigInvalidJson,
            "Invalid JSON in configuration",
            details,
        )
    }

    pub fn config_invalid_value(
        key: impl Into<String>,
        value: Option<String>,
        problem: impl Into<String>,
    ) -> Self {
        let details = to_details(ConfigInvalidValueDetails {
            key: key.into(),
            value,
            problem: problem.into(),
        });

        Self::new(
            ErrorCode::ConfigInvalidValue,
            "Invalid configuration value",
            details,
        )
    }

    pub fn archive_source_missing(source_dir: impl Into<String>) -> Self {
        let source_dir = source_dir.into();
        Self::new(
            ErrorCode::ArchiveSourceMissing,
            format!("Source directory '{}' does not exist", source_dir),
            to_details(ArchiveSourceDetails { source_dir }),
        )
        .with_hint("Set 'sourceDir' in packrelease.json or pass --source")
    }

    pub fn archive_source_empty(source_dir: impl Into<String>) -> Self {
        let source_dir = source_dir.into();
        Self::new(
            ErrorCode::ArchiveSourceEmpty,
            format!("Source directory '{}' contains no files", source_dir),
            to_details(ArchiveSourceDetails { source_dir }),
        )
    }

    pub fn archive_write_failed(destination: impl Into<String>, error: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ArchiveWriteFailed,
            "Failed to write archive",
            to_details(ArchiveWriteDetails {
                destination: destination.into(),
                error: error.into(),
            }),
        )
    }

    pub fn release_create_failed(details: PlatformRejectionDetails) -> Self {
        let message = match details.status {
            Some(status) => format!("Release creation rejected: HTTP {}", status),
            None => "Release creation request failed".to_string(),
        };
        Self::new(ErrorCode::ReleaseCreateFailed, message, to_details(details))
    }

    pub fn release_tag_exists(tag: impl Into<String>, body: impl Into<String>) -> Self {
        let tag = tag.into();
        Self::new(
            ErrorCode::ReleaseTagExists,
            format!("A release tagged '{}' already exists", tag),
            to_details(PlatformRejectionDetails {
                operation: "release.create".to_string(),
                status: Some(422),
                tag: Some(tag),
                body: body.into(),
            }),
        )
        .with_hint("Re-trigger the pipeline to obtain a fresh run identifier")
    }

    pub fn release_auth_failed(details: PlatformRejectionDetails) -> Self {
        Self::new(
            ErrorCode::ReleaseAuthFailed,
            "Hosting platform rejected the access token",
            to_details(details),
        )
        .with_hint("Check that the token has 'contents: write' permission on the repository")
    }

    pub fn asset_upload_failed(details: PlatformRejectionDetails) -> Self {
        let message = match details.status {
            Some(status) => format!("Asset upload rejected: HTTP {}", status),
            None => "Asset upload request failed".to_string(),
        };
        Self::new(ErrorCode::AssetUploadFailed, message, to_details(details))
    }

    pub fn git_command_failed(message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::GitCommandFailed,
            message,
            Value::Object(serde_json::Map::new()),
        )
    }

    pub fn internal_io(error: impl Into<String>, context: Option<String>) -> Self {
        let details = to_details(InternalIoErrorDetails {
            error: error.into(),
            context,
        });

        Self::new(ErrorCode::InternalIoError, "IO error", details)
    }

    pub fn internal_json(error: impl Into<String>, context: Option<String>) -> Self {
        let details = to_details(InternalJsonErrorDetails {
            error: error.into(),
            context,
        });

        Self::new(ErrorCode::InternalJsonError, "JSON error", details)
    }

    pub fn internal_unexpected(error: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InternalUnexpected,
            "Unexpected error",
            serde_json::json!({ "error": error.into() }),
        )
    }

    pub fn with_hint(mut self, message: impl Into<String>) -> Self {
        self.hints.push(Hint {
            message: message.into(),
        });
        self
    }
}
