use super::ErrorCode;

pub fn all_codes() -> &'static [ErrorCode] {
    &[
        ErrorCode::ConfigMissingKey,
        ErrorCode::ConfigInvalidJson,
        ErrorCode::ConfigInvalidValue,
        ErrorCode::ValidationMissingArgument,
        ErrorCode::ValidationInvalidArgument,
        ErrorCode::ValidationInvalidJson,
        ErrorCode::ArchiveSourceMissing,
        ErrorCode::ArchiveSourceEmpty,
        ErrorCode::ArchiveWriteFailed,
        ErrorCode::ReleaseCreateFailed,
        ErrorCode::ReleaseTagExists,
        ErrorCode::ReleaseAuthFailed,
        ErrorCode::AssetUploadFailed,
        ErrorCode::GitCommandFailed,
        ErrorCode::InternalIoError,
        ErrorCode::InternalJsonError,
        ErrorCode::InternalUnexpected,
    ]
}
