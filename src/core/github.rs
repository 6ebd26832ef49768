//! GitHub Releases client.
//!
//! Creates release records and uploads assets through the REST API using a
//! blocking reqwest client. Status codes are mapped onto the release/asset
//! error taxonomy so callers never see raw HTTP failures.

use std::time::Duration;

use reqwest::blocking::{Body, Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};

use crate::config::GitHubSettings;
use crate::error::{Error, PlatformRejectionDetails, Result};
use crate::release::{AssetUpload, CreatedRelease, ReleasePlatform, ReleaseSpec, UploadedAsset};
use crate::utils::io;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const API_VERSION: &str = "2022-11-28";
const ACCEPT_JSON: &str = "application/vnd.github+json";

/// Access token supplied by the environment. Never printed or serialized.
#[derive(Clone)]
pub struct Token(String);

impl Token {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Read the token from the named environment variable.
    pub fn from_env_with<F>(var: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        lookup(var)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(Self)
            .ok_or_else(|| {
                Error::config_missing_key(var, None)
                    .with_hint(format!("Export {} with a token allowed to create releases", var))
            })
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Token(<redacted>)")
    }
}

#[derive(Debug, Serialize)]
struct CreateReleaseRequest<'a> {
    tag_name: &'a str,
    name: &'a str,
    body: &'a str,
    draft: bool,
    prerelease: bool,
}

#[derive(Debug, Deserialize)]
struct ReleaseResponse {
    id: u64,
    tag_name: String,
    upload_url: String,
    #[serde(default)]
    html_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AssetResponse {
    id: u64,
    name: String,
    size: u64,
    #[serde(default)]
    browser_download_url: Option<String>,
}

pub struct GitHubClient {
    client: Client,
    api_url: String,
    owner: String,
    repo: String,
    token: Token,
}

impl GitHubClient {
    pub fn new(settings: &GitHubSettings, token: Token) -> Result<Self> {
        let (owner, repo) = settings.owner_and_repo()?;

        let client = Client::builder()
            .user_agent(format!("packrelease/{}", VERSION))
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| Error::internal_io(e.to_string(), Some("create HTTP client".to_string())))?;

        Ok(Self {
            client,
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            owner: owner.to_string(),
            repo: repo.to_string(),
            token,
        })
    }

    pub fn releases_endpoint(&self) -> String {
        format!("{}/repos/{}/{}/releases", self.api_url, self.owner, self.repo)
    }

    fn headers(&self, content_type: &str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&self.token.bearer()).map_err(|_| {
            Error::config_invalid_value("token", None, "Token contains invalid header characters")
        })?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_JSON));
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static(API_VERSION));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("packrelease/{}", VERSION))
                .unwrap_or_else(|_| HeaderValue::from_static("packrelease")),
        );
        let content_type = HeaderValue::from_str(content_type).map_err(|_| {
            Error::config_invalid_value(
                "contentType",
                Some(content_type.to_string()),
                "Not a valid header value",
            )
        })?;
        headers.insert(CONTENT_TYPE, content_type);
        Ok(headers)
    }
}

impl ReleasePlatform for GitHubClient {
    fn create_release(&self, spec: &ReleaseSpec) -> Result<CreatedRelease> {
        let request = CreateReleaseRequest {
            tag_name: &spec.tag,
            name: &spec.name,
            body: &spec.body,
            draft: spec.draft,
            prerelease: spec.prerelease,
        };

        log_status!("release", "Creating release '{}' on {}/{}", spec.tag, self.owner, self.repo);

        let response = self
            .client
            .post(self.releases_endpoint())
            .headers(self.headers("application/json")?)
            .json(&request)
            .send()
            .map_err(|e| {
                Error::release_create_failed(transport_details("release.create", Some(spec.tag.as_str()), &e))
            })?;

        let (status, body) = read_response(response, "release.create")?;
        if !status.is_success() {
            return Err(create_error(status, &spec.tag, body));
        }

        // The release exists once the platform answers 2xx, even if the body is unreadable.
        let parsed: ReleaseResponse = serde_json::from_str(&body).map_err(|e| {
            Error::release_create_failed(rejection(
                "release.create",
                status,
                &spec.tag,
                format!("Unreadable release response ({}): {}", e, body),
            ))
            .with_hint(format!(
                "The release '{}' may already exist on the platform; check before re-triggering",
                spec.tag
            ))
        })?;

        Ok(CreatedRelease {
            id: parsed.id,
            tag: parsed.tag_name,
            upload_url: parsed.upload_url,
            html_url: parsed.html_url,
        })
    }

    fn upload_asset(&self, release: &CreatedRelease, asset: &AssetUpload) -> Result<UploadedAsset> {
        let url = upload_endpoint(&release.upload_url, &asset.name)?;
        let file = io::open_file(&asset.path, "open archive for upload")?;
        let size = file
            .metadata()
            .map(|m| m.len())
            .map_err(|e| Error::internal_io(e.to_string(), Some("stat archive for upload".to_string())))?;

        log_status!(
            "upload",
            "Uploading {} ({} bytes) to release '{}'",
            asset.name,
            size,
            release.tag
        );

        let response = self
            .client
            .post(url)
            .headers(self.headers(&asset.content_type)?)
            .body(Body::sized(file, size))
            .send()
            .map_err(|e| {
                Error::asset_upload_failed(transport_details("asset.upload", Some(release.tag.as_str()), &e))
            })?;

        let (status, body) = read_response(response, "asset.upload")?;
        if !status.is_success() {
            return Err(upload_error(status, &release.tag, body));
        }

        let parsed: AssetResponse = serde_json::from_str(&body).map_err(|e| {
            Error::internal_json(e.to_string(), Some("parse asset response".to_string()))
        })?;

        Ok(UploadedAsset {
            id: parsed.id,
            name: parsed.name,
            size: parsed.size,
            download_url: parsed.browser_download_url,
        })
    }
}

/// Expand the release's upload URL template into a concrete endpoint.
///
/// GitHub returns `.../assets{?name,label}`; the template suffix is dropped
/// and `name` is appended as a percent-encoded query parameter.
pub fn upload_endpoint(upload_url: &str, asset_name: &str) -> Result<Url> {
    let base = match upload_url.find('{') {
        Some(idx) => &upload_url[..idx],
        None => upload_url,
    };

    let mut url = Url::parse(base).map_err(|e| {
        Error::asset_upload_failed(PlatformRejectionDetails {
            operation: "asset.upload".to_string(),
            status: None,
            tag: None,
            body: format!("Invalid upload URL '{}': {}", upload_url, e),
        })
    })?;
    url.query_pairs_mut().append_pair("name", asset_name);
    Ok(url)
}

fn read_response(response: Response, operation: &str) -> Result<(StatusCode, String)> {
    let status = response.status();
    let body = response.text().map_err(|e| {
        Error::internal_io(e.to_string(), Some(format!("{} response body", operation)))
    })?;
    Ok((status, body))
}

fn transport_details(operation: &str, tag: Option<&str>, err: &reqwest::Error) -> PlatformRejectionDetails {
    PlatformRejectionDetails {
        operation: operation.to_string(),
        status: None,
        tag: tag.map(str::to_string),
        body: err.to_string(),
    }
}

fn rejection(operation: &str, status: StatusCode, tag: &str, body: String) -> PlatformRejectionDetails {
    PlatformRejectionDetails {
        operation: operation.to_string(),
        status: Some(status.as_u16()),
        tag: Some(tag.to_string()),
        body,
    }
}

/// Map a non-success release creation response onto the error taxonomy.
pub fn create_error(status: StatusCode, tag: &str, body: String) -> Error {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Error::release_auth_failed(rejection("release.create", status, tag, body))
        }
        StatusCode::UNPROCESSABLE_ENTITY if body.contains("already_exists") => {
            Error::release_tag_exists(tag, body)
        }
        _ => Error::release_create_failed(rejection("release.create", status, tag, body)),
    }
}

/// Map a non-success asset upload response onto the error taxonomy.
pub fn upload_error(status: StatusCode, tag: &str, body: String) -> Error {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Error::release_auth_failed(rejection("asset.upload", status, tag, body))
        }
        StatusCode::PAYLOAD_TOO_LARGE => {
            Error::asset_upload_failed(rejection("asset.upload", status, tag, body))
                .with_hint("Release assets must be smaller than 2 GiB")
        }
        _ => Error::asset_upload_failed(rejection("asset.upload", status, tag, body)),
    }
}
