//! Version existence check against the registry's package index

use super::RegistryClient;
use crate::core::error::{PublishError, RegistryErrorKind};
use crate::core::request::{PublishRequest, RegistryKind};
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::{debug, warn};

/// Answer of a version existence check
///
/// Registry failures are a value here, not an error: the caller decides
/// whether an unreachable registry blocks the publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionCheckResult {
    NotFound,
    Exists,
    RegistryError {
        kind: RegistryErrorKind,
        message: String,
    },
}

#[derive(Debug, Deserialize)]
struct VersionsIndex {
    versions: Vec<String>,
}

fn classify(error: &reqwest::Error) -> RegistryErrorKind {
    if error.is_timeout() {
        RegistryErrorKind::Timeout
    } else if error.is_connect() {
        RegistryErrorKind::Connect
    } else {
        RegistryErrorKind::Transport
    }
}

impl RegistryClient {
    /// Check whether `request.version` of `request.package_name` is already published
    ///
    /// The package id is lowercased in the index URL.
    /// 404 means the package has never been published. A 200 whose body is not
    /// a versions index is an [`PublishError::InvalidRegistryResponse`].
    pub async fn version_exists(
        &self,
        request: &PublishRequest,
    ) -> Result<VersionCheckResult, PublishError> {
        let url = request
            .registry_kind
            .versions_index_url(&request.registry_source, &request.package_name.to_lowercase());
        debug!(url = %url, "checking registry for existing version");

        let mut builder = self.http.get(&url);
        if request.registry_kind == RegistryKind::GithubPackages {
            if let Some(credentials) = &request.credentials {
                let user = credentials
                    .principal
                    .as_deref()
                    .unwrap_or(&request.source_name);
                builder = builder.basic_auth(user, Some(credentials.secret.expose_secret()));
            }
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(url = %url, error = %e, "registry request failed");
                return Ok(VersionCheckResult::RegistryError {
                    kind: classify(&e),
                    message: e.to_string(),
                });
            }
        };

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(VersionCheckResult::NotFound);
        }
        if status != reqwest::StatusCode::OK {
            return Ok(VersionCheckResult::RegistryError {
                kind: RegistryErrorKind::Status(status.as_u16()),
                message: status
                    .canonical_reason()
                    .unwrap_or("unexpected status")
                    .to_string(),
            });
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Ok(VersionCheckResult::RegistryError {
                    kind: classify(&e),
                    message: e.to_string(),
                });
            }
        };

        let index: VersionsIndex =
            serde_json::from_str(&body).map_err(|e| PublishError::InvalidRegistryResponse {
                url: url.clone(),
                message: e.to_string(),
            })?;

        let exists = index
            .versions
            .iter()
            .any(|published| published.eq_ignore_ascii_case(&request.version));

        Ok(if exists {
            VersionCheckResult::Exists
        } else {
            VersionCheckResult::NotFound
        })
    }
}
