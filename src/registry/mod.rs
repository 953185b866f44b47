//! Registry client
//!
//! Registers the push source with the local package manager and asks the
//! registry whether a package version has already been published.

pub mod source;
pub mod version_check;

use crate::core::error::{PublishError, RegistryErrorKind};
use crate::core::traits::CommandRunner;
use std::sync::Arc;
use std::time::Duration;

pub use source::{ConfiguredSource, SourceRegistration};
pub use version_check::VersionCheckResult;

/// Talks to the registry over HTTP and to the package manager through a [`CommandRunner`]
pub struct RegistryClient {
    http: reqwest::Client,
    runner: Arc<dyn CommandRunner>,
}

impl RegistryClient {
    /// Create a client whose HTTP requests give up after `timeout`
    pub fn new(runner: Arc<dyn CommandRunner>, timeout: Duration) -> Result<Self, PublishError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("nuget-publisher/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PublishError::RegistryError {
                kind: RegistryErrorKind::Transport,
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self { http, runner })
    }
}
