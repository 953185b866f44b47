//! Package-manager source registration

use super::RegistryClient;
use crate::core::error::PublishError;
use crate::core::request::{PublishRequest, RegistryKind};
use crate::core::traits::{CommandInvocation, OutputMode};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

lazy_static! {
    /// `  1.  nuget.org [Enabled]` header line of `dotnet nuget list source`
    static ref SOURCE_HEADER: Regex =
        Regex::new(r"^\s*\d+\.\s+(.+?)\s+\[(Enabled|Disabled)\]\s*$").unwrap();
}

/// One entry of the package manager's source list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfiguredSource {
    pub name: String,
    pub url: String,
    pub enabled: bool,
}

/// The source entry pushes go to for this run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRegistration {
    /// Name passed to `--source` when pushing
    pub name: String,
    pub index_url: String,
    /// An existing entry for the same URL was reused instead of adding one
    pub reused: bool,
}

/// Parse the output of `dotnet nuget list source`
pub fn parse_source_list(output: &str) -> Vec<ConfiguredSource> {
    let mut sources = Vec::new();
    let mut lines = output.lines().peekable();

    while let Some(line) = lines.next() {
        let Some(cap) = SOURCE_HEADER.captures(line) else {
            continue;
        };
        let url = lines
            .next_if(|next| !SOURCE_HEADER.is_match(next))
            .map(|next| next.trim().to_string())
            .unwrap_or_default();

        sources.push(ConfiguredSource {
            name: cap[1].to_string(),
            url,
            enabled: &cap[2] == "Enabled",
        });
    }

    sources
}

fn same_url(a: &str, b: &str) -> bool {
    a.trim_end_matches('/')
        .eq_ignore_ascii_case(b.trim_end_matches('/'))
}

impl RegistryClient {
    /// Make sure the registry is a configured, enabled source
    ///
    /// An existing entry pointing at the same index URL is reused as-is;
    /// otherwise the source is added (with credentials for GitHub Packages).
    /// The chosen entry is always enabled.
    pub fn ensure_source_registered(
        &self,
        request: &PublishRequest,
    ) -> Result<SourceRegistration, PublishError> {
        let index_url = request
            .registry_kind
            .service_index_url(&request.registry_source);

        let listing = self.runner.run(
            &CommandInvocation::new("dotnet").args(["nuget", "list", "source"]),
            OutputMode::Captured,
        )?;
        let sources = parse_source_list(&listing.stdout);

        let registration = if let Some(existing) =
            sources.iter().find(|s| same_url(&s.url, &index_url))
        {
            info!(name = %existing.name, url = %index_url, "source already configured, reusing it");
            SourceRegistration {
                name: existing.name.clone(),
                index_url,
                reused: true,
            }
        } else if sources.is_empty() && listing.stdout.contains(&index_url) {
            warn!(url = %index_url, "unrecognized source list format, assuming source is configured");
            SourceRegistration {
                name: request.source_name.clone(),
                index_url,
                reused: true,
            }
        } else {
            if let Some(clash) = sources.iter().find(|s| s.name == request.source_name) {
                return Err(PublishError::config(
                    "SOURCE_NAME",
                    format!(
                        "source '{}' is already registered for {}",
                        clash.name, clash.url
                    ),
                ));
            }
            self.add_source(request, &index_url)?;
            SourceRegistration {
                name: request.source_name.clone(),
                index_url,
                reused: false,
            }
        };

        self.runner.run(
            &CommandInvocation::new("dotnet")
                .args(["nuget", "enable", "source"])
                .arg(registration.name.clone()),
            OutputMode::Captured,
        )?;

        Ok(registration)
    }

    fn add_source(&self, request: &PublishRequest, index_url: &str) -> Result<(), PublishError> {
        let mut add = CommandInvocation::new("dotnet")
            .args(["nuget", "add", "source"])
            .arg(index_url)
            .arg("--name")
            .arg(request.source_name.clone());

        if request.registry_kind == RegistryKind::GithubPackages {
            let credentials = request.credentials.as_ref().ok_or_else(|| {
                PublishError::config("NUGET_KEY", "GitHub Packages sources need credentials")
            })?;
            let principal = credentials.principal.clone().ok_or_else(|| {
                PublishError::config("GITHUB_USER", "GitHub Packages sources need a user name")
            })?;
            add = add
                .arg("--username")
                .arg(principal)
                .arg("--password")
                .secret_arg(credentials.secret.clone())
                .arg("--store-password-in-clear-text");
        }

        info!(name = %request.source_name, url = %index_url, kind = %request.registry_kind, "adding source");
        self.runner.run(&add, OutputMode::Captured)?;
        Ok(())
    }
}
