//! Build, pack and push a single package version
//!
//! Only invoked once the registry has confirmed the version is new.

use super::artifacts::{self, ArtifactKind, BuildArtifact};
use crate::core::error::PublishError;
use crate::core::request::{PublishRequest, RegistryKind};
use crate::core::traits::{CommandInvocation, CommandRunner, OutputMode};
use crate::registry::RegistryClient;
use lazy_static::lazy_static;
use regex::Regex;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

lazy_static! {
    /// First registry-reported error line in push output
    static ref PUSH_ERROR: Regex = Regex::new(r"error[^\r\n]*").unwrap();
}

/// Why a run ended without pushing anything
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The version is already in the registry
    VersionExists,
    /// No push secret was configured
    MissingCredential,
}

/// Files pushed for a published version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOutcome {
    pub package_path: PathBuf,
    pub symbols_package_path: Option<PathBuf>,
    pub pushed_version: String,
}

impl PublishOutcome {
    pub fn package_file_name(&self) -> String {
        file_name(&self.package_path)
    }

    pub fn symbols_file_name(&self) -> Option<String> {
        self.symbols_package_path.as_deref().map(file_name)
    }
}

fn file_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishStatus {
    Published(PublishOutcome),
    Skipped(SkipReason),
}

/// Extract the first error line a registry wrote into push output
pub fn find_push_error(output: &str) -> Option<String> {
    PUSH_ERROR.find(output).map(|m| m.as_str().trim().to_string())
}

pub struct PublishExecutor {
    runner: Arc<dyn CommandRunner>,
    registry: Arc<RegistryClient>,
}

impl PublishExecutor {
    pub fn new(runner: Arc<dyn CommandRunner>, registry: Arc<RegistryClient>) -> Self {
        Self { runner, registry }
    }

    /// Publish `request.version`
    ///
    /// Without a configured secret this logs a warning and returns
    /// [`SkipReason::MissingCredential`] before touching anything.
    pub fn publish(&self, request: &PublishRequest) -> Result<PublishStatus, PublishError> {
        let Some(credentials) = &request.credentials else {
            warn!("NUGET_KEY not given, skipping publish");
            return Ok(PublishStatus::Skipped(SkipReason::MissingCredential));
        };

        let source = self.registry.ensure_source_registered(request)?;

        if request.skip_build {
            info!("build skipped, publishing existing packages");
        } else {
            let removed = artifacts::clean_stale_artifacts(&request.output_directory)?;
            if removed > 0 {
                info!(removed, "removed stale packages");
            }
            self.build_and_pack(request)?;
        }

        let pushable = self.select_artifacts(request)?;
        let primary: Vec<&BuildArtifact> = pushable
            .iter()
            .filter(|a| a.kind == ArtifactKind::Primary)
            .collect();
        let symbols: Vec<&BuildArtifact> = pushable
            .iter()
            .filter(|a| a.kind == ArtifactKind::Symbols)
            .collect();

        let Some(package) = primary.first() else {
            return Err(PublishError::NoArtifactsProduced {
                directory: request.output_directory.clone(),
            });
        };
        if primary.len() > 1 {
            warn!(count = primary.len(), "more than one package produced, reporting the first");
        }
        if symbols.len() > 1 {
            warn!(count = symbols.len(), "more than one symbols package produced, reporting the first");
        }

        info!(
            packages = %pushable.iter().map(BuildArtifact::file_name).collect::<Vec<_>>().join(", "),
            "generated packages"
        );

        for artifact in &pushable {
            let mut push = CommandInvocation::new("dotnet")
                .args(["nuget", "push"])
                .arg(artifact.path.to_string_lossy())
                .arg("--source")
                .arg(source.name.clone());
            if request.registry_kind == RegistryKind::Default {
                push = push.arg("--api-key").secret_arg(credentials.secret.clone());
            }
            push = push.arg("--skip-duplicate");
            if !request.include_symbols {
                push = push.arg("--no-symbols");
            }

            let output = self.runner.run(&push, OutputMode::Captured)?;
            if let Some(message) = find_push_error(&output.stdout) {
                return Err(PublishError::RegistryRejected { message });
            }
            info!(package = %artifact.file_name(), "pushed");
        }

        Ok(PublishStatus::Published(PublishOutcome {
            package_path: package.path.clone(),
            symbols_package_path: symbols.first().map(|a| a.path.clone()),
            pushed_version: request.version.clone(),
        }))
    }

    fn build_and_pack(&self, request: &PublishRequest) -> Result<(), PublishError> {
        let project = request.project_file.to_string_lossy().into_owned();

        self.runner.run(
            &CommandInvocation::new("dotnet")
                .arg("build")
                .arg(project.clone())
                .args(["-c", "Release"]),
            OutputMode::Streamed,
        )?;

        let mut pack = CommandInvocation::new("dotnet")
            .arg("pack")
            .arg(project)
            .args(["--no-build", "-c", "Release", "-o"])
            .arg(request.output_directory.to_string_lossy());
        if request.include_symbols {
            pack = pack.args(["--include-symbols", "-p:SymbolPackageFormat=snupkg"]);
        }
        self.runner.run(&pack, OutputMode::Streamed)?;

        Ok(())
    }

    fn select_artifacts(&self, request: &PublishRequest) -> Result<Vec<BuildArtifact>, PublishError> {
        let discovered = artifacts::discover_artifacts(&request.output_directory)?;
        if discovered.is_empty() {
            return Err(PublishError::NoArtifactsProduced {
                directory: request.output_directory.clone(),
            });
        }

        if request.include_symbols {
            return Ok(discovered);
        }

        let (keep, ignored): (Vec<_>, Vec<_>) = discovered
            .into_iter()
            .partition(|a| a.kind == ArtifactKind::Primary);
        for artifact in &ignored {
            warn!(package = %artifact.file_name(), "symbols disabled, not pushing symbols package");
        }
        Ok(keep)
    }
}
