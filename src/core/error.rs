//! Error handling for package publishing
//!
//! This module provides the fatal error taxonomy of a publish run, with
//! stable error codes and recovery guidance, using the thiserror crate.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Classification of a failed registry existence check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryErrorKind {
    /// The registry answered with a status other than 200 or 404
    Status(u16),
    /// The request did not complete within the configured timeout
    Timeout,
    /// DNS resolution or TCP connect failed
    Connect,
    /// Any other transport-level failure
    Transport,
}

impl fmt::Display for RegistryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryErrorKind::Status(code) => write!(f, "HTTP {}", code),
            RegistryErrorKind::Timeout => write!(f, "timeout"),
            RegistryErrorKind::Connect => write!(f, "connect"),
            RegistryErrorKind::Transport => write!(f, "transport"),
        }
    }
}

/// Main error type for package publishing operations
#[derive(Error, Debug)]
pub enum PublishError {
    // Configuration errors
    #[error("invalid configuration for '{field}': {message}")]
    ConfigurationError { field: String, message: String },

    // Command execution errors
    #[error("calling '{command}' failed{}: {stderr}", exit_code.map(|c| format!(" with exit code {}", c)).unwrap_or_default())]
    CommandFailed {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    // Registry errors
    #[error("registry error ({kind}): {message}")]
    RegistryError {
        kind: RegistryErrorKind,
        message: String,
    },

    #[error("registry index at {url} returned an unreadable body: {message}")]
    InvalidRegistryResponse { url: String, message: String },

    #[error("version {version} of {package} already exists")]
    VersionAlreadyExists { package: String, version: String },

    // Publishing errors
    #[error("no packages were built in {}", directory.display())]
    NoArtifactsProduced { directory: PathBuf },

    #[error("registry rejected the push: {message}")]
    RegistryRejected { message: String },

    #[error("failed to access {}: {source}", path.display())]
    ArtifactIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PublishError {
    /// Shorthand for a configuration error on a named field
    pub fn config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Get suggested actions for this error
    pub fn suggested_actions(&self) -> Vec<&'static str> {
        match self {
            Self::ConfigurationError { .. } => vec![
                "Check the INPUT_* environment variables and the config file",
                "Make sure referenced project and version files exist",
            ],
            Self::CommandFailed { .. } => vec![
                "Check the command output above",
                "Make sure the dotnet SDK and git are installed and on PATH",
            ],
            Self::RegistryError { .. } => vec![
                "Check that NUGET_SOURCE points at a reachable registry",
                "Check the registry status page",
            ],
            Self::InvalidRegistryResponse { .. } => {
                vec!["Check that NUGET_SOURCE points at a NuGet v3 registry"]
            }
            Self::VersionAlreadyExists { .. } => vec![
                "Bump the package version",
                "Disable FAIL_IF_VERSION_EXISTS to skip existing versions quietly",
            ],
            Self::NoArtifactsProduced { .. } => vec![
                "Check OUTPUT_FOLDER matches the pack output directory",
                "Check that the project is packable",
            ],
            Self::RegistryRejected { .. } => vec![
                "Check the API key and its push scopes",
                "Check the package metadata against registry rules",
            ],
            Self::ArtifactIo { .. } => vec!["Check permissions on the output directory"],
        }
    }

    /// Get error code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigurationError { .. } => "CONFIGURATION_ERROR",
            Self::CommandFailed { .. } => "COMMAND_FAILED",
            Self::RegistryError { .. } => "REGISTRY_ERROR",
            Self::InvalidRegistryResponse { .. } => "INVALID_REGISTRY_RESPONSE",
            Self::VersionAlreadyExists { .. } => "VERSION_ALREADY_EXISTS",
            Self::NoArtifactsProduced { .. } => "NO_ARTIFACTS_PRODUCED",
            Self::RegistryRejected { .. } => "REGISTRY_REJECTED",
            Self::ArtifactIo { .. } => "ARTIFACT_IO",
        }
    }
}

impl From<crate::security::CommandError> for PublishError {
    fn from(error: crate::security::CommandError) -> Self {
        use crate::security::CommandError;

        match error {
            CommandError::Failed {
                command,
                exit_code,
                stderr,
            } => Self::CommandFailed {
                command,
                exit_code,
                stderr,
            },
            CommandError::CommandNotAllowed(program) => Self::CommandFailed {
                stderr: format!("'{}' is not an allowed command", program),
                command: program,
                exit_code: None,
            },
            CommandError::InvalidWorkingDirectory(dir) => Self::config(
                "working_dir",
                format!("{} does not exist or is not a directory", dir.display()),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::CommandError;

    #[test]
    fn test_configuration_error() {
        let error = PublishError::config("project_file", "project file not found");

        assert_eq!(error.code(), "CONFIGURATION_ERROR");
        assert!(error.to_string().contains("project_file"));
        assert!(!error.suggested_actions().is_empty());
    }

    #[test]
    fn test_command_failed_display_with_exit_code() {
        let error = PublishError::CommandFailed {
            command: "git tag v1.0.0".to_string(),
            exit_code: Some(128),
            stderr: "tag 'v1.0.0' already exists".to_string(),
        };

        let display = error.to_string();
        assert!(display.contains("git tag v1.0.0"));
        assert!(display.contains("exit code 128"));
        assert!(display.contains("already exists"));
    }

    #[test]
    fn test_command_failed_display_without_exit_code() {
        let error = PublishError::CommandFailed {
            command: "dotnet pack".to_string(),
            exit_code: None,
            stderr: "No such file or directory".to_string(),
        };

        assert!(!error.to_string().contains("exit code"));
    }

    #[test]
    fn test_registry_error_kinds() {
        let error = PublishError::RegistryError {
            kind: RegistryErrorKind::Status(503),
            message: "Service Unavailable".to_string(),
        };
        assert_eq!(error.code(), "REGISTRY_ERROR");
        assert!(error.to_string().contains("HTTP 503"));

        let error = PublishError::RegistryError {
            kind: RegistryErrorKind::Timeout,
            message: "operation timed out".to_string(),
        };
        assert!(error.to_string().contains("timeout"));
    }

    #[test]
    fn test_version_already_exists() {
        let error = PublishError::VersionAlreadyExists {
            package: "Foo".to_string(),
            version: "1.0.0".to_string(),
        };

        assert_eq!(error.code(), "VERSION_ALREADY_EXISTS");
        assert_eq!(error.to_string(), "version 1.0.0 of Foo already exists");
        assert!(
            error
                .suggested_actions()
                .iter()
                .any(|a| a.contains("FAIL_IF_VERSION_EXISTS"))
        );
    }

    #[test]
    fn test_no_artifacts_produced() {
        let error = PublishError::NoArtifactsProduced {
            directory: PathBuf::from("out"),
        };

        assert_eq!(error.code(), "NO_ARTIFACTS_PRODUCED");
        assert!(error.to_string().contains("out"));
    }

    #[test]
    fn test_from_command_error() {
        let error: PublishError = CommandError::Failed {
            command: "dotnet nuget push Foo.1.0.0.nupkg".to_string(),
            exit_code: Some(1),
            stderr: "401 Unauthorized".to_string(),
        }
        .into();

        match error {
            PublishError::CommandFailed {
                command, exit_code, ..
            } => {
                assert!(command.starts_with("dotnet nuget push"));
                assert_eq!(exit_code, Some(1));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_from_rejected_command_names_the_program() {
        let error: PublishError = CommandError::CommandNotAllowed("rm".to_string()).into();

        assert_eq!(error.code(), "COMMAND_FAILED");
        assert!(error.to_string().contains("'rm'"));
        assert!(!error.to_string().contains("''"));
    }

    #[test]
    fn test_from_missing_working_directory_is_configuration_error() {
        let error: PublishError =
            CommandError::InvalidWorkingDirectory(PathBuf::from("/no/such/dir")).into();

        assert_eq!(error.code(), "CONFIGURATION_ERROR");
        assert!(error.to_string().contains("/no/such/dir"));
    }

    #[test]
    fn test_from_command_not_allowed() {
        let error: PublishError = CommandError::CommandNotAllowed("rm".to_string()).into();

        assert_eq!(error.code(), "COMMAND_FAILED");
        assert!(error.to_string().contains("rm"));
    }
}
