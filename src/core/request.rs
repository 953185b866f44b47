//! The immutable request a publish run operates on

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// URL prefix identifying the GitHub Packages NuGet registry
pub const GITHUB_PACKAGES_PREFIX: &str = "https://nuget.pkg.github.com/";

/// Registry flavours with different index and authentication conventions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RegistryKind {
    #[default]
    Default,
    GithubPackages,
}

impl RegistryKind {
    /// Infer the kind from a source URL
    pub fn detect(source: &str) -> Self {
        if source.starts_with(GITHUB_PACKAGES_PREFIX) {
            RegistryKind::GithubPackages
        } else {
            RegistryKind::Default
        }
    }

    /// Parse the configuration spelling (`default` | `github-packages`)
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "default" | "nuget" => Some(RegistryKind::Default),
            "github-packages" | "github" | "gpr" => Some(RegistryKind::GithubPackages),
            _ => None,
        }
    }

    /// Index URL registered with the package manager for this source
    pub fn service_index_url(&self, source: &str) -> String {
        match self {
            RegistryKind::Default => format!("{}/v3/index.json", source),
            RegistryKind::GithubPackages => format!("{}/index.json", source),
        }
    }

    /// JSON endpoint listing every published version of a package
    ///
    /// `package_name` is used as given; the version check passes the
    /// lowercased id because flat-container paths are lowercase.
    pub fn versions_index_url(&self, source: &str, package_name: &str) -> String {
        match self {
            RegistryKind::Default => {
                format!("{}/v3-flatcontainer/{}/index.json", source, package_name)
            }
            RegistryKind::GithubPackages => {
                format!("{}/download/{}/index.json", source, package_name)
            }
        }
    }
}

impl fmt::Display for RegistryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryKind::Default => write!(f, "default"),
            RegistryKind::GithubPackages => write!(f, "github-packages"),
        }
    }
}

/// Push secret plus the optional principal it belongs to
#[derive(Debug, Clone)]
pub struct Credentials {
    pub principal: Option<String>,
    pub secret: SecretString,
}

/// Everything a run needs, resolved and validated upstream by the config loader
#[derive(Debug, Clone)]
pub struct PublishRequest {
    /// Project file handed to the build tool
    pub project_file: PathBuf,
    /// Directory packages are written to and discovered in
    pub output_directory: PathBuf,
    pub package_name: String,
    pub version: String,
    /// Registry base URL without trailing slash
    pub registry_source: String,
    pub registry_kind: RegistryKind,
    /// Name of the package-manager source entry used for pushes
    pub source_name: String,
    pub credentials: Option<Credentials>,
    pub tag_on_publish: bool,
    /// Tag template with a single `*` placeholder
    pub tag_template: String,
    /// Remote the created tag is pushed to
    pub git_remote: String,
    pub include_symbols: bool,
    pub fail_if_version_exists: bool,
    pub skip_build: bool,
    pub http_timeout: Duration,
}

#[cfg(test)]
impl PublishRequest {
    /// Request with test-friendly defaults
    pub(crate) fn for_tests(output_directory: impl Into<PathBuf>) -> Self {
        Self {
            project_file: PathBuf::from("src/Foo/Foo.csproj"),
            output_directory: output_directory.into(),
            package_name: "Foo".to_string(),
            version: "1.0.0".to_string(),
            registry_source: "https://api.example.org/nuget".to_string(),
            registry_kind: RegistryKind::Default,
            source_name: "nuget-publisher".to_string(),
            credentials: Some(Credentials {
                principal: None,
                secret: SecretString::from("oy2-test-api-key-0001".to_string()),
            }),
            tag_on_publish: false,
            tag_template: "v*".to_string(),
            git_remote: "origin".to_string(),
            include_symbols: false,
            fail_if_version_exists: false,
            skip_build: false,
            http_timeout: Duration::from_secs(5),
        }
    }
}
