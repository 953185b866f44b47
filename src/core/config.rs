//! Configuration structures and types for nuget-publisher
//!
//! This module provides type-safe configuration management with serde support.
//! Every layer (file, environment, CLI) produces a [`PublishConfig`]; layers
//! are merged field by field by the config loader.

use crate::core::request::RegistryKind;
use serde::{Deserialize, Serialize};

/// Default registry base URL
pub const DEFAULT_NUGET_SOURCE: &str = "https://api.nuget.org";

/// Default version extraction pattern (first capture group is the version)
pub const DEFAULT_VERSION_REGEX: &str = r"^\s*<Version>(.*)</Version>\s*$";

/// Default tag template
pub const DEFAULT_TAG_FORMAT: &str = "v*";

/// Default package-manager source name
pub const DEFAULT_SOURCE_NAME: &str = "nuget-publisher";

/// Default timeout for the registry existence check, in seconds
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Root configuration object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PublishConfig {
    /// Project file to build and pack
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_file: Option<String>,

    /// Directory packages are written to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_folder: Option<String>,

    /// Skip build and pack, push what is already in the output folder
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_build: Option<bool>,

    /// Package id (default: project file name without extension)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_name: Option<String>,

    /// Version settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<VersionConfig>,

    /// Registry settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry: Option<RegistryConfig>,

    /// Git tagging settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<TagConfig>,

    /// Push the symbols package alongside the primary package
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_symbols: Option<bool>,

    /// Fail instead of skipping when the version is already published
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fail_if_version_exists: Option<bool>,
}

/// Where the package version comes from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct VersionConfig {
    /// Version used verbatim (wins over file extraction)
    #[serde(skip_serializing_if = "Option::is_none", rename = "static")]
    pub static_version: Option<String>,

    /// File to extract the version from (default: project file)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Pattern whose first capture group is the version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
}

/// Registry connection settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct RegistryConfig {
    /// Registry base URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Registry kind (default: inferred from the source URL)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<RegistryKind>,

    /// Name of the package-manager source entry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,

    /// Principal used for credential-bearing registration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// Existence check timeout in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// Git tag settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TagConfig {
    /// Create and push a tag after a successful publish
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<bool>,

    /// Tag template, `*` is replaced by the version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Remote the tag is pushed to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,
}
