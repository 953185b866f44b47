//! Version resolution and validation
//!
//! Extracts the package version from a file with a user-supplied pattern
//! and checks it against Semantic Versioning 2.0.0.
//!
//! # Example
//!
//! ```
//! use nuget_publisher::validation::VersionResolver;
//!
//! let resolver = VersionResolver::new(r"<Version>(.*)</Version>").unwrap();
//! let version = resolver.extract("<Version>1.2.3</Version>").unwrap();
//! assert_eq!(version, "1.2.3");
//! ```

use crate::core::error::PublishError;
use regex::{Regex, RegexBuilder};
use std::path::Path;
use tokio::fs;
use tracing::warn;

/// Extracts versions using the first capture group of a multi-line pattern
#[derive(Debug, Clone)]
pub struct VersionResolver {
    pattern: Regex,
}

impl VersionResolver {
    /// Compile the extraction pattern
    ///
    /// `^` and `$` match at line boundaries.
    pub fn new(pattern: &str) -> Result<Self, PublishError> {
        let pattern = RegexBuilder::new(pattern)
            .multi_line(true)
            .build()
            .map_err(|e| PublishError::config("VERSION_REGEX", e.to_string()))?;

        if pattern.captures_len() < 2 {
            return Err(PublishError::config(
                "VERSION_REGEX",
                "pattern must contain a capture group for the version",
            ));
        }

        Ok(Self { pattern })
    }

    /// Extract the version from text
    pub fn extract(&self, content: &str) -> Result<String, PublishError> {
        let version = self
            .pattern
            .captures(content)
            .and_then(|cap| cap.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| PublishError::config("VERSION_REGEX", "unable to extract version info"))?;

        validate_version(&version);
        Ok(version)
    }

    /// Read a file and extract the version from it
    pub async fn extract_from_file(&self, path: &Path) -> Result<String, PublishError> {
        if !path.exists() {
            return Err(PublishError::config(
                "VERSION_FILE_PATH",
                format!("version file {} not found", path.display()),
            ));
        }

        let content = fs::read_to_string(path).await.map_err(|e| {
            PublishError::config(
                "VERSION_FILE_PATH",
                format!("failed to read {}: {}", path.display(), e),
            )
        })?;

        self.extract(&content)
    }
}

/// Check a version against SemVer
///
/// NuGet also accepts four-part versions, so a mismatch is only a warning.
pub fn validate_version(version: &str) -> bool {
    let valid = semver::Version::parse(version).is_ok();
    if !valid {
        warn!(version, "version is not valid SemVer 2.0.0");
    }
    valid
}
