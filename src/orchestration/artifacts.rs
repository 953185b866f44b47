//! Package files produced by `dotnet pack`

use crate::core::error::PublishError;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

pub const PRIMARY_EXTENSION: &str = "nupkg";
pub const SYMBOLS_EXTENSION: &str = "snupkg";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ArtifactKind {
    Primary,
    Symbols,
}

impl ArtifactKind {
    /// Classify a file by extension; `None` for anything that is not a package
    pub fn classify(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case(PRIMARY_EXTENSION) => Some(Self::Primary),
            Some(ext) if ext.eq_ignore_ascii_case(SYMBOLS_EXTENSION) => Some(Self::Symbols),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildArtifact {
    pub path: PathBuf,
    pub kind: ArtifactKind,
}

impl BuildArtifact {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

fn package_files(directory: &Path) -> Result<Vec<BuildArtifact>, PublishError> {
    let mut artifacts = Vec::new();

    for entry in WalkDir::new(directory).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| PublishError::ArtifactIo {
            path: directory.to_path_buf(),
            source: e.into(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(kind) = ArtifactKind::classify(entry.path()) {
            artifacts.push(BuildArtifact {
                path: entry.into_path(),
                kind,
            });
        }
    }

    Ok(artifacts)
}

/// Delete package files left over from an earlier run
///
/// A missing directory has nothing to clean. Returns the number of files removed.
pub fn clean_stale_artifacts(directory: &Path) -> Result<usize, PublishError> {
    if !directory.exists() {
        return Ok(0);
    }

    let stale = package_files(directory)?;
    for artifact in &stale {
        debug!(path = %artifact.path.display(), "removing stale package");
        std::fs::remove_file(&artifact.path).map_err(|source| PublishError::ArtifactIo {
            path: artifact.path.clone(),
            source,
        })?;
    }

    Ok(stale.len())
}

/// Package files in `directory`, primaries first, each group ordered by file name
pub fn discover_artifacts(directory: &Path) -> Result<Vec<BuildArtifact>, PublishError> {
    if !directory.is_dir() {
        return Err(PublishError::NoArtifactsProduced {
            directory: directory.to_path_buf(),
        });
    }

    let mut artifacts = package_files(directory)?;
    artifacts.sort_by(|a, b| a.kind.cmp(&b.kind).then_with(|| a.path.cmp(&b.path)));
    Ok(artifacts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &TempDir, name: &str) {
        fs::write(dir.path().join(name), b"pkg").unwrap();
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            ArtifactKind::classify(Path::new("Foo.1.0.0.nupkg")),
            Some(ArtifactKind::Primary)
        );
        assert_eq!(
            ArtifactKind::classify(Path::new("Foo.1.0.0.snupkg")),
            Some(ArtifactKind::Symbols)
        );
        assert_eq!(ArtifactKind::classify(Path::new("Foo.csproj")), None);
        assert_eq!(ArtifactKind::classify(Path::new("nupkg")), None);
    }

    #[test]
    fn test_discover_orders_primary_first() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "Foo.1.0.0.snupkg");
        touch(&dir, "Foo.1.0.0.nupkg");
        touch(&dir, "readme.md");

        let artifacts = discover_artifacts(dir.path()).unwrap();

        assert_eq!(artifacts.len(), 2);
        assert_eq!(artifacts[0].kind, ArtifactKind::Primary);
        assert_eq!(artifacts[0].file_name(), "Foo.1.0.0.nupkg");
        assert_eq!(artifacts[1].kind, ArtifactKind::Symbols);
    }

    #[test]
    fn test_discover_ignores_nested_packages() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("bin")).unwrap();
        fs::write(dir.path().join("bin").join("Old.0.1.0.nupkg"), b"pkg").unwrap();

        assert!(discover_artifacts(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_discover_missing_directory() {
        let dir = TempDir::new().unwrap();
        let error = discover_artifacts(&dir.path().join("out")).unwrap_err();

        assert_eq!(error.code(), "NO_ARTIFACTS_PRODUCED");
    }

    #[test]
    fn test_clean_stale_artifacts() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "Foo.0.9.0.nupkg");
        touch(&dir, "Foo.0.9.0.snupkg");
        touch(&dir, "Foo.csproj");

        assert_eq!(clean_stale_artifacts(dir.path()).unwrap(), 2);
        assert!(dir.path().join("Foo.csproj").exists());
        assert!(discover_artifacts(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_clean_missing_directory() {
        let dir = TempDir::new().unwrap();
        assert_eq!(clean_stale_artifacts(&dir.path().join("out")).unwrap(), 0);
    }
}
