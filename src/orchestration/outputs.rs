//! Pipeline output lines
//!
//! Results are written to stdout as `::set-output name=KEY::value` and, when
//! the runner exposes a `GITHUB_OUTPUT` file, appended there as `KEY=value`.

use super::package_publisher::PublishOutcome;
use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub const VERSION: &str = "VERSION";
pub const PACKAGE_NAME: &str = "PACKAGE_NAME";
pub const PACKAGE_PATH: &str = "PACKAGE_PATH";
pub const SYMBOLS_PACKAGE_NAME: &str = "SYMBOLS_PACKAGE_NAME";
pub const SYMBOLS_PACKAGE_PATH: &str = "SYMBOLS_PACKAGE_PATH";
pub const VERSION_EXISTS: &str = "VERSION_EXISTS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    pub key: &'static str,
    pub value: String,
}

impl OutputLine {
    pub fn new(key: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

impl fmt::Display for OutputLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "::set-output name={}::{}", self.key, self.value)
    }
}

fn resolved(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Output lines for a pushed package and its symbols package
pub fn package_outputs(outcome: &PublishOutcome) -> Vec<OutputLine> {
    let mut lines = vec![
        OutputLine::new(PACKAGE_NAME, outcome.package_file_name()),
        OutputLine::new(
            PACKAGE_PATH,
            resolved(&outcome.package_path).display().to_string(),
        ),
    ];

    if let (Some(name), Some(path)) = (
        outcome.symbols_file_name(),
        outcome.symbols_package_path.as_deref(),
    ) {
        lines.push(OutputLine::new(SYMBOLS_PACKAGE_NAME, name));
        lines.push(OutputLine::new(
            SYMBOLS_PACKAGE_PATH,
            resolved(path).display().to_string(),
        ));
    }

    lines
}

/// Write `lines` to `out`, one per line, and mirror them into `github_output`
pub fn emit<W: Write>(
    lines: &[OutputLine],
    out: &mut W,
    github_output: Option<&Path>,
) -> io::Result<()> {
    for line in lines {
        writeln!(out, "{}", line)?;
    }
    out.flush()?;

    if let Some(path) = github_output {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        for line in lines {
            writeln!(file, "{}={}", line.key, line.value)?;
        }
    }

    Ok(())
}
