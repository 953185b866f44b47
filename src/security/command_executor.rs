//! SafeCommandExecutor: whitelisted command execution for the publish pipeline
//!
//! # Security Features
//!
//! - **Whitelist-based validation**: Only the dotnet and git toolchains can execute
//! - **Injection prevention**: Uses `std::process::Command` which prevents shell injection
//! - **Argument sanitization**: Arguments passed as Vec, never interpolated into shell strings
//! - **Secret masking**: Secret arguments are masked in logs and error messages
//! - **Working directory validation**: Validates existence before execution
//!
//! # Example
//!
//! ```rust,no_run
//! use nuget_publisher::{CommandInvocation, CommandRunner, OutputMode, SafeCommandExecutor};
//!
//! let executor = SafeCommandExecutor::new(std::env::temp_dir()).unwrap();
//! let output = executor
//!     .run(&CommandInvocation::new("git").arg("--version"), OutputMode::Captured)
//!     .unwrap();
//! println!("{}", output.stdout);
//! ```

use crate::core::traits::{CommandInvocation, CommandOutput, CommandRunner, OutputMode};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{ChildStderr, Command, Stdio};
use thiserror::Error;
use tracing::{debug, info};

/// Allowed commands whitelist for security.
///
/// Only these commands can be executed via SafeCommandExecutor.
const ALLOWED_COMMANDS: &[&str] = &["dotnet", "git"];

/// Errors that can occur during command execution
#[derive(Error, Debug)]
pub enum CommandError {
    /// Command is not in the allowed whitelist
    #[error("Command '{0}' is not in the allowed whitelist")]
    CommandNotAllowed(String),

    /// Working directory does not exist or is not accessible
    #[error("Working directory does not exist: {0}")]
    InvalidWorkingDirectory(PathBuf),

    /// Command could not be launched or exited with a nonzero status
    #[error("Calling '{command}' resulted in {}: {stderr}", exit_code.map(|c| c.to_string()).unwrap_or_else(|| "no exit code".to_string()))]
    Failed {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },
}

/// Safe command executor with security controls
///
/// This struct provides a secure way to execute external commands with:
/// - Whitelist validation
/// - Working directory control
/// - Injection prevention through `std::process::Command`
#[derive(Debug)]
pub struct SafeCommandExecutor {
    /// Working directory where commands will be executed
    working_dir: PathBuf,
}

impl SafeCommandExecutor {
    /// Create a new SafeCommandExecutor with working directory validation.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::InvalidWorkingDirectory` if the directory does not exist.
    pub fn new<P: AsRef<Path>>(working_dir: P) -> Result<Self, CommandError> {
        let working_dir = working_dir.as_ref().to_path_buf();

        if !working_dir.exists() {
            return Err(CommandError::InvalidWorkingDirectory(working_dir));
        }

        Ok(Self { working_dir })
    }

    /// Directory commands run in
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }
}

impl CommandRunner for SafeCommandExecutor {
    fn run(
        &self,
        invocation: &CommandInvocation,
        mode: OutputMode,
    ) -> Result<CommandOutput, CommandError> {
        // Whitelist validation: Only pre-approved commands
        if !ALLOWED_COMMANDS.contains(&invocation.program.as_str()) {
            return Err(CommandError::CommandNotAllowed(invocation.program.clone()));
        }

        let rendered = invocation.to_string();
        info!(command = %rendered, ?mode, "executing");

        let mut command = Command::new(&invocation.program);
        command
            .args(invocation.exposed_args())
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stderr(Stdio::piped());

        let launch_failure = |e: std::io::Error| CommandError::Failed {
            command: rendered.clone(),
            exit_code: None,
            stderr: e.to_string(),
        };

        let (status, stdout, stderr) = match mode {
            OutputMode::Captured => {
                let output = command
                    .stdout(Stdio::piped())
                    .output()
                    .map_err(launch_failure)?;
                (
                    output.status,
                    String::from_utf8_lossy(&output.stdout).to_string(),
                    String::from_utf8_lossy(&output.stderr).to_string(),
                )
            }
            OutputMode::Streamed => {
                // stdout stays reserved for pipeline output lines
                let mut child = command
                    .stdout(Stdio::from(std::io::stderr()))
                    .spawn()
                    .map_err(launch_failure)?;
                let stderr = child
                    .stderr
                    .take()
                    .map(forward_lines)
                    .unwrap_or_default();
                let status = child.wait().map_err(launch_failure)?;
                (status, String::new(), stderr)
            }
        };

        if !status.success() {
            return Err(CommandError::Failed {
                command: rendered,
                exit_code: status.code(),
                stderr,
            });
        }

        debug!(command = %rendered, stdout = %stdout, "result");

        Ok(CommandOutput {
            exit_code: status.code().unwrap_or(0),
            stdout,
            stderr,
        })
    }
}

/// Copy a child's stderr to ours line by line as it arrives, keeping a copy
fn forward_lines(pipe: ChildStderr) -> String {
    let mut parent = std::io::stderr();
    let mut collected = String::new();

    for chunk in BufReader::new(pipe).split(b'\n') {
        let Ok(mut line) = chunk else { break };
        line.push(b'\n');
        let _ = parent.write_all(&line);
        collected.push_str(&String::from_utf8_lossy(&line));
    }

    collected
}
