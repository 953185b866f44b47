//! Core traits and types for external command execution
//!
//! Every side-effecting call to the package, build and version-control
//! toolchains goes through the [`CommandRunner`] trait. Commands are modelled
//! as a program plus a structured argument list, never a shell string, so
//! paths and versions containing spaces are passed through intact.

use crate::security::{CommandError, SecureTokenManager};
use secrecy::{ExposeSecret, SecretString};
use std::fmt;

// ============================================================================
// Invocations
// ============================================================================

/// A single command-line argument
#[derive(Clone)]
pub enum CommandArg {
    /// Argument passed and displayed as-is
    Plain(String),
    /// Argument passed to the child but masked whenever displayed
    Secret(SecretString),
}

impl CommandArg {
    /// Value handed to the child process
    pub fn expose(&self) -> &str {
        match self {
            CommandArg::Plain(value) => value,
            CommandArg::Secret(secret) => secret.expose_secret(),
        }
    }
}

impl fmt::Debug for CommandArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl fmt::Display for CommandArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandArg::Plain(value) => write!(f, "{}", value),
            CommandArg::Secret(secret) => {
                write!(f, "{}", SecureTokenManager::mask_token(secret.expose_secret()))
            }
        }
    }
}

/// Program plus argument list for one external command
#[derive(Debug, Clone)]
pub struct CommandInvocation {
    pub program: String,
    pub args: Vec<CommandArg>,
}

impl CommandInvocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append a plain argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(CommandArg::Plain(arg.into()));
        self
    }

    /// Append several plain arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args
            .extend(args.into_iter().map(|a| CommandArg::Plain(a.into())));
        self
    }

    /// Append a secret argument (masked in logs and errors)
    pub fn secret_arg(mut self, secret: SecretString) -> Self {
        self.args.push(CommandArg::Secret(secret));
        self
    }

    /// Arguments as the child process sees them
    pub fn exposed_args(&self) -> Vec<&str> {
        self.args.iter().map(CommandArg::expose).collect()
    }
}

impl fmt::Display for CommandInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

// ============================================================================
// Results
// ============================================================================

/// How child output is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// stdout and stderr are buffered and returned
    Captured,
    /// Child stdout and stderr are forwarded live to the parent's stderr;
    /// only stderr is returned
    Streamed,
}

/// Output of a command that exited successfully
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
    /// Empty in [`OutputMode::Streamed`]
    pub stdout: String,
    pub stderr: String,
}

// ============================================================================
// Command Runner Trait
// ============================================================================

/// Executes external commands on behalf of the publishing pipeline
///
/// Implementations must report a nonzero exit status or a launch failure as
/// [`CommandError::Failed`]; output content is never interpreted here.
pub trait CommandRunner: Send + Sync {
    fn run(
        &self,
        invocation: &CommandInvocation,
        mode: OutputMode,
    ) -> Result<CommandOutput, CommandError>;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_display_masks_secrets() {
        let invocation = CommandInvocation::new("dotnet")
            .args(["nuget", "push", "Foo.1.0.0.nupkg", "--api-key"])
            .secret_arg(SecretString::from("oy2abcdefghijklmnop".to_string()));

        let display = invocation.to_string();
        assert_eq!(display, "dotnet nuget push Foo.1.0.0.nupkg --api-key oy2...nop");
        assert!(!format!("{:?}", invocation).contains("oy2abcdefghijklmnop"));
    }

    #[test]
    fn test_exposed_args_keep_secret_value() {
        let invocation = CommandInvocation::new("dotnet")
            .arg("--password")
            .secret_arg(SecretString::from("hunter2".to_string()));

        assert_eq!(invocation.exposed_args(), vec!["--password", "hunter2"]);
    }

    #[test]
    fn test_arguments_with_spaces_stay_whole() {
        let invocation = CommandInvocation::new("dotnet")
            .arg("pack")
            .arg("src/My Project/My Project.csproj");

        assert_eq!(invocation.args.len(), 2);
        assert_eq!(
            invocation.exposed_args()[1],
            "src/My Project/My Project.csproj"
        );
    }
}
