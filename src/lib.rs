//! nuget-publisher
//!
//! Publishes a NuGet package version once: checks the registry for the
//! version, then builds, packs, pushes and optionally tags it.
//!
//! ```no_run
//! use nuget_publisher::{CommandInvocation, CommandRunner, OutputMode, SafeCommandExecutor};
//!
//! let runner = SafeCommandExecutor::new(".").unwrap();
//! let output = runner
//!     .run(
//!         &CommandInvocation::new("dotnet").args(["nuget", "list", "source"]),
//!         OutputMode::Captured,
//!     )
//!     .unwrap();
//! println!("{}", output.stdout);
//! ```

pub mod core;
pub mod orchestration;
pub mod registry;
pub mod security;
pub mod validation;

pub use crate::core::*;
pub use orchestration::{
    Orchestrator, OutputLine, PublishExecutor, PublishOutcome, PublishStatus, RunReport,
    SkipReason, TagPublisher,
};
pub use registry::{RegistryClient, VersionCheckResult};
pub use security::{CommandError, SafeCommandExecutor, SecureTokenManager};
pub use validation::{VersionResolver, validate_version};
