//! Orchestration layer for package publishing
//!
//! This module provides the run pipeline: artifact discovery, the
//! build/pack/push executor, tagging, pipeline outputs and the top-level
//! orchestrator that ties them to the state machine.

pub mod artifacts;
pub mod orchestrator;
pub mod outputs;
pub mod package_publisher;
pub mod tag_publisher;

// Re-export main types for convenience
pub use artifacts::{ArtifactKind, BuildArtifact};
pub use orchestrator::{Orchestrator, RunReport};
pub use outputs::OutputLine;
pub use package_publisher::{PublishExecutor, PublishOutcome, PublishStatus, SkipReason};
pub use tag_publisher::{TagPublisher, render_tag};
