//! Version-control tag for a published version

use crate::core::error::PublishError;
use crate::core::traits::{CommandInvocation, CommandRunner, OutputMode};
use std::sync::Arc;
use tracing::info;

/// Placeholder replaced by the version in tag templates
pub const TAG_PLACEHOLDER: char = '*';

/// Substitute `version` for the first placeholder in `template`
pub fn render_tag(template: &str, version: &str) -> String {
    template.replacen(TAG_PLACEHOLDER, version, 1)
}

pub struct TagPublisher {
    runner: Arc<dyn CommandRunner>,
    template: String,
    remote: String,
}

impl TagPublisher {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        template: impl Into<String>,
        remote: impl Into<String>,
    ) -> Self {
        Self {
            runner,
            template: template.into(),
            remote: remote.into(),
        }
    }

    /// Create the tag for `version` at HEAD and push it
    ///
    /// An existing tag fails the `git tag` call and is returned as
    /// [`PublishError::CommandFailed`].
    pub fn tag(&self, version: &str) -> Result<String, PublishError> {
        let tag = render_tag(&self.template, version);
        info!(tag = %tag, "creating tag");

        self.runner.run(
            &CommandInvocation::new("git").arg("tag").arg(tag.clone()),
            OutputMode::Captured,
        )?;
        self.runner.run(
            &CommandInvocation::new("git")
                .arg("push")
                .arg(self.remote.clone())
                .arg(tag.clone()),
            OutputMode::Captured,
        )?;

        Ok(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::fake::ScriptedRunner;

    #[test]
    fn test_render_tag() {
        assert_eq!(render_tag("release-*", "2.3.0"), "release-2.3.0");
        assert_eq!(render_tag("v*", "1.0.0-beta.1"), "v1.0.0-beta.1");
        assert_eq!(render_tag("*-*", "1.0.0"), "1.0.0-*");
    }

    #[test]
    fn test_tag_creates_and_pushes() {
        let runner = Arc::new(ScriptedRunner::new());
        let publisher = TagPublisher::new(runner.clone(), "release-*", "upstream");

        let tag = publisher.tag("2.3.0").unwrap();

        assert_eq!(tag, "release-2.3.0");
        assert_eq!(
            runner.command_lines(),
            vec!["git tag release-2.3.0", "git push upstream release-2.3.0"]
        );
    }

    #[test]
    fn test_existing_tag_is_fatal() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.reply_failure("git tag", 128, "fatal: tag 'v1.0.0' already exists");
        let publisher = TagPublisher::new(runner.clone(), "v*", "origin");

        let error = publisher.tag("1.0.0").unwrap_err();

        assert!(error.to_string().contains("already exists"));
        assert_eq!(runner.calls().len(), 1);
    }
}
