//! Orchestrator - top-level publish run
//!
//! Drives one run through the state machine:
//! - Validating: request sanity checks
//! - CheckingVersion: registry lookup, skip or fail on an existing version
//! - Publishing: build, pack and push through [`PublishExecutor`]
//! - Tagging: optional version-control tag through [`TagPublisher`]

use super::outputs::{self, OutputLine};
use super::package_publisher::{PublishExecutor, PublishStatus, SkipReason};
use super::tag_publisher::{TAG_PLACEHOLDER, TagPublisher};
use crate::core::error::PublishError;
use crate::core::request::PublishRequest;
use crate::core::state_machine::{PublishState, PublishStateMachine};
use crate::core::traits::CommandRunner;
use crate::registry::{RegistryClient, VersionCheckResult};
use crate::validation::validate_version;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of a run that ended in `Done` or `Skipped`
#[derive(Debug, Clone)]
pub struct RunReport {
    pub final_state: PublishState,
    pub status: PublishStatus,
    pub tag: Option<String>,
    /// Pipeline output lines, empty unless something was pushed
    pub outputs: Vec<OutputLine>,
    pub duration_ms: i64,
}

pub struct Orchestrator {
    runner: Arc<dyn CommandRunner>,
    registry: Arc<RegistryClient>,
    executor: PublishExecutor,
    state_machine: PublishStateMachine,
    outputs: Vec<OutputLine>,
}

impl Orchestrator {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        http_timeout: std::time::Duration,
    ) -> Result<Self, PublishError> {
        let registry = Arc::new(RegistryClient::new(runner.clone(), http_timeout)?);
        let executor = PublishExecutor::new(runner.clone(), registry.clone());

        Ok(Self {
            runner,
            registry,
            executor,
            state_machine: PublishStateMachine::new(),
            outputs: Vec::new(),
        })
    }

    /// State of the most recent run
    pub fn state(&self) -> PublishState {
        self.state_machine.get_state()
    }

    pub fn state_machine(&self) -> &PublishStateMachine {
        &self.state_machine
    }

    /// Output lines of the most recent run, including a failed one
    ///
    /// Package lines are recorded as soon as the push succeeds, so they
    /// survive a failure while tagging.
    pub fn outputs(&self) -> &[OutputLine] {
        &self.outputs
    }

    /// Run the full pipeline for `request`
    ///
    /// Any error leaves the state machine in `Failed`.
    pub async fn run(&mut self, request: &PublishRequest) -> Result<RunReport, PublishError> {
        self.state_machine = PublishStateMachine::new();
        self.outputs.clear();

        let result = self.execute(request).await;
        if let Err(e) = &result {
            self.state_machine.fail(&e.to_string());
        }
        debug!(history = %self.state_machine.get_history(), "run finished");

        result
    }

    /// Validate and look the version up without publishing
    ///
    /// Returns whether the version already exists in the registry.
    pub async fn check_only(&mut self, request: &PublishRequest) -> Result<bool, PublishError> {
        self.state_machine = PublishStateMachine::new();
        self.outputs.clear();

        let result = self.check(request).await;
        if let Err(e) = &result {
            self.state_machine.fail(&e.to_string());
        }

        result
    }

    async fn check(&mut self, request: &PublishRequest) -> Result<bool, PublishError> {
        validate_request(request)?;
        self.advance(PublishState::CheckingVersion);
        self.lookup(request).await
    }

    async fn execute(&mut self, request: &PublishRequest) -> Result<RunReport, PublishError> {
        info!(
            package = %request.package_name,
            version = %request.version,
            source = %request.registry_source,
            kind = %request.registry_kind,
            "starting publish run"
        );
        validate_request(request)?;

        self.advance(PublishState::CheckingVersion);
        if self.lookup(request).await? {
            if request.fail_if_version_exists {
                return Err(PublishError::VersionAlreadyExists {
                    package: request.package_name.clone(),
                    version: request.version.clone(),
                });
            }
            info!(version = %request.version, "version already exists, nothing to publish");
            self.advance(PublishState::Skipped);
            return Ok(self.report(PublishStatus::Skipped(SkipReason::VersionExists), None));
        }

        info!(version = %request.version, package = %request.package_name, "found new version");
        self.advance(PublishState::Publishing);
        let status = self.executor.publish(request)?;

        let PublishStatus::Published(outcome) = &status else {
            self.advance(PublishState::Done);
            return Ok(self.report(status.clone(), None));
        };
        self.outputs = outputs::package_outputs(outcome);

        let tag = if request.tag_on_publish {
            self.advance(PublishState::Tagging);
            let publisher = TagPublisher::new(
                self.runner.clone(),
                request.tag_template.clone(),
                request.git_remote.clone(),
            );
            let tag = publisher.tag(&outcome.pushed_version)?;
            self.outputs.push(OutputLine::new(outputs::VERSION, tag.clone()));
            Some(tag)
        } else {
            None
        };

        self.advance(PublishState::Done);
        Ok(self.report(status.clone(), tag))
    }

    /// `true` when the version is already published
    async fn lookup(&self, request: &PublishRequest) -> Result<bool, PublishError> {
        match self.registry.version_exists(request).await? {
            VersionCheckResult::Exists => Ok(true),
            VersionCheckResult::NotFound => Ok(false),
            VersionCheckResult::RegistryError { kind, message } => {
                Err(PublishError::RegistryError { kind, message })
            }
        }
    }

    fn advance(&mut self, to: PublishState) {
        if let Err(e) = self.state_machine.transition(to, None) {
            warn!(error = %e, "state machine rejected transition");
        }
    }

    fn report(&self, status: PublishStatus, tag: Option<String>) -> RunReport {
        RunReport {
            final_state: self.state_machine.get_state(),
            status,
            tag,
            outputs: self.outputs.clone(),
            duration_ms: self.state_machine.get_elapsed_time(),
        }
    }
}

/// Checks made in `Validating`
pub fn validate_request(request: &PublishRequest) -> Result<(), PublishError> {
    if request.package_name.trim().is_empty() {
        return Err(PublishError::config("PACKAGE_NAME", "package name is empty"));
    }
    if request.version.trim().is_empty() {
        return Err(PublishError::config("VERSION_STATIC", "version is empty"));
    }
    if !(request.registry_source.starts_with("https://")
        || request.registry_source.starts_with("http://"))
    {
        return Err(PublishError::config(
            "NUGET_SOURCE",
            format!("'{}' is not an http(s) URL", request.registry_source),
        ));
    }
    if !request.skip_build && !request.project_file.is_file() {
        return Err(PublishError::config(
            "PROJECT_FILE_PATH",
            format!("project file not found: {}", request.project_file.display()),
        ));
    }
    if request.tag_on_publish && request.tag_template.matches(TAG_PLACEHOLDER).count() != 1 {
        return Err(PublishError::config(
            "TAG_FORMAT",
            format!(
                "tag format '{}' must contain exactly one '{}'",
                request.tag_template, TAG_PLACEHOLDER
            ),
        ));
    }

    validate_version(&request.version);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::fake::ScriptedRunner;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct Fixture {
        dir: TempDir,
        server: MockServer,
        runner: Arc<ScriptedRunner>,
    }

    impl Fixture {
        async fn new() -> Self {
            let dir = TempDir::new().unwrap();
            fs::write(dir.path().join("Foo.csproj"), "<Project />").unwrap();
            Self {
                dir,
                server: MockServer::start().await,
                runner: Arc::new(ScriptedRunner::new()),
            }
        }

        fn request(&self) -> PublishRequest {
            let mut request = PublishRequest::for_tests(self.dir.path());
            request.project_file = self.dir.path().join("Foo.csproj");
            request.registry_source = self.server.uri();
            request
        }

        async fn published_versions(&self, versions: &[&str]) {
            Mock::given(method("GET"))
                .and(path("/v3-flatcontainer/foo/index.json"))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_json(serde_json::json!({ "versions": versions })),
                )
                .mount(&self.server)
                .await;
        }

        async fn never_published(&self) {
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(404))
                .mount(&self.server)
                .await;
        }

        fn pack_output(&self, files: &[&str]) {
            for name in files {
                fs::write(self.dir.path().join(name), b"pkg").unwrap();
            }
        }

        fn orchestrator(&self) -> Orchestrator {
            Orchestrator::new(self.runner.clone(), Duration::from_secs(5)).unwrap()
        }
    }

    #[tokio::test]
    async fn test_existing_version_is_skipped() {
        let fixture = Fixture::new().await;
        fixture.published_versions(&["1.0.0"]).await;

        let report = fixture.orchestrator().run(&fixture.request()).await.unwrap();

        assert_eq!(report.final_state, PublishState::Skipped);
        assert_eq!(report.status, PublishStatus::Skipped(SkipReason::VersionExists));
        assert!(report.outputs.is_empty());
        assert!(fixture.runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_existing_version_strict_fails() {
        let fixture = Fixture::new().await;
        fixture.published_versions(&["1.0.0"]).await;
        let mut request = fixture.request();
        request.fail_if_version_exists = true;
        let mut orchestrator = fixture.orchestrator();

        let error = orchestrator.run(&request).await.unwrap_err();

        assert_eq!(error.code(), "VERSION_ALREADY_EXISTS");
        assert_eq!(orchestrator.state(), PublishState::Failed);
        assert!(fixture.runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_new_version_published_and_tagged() {
        let fixture = Fixture::new().await;
        fixture.published_versions(&["0.9.0"]).await;
        let mut request = fixture.request();
        request.skip_build = true;
        request.tag_on_publish = true;
        request.tag_template = "release-*".to_string();
        fixture.pack_output(&["Foo.1.0.0.nupkg"]);
        let mut orchestrator = fixture.orchestrator();

        let report = orchestrator.run(&request).await.unwrap();

        assert_eq!(report.final_state, PublishState::Done);
        assert_eq!(report.tag.as_deref(), Some("release-1.0.0"));
        assert!(report.outputs.contains(&OutputLine::new(outputs::VERSION, "release-1.0.0")));
        let states: Vec<PublishState> =
            orchestrator.state_machine().transitions().iter().map(|t| t.to).collect();
        assert_eq!(
            states,
            vec![
                PublishState::CheckingVersion,
                PublishState::Publishing,
                PublishState::Tagging,
                PublishState::Done
            ]
        );
    }

    #[tokio::test]
    async fn test_tag_failure_after_push_fails_run() {
        let fixture = Fixture::new().await;
        fixture.never_published().await;
        fixture.runner.reply_failure("git tag", 128, "fatal: tag 'v1.0.0' already exists");
        let mut request = fixture.request();
        request.skip_build = true;
        request.tag_on_publish = true;
        fixture.pack_output(&["Foo.1.0.0.nupkg"]);
        let mut orchestrator = fixture.orchestrator();

        let error = orchestrator.run(&request).await.unwrap_err();

        assert_eq!(error.code(), "COMMAND_FAILED");
        assert_eq!(orchestrator.state(), PublishState::Failed);
        let keys: Vec<&str> = orchestrator.outputs().iter().map(|l| l.key).collect();
        assert_eq!(keys, vec![outputs::PACKAGE_NAME, outputs::PACKAGE_PATH]);
        assert!(
            fixture
                .runner
                .command_lines()
                .iter()
                .any(|l| l.starts_with("dotnet nuget push"))
        );
    }

    #[tokio::test]
    async fn test_missing_credential_ends_done_without_push() {
        let fixture = Fixture::new().await;
        fixture.never_published().await;
        let mut request = fixture.request();
        request.credentials = None;
        request.tag_on_publish = true;

        let report = fixture.orchestrator().run(&request).await.unwrap();

        assert_eq!(report.final_state, PublishState::Done);
        assert_eq!(report.status, PublishStatus::Skipped(SkipReason::MissingCredential));
        assert_eq!(report.tag, None);
        assert!(fixture.runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_registry_error_fails_run() {
        let fixture = Fixture::new().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&fixture.server)
            .await;
        let mut orchestrator = fixture.orchestrator();

        let error = orchestrator.run(&fixture.request()).await.unwrap_err();

        assert_eq!(error.code(), "REGISTRY_ERROR");
        assert_eq!(orchestrator.state(), PublishState::Failed);
        assert!(orchestrator.state_machine().get_last_error().is_some());
    }

    #[tokio::test]
    async fn test_missing_project_file_fails_validation() {
        let fixture = Fixture::new().await;
        let mut request = fixture.request();
        request.project_file = fixture.dir.path().join("Missing.csproj");
        let mut orchestrator = fixture.orchestrator();

        let error = orchestrator.run(&request).await.unwrap_err();

        assert_eq!(error.code(), "CONFIGURATION_ERROR");
        assert_eq!(orchestrator.state(), PublishState::Failed);
        assert!(fixture.server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_check_only_reports_existence() {
        let fixture = Fixture::new().await;
        fixture.published_versions(&["1.0.0"]).await;
        let mut orchestrator = fixture.orchestrator();

        assert!(orchestrator.check_only(&fixture.request()).await.unwrap());
        assert_eq!(orchestrator.state(), PublishState::CheckingVersion);
        assert!(fixture.runner.calls().is_empty());
    }

    #[test]
    fn test_validate_tag_template() {
        let dir = TempDir::new().unwrap();
        let mut request = PublishRequest::for_tests(dir.path());
        request.skip_build = true;
        request.tag_on_publish = true;

        request.tag_template = "v*-*".to_string();
        assert!(validate_request(&request).is_err());

        request.tag_template = "release".to_string();
        assert!(validate_request(&request).is_err());

        request.tag_template = "v*".to_string();
        assert!(validate_request(&request).is_ok());
    }

    #[test]
    fn test_validate_source_url() {
        let dir = TempDir::new().unwrap();
        let mut request = PublishRequest::for_tests(dir.path());
        request.skip_build = true;
        request.registry_source = "api.nuget.org".to_string();

        let error = validate_request(&request).unwrap_err();
        assert!(error.to_string().contains("NUGET_SOURCE"));
    }
}
