//! nuget-publisher CLI
//!
//! Publishes a NuGet package version if the registry does not have it yet

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use nuget_publisher::core::config::{PublishConfig, RegistryConfig, TagConfig, VersionConfig};
use nuget_publisher::orchestration::outputs::{self, OutputLine};
use nuget_publisher::{
    ConfigLoadOptions, ConfigLoader, Orchestrator, PublishError, RegistryKind,
    SafeCommandExecutor, SecureTokenManager,
};
use std::io;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::{Instrument, info, info_span};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Publish a NuGet package version once
#[derive(Parser)]
#[command(name = "nuget-publisher")]
#[command(version)]
#[command(about = "Publish a NuGet package version if it is not in the registry yet", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: .nuget-publish.yaml in the working directory)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Directory commands run in and relative paths resolve against
    #[arg(long, global = true, value_name = "DIR")]
    working_dir: Option<PathBuf>,

    /// Log output format (logs go to stderr)
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the registry, then build, pack, push and optionally tag
    Publish(RequestArgs),

    /// Only check whether the version is already published
    Check(RequestArgs),
}

/// Overrides for the file and environment configuration
#[derive(Args)]
struct RequestArgs {
    /// Project file to build and pack
    #[arg(long)]
    project_file: Option<String>,

    /// Directory packages are written to
    #[arg(long)]
    output_folder: Option<String>,

    /// Push packages already in the output folder without building
    #[arg(long)]
    no_build: bool,

    /// Package id (default: project file name)
    #[arg(long)]
    package_name: Option<String>,

    /// Version to publish, skips extraction from the version file
    #[arg(long = "version-static")]
    version_static: Option<String>,

    /// File the version is extracted from (default: project file)
    #[arg(long)]
    version_file: Option<String>,

    /// Pattern whose first capture group is the version
    #[arg(long)]
    version_regex: Option<String>,

    /// Registry base URL
    #[arg(long)]
    source: Option<String>,

    /// Registry kind (default: inferred from the source URL)
    #[arg(long, value_parser = parse_registry_kind)]
    registry_kind: Option<RegistryKind>,

    /// Name of the package-manager source entry
    #[arg(long)]
    source_name: Option<String>,

    /// User for GitHub Packages registration
    #[arg(long)]
    github_user: Option<String>,

    /// Existence check timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Create and push a git tag after publishing
    #[arg(long)]
    tag_commit: bool,

    /// Tag template, `*` is replaced by the version
    #[arg(long)]
    tag_format: Option<String>,

    /// Remote the tag is pushed to
    #[arg(long)]
    tag_remote: Option<String>,

    /// Pack and push the symbols package
    #[arg(long)]
    include_symbols: bool,

    /// Fail instead of skipping when the version already exists
    #[arg(long)]
    fail_if_version_exists: bool,
}

fn parse_registry_kind(value: &str) -> Result<RegistryKind, String> {
    RegistryKind::parse(value).ok_or_else(|| format!("unknown registry kind '{}'", value))
}

impl RequestArgs {
    /// Only flags given on the command line override lower layers
    fn into_config(self) -> PublishConfig {
        let flag = |set: bool| set.then_some(true);

        PublishConfig {
            project_file: self.project_file,
            output_folder: self.output_folder,
            no_build: flag(self.no_build),
            package_name: self.package_name,
            version: Some(VersionConfig {
                static_version: self.version_static,
                file: self.version_file,
                regex: self.version_regex,
            }),
            registry: Some(RegistryConfig {
                source: self.source,
                kind: self.registry_kind,
                source_name: self.source_name,
                user: self.github_user,
                timeout_secs: self.timeout_secs,
            }),
            tag: Some(TagConfig {
                commit: flag(self.tag_commit),
                format: self.tag_format,
                remote: self.tag_remote,
            }),
            include_symbols: flag(self.include_symbols),
            fail_if_version_exists: flag(self.fail_if_version_exists),
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let span = info_span!("publish_run", run_id = %Uuid::new_v4());
    let result = run(cli).instrument(span).await;

    if let Err(e) = result {
        if let Some(publish_error) = e.downcast_ref::<PublishError>() {
            for action in publish_error.suggested_actions() {
                info!(code = publish_error.code(), "hint: {}", action);
            }
        }
        let message = SecureTokenManager::new().mask_tokens_in_string(&e.to_string());
        println!("::error::{}", message);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let working_dir = match cli.working_dir {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    let (args, check_only) = match cli.command {
        Commands::Publish(args) => (args, false),
        Commands::Check(args) => (args, true),
    };

    let request = ConfigLoader::load(ConfigLoadOptions {
        working_dir: working_dir.clone(),
        config_file: cli.config,
        cli_args: Some(args.into_config()),
        env: std::env::vars().collect(),
    })
    .await?;

    let runner = Arc::new(SafeCommandExecutor::new(&working_dir)?);
    let mut orchestrator = Orchestrator::new(runner, request.http_timeout)?;
    let github_output = std::env::var_os("GITHUB_OUTPUT")
        .filter(|path| !path.is_empty())
        .map(PathBuf::from);

    if check_only {
        let exists = orchestrator.check_only(&request).await?;
        info!(version = %request.version, exists, "version check finished");
        outputs::emit(
            &[OutputLine::new(outputs::VERSION_EXISTS, exists.to_string())],
            &mut io::stdout().lock(),
            github_output.as_deref(),
        )?;
        return Ok(());
    }

    // Lines recorded before a failure still reach the pipeline
    let result = orchestrator.run(&request).await;
    outputs::emit(
        orchestrator.outputs(),
        &mut io::stdout().lock(),
        github_output.as_deref(),
    )?;
    let report = result?;
    info!(
        state = ?report.final_state,
        status = ?report.status,
        duration_ms = report.duration_ms,
        "publish run finished"
    );

    Ok(())
}
