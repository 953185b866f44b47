//! Configuration loader for nuget-publisher
//!
//! This module merges the configuration layers and resolves them into a
//! fully populated [`PublishRequest`].

use super::config::*;
use crate::core::error::PublishError;
use crate::core::request::{PublishRequest, RegistryKind};
use crate::security::SecureTokenManager;
use crate::validation::VersionResolver;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info};

/// Configuration file name looked up in the working directory
pub const CONFIG_FILENAME: &str = ".nuget-publish.yaml";

/// Configuration load options
#[derive(Debug, Clone)]
pub struct ConfigLoadOptions {
    /// Directory relative paths are resolved against
    pub working_dir: PathBuf,

    /// Explicit config file (default: `<working_dir>/.nuget-publish.yaml`)
    pub config_file: Option<PathBuf>,

    /// CLI arguments (highest priority)
    pub cli_args: Option<PublishConfig>,

    /// Environment variables
    pub env: HashMap<String, String>,
}

/// Configuration file loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from multiple sources with priority
    ///
    /// Priority (high to low):
    /// 1. CLI arguments
    /// 2. Environment variables (`INPUT_<NAME>`, then `<NAME>`)
    /// 3. Config file
    /// 4. Default values
    pub async fn load(options: ConfigLoadOptions) -> Result<PublishRequest, PublishError> {
        let mut configs: Vec<PublishConfig> = Vec::new();

        // 3. Config file
        let config_path = options
            .config_file
            .clone()
            .unwrap_or_else(|| options.working_dir.join(CONFIG_FILENAME));
        let explicit = options.config_file.is_some();
        if let Some(file_config) = Self::load_config_file(&config_path, explicit).await? {
            info!(path = %config_path.display(), "loaded config file");
            configs.push(file_config);
        }

        // 2. Environment variables
        configs.push(Self::load_env_config(&options.env)?);

        // 1. CLI arguments (highest priority)
        if let Some(cli_config) = options.cli_args {
            configs.push(cli_config);
        }

        let merged = Self::merge_configs(configs);
        debug!(config = ?merged, "merged configuration");

        Self::resolve(merged, &options.env, &options.working_dir).await
    }

    /// Load configuration from a YAML file
    ///
    /// A missing default file is not an error; a missing explicit file is.
    async fn load_config_file(
        file_path: &Path,
        explicit: bool,
    ) -> Result<Option<PublishConfig>, PublishError> {
        if !file_path.exists() {
            if explicit {
                return Err(PublishError::config(
                    "config",
                    format!("config file {} not found", file_path.display()),
                ));
            }
            return Ok(None);
        }

        let content = fs::read_to_string(file_path).await.map_err(|e| {
            PublishError::config("config", format!("failed to read config file: {}", e))
        })?;

        let config: PublishConfig = serde_yaml::from_str(&content).map_err(|e| {
            PublishError::config("config", format!("failed to parse YAML config: {}", e))
        })?;

        Ok(Some(config))
    }

    /// Look up `INPUT_<name>` first, then `<name>`; empty values count as unset
    fn env_value(env: &HashMap<String, String>, name: &str) -> Option<String> {
        [format!("INPUT_{}", name), name.to_string()]
            .iter()
            .filter_map(|key| env.get(key))
            .find(|value| !value.trim().is_empty())
            .cloned()
    }

    fn env_bool(env: &HashMap<String, String>, name: &str) -> Result<Option<bool>, PublishError> {
        match Self::env_value(env, name) {
            None => Ok(None),
            Some(raw) => parse_bool(&raw)
                .map(Some)
                .ok_or_else(|| PublishError::config(name, format!("expected true or false, got '{}'", raw))),
        }
    }

    /// Load configuration from environment variables
    fn load_env_config(env: &HashMap<String, String>) -> Result<PublishConfig, PublishError> {
        let kind = match Self::env_value(env, "REGISTRY_KIND") {
            None => None,
            Some(raw) => Some(RegistryKind::parse(&raw).ok_or_else(|| {
                PublishError::config(
                    "REGISTRY_KIND",
                    format!("expected default or github-packages, got '{}'", raw),
                )
            })?),
        };

        let timeout_secs = match Self::env_value(env, "HTTP_TIMEOUT_SECS") {
            None => None,
            Some(raw) => Some(raw.trim().parse::<u64>().map_err(|_| {
                PublishError::config("HTTP_TIMEOUT_SECS", format!("expected seconds, got '{}'", raw))
            })?),
        };

        let fail_if_exists = match Self::env_bool(env, "FAIL_IF_VERSION_EXISTS")? {
            Some(value) => Some(value),
            None => Self::env_bool(env, "THOW_ERROR_IF_VERSION_EXISTS")?,
        };

        Ok(PublishConfig {
            project_file: Self::env_value(env, "PROJECT_FILE_PATH"),
            output_folder: Self::env_value(env, "OUTPUT_FOLDER"),
            no_build: Self::env_bool(env, "NO_BUILD")?,
            package_name: Self::env_value(env, "PACKAGE_NAME"),
            version: Some(VersionConfig {
                static_version: Self::env_value(env, "VERSION_STATIC"),
                file: Self::env_value(env, "VERSION_FILE_PATH"),
                regex: Self::env_value(env, "VERSION_REGEX"),
            }),
            registry: Some(RegistryConfig {
                source: Self::env_value(env, "NUGET_SOURCE"),
                kind,
                source_name: Self::env_value(env, "SOURCE_NAME"),
                user: None,
                timeout_secs,
            }),
            tag: Some(TagConfig {
                commit: Self::env_bool(env, "TAG_COMMIT")?,
                format: Self::env_value(env, "TAG_FORMAT"),
                remote: None,
            }),
            include_symbols: Self::env_bool(env, "INCLUDE_SYMBOLS")?,
            fail_if_version_exists: fail_if_exists,
        })
    }

    /// Merge multiple configurations with priority (later wins)
    fn merge_configs(configs: Vec<PublishConfig>) -> PublishConfig {
        let mut result = PublishConfig::default();

        for config in configs {
            Self::merge_into(&mut result, config);
        }

        result
    }

    /// Merge source config into target
    fn merge_into(target: &mut PublishConfig, source: PublishConfig) {
        fn take<T>(target: &mut Option<T>, source: Option<T>) {
            if source.is_some() {
                *target = source;
            }
        }

        take(&mut target.project_file, source.project_file);
        take(&mut target.output_folder, source.output_folder);
        take(&mut target.no_build, source.no_build);
        take(&mut target.package_name, source.package_name);
        take(&mut target.include_symbols, source.include_symbols);
        take(&mut target.fail_if_version_exists, source.fail_if_version_exists);

        if let Some(source_version) = source.version {
            let target_version = target.version.get_or_insert_with(Default::default);
            take(&mut target_version.static_version, source_version.static_version);
            take(&mut target_version.file, source_version.file);
            take(&mut target_version.regex, source_version.regex);
        }

        if let Some(source_registry) = source.registry {
            let target_registry = target.registry.get_or_insert_with(Default::default);
            take(&mut target_registry.source, source_registry.source);
            take(&mut target_registry.kind, source_registry.kind);
            take(&mut target_registry.source_name, source_registry.source_name);
            take(&mut target_registry.user, source_registry.user);
            take(&mut target_registry.timeout_secs, source_registry.timeout_secs);
        }

        if let Some(source_tag) = source.tag {
            let target_tag = target.tag.get_or_insert_with(Default::default);
            take(&mut target_tag.commit, source_tag.commit);
            take(&mut target_tag.format, source_tag.format);
            take(&mut target_tag.remote, source_tag.remote);
        }
    }

    /// Apply defaults, resolve the version and build the request
    async fn resolve(
        config: PublishConfig,
        env: &HashMap<String, String>,
        working_dir: &Path,
    ) -> Result<PublishRequest, PublishError> {
        let version_config = config.version.unwrap_or_default();
        let registry = config.registry.unwrap_or_default();
        let tag = config.tag.unwrap_or_default();

        let project_file = config
            .project_file
            .map(|p| working_dir.join(p))
            .ok_or_else(|| PublishError::config("PROJECT_FILE_PATH", "project file path is required"))?;

        let package_name = match config.package_name {
            Some(name) => name,
            None => default_package_name(&project_file).ok_or_else(|| {
                PublishError::config(
                    "PACKAGE_NAME",
                    format!("cannot derive a package name from {}", project_file.display()),
                )
            })?,
        };

        let version = match version_config.static_version {
            Some(version) => version.trim().to_string(),
            None => {
                let version_file = version_config
                    .file
                    .map(|f| working_dir.join(f))
                    .unwrap_or_else(|| project_file.clone());
                let pattern = version_config
                    .regex
                    .unwrap_or_else(|| DEFAULT_VERSION_REGEX.to_string());
                VersionResolver::new(&pattern)?
                    .extract_from_file(&version_file)
                    .await?
            }
        };

        let source = registry
            .source
            .unwrap_or_else(|| DEFAULT_NUGET_SOURCE.to_string())
            .trim_end_matches('/')
            .to_string();
        let kind = registry.kind.unwrap_or_else(|| RegistryKind::detect(&source));

        let mut credentials = SecureTokenManager::from_env_map(env.clone()).credentials();
        if let (Some(credentials), Some(user)) = (credentials.as_mut(), registry.user) {
            credentials.principal = Some(user);
        }

        let request = PublishRequest {
            project_file,
            output_directory: working_dir.join(config.output_folder.unwrap_or_else(|| ".".to_string())),
            package_name,
            version,
            registry_source: source,
            registry_kind: kind,
            source_name: registry
                .source_name
                .unwrap_or_else(|| DEFAULT_SOURCE_NAME.to_string()),
            credentials,
            tag_on_publish: tag.commit.unwrap_or(false),
            tag_template: tag.format.unwrap_or_else(|| DEFAULT_TAG_FORMAT.to_string()),
            git_remote: tag.remote.unwrap_or_else(|| "origin".to_string()),
            include_symbols: config.include_symbols.unwrap_or(false),
            fail_if_version_exists: config.fail_if_version_exists.unwrap_or(false),
            skip_build: config.no_build.unwrap_or(false),
            http_timeout: Duration::from_secs(
                registry.timeout_secs.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
            ),
        };

        info!(
            package = %request.package_name,
            version = %request.version,
            source = %request.registry_source,
            kind = %request.registry_kind,
            "configuration resolved"
        );

        Ok(request)
    }
}

/// Parse `true` / `false` case-insensitively
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Project file name with its last extension removed (`Foo.Bar.csproj` -> `Foo.Bar`)
pub fn default_package_name(project_file: &Path) -> Option<String> {
    project_file
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .filter(|stem| !stem.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn options(dir: &TempDir, pairs: &[(&str, &str)]) -> ConfigLoadOptions {
        ConfigLoadOptions {
            working_dir: dir.path().to_path_buf(),
            config_file: None,
            cli_args: None,
            env: env(pairs),
        }
    }

    fn write_project(dir: &TempDir, version: &str) {
        std::fs::write(
            dir.path().join("Foo.Bar.csproj"),
            format!(
                "<Project>\n  <PropertyGroup>\n    <Version>{}</Version>\n  </PropertyGroup>\n</Project>\n",
                version
            ),
        )
        .unwrap();
    }

    #[tokio::test]
    async fn test_load_from_env_with_version_from_project() {
        let dir = TempDir::new().unwrap();
        write_project(&dir, "1.4.2");

        let request = ConfigLoader::load(options(
            &dir,
            &[("INPUT_PROJECT_FILE_PATH", "Foo.Bar.csproj"), ("NUGET_KEY", "oy2-key-value-123")],
        ))
        .await
        .unwrap();

        assert_eq!(request.package_name, "Foo.Bar");
        assert_eq!(request.version, "1.4.2");
        assert_eq!(request.registry_source, DEFAULT_NUGET_SOURCE);
        assert_eq!(request.registry_kind, RegistryKind::Default);
        assert_eq!(request.tag_template, "v*");
        assert_eq!(request.http_timeout, Duration::from_secs(30));
        assert_eq!(
            request.credentials.unwrap().secret.expose_secret(),
            "oy2-key-value-123"
        );
    }

    #[tokio::test]
    async fn test_static_version_wins() {
        let dir = TempDir::new().unwrap();
        write_project(&dir, "1.4.2");

        let request = ConfigLoader::load(options(
            &dir,
            &[("PROJECT_FILE_PATH", "Foo.Bar.csproj"), ("VERSION_STATIC", "9.9.9")],
        ))
        .await
        .unwrap();

        assert_eq!(request.version, "9.9.9");
        assert!(request.credentials.is_none());
    }

    #[tokio::test]
    async fn test_missing_version_match_is_configuration_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("Foo.csproj"), "<Project />").unwrap();

        let error = ConfigLoader::load(options(&dir, &[("PROJECT_FILE_PATH", "Foo.csproj")]))
            .await
            .unwrap_err();

        assert_eq!(error.code(), "CONFIGURATION_ERROR");
    }

    #[tokio::test]
    async fn test_invalid_bool_is_configuration_error() {
        let dir = TempDir::new().unwrap();
        write_project(&dir, "1.0.0");

        let error = ConfigLoader::load(options(
            &dir,
            &[("PROJECT_FILE_PATH", "Foo.Bar.csproj"), ("TAG_COMMIT", "yes")],
        ))
        .await
        .unwrap_err();

        assert!(error.to_string().contains("TAG_COMMIT"));
    }

    #[tokio::test]
    async fn test_github_source_detected_and_trimmed() {
        let dir = TempDir::new().unwrap();
        write_project(&dir, "1.0.0");

        let request = ConfigLoader::load(options(
            &dir,
            &[
                ("PROJECT_FILE_PATH", "Foo.Bar.csproj"),
                ("NUGET_SOURCE", "https://nuget.pkg.github.com/acme/"),
                ("NUGET_KEY", "ghp_abcdefghijklmnop"),
                ("GITHUB_ACTOR", "octocat"),
            ],
        ))
        .await
        .unwrap();

        assert_eq!(request.registry_source, "https://nuget.pkg.github.com/acme");
        assert_eq!(request.registry_kind, RegistryKind::GithubPackages);
        assert_eq!(
            request.credentials.unwrap().principal.as_deref(),
            Some("octocat")
        );
    }

    #[tokio::test]
    async fn test_legacy_fail_flag_spelling() {
        let dir = TempDir::new().unwrap();
        write_project(&dir, "1.0.0");

        let request = ConfigLoader::load(options(
            &dir,
            &[
                ("PROJECT_FILE_PATH", "Foo.Bar.csproj"),
                ("INPUT_THOW_ERROR_IF_VERSION_EXISTS", "true"),
            ],
        ))
        .await
        .unwrap();

        assert!(request.fail_if_version_exists);
    }

    #[tokio::test]
    async fn test_priority_cli_over_env_over_file() {
        let dir = TempDir::new().unwrap();
        write_project(&dir, "1.0.0");
        std::fs::write(
            dir.path().join(CONFIG_FILENAME),
            "projectFile: Foo.Bar.csproj\npackageName: FromFile\ntag:\n  format: file-*\n  commit: true\n",
        )
        .unwrap();

        let mut opts = options(&dir, &[("PACKAGE_NAME", "FromEnv"), ("TAG_FORMAT", "env-*")]);
        opts.cli_args = Some(PublishConfig {
            package_name: Some("FromCli".to_string()),
            ..Default::default()
        });

        let request = ConfigLoader::load(opts).await.unwrap();

        assert_eq!(request.package_name, "FromCli");
        assert_eq!(request.tag_template, "env-*");
        assert!(request.tag_on_publish);
    }

    #[tokio::test]
    async fn test_missing_explicit_config_file() {
        let dir = TempDir::new().unwrap();
        let mut opts = options(&dir, &[]);
        opts.config_file = Some(dir.path().join("missing.yaml"));

        let error = ConfigLoader::load(opts).await.unwrap_err();
        assert_eq!(error.code(), "CONFIGURATION_ERROR");
    }

    #[test]
    fn test_default_package_name() {
        assert_eq!(
            default_package_name(Path::new("src/Acme.Widgets/Acme.Widgets.csproj")),
            Some("Acme.Widgets".to_string())
        );
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" false "), Some(false));
        assert_eq!(parse_bool("1"), None);
    }
}
