//! Release configuration file and the immutable run context built from it.
//!
//! The file is JSON with camelCase keys. Optional sections fall back to the
//! defaults below; required values are checked once in [`ReleaseContext::from_config`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::conformance::auth::{Identity, LoginMethod};
use crate::error::{Error, Result};
use crate::utils::retry::RetryPolicy;

pub const DEFAULT_CONFIG_FILE: &str = "flowship.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseConfig {
    #[serde(default = "default_project_dir")]
    pub project_dir: String,
    #[serde(default)]
    pub image: String,
    #[serde(default = "default_dockerfile")]
    pub dockerfile: String,
    #[serde(default = "default_docker_bin")]
    pub docker_bin: String,
    #[serde(default = "default_service")]
    pub service: String,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub secret: SecretConfig,
    #[serde(default)]
    pub builder: BuilderConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub identities: Vec<IdentityConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteConfig {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub user: String,
    #[serde(default = "default_ssh_port")]
    pub port: u16,
    #[serde(default)]
    pub identity_file: Option<String>,
    #[serde(default)]
    pub work_dir: String,
}

/// Where the build-time secret lives on the remote host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretConfig {
    /// Path of the `key=value` file, relative to `remote.workDir` unless absolute.
    #[serde(default = "default_secret_file")]
    pub file: String,
    #[serde(default = "default_secret_key")]
    pub key: String,
    /// Build argument name; defaults to `key`.
    #[serde(default)]
    pub build_arg: Option<String>,
}

impl Default for SecretConfig {
    fn default() -> Self {
        Self {
            file: default_secret_file(),
            key: default_secret_key(),
            build_arg: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuilderConfig {
    #[serde(default)]
    pub registration_file: Option<String>,
    #[serde(default = "default_target_platform")]
    pub target_platform: String,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            registration_file: None,
            target_platform: default_target_platform(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_delay_secs")]
    pub delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_secs: default_retry_delay_secs(),
        }
    }
}

/// Timeouts for the remote channel and the HTTP probes.
///
/// `connectSecs` and `transferSecs` are passed to `ssh`/`scp` as
/// `ConnectTimeout`, so they bound connection setup only. A copy that stalls
/// after connecting is dropped by the `ServerAlive` keepalives instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeoutConfig {
    /// Connection setup for remote commands.
    #[serde(default = "default_connect_secs")]
    pub connect_secs: u64,
    /// Connection setup for archive uploads. Does not bound the copy itself.
    #[serde(default = "default_transfer_secs")]
    pub transfer_secs: u64,
    /// Whole-request timeout for each HTTP probe.
    #[serde(default = "default_probe_secs")]
    pub probe_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: default_connect_secs(),
            transfer_secs: default_transfer_secs(),
            probe_secs: default_probe_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfig {
    #[serde(default)]
    pub base_url: String,
    /// Token endpoint root; defaults to `{baseUrl}/gotrue`.
    #[serde(default)]
    pub auth_url: Option<String>,
    #[serde(default = "default_health_path")]
    pub health_path: String,
    #[serde(default = "default_health_expect")]
    pub health_expect: String,
    #[serde(default = "default_settle_secs")]
    pub settle_secs: u64,
    #[serde(default = "default_health_attempts")]
    pub health_attempts: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            auth_url: None,
            health_path: default_health_path(),
            health_expect: default_health_expect(),
            settle_secs: default_settle_secs(),
            health_attempts: default_health_attempts(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityConfig {
    pub name: String,
    pub method: LoginMethod,
    pub identifier: String,
    #[serde(default)]
    pub password: Option<String>,
    /// Environment variable holding the password.
    #[serde(default)]
    pub password_env: Option<String>,
}

// =============================================================================
// Default value functions
// =============================================================================

fn default_project_dir() -> String {
    ".".to_string()
}

fn default_dockerfile() -> String {
    "Dockerfile".to_string()
}

fn default_docker_bin() -> String {
    "docker".to_string()
}

fn default_service() -> String {
    "appflowy_cloud".to_string()
}

fn default_ssh_port() -> u16 {
    22
}

fn default_secret_file() -> String {
    ".env".to_string()
}

fn default_secret_key() -> String {
    "DATABASE_URL".to_string()
}

fn default_target_platform() -> String {
    "linux/amd64".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay_secs() -> u64 {
    5
}

fn default_connect_secs() -> u64 {
    30
}

fn default_transfer_secs() -> u64 {
    60
}

fn default_probe_secs() -> u64 {
    15
}

fn default_health_path() -> String {
    "/health".to_string()
}

fn default_health_expect() -> String {
    "OK".to_string()
}

fn default_settle_secs() -> u64 {
    15
}

fn default_health_attempts() -> u32 {
    3
}

// =============================================================================
// Loading
// =============================================================================

pub fn load(path: &Path) -> Result<ReleaseConfig> {
    let display = path.display().to_string();
    let raw = std::fs::read_to_string(path).map_err(|e| {
        Error::internal_io(e.to_string(), Some(format!("read {}", display))).with_hint(format!(
            "Create {} or pass --config <path>",
            DEFAULT_CONFIG_FILE
        ))
    })?;
    parse(&raw, &display)
}

pub fn parse(raw: &str, origin: &str) -> Result<ReleaseConfig> {
    serde_json::from_str(raw).map_err(|e| Error::config_invalid_json(origin, e))
}

// =============================================================================
// Run context
// =============================================================================

/// Remote execution target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    pub host: String,
    pub user: String,
    pub port: u16,
    pub identity_file: Option<String>,
    pub work_dir: String,
}

impl RemoteTarget {
    pub fn address(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    /// Absolute path of `relative` inside the remote working directory.
    pub fn path_in_work_dir(&self, relative: &str) -> String {
        if relative.starts_with('/') {
            relative.to_string()
        } else {
            format!("{}/{}", self.work_dir.trim_end_matches('/'), relative)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub connect: Duration,
    pub transfer: Duration,
    pub probe: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEndpoints {
    pub base_url: String,
    pub auth_url: String,
    pub health_path: String,
    pub health_expect: String,
    pub settle: Duration,
    pub health_attempts: u32,
}

impl ApiEndpoints {
    pub fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    pub fn health_url(&self) -> String {
        self.url(&self.health_path)
    }
}

pub fn join_url(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Immutable configuration for one run. Built once, read-only afterwards.
#[derive(Debug, Clone)]
pub struct ReleaseContext {
    pub project_dir: PathBuf,
    pub image: String,
    pub dockerfile: String,
    pub docker_bin: String,
    pub service: String,
    pub remote: RemoteTarget,
    pub secret: SecretConfig,
    pub builder: BuilderConfig,
    pub retry: RetryPolicy,
    pub timeouts: Timeouts,
    pub api: ApiEndpoints,
    pub identities: Vec<Identity>,
}

impl ReleaseContext {
    pub fn from_config(config: ReleaseConfig) -> Result<Self> {
        require("image", &config.image)?;
        require("remote.host", &config.remote.host)?;
        require("remote.user", &config.remote.user)?;
        require("remote.workDir", &config.remote.work_dir)?;
        require("api.baseUrl", &config.api.base_url)?;

        let identity_file = match config.remote.identity_file.as_deref() {
            Some(path) if !path.is_empty() => {
                let expanded = shellexpand::tilde(path).to_string();
                if !Path::new(&expanded).exists() {
                    return Err(Error::ssh_identity_file_not_found(expanded));
                }
                Some(expanded)
            }
            _ => None,
        };

        let identities = config
            .identities
            .iter()
            .map(resolve_identity)
            .collect::<Result<Vec<_>>>()?;

        let base_url = config.api.base_url.trim_end_matches('/').to_string();
        let auth_url = config
            .api
            .auth_url
            .clone()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| format!("{}/gotrue", base_url));

        Ok(Self {
            project_dir: PathBuf::from(shellexpand::tilde(&config.project_dir).to_string()),
            image: config.image,
            dockerfile: config.dockerfile,
            docker_bin: config.docker_bin,
            service: config.service,
            remote: RemoteTarget {
                host: config.remote.host,
                user: config.remote.user,
                port: config.remote.port,
                identity_file,
                work_dir: config.remote.work_dir,
            },
            secret: config.secret,
            builder: config.builder,
            retry: RetryPolicy::new(
                config.retry.max_attempts,
                Duration::from_secs(config.retry.delay_secs),
            ),
            timeouts: Timeouts {
                connect: Duration::from_secs(config.timeouts.connect_secs),
                transfer: Duration::from_secs(config.timeouts.transfer_secs),
                probe: Duration::from_secs(config.timeouts.probe_secs),
            },
            api: ApiEndpoints {
                base_url,
                auth_url: auth_url.trim_end_matches('/').to_string(),
                health_path: config.api.health_path,
                health_expect: config.api.health_expect,
                settle: Duration::from_secs(config.api.settle_secs),
                health_attempts: config.api.health_attempts.max(1),
            },
            identities,
        })
    }

    /// Remote path of the secret file.
    pub fn secret_path(&self) -> String {
        self.remote.path_in_work_dir(&self.secret.file)
    }

    pub fn secret_build_arg(&self) -> &str {
        self.secret.build_arg.as_deref().unwrap_or(&self.secret.key)
    }
}

fn require(key: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::config_missing_key(key, Some(DEFAULT_CONFIG_FILE.to_string())));
    }
    Ok(())
}

fn resolve_identity(config: &IdentityConfig) -> Result<Identity> {
    let password = match (&config.password, &config.password_env) {
        (Some(password), _) if !password.is_empty() => password.clone(),
        (_, Some(var)) => std::env::var(var).map_err(|_| {
            Error::config_invalid_value(
                format!("identities.{}.passwordEnv", config.name),
                Some(var.clone()),
                "environment variable is not set",
            )
        })?,
        _ => {
            return Err(Error::config_missing_key(
                format!("identities.{}.password", config.name),
                None,
            ))
        }
    };

    Ok(Identity {
        name: config.name.clone(),
        method: config.method,
        identifier: config.identifier.clone(),
        password,
    })
}
