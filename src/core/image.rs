//! Container image build through the external `docker` command.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::builder::{BuildBackend, BuilderDecision};
use crate::config::ReleaseContext;
use crate::error::{BuildFailedDetails, Error, Result};
use crate::utils::command;
use crate::utils::redact::redact_assignment;

/// Everything the build command needs. Selected once, consumed by [`build`].
#[derive(Debug, Clone)]
pub struct BuildDescriptor {
    pub backend: BuildBackend,
    pub platform: String,
    pub builder_name: Option<String>,
    pub build_args: BTreeMap<String, String>,
    pub image: String,
    pub dockerfile: String,
    pub context_dir: PathBuf,
    pub docker_bin: String,
}

impl BuildDescriptor {
    pub fn new(ctx: &ReleaseContext, decision: &BuilderDecision, secret: String) -> Self {
        let mut build_args = BTreeMap::new();
        build_args.insert(ctx.secret_build_arg().to_string(), secret);

        Self {
            backend: decision.backend,
            platform: decision.platform.clone(),
            builder_name: decision.builder_name.clone(),
            build_args,
            image: ctx.image.clone(),
            dockerfile: ctx.dockerfile.clone(),
            context_dir: ctx.project_dir.clone(),
            docker_bin: ctx.docker_bin.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildReport {
    pub backend: BuildBackend,
    pub image: String,
    pub duration_secs: f64,
}

/// Arguments passed to the docker binary for this descriptor.
pub fn command_args(descriptor: &BuildDescriptor) -> Vec<String> {
    let mut args: Vec<String> = Vec::new();

    match descriptor.backend {
        BuildBackend::LocalNative => {
            args.push("build".to_string());
        }
        BuildBackend::LocalEmulated | BuildBackend::RemoteAgent => {
            args.extend(["buildx".to_string(), "build".to_string()]);
            if descriptor.backend == BuildBackend::RemoteAgent {
                if let Some(name) = &descriptor.builder_name {
                    args.extend(["--builder".to_string(), name.clone()]);
                }
            }
            args.extend([
                "--platform".to_string(),
                descriptor.platform.clone(),
                "--load".to_string(),
            ]);
        }
    }

    args.extend([
        "-t".to_string(),
        descriptor.image.clone(),
        "-f".to_string(),
        descriptor.dockerfile.clone(),
    ]);

    for (key, value) in &descriptor.build_args {
        args.push("--build-arg".to_string());
        args.push(format!("{}={}", key, value));
    }

    args.push(".".to_string());
    args
}

/// The command line as it may appear in logs: build-arg values are redacted.
pub fn display_command(descriptor: &BuildDescriptor) -> String {
    let args = command_args(descriptor);
    let mut shown = vec![descriptor.docker_bin.clone()];
    let mut redact_next = false;

    for arg in args {
        if redact_next {
            shown.push(redact_assignment(&arg));
            redact_next = false;
        } else {
            redact_next = arg == "--build-arg";
            shown.push(arg);
        }
    }

    shown.join(" ")
}

/// Run the build. Duration is logged whether or not it succeeds.
pub fn build(descriptor: &BuildDescriptor) -> Result<BuildReport> {
    log_status!("build", "{}", display_command(descriptor));

    let started = Instant::now();
    let output = command::run_passthrough(
        &descriptor.docker_bin,
        &command_args(descriptor),
        Some(&descriptor.context_dir),
    );
    let duration = started.elapsed();

    log_status!(
        "build",
        "{} after {}",
        if output.success { "Finished" } else { "Failed" },
        format_duration(duration)
    );

    if !output.success {
        return Err(Error::build_failed(BuildFailedDetails {
            backend: descriptor.backend.as_str().to_string(),
            exit_code: output.exit_code,
            duration_secs: duration.as_secs_f64(),
        })
        .with_hint(format!(
            "Re-run '{}' in {} to see the full build log",
            display_command(descriptor),
            descriptor.context_dir.display()
        )));
    }

    Ok(BuildReport {
        backend: descriptor.backend,
        image: descriptor.image.clone(),
        duration_secs: duration.as_secs_f64(),
    })
}

pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 60 {
        format!("{}m{:02}s", secs / 60, secs % 60)
    } else {
        format!("{:.1}s", duration.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn descriptor(backend: BuildBackend) -> BuildDescriptor {
        let mut build_args = BTreeMap::new();
        build_args.insert(
            "DATABASE_URL".to_string(),
            "postgres://admin:hunter2@db/app".to_string(),
        );
        BuildDescriptor {
            backend,
            platform: "linux/amd64".to_string(),
            builder_name: Some("amd64-agent".to_string()),
            build_args,
            image: "appflowyinc/appflowy_cloud:latest".to_string(),
            dockerfile: "Dockerfile".to_string(),
            context_dir: std::env::temp_dir(),
            docker_bin: "docker".to_string(),
        }
    }

    #[test]
    fn native_build_uses_plain_docker_build() {
        let args = command_args(&descriptor(BuildBackend::LocalNative));
        assert_eq!(args[0], "build");
        assert!(!args.contains(&"--platform".to_string()));
        assert!(!args.contains(&"--builder".to_string()));
        assert!(args.contains(&"DATABASE_URL=postgres://admin:hunter2@db/app".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("."));
    }

    #[test]
    fn emulated_build_targets_platform_without_builder() {
        let args = command_args(&descriptor(BuildBackend::LocalEmulated));
        assert_eq!(&args[..2], &["buildx".to_string(), "build".to_string()]);
        assert!(args.windows(2).any(|w| w[0] == "--platform" && w[1] == "linux/amd64"));
        assert!(args.contains(&"--load".to_string()));
        assert!(!args.contains(&"--builder".to_string()));
    }

    #[test]
    fn remote_agent_build_names_builder() {
        let args = command_args(&descriptor(BuildBackend::RemoteAgent));
        assert!(args.windows(2).any(|w| w[0] == "--builder" && w[1] == "amd64-agent"));
    }

    #[test]
    fn display_command_never_shows_secret() {
        let shown = display_command(&descriptor(BuildBackend::LocalNative));
        assert!(!shown.contains("hunter2"));
        assert!(shown.contains("--build-arg DATABASE_URL=post********"));
        assert!(shown.starts_with("docker build"));
    }

    #[test]
    fn failing_build_command_is_build_error() {
        let mut d = descriptor(BuildBackend::LocalNative);
        d.docker_bin = "false".to_string();
        let err = build(&d).unwrap_err();
        assert_eq!(err.code, ErrorCode::BuildFailed);
        assert_eq!(err.details["exitCode"], 1);
        assert!(err.details["durationSecs"].is_number());
    }

    #[test]
    fn successful_build_reports_duration() {
        let mut d = descriptor(BuildBackend::LocalNative);
        d.docker_bin = "true".to_string();
        let report = build(&d).unwrap();
        assert!(report.duration_secs >= 0.0);
        assert_eq!(report.backend, BuildBackend::LocalNative);
    }

    #[test]
    fn durations_format_readably() {
        assert_eq!(format_duration(Duration::from_millis(2500)), "2.5s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m05s");
    }
}
