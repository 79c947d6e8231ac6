//! Build backend selection.
//!
//! The decision is a table of rules checked in order over a snapshot of the
//! environment. Gathering that snapshot (reading the registration file and
//! probing the agent) is the only side-effecting part.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::ReleaseContext;
use crate::error::{Error, Result};
use crate::utils::command;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildBackend {
    LocalNative,
    LocalEmulated,
    RemoteAgent,
}

impl BuildBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildBackend::LocalNative => "local-native",
            BuildBackend::LocalEmulated => "local-emulated",
            BuildBackend::RemoteAgent => "remote-agent",
        }
    }
}

/// Contents of the builder-registration file.
///
/// Either JSON (`{"name": "...", "endpoint": "..."}`) or a plain file whose
/// first non-empty line is the builder name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuilderRegistration {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl BuilderRegistration {
    pub fn parse(raw: &str) -> Option<Self> {
        if let Ok(parsed) = serde_json::from_str::<BuilderRegistration>(raw) {
            return (!parsed.name.trim().is_empty()).then_some(parsed);
        }

        raw.lines()
            .map(str::trim)
            .find(|line| !line.is_empty() && !line.starts_with('#'))
            .map(|name| BuilderRegistration {
                name: name.to_string(),
                endpoint: None,
            })
    }
}

/// Everything the decision depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionInputs {
    pub registration: Option<BuilderRegistration>,
    pub agent_alive: bool,
    pub host_platform: String,
    pub target_platform: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuilderDecision {
    pub backend: BuildBackend,
    pub platform: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub builder_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

struct Rule {
    backend: BuildBackend,
    applies: fn(&SelectionInputs) -> bool,
}

fn agent_available(i: &SelectionInputs) -> bool {
    i.registration.is_some() && i.agent_alive
}

fn foreign_arch(i: &SelectionInputs) -> bool {
    i.host_platform != i.target_platform
}

fn always(_: &SelectionInputs) -> bool {
    true
}

const RULES: &[Rule] = &[
    Rule {
        backend: BuildBackend::RemoteAgent,
        applies: agent_available,
    },
    Rule {
        backend: BuildBackend::LocalEmulated,
        applies: foreign_arch,
    },
    Rule {
        backend: BuildBackend::LocalNative,
        applies: always,
    },
];

/// Pick a backend. First matching rule wins; the last rule always matches.
pub fn select(inputs: &SelectionInputs) -> BuilderDecision {
    let backend = RULES
        .iter()
        .find(|rule| (rule.applies)(inputs))
        .map(|rule| rule.backend)
        .unwrap_or(BuildBackend::LocalNative);

    let builder_name = match backend {
        BuildBackend::RemoteAgent => inputs.registration.as_ref().map(|r| r.name.clone()),
        _ => None,
    };

    let warning = match backend {
        BuildBackend::LocalEmulated => Some(format!(
            "Host platform {} differs from target {}; building under emulation will be slow",
            inputs.host_platform, inputs.target_platform
        )),
        _ => None,
    };

    BuilderDecision {
        backend,
        platform: inputs.target_platform.clone(),
        builder_name,
        warning,
    }
}

/// Docker platform string for the machine we are running on.
pub fn host_platform() -> String {
    platform_for_arch(std::env::consts::ARCH)
}

pub fn platform_for_arch(arch: &str) -> String {
    match arch {
        "x86_64" => "linux/amd64".to_string(),
        "aarch64" => "linux/arm64".to_string(),
        "arm" => "linux/arm/v7".to_string(),
        other => format!("linux/{}", other),
    }
}

/// Read the registration file if one is configured and present.
pub fn read_registration(path: Option<&str>) -> Result<Option<BuilderRegistration>> {
    let Some(path) = path.filter(|p| !p.is_empty()) else {
        return Ok(None);
    };

    let expanded = shellexpand::tilde(path).to_string();
    if !Path::new(&expanded).exists() {
        return Ok(None);
    }

    let raw = std::fs::read_to_string(&expanded)
        .map_err(|e| Error::internal_io(e.to_string(), Some(format!("read {}", expanded))))?;
    Ok(BuilderRegistration::parse(&raw))
}

/// Liveness probe for a registered build agent.
pub fn probe_agent(docker_bin: &str, name: &str) -> bool {
    let args = vec![
        "buildx".to_string(),
        "inspect".to_string(),
        "--bootstrap".to_string(),
        name.to_string(),
    ];
    command::run_captured(docker_bin, &args, None).success
}

/// Gather inputs from the environment and decide.
pub fn decide(ctx: &ReleaseContext) -> Result<BuilderDecision> {
    let registration = read_registration(ctx.builder.registration_file.as_deref())?;

    let agent_alive = match &registration {
        Some(reg) => {
            let alive = probe_agent(&ctx.docker_bin, &reg.name);
            if !alive {
                log_status!("builder", "Registered agent '{}' did not respond, falling back to local build", reg.name);
            }
            alive
        }
        None => false,
    };

    let decision = select(&SelectionInputs {
        registration,
        agent_alive,
        host_platform: host_platform(),
        target_platform: ctx.builder.target_platform.clone(),
    });

    if let Some(warning) = &decision.warning {
        log_status!("builder", "Warning: {}", warning);
    }
    log_status!("builder", "Selected {} backend for {}", decision.backend.as_str(), decision.platform);

    Ok(decision)
}
