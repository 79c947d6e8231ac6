//! Remote instance replacement.
//!
//! A fixed sequence of container-lifecycle commands run in the remote working
//! directory. Each step has a mode that decides what a nonzero exit means.

use serde::Serialize;

use crate::artifact::remote_archive_path;
use crate::config::ReleaseContext;
use crate::error::{DeployStepFailedDetails, Error, Result};
use crate::ssh::RemoteSession;
use crate::utils::shell;

/// What a failing step does to the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepMode {
    /// Failure is logged and the sequence continues.
    BestEffort,
    /// Failure aborts the deploy with `deploy.step_failed`.
    Required,
    /// Output is reported; exit status does not matter.
    Observational,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployStep {
    pub name: String,
    pub command: String,
    pub mode: StepMode,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployPlan {
    pub work_dir: String,
    pub steps: Vec<DeployStep>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    pub name: String,
    pub mode: StepMode,
    pub success: bool,
    pub exit_code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployReport {
    pub steps: Vec<StepResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Removes the transferred archive. Also run after a required step fails.
pub const CLEANUP_STEP: &str = "cleanup-archive";

fn step(name: &str, command: String, mode: StepMode) -> DeployStep {
    DeployStep {
        name: name.to_string(),
        command,
        mode,
    }
}

/// The ordered remote steps for this context.
pub fn plan(ctx: &ReleaseContext) -> DeployPlan {
    let service = shell::quote_arg(&ctx.service);
    let image = shell::quote_arg(&ctx.image);
    let archive = shell::quote_path(&remote_archive_path(&ctx.remote));

    DeployPlan {
        work_dir: ctx.remote.work_dir.clone(),
        steps: vec![
            step(
                "stop-old-instance",
                format!("docker compose stop {}", service),
                StepMode::BestEffort,
            ),
            step(
                "remove-old-image",
                format!("docker rmi -f {}", image),
                StepMode::BestEffort,
            ),
            step(
                "load-image",
                format!("docker load -i {}", archive),
                StepMode::Required,
            ),
            step(
                "start-instance",
                format!("docker compose up -d {}", service),
                StepMode::Required,
            ),
            step(
                CLEANUP_STEP,
                format!("rm -f {}", archive),
                StepMode::BestEffort,
            ),
            step(
                "report-status",
                format!("docker compose ps {}", service),
                StepMode::Observational,
            ),
        ],
    }
}

/// Run every step in order. Stops at the first failed required step, after
/// running any remaining archive cleanup.
pub fn deploy(session: &RemoteSession, plan: &DeployPlan) -> Result<DeployReport> {
    let mut results = Vec::with_capacity(plan.steps.len());
    let mut status = None;

    for (index, step) in plan.steps.iter().enumerate() {
        log_status!("deploy", "{}: {}", step.name, step.command);
        let output = session.execute(&shell::in_dir(&plan.work_dir, &step.command))?;

        match step.mode {
            StepMode::Required if !output.success => {
                log_status!("deploy", "{} failed (exit {})", step.name, output.exit_code);
                cleanup_after_failure(session, plan, &plan.steps[index + 1..]);
                return Err(Error::deploy_step_failed(DeployStepFailedDetails {
                    step: step.name.clone(),
                    exit_code: output.exit_code,
                    stderr: output.error_text().to_string(),
                }));
            }
            StepMode::BestEffort if !output.success => {
                log_status!(
                    "deploy",
                    "{} failed (exit {}), continuing: {}",
                    step.name,
                    output.exit_code,
                    output.error_text()
                );
            }
            StepMode::Observational => {
                let text = output.stdout.trim().to_string();
                if !text.is_empty() {
                    log_status!("deploy", "{}", text);
                    status = Some(text);
                }
            }
            _ => {}
        }

        results.push(StepResult {
            name: step.name.clone(),
            mode: step.mode,
            success: output.success,
            exit_code: output.exit_code,
            output: (step.mode == StepMode::Observational && !output.stdout.trim().is_empty())
                .then(|| output.stdout.trim().to_string()),
        });
    }

    Ok(DeployReport {
        steps: results,
        status,
    })
}

/// Best-effort cleanup once the sequence has been aborted. Errors are only logged.
fn cleanup_after_failure(session: &RemoteSession, plan: &DeployPlan, remaining: &[DeployStep]) {
    for step in remaining.iter().filter(|s| s.name == CLEANUP_STEP) {
        log_status!("deploy", "{}: {}", step.name, step.command);
        match session.execute(&shell::in_dir(&plan.work_dir, &step.command)) {
            Ok(output) if output.success => {}
            Ok(output) => log_status!(
                "deploy",
                "{} failed (exit {}): {}",
                step.name,
                output.exit_code,
                output.error_text()
            ),
            Err(err) => log_status!("deploy", "{} not run: {}", step.name, err),
        }
    }
}
