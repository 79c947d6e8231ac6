//! The release pipeline.
//!
//! Stages run strictly in order and every stage before the conformance run is
//! a hard gate: the first error aborts the release and nothing after it runs.
//! Conformance failures are scored, not raised, and only shape the verdict.

use serde::Serialize;
use serde_json::json;
use std::time::Instant;

use crate::artifact::{self, RemoteArtifact};
use crate::builder::{self, BuilderDecision};
use crate::config::ReleaseContext;
use crate::conformance::{ConformanceReport, Counters, Identity, Runner, TestCase};
use crate::deploy::{self, DeployReport};
use crate::error::{Error, Result};
use crate::health::{self, HealthReport};
use crate::http::HttpProbe;
use crate::image::{self, BuildDescriptor, BuildReport};
use crate::remote_config;
use crate::report::{self, Verdict};
use crate::ssh::RemoteSession;
use crate::utils::retry::RetryPolicy;

#[derive(Debug, Clone, Copy, Default)]
pub struct ReleaseOptions {
    /// Skip secret resolution, builder selection and the build; the image must already exist locally.
    pub skip_build: bool,
    /// Skip export, transfer and the remote deploy.
    pub skip_deploy: bool,
    /// Skip the health gate and the conformance run.
    pub skip_tests: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Success,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageRecord {
    pub name: String,
    pub status: StageStatus,
    pub duration_secs: f64,
}

/// Health gate plus scored conformance results.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestReport {
    pub health: HealthReport,
    pub conformance: ConformanceReport,
    pub verdict: Verdict,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseReport {
    pub image: String,
    pub target: String,
    pub started_at: String,
    pub finished_at: String,
    pub stages: Vec<StageRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub builder: Option<BuilderDecision>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<RemoteArtifact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deploy: Option<DeployReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test: Option<TestReport>,
    pub verdict: Verdict,
}

/// Collaborators for one release run.
pub struct Release<'a> {
    pub ctx: &'a ReleaseContext,
    pub session: &'a RemoteSession,
    pub probe: &'a dyn HttpProbe,
    pub cases: &'a [TestCase],
    pub identities: &'a [Identity],
}

impl<'a> Release<'a> {
    /// Run every stage. A fatal error carries the stage name and the tally
    /// at the point of abort in its details.
    pub fn run(&self, options: ReleaseOptions) -> Result<ReleaseReport> {
        self.run_stages(options).map_err(aborted)
    }

    fn run_stages(&self, options: ReleaseOptions) -> Result<ReleaseReport> {
        let started_at = chrono::Utc::now().to_rfc3339();
        let mut stages = Vec::new();
        log_status!("release", "Releasing {} to {}", self.ctx.image, self.session.target());

        let mut decision = None;
        let mut build = None;
        if options.skip_build {
            skip(&mut stages, &["resolve-secret", "select-builder", "build"]);
        } else {
            let secret = timed(&mut stages, "resolve-secret", || {
                remote_config::resolve(self.session, &self.ctx.secret_path(), &self.ctx.secret.key)
            })?;
            let selected = timed(&mut stages, "select-builder", || builder::decide(self.ctx))?;
            let descriptor = BuildDescriptor::new(self.ctx, &selected, secret);
            build = Some(timed(&mut stages, "build", || image::build(&descriptor))?);
            decision = Some(selected);
        }

        let mut remote_artifact = None;
        let mut deployed = None;
        if options.skip_deploy {
            skip(&mut stages, &["export", "transfer", "deploy"]);
        } else {
            let handle = timed(&mut stages, "export", || artifact::export(self.ctx))?;
            remote_artifact = Some(timed(&mut stages, "transfer", || {
                artifact::transfer(self.session, &self.ctx.remote, handle)
            })?);
            let plan = deploy::plan(self.ctx);
            deployed = Some(timed(&mut stages, "deploy", || deploy::deploy(self.session, &plan))?);
        }

        let (test, verdict) = if options.skip_tests {
            skip(&mut stages, &["health", "conformance"]);
            (None, report::finalize(&Counters::new()))
        } else {
            let test = run_checks(self.ctx, self.probe, self.cases, self.identities, &mut stages)?;
            let verdict = test.verdict.clone();
            (Some(test), verdict)
        };

        log_status!("release", "{}", verdict.summary);

        Ok(ReleaseReport {
            image: self.ctx.image.clone(),
            target: self.session.target(),
            started_at,
            finished_at: chrono::Utc::now().to_rfc3339(),
            stages,
            builder: decision,
            build,
            artifact: remote_artifact,
            deploy: deployed,
            test,
            verdict,
        })
    }
}

/// Health gate, then the conformance suite. Used by `release` and by `test`
/// against an already-deployed service.
pub fn verify(
    ctx: &ReleaseContext,
    probe: &dyn HttpProbe,
    cases: &[TestCase],
    identities: &[Identity],
    stages: &mut Vec<StageRecord>,
) -> Result<TestReport> {
    run_checks(ctx, probe, cases, identities, stages).map_err(aborted)
}

fn run_checks(
    ctx: &ReleaseContext,
    probe: &dyn HttpProbe,
    cases: &[TestCase],
    identities: &[Identity],
    stages: &mut Vec<StageRecord>,
) -> Result<TestReport> {
    let policy = RetryPolicy::new(ctx.api.health_attempts, ctx.retry.delay);
    let health = timed(stages, "health", || health::verify(probe, &ctx.api, &policy))?;

    let conformance = timed(stages, "conformance", || {
        Ok(Runner::new(probe, &ctx.api, cases).run(identities))
    })?;
    let verdict = report::finalize(&conformance.counters);

    Ok(TestReport {
        health,
        conformance,
        verdict,
    })
}

fn timed<T>(stages: &mut Vec<StageRecord>, name: &str, op: impl FnOnce() -> Result<T>) -> Result<T> {
    log_status!("release", "Stage {}", name);
    let started = Instant::now();
    let result = op();

    stages.push(StageRecord {
        name: name.to_string(),
        status: if result.is_ok() {
            StageStatus::Success
        } else {
            StageStatus::Failed
        },
        duration_secs: started.elapsed().as_secs_f64(),
    });

    result.map_err(|err| in_stage(name, err))
}

fn skip(stages: &mut Vec<StageRecord>, names: &[&str]) {
    for name in names {
        log_status!("release", "Stage {} skipped", name);
        stages.push(StageRecord {
            name: name.to_string(),
            status: StageStatus::Skipped,
            duration_secs: 0.0,
        });
    }
}

/// Tag an error with the stage that raised it.
fn in_stage(stage: &str, err: Error) -> Error {
    with_detail(err, "stage", stage)
}

fn with_detail(mut err: Error, key: &str, value: &str) -> Error {
    match err.details.as_object_mut() {
        Some(details) => {
            details.insert(key.to_string(), json!(value));
        }
        None => {
            err.details = json!({ key: value });
        }
    }
    err
}

/// Fatal errors happen before anything is scored, so the tally is empty.
fn aborted(err: Error) -> Error {
    let summary = report::finalize(&Counters::new()).summary;
    let stage = err.details["stage"].as_str().unwrap_or("unknown").to_string();
    log_status!("release", "Aborted at {}: {}", stage, err.message);
    log_status!("release", "{}", summary);
    with_detail(err, "summary", &summary)
}
