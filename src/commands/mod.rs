use std::path::{Path, PathBuf};

use flowship::log_status;

use flowship::config::{self, ReleaseContext};
use flowship::conformance::{self, Identity, TestCase};
use flowship::ssh::{RemoteSession, SshClient};

pub type CmdResult<T> = flowship::Result<(T, i32)>;

pub(crate) struct GlobalArgs {
    pub config: PathBuf,
}

// ============================================================================
// Shared setup (CLI layer)
// ============================================================================

/// Load the release file and validate it into a run context.
pub(crate) fn load_context(global: &GlobalArgs) -> flowship::Result<ReleaseContext> {
    log_status!("config", "Loading {}", global.config.display());
    let raw = config::load(&global.config)?;
    ReleaseContext::from_config(raw)
}

/// Remote session over SSH with the configured timeouts and retry policy.
pub(crate) fn connect(ctx: &ReleaseContext) -> RemoteSession {
    let client = SshClient::new(&ctx.remote, ctx.timeouts.connect, ctx.timeouts.transfer);
    RemoteSession::new(Box::new(client), ctx.retry)
}

/// Built-in suite, or the cases in `suite` when given.
pub(crate) fn load_cases(ctx: &ReleaseContext, suite: Option<&Path>) -> flowship::Result<Vec<TestCase>> {
    match suite {
        Some(path) => {
            log_status!("test", "Using suite {}", path.display());
            conformance::load_suite(path)
        }
        None => Ok(conformance::default_suite(&ctx.api)),
    }
}

/// Identities to test. An empty filter keeps all of them; unknown names are an error.
pub(crate) fn select_identities(ctx: &ReleaseContext, names: &[String]) -> flowship::Result<Vec<Identity>> {
    if names.is_empty() {
        return Ok(ctx.identities.clone());
    }

    for name in names {
        if !ctx.identities.iter().any(|i| &i.name == name) {
            let known: Vec<&str> = ctx.identities.iter().map(|i| i.name.as_str()).collect();
            return Err(flowship::Error::validation_invalid_argument(
                "identity",
                format!("Unknown identity '{}'", name),
                Some(name.clone()),
            )
            .with_hint(format!("Configured identities: {}", known.join(", "))));
        }
    }

    Ok(ctx
        .identities
        .iter()
        .filter(|i| names.contains(&i.name))
        .cloned()
        .collect())
}

// ============================================================================
// Dispatch
// ============================================================================

pub mod builder;
pub mod plan;
pub mod release;
pub mod test;

macro_rules! dispatch {
    ($args:expr, $global:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args, $global))
    };
}

pub(crate) fn run_json(
    command: crate::Commands,
    global: &GlobalArgs,
) -> (flowship::Result<serde_json::Value>, i32) {
    crate::tty::status("flowship is working...");

    match command {
        crate::Commands::Release(args) => dispatch!(args, global, release),
        crate::Commands::Test(args) => dispatch!(args, global, test),
        crate::Commands::Builder(args) => dispatch!(args, global, builder),
        crate::Commands::Plan(args) => dispatch!(args, global, plan),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(identities: &str) -> ReleaseContext {
        let raw = format!(
            r#"{{
                "image": "appflowyinc/appflowy_cloud:latest",
                "remote": {{ "host": "10.0.0.5", "user": "deploy", "workDir": "/srv/appflowy" }},
                "api": {{ "baseUrl": "http://svc" }},
                "identities": {}
            }}"#,
            identities
        );
        ReleaseContext::from_config(config::parse(&raw, "inline").unwrap()).unwrap()
    }

    const TWO: &str = r#"[
        {"name": "phone", "method": "phone", "identifier": "+15550100", "password": "a"},
        {"name": "email", "method": "email", "identifier": "qa@example.com", "password": "b"}
    ]"#;

    #[test]
    fn empty_filter_keeps_all_identities() {
        let ctx = context(TWO);
        assert_eq!(select_identities(&ctx, &[]).unwrap().len(), 2);
    }

    #[test]
    fn filter_selects_named_identity() {
        let ctx = context(TWO);
        let picked = select_identities(&ctx, &["email".to_string()]).unwrap();
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].name, "email");
    }

    #[test]
    fn unknown_identity_is_rejected() {
        let ctx = context(TWO);
        let err = select_identities(&ctx, &["nobody".to_string()]).unwrap_err();
        assert_eq!(err.code, flowship::ErrorCode::ValidationInvalidArgument);
        assert!(err.hints[0].message.contains("phone, email"));
    }

    #[test]
    fn default_cases_come_from_context() {
        let ctx = context("[]");
        let cases = load_cases(&ctx, None).unwrap();
        assert_eq!(cases[0].name, "health");
    }

    #[test]
    fn suite_file_replaces_default_cases() {
        let ctx = context("[]");
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("suite.json");
        std::fs::write(
            &path,
            r#"[{"name": "ping", "path": "/ping", "expect": {"type": "status", "status": 200}}]"#,
        )
        .unwrap();

        let cases = load_cases(&ctx, Some(&path)).unwrap();
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].name, "ping");
    }
}
