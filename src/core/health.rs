//! Post-deploy readiness gate.

use serde::Serialize;

use crate::config::ApiEndpoints;
use crate::error::{Error, ErrorCode, Result};
use crate::http::{HttpProbe, ProbeRequest};
use crate::utils::retry::{self, RetryPolicy};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub url: String,
    pub attempts: u32,
    pub settle_secs: u64,
}

/// Wait for the settle interval, then probe the health endpoint until it
/// answers with the expected literal or `policy` runs out.
pub fn verify(probe: &dyn HttpProbe, api: &ApiEndpoints, policy: &RetryPolicy) -> Result<HealthReport> {
    let url = api.health_url();

    if !api.settle.is_zero() {
        log_status!("health", "Waiting {}s for the service to settle", api.settle.as_secs());
        std::thread::sleep(api.settle);
    }

    let mut attempts = 0;
    retry::retry(
        policy,
        "health probe",
        |err: &Error| err.code == ErrorCode::HealthCheckFailed,
        |attempt| {
            attempts = attempt;
            check_once(probe, &url, &api.health_expect)
        },
    )?;

    log_status!("health", "{} answered {}", url, api.health_expect);
    Ok(HealthReport {
        url,
        attempts,
        settle_secs: api.settle.as_secs(),
    })
}

fn check_once(probe: &dyn HttpProbe, url: &str, expect: &str) -> Result<()> {
    let observed = match probe.send(&ProbeRequest::get(url)) {
        Ok(response) if response.body.trim() == expect => return Ok(()),
        Ok(response) => format!("HTTP {}: {}", response.status, truncate(response.body.trim(), 120)),
        Err(err) => err.message,
    };
    Err(Error::health_check_failed(url, observed))
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        format!("{}...", text.chars().take(max).collect::<String>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::StubService;
    use crate::http::Method;
    use std::time::Duration;

    fn api() -> ApiEndpoints {
        ApiEndpoints {
            base_url: "http://svc".to_string(),
            auth_url: "http://svc/gotrue".to_string(),
            health_path: "/health".to_string(),
            health_expect: "OK".to_string(),
            settle: Duration::ZERO,
            health_attempts: 3,
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::ZERO)
    }

    #[test]
    fn literal_ok_passes_first_time() {
        let svc = StubService::new().route(Method::Get, "http://svc/health", 200, "OK\n");
        let report = verify(&svc, &api(), &policy()).unwrap();
        assert_eq!(report.attempts, 1);
        assert_eq!(svc.hits("http://svc/health"), 1);
    }

    #[test]
    fn retries_until_ready() {
        let svc = StubService::new()
            .route(Method::Get, "http://svc/health", 502, "Bad Gateway")
            .route(Method::Get, "http://svc/health", 200, "OK");
        let report = verify(&svc, &api(), &policy()).unwrap();
        assert_eq!(report.attempts, 2);
    }

    #[test]
    fn wrong_body_is_not_healthy() {
        let svc = StubService::new().route(Method::Get, "http://svc/health", 200, "{\"status\":\"ok\"}");
        let err = verify(&svc, &api(), &policy()).unwrap_err();
        assert_eq!(err.code, ErrorCode::HealthCheckFailed);
        assert_eq!(svc.hits("http://svc/health"), 3);
        assert!(err.details["observed"].as_str().unwrap().starts_with("HTTP 200"));
    }

    #[test]
    fn long_bodies_are_truncated() {
        assert_eq!(truncate("abcdef", 3), "abc...");
        assert_eq!(truncate("abc", 3), "abc");
    }
}
