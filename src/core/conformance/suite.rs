//! Declarative test cases and the built-in suite.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_json_path::JsonPath;
use std::collections::BTreeMap;
use std::path::Path;

use crate::config::ApiEndpoints;
use crate::error::{Error, Result};
use crate::http::{Method, ProbeResponse};
use crate::utils::template;

/// Path parameter filled from the workspace listing.
pub const WORKSPACE_ID: &str = "workspace_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthRequirement {
    #[default]
    None,
    Bearer,
}

/// What a response must look like for the case to pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Expectation {
    /// Exact status code.
    Status { status: u16 },
    /// Any status except this one. Used as a route-existence check.
    NotStatus { status: u16 },
    /// 2xx with a JSON object body containing `key`.
    BodyKey { key: String },
    /// Body equals `body` after trimming whitespace.
    BodyLiteral { body: String },
}

impl Expectation {
    /// `Ok` on pass, otherwise the reason it failed.
    pub fn check(&self, response: &ProbeResponse) -> std::result::Result<(), String> {
        match self {
            Expectation::Status { status } if response.status == *status => Ok(()),
            Expectation::Status { status } => Err(format!(
                "expected HTTP {}, got {}",
                status, response.status
            )),
            Expectation::NotStatus { status } if response.status != *status => Ok(()),
            Expectation::NotStatus { status } => Err(format!("got HTTP {}", status)),
            Expectation::BodyKey { key } => {
                if !(200..300).contains(&response.status) {
                    return Err(format!("HTTP {}", response.status));
                }
                match response.json() {
                    Some(Value::Object(map)) if map.contains_key(key) => Ok(()),
                    Some(_) => Err(format!("HTTP {} without '{}' key", response.status, key)),
                    None => Err(format!("HTTP {}: body is not JSON", response.status)),
                }
            }
            Expectation::BodyLiteral { body } if response.body.trim() == body => Ok(()),
            Expectation::BodyLiteral { body } => Err(format!(
                "HTTP {}: expected body '{}'",
                response.status, body
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub name: String,
    #[serde(default = "default_method")]
    pub method: Method,
    /// Path relative to the API base URL; may reference `{{name}}` values.
    pub path: String,
    pub expect: Expectation,
    #[serde(default)]
    pub auth: AuthRequirement,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    /// Values to record on pass: name -> JSONPath into the response body.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extract: BTreeMap<String, String>,
}

fn default_method() -> Method {
    Method::Get
}

impl TestCase {
    fn new(name: &str, method: Method, path: &str, auth: AuthRequirement, expect: Expectation) -> Self {
        Self {
            name: name.to_string(),
            method,
            path: path.to_string(),
            expect,
            auth,
            body: None,
            extract: BTreeMap::new(),
        }
    }

    fn public(name: &str, path: &str, expect: Expectation) -> Self {
        Self::new(name, Method::Get, path, AuthRequirement::None, expect)
    }

    fn bearer(name: &str, path: &str) -> Self {
        Self::new(
            name,
            Method::Get,
            path,
            AuthRequirement::Bearer,
            Expectation::BodyKey {
                key: "data".to_string(),
            },
        )
    }

    fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    fn extracting(mut self, name: &str, path: &str) -> Self {
        self.extract.insert(name.to_string(), path.to_string());
        self
    }

    /// Names the path needs before the case can run.
    pub fn requires(&self) -> Vec<String> {
        template::placeholders(&self.path)
    }
}

/// Pull each `extract` value out of a JSON body. Entries that do not resolve
/// to a non-empty scalar are left out.
pub fn extract_values(case: &TestCase, body: &str) -> BTreeMap<String, String> {
    let mut found = BTreeMap::new();
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return found;
    };

    for (name, expr) in &case.extract {
        let Ok(path) = JsonPath::parse(expr) else {
            continue;
        };
        let scalar = match path.query(&value).first() {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        if let Some(scalar) = scalar {
            found.insert(name.clone(), scalar);
        }
    }

    found
}

/// The suite run when no `--suite` file is given.
pub fn default_suite(api: &ApiEndpoints) -> Vec<TestCase> {
    let ws = "/api/workspace/{{workspace_id}}";
    let data = || Expectation::BodyKey {
        key: "data".to_string(),
    };

    vec![
        TestCase::public(
            "health",
            &api.health_path,
            Expectation::BodyLiteral {
                body: api.health_expect.clone(),
            },
        ),
        TestCase::public("server_info", "/api/server", data()),
        TestCase::public("subscription_plans", "/api/subscription/plans", data()),
        TestCase::bearer("user_profile", "/api/user/profile"),
        TestCase::bearer("workspace_list", "/api/workspace")
            .extracting(WORKSPACE_ID, "$.data[0].workspace_id"),
        TestCase::bearer("user_workspace_info", "/api/user/workspace"),
        TestCase::bearer("workspace_members", &format!("{}/member", ws)),
        TestCase::bearer("workspace_settings", &format!("{}/settings", ws)),
        TestCase::bearer("workspace_usage", &format!("{}/usage", ws)),
        TestCase::bearer(
            "billing_status",
            "/billing/api/v1/subscription-status/{{workspace_id}}",
        ),
        TestCase::bearer("current_subscription", "/api/subscription/current"),
        TestCase::bearer("invites", "/api/workspace/invite"),
        TestCase::bearer(
            "file_storage_usage",
            "/api/file_storage/{{workspace_id}}/usage",
        ),
        TestCase::bearer(
            "shared_views",
            "/api/sharing/workspace/{{workspace_id}}/view",
        ),
        TestCase::bearer("folder", &format!("{}/folder", ws)),
        TestCase::bearer("recent", &format!("{}/recent", ws)),
        TestCase::bearer("favorites", &format!("{}/favorite", ws)),
        TestCase::bearer("trash", &format!("{}/trash", ws)),
        TestCase::bearer("databases", &format!("{}/database", ws)),
        TestCase::bearer("quick_notes", &format!("{}/quick-note", ws)),
        // Loose on purpose: any answer other than 405 means the route is registered.
        TestCase::new(
            "invite_route_exists",
            Method::Post,
            &format!("{}/invite", ws),
            AuthRequirement::Bearer,
            Expectation::NotStatus { status: 405 },
        )
        .with_body(serde_json::json!({})),
    ]
}

/// Load a replacement suite from a JSON array of cases.
pub fn load_suite(path: &Path) -> Result<Vec<TestCase>> {
    let display = path.display().to_string();
    let raw = std::fs::read_to_string(path)
        .map_err(|e| Error::internal_io(e.to_string(), Some(format!("read {}", display))))?;
    parse_suite(&raw, &display)
}

pub fn parse_suite(raw: &str, origin: &str) -> Result<Vec<TestCase>> {
    let cases: Vec<TestCase> =
        serde_json::from_str(raw).map_err(|e| Error::config_invalid_json(origin, e))?;
    validate(&cases)?;
    Ok(cases)
}

fn validate(cases: &[TestCase]) -> Result<()> {
    let mut seen: Vec<&str> = Vec::new();

    for case in cases {
        if case.name.trim().is_empty() {
            return Err(Error::config_invalid_value(
                "suite.name",
                None,
                "test case name is empty",
            ));
        }
        if seen.contains(&case.name.as_str()) {
            return Err(Error::config_invalid_value(
                "suite.name",
                Some(case.name.clone()),
                "duplicate test case name",
            ));
        }
        seen.push(&case.name);

        for (name, expr) in &case.extract {
            JsonPath::parse(expr).map_err(|e| {
                Error::config_invalid_value(
                    format!("{}.extract.{}", case.name, name),
                    Some(expr.clone()),
                    e.to_string(),
                )
            })?;
        }
    }

    Ok(())
}
