use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigMissingKey,
    ConfigInvalidJson,
    ConfigInvalidValue,

    ValidationInvalidArgument,

    SshIdentityFileNotFound,
    SshConnectFailed,

    RemoteCommandFailed,

    BuildFailed,
    ArtifactExportFailed,
    TransferFailed,
    DeployStepFailed,
    HealthCheckFailed,

    HttpRequestFailed,

    InternalIoError,
    InternalJsonError,
    InternalUnexpected,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigMissingKey => "config.missing_key",
            ErrorCode::ConfigInvalidJson => "config.invalid_json",
            ErrorCode::ConfigInvalidValue => "config.invalid_value",

            ErrorCode::ValidationInvalidArgument => "validation.invalid_argument",

            ErrorCode::SshIdentityFileNotFound => "ssh.identity_file_not_found",
            ErrorCode::SshConnectFailed => "ssh.connect_failed",

            ErrorCode::RemoteCommandFailed => "remote.command_failed",

            ErrorCode::BuildFailed => "build.failed",
            ErrorCode::ArtifactExportFailed => "artifact.export_failed",
            ErrorCode::TransferFailed => "transfer.failed",
            ErrorCode::DeployStepFailed => "deploy.step_failed",
            ErrorCode::HealthCheckFailed => "health.check_failed",

            ErrorCode::HttpRequestFailed => "http.request_failed",

            ErrorCode::InternalIoError => "internal.io_error",
            ErrorCode::InternalJsonError => "internal.json_error",
            ErrorCode::InternalUnexpected => "internal.unexpected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMissingKeyDetails {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidJsonDetails {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidValueDetails {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub problem: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidArgumentDetails {
    pub field: String,
    pub problem: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalIoErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SshConnectFailedDetails {
    pub host: String,
    pub attempts: u32,
    pub exit_code: i32,
    pub stderr: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCommandFailedDetails {
    pub command: String,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub host: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildFailedDetails {
    pub backend: String,
    pub exit_code: i32,
    pub duration_secs: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployStepFailedDetails {
    pub step: String,
    pub exit_code: i32,
    pub stderr: String,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    pub details: Value,
    pub hints: Vec<Hint>,
    pub retryable: Option<bool>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

fn to_details<T: Serialize>(details: T) -> Value {
    serde_json::to_value(details).unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            hints: Vec::new(),
            retryable: None,
        }
    }

    pub fn validation_invalid_argument(
        field: impl Into<String>,
        problem: impl Into<String>,
        id: Option<String>,
    ) -> Self {
        let details = to_details(InvalidArgumentDetails {
            field: field.into(),
            problem: problem.into(),
            id,
        });

        Self::new(
            ErrorCode::ValidationInvalidArgument,
            "Invalid argument",
            details,
        )
    }

    pub fn config_missing_key(key: impl Into<String>, path: Option<String>) -> Self {
        let key = key.into();
        let message = format!("Missing required configuration key '{}'", key);
        let details = to_details(ConfigMissingKeyDetails { key, path });

        Self::new(ErrorCode::ConfigMissingKey, message, details)
    }

    pub fn config_invalid_json(path: impl Into<String>, err: serde_json::Error) -> Self {
        let details = to_details(ConfigInvalidJsonDetails {
            path: path.into(),
            error: err.to_string(),
        });

        Self::new(
            ErrorCode::ConfigInvalidJson,
            "Invalid JSON in configuration",
            details,
        )
    }

    pub fn config_invalid_value(
        key: impl Into<String>,
        value: Option<String>,
        problem: impl Into<String>,
    ) -> Self {
        let details = to_details(ConfigInvalidValueDetails {
            key: key.into(),
            value,
            problem: problem.into(),
        });

        Self::new(
            ErrorCode::ConfigInvalidValue,
            "Invalid configuration value",
            details,
        )
    }

    pub fn ssh_identity_file_not_found(identity_file: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::SshIdentityFileNotFound,
            "SSH identity file not found",
            serde_json::json!({ "identityFile": identity_file.into() }),
        )
    }

    /// Connection-level failure after the retry budget is spent.
    pub fn ssh_connect_failed(details: SshConnectFailedDetails) -> Self {
        let message = format!(
            "Could not reach {} after {} attempt(s)",
            details.host, details.attempts
        );
        let mut err = Self::new(ErrorCode::SshConnectFailed, message, to_details(details));
        err.retryable = Some(true);
        err
    }

    pub fn remote_command_failed(details: RemoteCommandFailedDetails) -> Self {
        let message = format!("Remote command failed with exit code {}", details.exit_code);
        let mut err = Self::new(ErrorCode::RemoteCommandFailed, message, to_details(details));
        err.retryable = Some(false);
        err
    }

    pub fn build_failed(details: BuildFailedDetails) -> Self {
        let message = format!(
            "Image build failed with exit code {} after {:.1}s",
            details.exit_code, details.duration_secs
        );
        Self::new(ErrorCode::BuildFailed, message, to_details(details))
    }

    pub fn artifact_export_failed(message: impl Into<String>, exit_code: i32) -> Self {
        Self::new(
            ErrorCode::ArtifactExportFailed,
            message,
            serde_json::json!({ "exitCode": exit_code }),
        )
    }

    pub fn transfer_failed(
        local_path: impl Into<String>,
        remote_path: impl Into<String>,
        exit_code: i32,
        stderr: impl Into<String>,
    ) -> Self {
        Self::new(
            ErrorCode::TransferFailed,
            "Artifact transfer failed",
            serde_json::json!({
                "localPath": local_path.into(),
                "remotePath": remote_path.into(),
                "exitCode": exit_code,
                "stderr": stderr.into(),
            }),
        )
    }

    pub fn deploy_step_failed(details: DeployStepFailedDetails) -> Self {
        let message = format!(
            "Deploy step '{}' failed with exit code {}",
            details.step, details.exit_code
        );
        Self::new(ErrorCode::DeployStepFailed, message, to_details(details))
    }

    pub fn health_check_failed(url: impl Into<String>, observed: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::HealthCheckFailed,
            "Service did not become healthy",
            serde_json::json!({ "url": url.into(), "observed": observed.into() }),
        )
    }

    /// The request never produced a response (DNS, connect, timeout, TLS).
    pub fn http_request_failed(method: &str, url: impl Into<String>, error: impl Into<String>) -> Self {
        let url = url.into();
        let error = error.into();
        let message = format!("{} {} failed: {}", method, url, error);
        Self::new(
            ErrorCode::HttpRequestFailed,
            message,
            serde_json::json!({ "method": method, "url": url, "error": error }),
        )
    }

    pub fn internal_io(error: impl Into<String>, context: Option<String>) -> Self {
        let details = to_details(InternalIoErrorDetails {
            error: error.into(),
            context,
        });

        Self::new(ErrorCode::InternalIoError, "IO error", details)
    }

    pub fn internal_json(error: impl Into<String>, context: Option<String>) -> Self {
        Self::new(
            ErrorCode::InternalJsonError,
            "JSON error",
            serde_json::json!({ "error": error.into(), "context": context }),
        )
    }

    pub fn internal_unexpected(error: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InternalUnexpected,
            "Unexpected error",
            serde_json::json!({ "error": error.into() }),
        )
    }

    pub fn with_hint(mut self, message: impl Into<String>) -> Self {
        self.hints.push(Hint {
            message: message.into(),
        });
        self
    }

    /// True for transient connection failures that a retry may fix.
    pub fn is_connection_error(&self) -> bool {
        self.code == ErrorCode::SshConnectFailed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_failed_is_marked_retryable() {
        let err = Error::ssh_connect_failed(SshConnectFailedDetails {
            host: "deploy.example.com".to_string(),
            attempts: 3,
            exit_code: 255,
            stderr: "Connection refused".to_string(),
        });
        assert!(err.is_connection_error());
        assert_eq!(err.retryable, Some(true));
        assert_eq!(err.code.as_str(), "ssh.connect_failed");
        assert_eq!(err.details["attempts"], 3);
    }

    #[test]
    fn remote_command_failure_is_not_a_connection_error() {
        let err = Error::remote_command_failed(RemoteCommandFailedDetails {
            command: "cat .env".to_string(),
            exit_code: 1,
            stdout: String::new(),
            stderr: "No such file".to_string(),
            host: "deploy.example.com".to_string(),
        });
        assert!(!err.is_connection_error());
        assert_eq!(err.retryable, Some(false));
        assert_eq!(err.details["exitCode"], 1);
    }

    #[test]
    fn deploy_step_failure_names_the_step() {
        let err = Error::deploy_step_failed(DeployStepFailedDetails {
            step: "load-image".to_string(),
            exit_code: 125,
            stderr: String::new(),
        });
        assert_eq!(err.message, "Deploy step 'load-image' failed with exit code 125");
        assert_eq!(err.details["step"], "load-image");
    }

    #[test]
    fn with_hint_appends() {
        let err = Error::internal_unexpected("boom").with_hint("try again");
        assert_eq!(err.hints.len(), 1);
        assert_eq!(err.hints[0].message, "try again");
    }
}
