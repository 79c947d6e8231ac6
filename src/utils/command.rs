//! Local process execution with captured or passed-through output.

use serde::Serialize;
use std::path::Path;
use std::process::{Command, Output, Stdio};

/// Result of one process run, local or remote.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandOutput {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub stdout: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub stderr: String,
    pub success: bool,
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn from_output(out: &Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&out.stdout).to_string(),
            stderr: String::from_utf8_lossy(&out.stderr).to_string(),
            success: out.status.success(),
            exit_code: out.status.code().unwrap_or(-1),
        }
    }

    /// A failure that never reached the target program.
    pub fn spawn_failure(context: &str, err: impl std::fmt::Display) -> Self {
        Self {
            stdout: String::new(),
            stderr: format!("{}: {}", context, err),
            success: false,
            exit_code: -1,
        }
    }

    /// Prefers stderr, falls back to stdout if stderr is empty.
    pub fn error_text(&self) -> &str {
        if self.stderr.trim().is_empty() {
            self.stdout.trim()
        } else {
            self.stderr.trim()
        }
    }
}

/// Run a program with captured stdout/stderr.
pub fn run_captured(program: &str, args: &[String], current_dir: Option<&Path>) -> CommandOutput {
    let mut cmd = Command::new(program);
    cmd.args(args);
    if let Some(dir) = current_dir {
        cmd.current_dir(dir);
    }

    match cmd.output() {
        Ok(out) => CommandOutput::from_output(&out),
        Err(e) => CommandOutput::spawn_failure(&format!("Failed to run {}", program), e),
    }
}

/// Run a program with stdout/stderr passed through to the terminal.
/// Only the exit status is captured.
pub fn run_passthrough(program: &str, args: &[String], current_dir: Option<&Path>) -> CommandOutput {
    let mut cmd = Command::new(program);
    cmd.args(args).stdout(Stdio::inherit()).stderr(Stdio::inherit());
    if let Some(dir) = current_dir {
        cmd.current_dir(dir);
    }

    match cmd.status() {
        Ok(status) => CommandOutput {
            stdout: String::new(),
            stderr: String::new(),
            success: status.success(),
            exit_code: status.code().unwrap_or(-1),
        },
        Err(e) => CommandOutput::spawn_failure(&format!("Failed to run {}", program), e),
    }
}

/// Run a shell command line through `sh -c`.
pub fn run_shell(command: &str, stdin_file: Option<&Path>) -> CommandOutput {
    let mut cmd = Command::new("sh");
    cmd.args(["-c", command]);

    if let Some(path) = stdin_file {
        match std::fs::File::open(path) {
            Ok(file) => {
                cmd.stdin(file);
            }
            Err(e) => return CommandOutput::spawn_failure("Failed to open stdin file", e),
        }
    }

    match cmd.output() {
        Ok(out) => CommandOutput::from_output(&out),
        Err(e) => CommandOutput::spawn_failure("Command error", e),
    }
}
