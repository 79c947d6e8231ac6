use std::path::Path;
use std::process::Command;
use std::time::Duration;

use crate::config::RemoteTarget;
use crate::utils::command::{self, CommandOutput};
use crate::utils::shell;

/// One attempt at talking to the remote target. No retries at this layer.
pub trait RemoteTransport {
    /// Run `command` once on the target.
    fn exec_once(&self, command: &str) -> CommandOutput;

    /// Copy `local` to `remote_path` once.
    fn copy_once(&self, local: &Path, remote_path: &str) -> CommandOutput;

    /// Human-readable target name for logs and error details.
    fn describe(&self) -> String;
}

/// `ssh`/`scp` backed transport.
pub struct SshClient {
    pub host: String,
    pub user: String,
    pub port: u16,
    pub identity_file: Option<String>,
    pub connect_timeout: Duration,
    pub transfer_timeout: Duration,
    /// When true, all commands run locally instead of over SSH.
    /// Set automatically when the host is localhost/127.0.0.1/::1.
    pub is_local: bool,
}

impl SshClient {
    pub fn new(target: &RemoteTarget, connect_timeout: Duration, transfer_timeout: Duration) -> Self {
        let is_local = is_local_host(&target.host);
        if is_local {
            log_status!("ssh", "Host '{}' is localhost, using local execution", target.host);
        }

        Self {
            host: target.host.clone(),
            user: target.user.clone(),
            port: target.port,
            identity_file: target.identity_file.clone(),
            connect_timeout,
            transfer_timeout,
            is_local,
        }
    }

    /// Options shared by `ssh` and `scp`. Batch mode keeps a stalled
    /// connection or an unexpected prompt from hanging the run.
    fn common_options(&self, connect_timeout: Duration) -> Vec<String> {
        let mut args = Vec::new();

        if let Some(identity_file) = &self.identity_file {
            args.push("-i".to_string());
            args.push(identity_file.clone());
        }

        args.extend([
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", connect_timeout.as_secs().max(1)),
            "-o".to_string(),
            "ServerAliveInterval=15".to_string(),
            "-o".to_string(),
            "ServerAliveCountMax=3".to_string(),
        ]);

        args
    }

    pub fn build_ssh_args(&self, command: &str) -> Vec<String> {
        let mut args = self.common_options(self.connect_timeout);

        if self.port != 22 {
            args.push("-p".to_string());
            args.push(self.port.to_string());
        }

        args.push(format!("{}@{}", self.user, self.host));
        args.push(command.to_string());
        args
    }

    /// `transfer_timeout` only bounds the scp handshake; a stalled copy is
    /// cut off by the keepalive options.
    pub fn build_scp_args(&self, local: &Path, remote_path: &str) -> Vec<String> {
        let mut args = self.common_options(self.transfer_timeout);

        if self.port != 22 {
            args.push("-P".to_string());
            args.push(self.port.to_string());
        }

        args.push(local.to_string_lossy().to_string());
        args.push(format!(
            "{}@{}:{}",
            self.user,
            self.host,
            shell::quote_path(remote_path)
        ));
        args
    }
}

impl RemoteTransport for SshClient {
    fn exec_once(&self, command: &str) -> CommandOutput {
        if self.is_local {
            return command::run_shell(command, None);
        }

        let args = self.build_ssh_args(command);
        match Command::new("ssh").args(&args).output() {
            Ok(out) => CommandOutput::from_output(&out),
            Err(e) => CommandOutput::spawn_failure("SSH error", e),
        }
    }

    fn copy_once(&self, local: &Path, remote_path: &str) -> CommandOutput {
        if self.is_local {
            let cmd = format!("cat > {}", shell::quote_path(remote_path));
            return command::run_shell(&cmd, Some(local));
        }

        let args = self.build_scp_args(local, remote_path);
        match Command::new("scp").args(&args).output() {
            Ok(out) => CommandOutput::from_output(&out),
            Err(e) => CommandOutput::spawn_failure("SCP error", e),
        }
    }

    fn describe(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }
}

/// Check if a host address refers to the local machine.
pub fn is_local_host(host: &str) -> bool {
    matches!(host, "localhost" | "127.0.0.1" | "::1")
}

/// Exit status `ssh` uses for its own errors, as opposed to the remote command's status.
const SSH_CONNECTION_EXIT: i32 = 255;

/// Connection-level failure of a remote exec.
///
/// Only `ssh`'s own exit status (or failing to start it at all) counts. A
/// command that ran and exited nonzero is a command failure whatever its
/// stderr says.
pub fn is_transient_exec_error(output: &CommandOutput) -> bool {
    !output.success && (output.exit_code == SSH_CONNECTION_EXIT || output.exit_code == -1)
}

/// Connection-level failure of a file copy.
///
/// `scp` exits 1 for its own errors too, so the stderr is matched against
/// known transient patterns as well.
pub fn is_transient_copy_error(output: &CommandOutput) -> bool {
    if output.success {
        return false;
    }
    if is_transient_exec_error(output) {
        return true;
    }

    let stderr = output.stderr.to_lowercase();
    let transient_patterns = [
        "connection refused",
        "connection reset",
        "connection timed out",
        "operation timed out",
        "no route to host",
        "network is unreachable",
        "temporary failure in name resolution",
        "could not resolve hostname",
        "broken pipe",
        "ssh_exchange_identification",
        "kex_exchange_identification",
        "connection closed by remote host",
        "lost connection",
    ];

    transient_patterns.iter().any(|p| stderr.contains(p))
}
