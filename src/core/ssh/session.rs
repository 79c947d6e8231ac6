use std::path::Path;

use crate::error::{Error, RemoteCommandFailedDetails, Result, SshConnectFailedDetails};
use crate::utils::command::CommandOutput;
use crate::utils::retry::{self, RetryPolicy};

use super::client::{is_transient_copy_error, is_transient_exec_error, RemoteTransport};

/// Remote execution with retry on connection-level failures only.
///
/// A command that ran and exited nonzero is never retried.
pub struct RemoteSession {
    transport: Box<dyn RemoteTransport>,
    policy: RetryPolicy,
}

impl RemoteSession {
    pub fn new(transport: Box<dyn RemoteTransport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn target(&self) -> String {
        self.transport.describe()
    }

    /// Run `command`, returning its output whatever the remote exit status.
    ///
    /// Errors only with `ssh.connect_failed` once the retry budget is spent.
    pub fn execute(&self, command: &str) -> Result<CommandOutput> {
        self.with_retry("ssh command", is_transient_exec_error, |transport| {
            transport.exec_once(command)
        })
    }

    /// Run `command` and return its stdout; a nonzero exit is a `remote.command_failed` error.
    pub fn run(&self, command: &str) -> Result<String> {
        let output = self.execute(command)?;
        if !output.success {
            return Err(Error::remote_command_failed(RemoteCommandFailedDetails {
                command: command.to_string(),
                exit_code: output.exit_code,
                stdout: output.stdout,
                stderr: output.stderr,
                host: self.target(),
            }));
        }
        Ok(output.stdout)
    }

    /// Copy a local file to `remote_path`, retrying connection failures.
    pub fn upload(&self, local: &Path, remote_path: &str) -> Result<CommandOutput> {
        self.with_retry("file transfer", is_transient_copy_error, |transport| {
            transport.copy_once(local, remote_path)
        })
    }

    fn with_retry<F>(
        &self,
        label: &str,
        is_transient: fn(&CommandOutput) -> bool,
        op: F,
    ) -> Result<CommandOutput>
    where
        F: Fn(&dyn RemoteTransport) -> CommandOutput,
    {
        retry::retry(&self.policy, label, Error::is_connection_error, |attempt| {
            let output = op(self.transport.as_ref());
            if is_transient(&output) {
                return Err(Error::ssh_connect_failed(SshConnectFailedDetails {
                    host: self.target(),
                    attempts: attempt,
                    exit_code: output.exit_code,
                    stderr: output.stderr.trim().to_string(),
                }));
            }
            Ok(output)
        })
    }
}
