mod client;
mod session;

#[cfg(test)]
pub(crate) use session::testing;

pub use client::{
    is_local_host, is_transient_copy_error, is_transient_exec_error, RemoteTransport, SshClient,
};
pub use session::RemoteSession;
