//! Image archive export and transfer.
//!
//! The local archive name is unique per run; the remote name is fixed so the
//! deploy steps always find it in the same place.

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::{ReleaseContext, RemoteTarget};
use crate::error::{Error, Result};
use crate::ssh::RemoteSession;
use crate::utils::command;

/// Fixed archive name in the remote working directory.
pub const REMOTE_ARCHIVE_NAME: &str = "appflowy_cloud.tar";

/// A locally exported image archive. The file is removed when the handle drops.
#[derive(Debug)]
pub struct ArtifactHandle {
    pub local_path: PathBuf,
    pub size: u64,
}

impl Drop for ArtifactHandle {
    fn drop(&mut self) {
        if self.local_path.exists() {
            let _ = std::fs::remove_file(&self.local_path);
        }
    }
}

/// The archive after it landed on the remote host.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteArtifact {
    pub remote_path: String,
    pub size: u64,
}

/// Remote destination of every transfer for this target.
pub fn remote_archive_path(target: &RemoteTarget) -> String {
    target.path_in_work_dir(REMOTE_ARCHIVE_NAME)
}

/// Fresh local archive path in the system temp dir.
pub fn local_archive_path() -> PathBuf {
    std::env::temp_dir().join(format!("flowship-{}.tar", uuid::Uuid::new_v4()))
}

pub fn export(ctx: &ReleaseContext) -> Result<ArtifactHandle> {
    export_to(&ctx.docker_bin, &ctx.image, &local_archive_path())
}

/// Save `image` into an archive at `path`.
pub fn export_to(docker_bin: &str, image: &str, path: &Path) -> Result<ArtifactHandle> {
    log_status!("export", "Saving {} to {}", image, path.display());

    let args = vec![
        "save".to_string(),
        "-o".to_string(),
        path.to_string_lossy().to_string(),
        image.to_string(),
    ];
    let output = command::run_captured(docker_bin, &args, None);

    // Take ownership first so a partial archive is cleaned up on failure.
    let mut handle = ArtifactHandle {
        local_path: path.to_path_buf(),
        size: 0,
    };

    if !output.success {
        return Err(Error::artifact_export_failed(
            format!("Failed to export {}: {}", image, output.error_text()),
            output.exit_code,
        ));
    }

    handle.size = std::fs::metadata(path)
        .map_err(|e| {
            Error::artifact_export_failed(
                format!("Export reported success but {} is unreadable: {}", path.display(), e),
                output.exit_code,
            )
        })?
        .len();

    log_status!("export", "Archive ready ({} bytes)", handle.size);
    Ok(handle)
}

/// Upload the archive to its fixed remote path. The local copy is deleted
/// whether or not the upload succeeds.
pub fn transfer(
    session: &RemoteSession,
    target: &RemoteTarget,
    handle: ArtifactHandle,
) -> Result<RemoteArtifact> {
    let remote_path = remote_archive_path(target);
    log_status!(
        "transfer",
        "Uploading {} to {}:{}",
        handle.local_path.display(),
        session.target(),
        remote_path
    );

    let output = session.upload(&handle.local_path, &remote_path)?;
    if !output.success {
        return Err(Error::transfer_failed(
            handle.local_path.to_string_lossy(),
            remote_path,
            output.exit_code,
            output.error_text(),
        ));
    }

    log_status!("transfer", "Upload complete");
    Ok(RemoteArtifact {
        remote_path,
        size: handle.size,
    })
}
