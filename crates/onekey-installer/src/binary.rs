use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use onekey_core::{
    archive_download_url, archive_file_name, archive_stem, InstallTarget, OnekeyError,
    ReleaseSource,
};
use tracing::{info, warn};

use crate::archive::extract_tar_gz;
use crate::download::{DownloadKind, Downloader};
use crate::fs_utils::{is_nonempty_file, set_executable, unique_run_id};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOutcome {
    ReusedExisting,
    Downloaded,
}

#[derive(Debug, Clone, Copy)]
pub struct BinaryRequest<'a> {
    pub source: ReleaseSource,
    pub version: &'a str,
    pub arch: &'a str,
}

/// Reuses a present binary, otherwise fetches it from the release archive.
pub fn install_binary(
    target: &InstallTarget,
    downloader: &Downloader<'_>,
    request: BinaryRequest<'_>,
) -> Result<BinaryOutcome> {
    let binary_path = target.binary_path();
    if is_nonempty_file(&binary_path) {
        info!(path = %binary_path.display(), "reusing installed binary");
        set_executable(&binary_path)?;
        return Ok(BinaryOutcome::ReusedExisting);
    }

    download_binary(target, downloader, request)?;
    Ok(BinaryOutcome::Downloaded)
}

/// Always downloads, staging inside the install directory so the final move
/// is a same-filesystem rename.
pub fn download_binary(
    target: &InstallTarget,
    downloader: &Downloader<'_>,
    request: BinaryRequest<'_>,
) -> Result<()> {
    let install_dir = target.install_dir();
    fs::create_dir_all(install_dir).map_err(|err| OnekeyError::filesystem(install_dir, err))?;

    let staging = target.staging_dir(&unique_run_id());
    fs::create_dir_all(&staging).map_err(|err| OnekeyError::filesystem(&staging, err))?;

    let result = stage_and_replace(target, downloader, request, &staging);
    if let Err(err) = fs::remove_dir_all(&staging) {
        warn!(path = %staging.display(), "failed to clean staging directory: {err}");
    }
    result
}

fn stage_and_replace(
    target: &InstallTarget,
    downloader: &Downloader<'_>,
    request: BinaryRequest<'_>,
    staging: &Path,
) -> Result<()> {
    let archive_path = staging.join(archive_file_name(request.version, request.arch));
    let url = archive_download_url(request.source, request.version, request.arch);
    downloader
        .download(&url, &archive_path, "Downloading frps", DownloadKind::Binary)
        .with_context(|| format!("failed to download frps {}", request.version))?;

    let extract_dir = staging.join("extract");
    let report = extract_tar_gz(&archive_path, &extract_dir)?;
    info!(files = report.files, skipped = report.skipped, "extracted release archive");

    let staged_binary = extract_dir
        .join(archive_stem(request.version, request.arch))
        .join(target.binary_name());
    if !staged_binary.is_file() {
        return Err(OnekeyError::archive(
            &archive_path,
            format!(
                "archive does not contain {}/{}",
                archive_stem(request.version, request.arch),
                target.binary_name()
            ),
        )
        .into());
    }
    set_executable(&staged_binary)?;

    let binary_path = target.binary_path();
    fs::rename(&staged_binary, &binary_path)
        .map_err(|err| OnekeyError::filesystem(&binary_path, err))
        .with_context(|| format!("failed to move {} into place", staged_binary.display()))?;
    Ok(())
}
