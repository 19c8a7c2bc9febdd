use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Component, Path, PathBuf};

use anyhow::Result;
use flate2::read::GzDecoder;
use onekey_core::OnekeyError;
use tracing::debug;

use crate::fs_utils::set_mode;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtractReport {
    pub directories: usize,
    pub files: usize,
    pub skipped: usize,
    pub bytes: u64,
}

impl ExtractReport {
    fn entries(&self) -> usize {
        self.directories + self.files + self.skipped
    }
}

/// Unpacks a gzip-compressed tar archive into `dest`. Directories and
/// regular files keep their stored permission bits; links and special
/// entries are skipped.
pub fn extract_tar_gz(archive_path: &Path, dest: &Path) -> Result<ExtractReport> {
    let file = File::open(archive_path)
        .map_err(|err| OnekeyError::archive(archive_path, format!("failed to open: {err}")))?;
    let mut archive = tar::Archive::new(GzDecoder::new(BufReader::new(file)));
    fs::create_dir_all(dest).map_err(|err| OnekeyError::filesystem(dest, err))?;

    let mut report = ExtractReport::default();
    let entries = archive
        .entries()
        .map_err(|err| OnekeyError::archive(archive_path, err))?;
    for entry in entries {
        let mut entry = entry.map_err(|err| OnekeyError::archive(archive_path, err))?;
        let raw_path = entry
            .path()
            .map_err(|err| OnekeyError::archive(archive_path, err))?
            .into_owned();
        let relative = sanitize_entry_path(&raw_path).ok_or_else(|| {
            OnekeyError::archive(
                archive_path,
                format!("unsafe entry path '{}'", raw_path.display()),
            )
        })?;
        if relative.as_os_str().is_empty() {
            continue;
        }
        let target = dest.join(&relative);
        let stored_mode = entry.header().mode().ok().map(|mode| mode & 0o7777);
        let entry_type = entry.header().entry_type();

        if entry_type.is_dir() {
            fs::create_dir_all(&target).map_err(|err| OnekeyError::filesystem(&target, err))?;
            set_mode(&target, stored_mode.unwrap_or(0o755))?;
            report.directories += 1;
        } else if entry_type.is_file() {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|err| OnekeyError::filesystem(parent, err))?;
            }
            let mut out =
                File::create(&target).map_err(|err| OnekeyError::filesystem(&target, err))?;
            let copied = io::copy(&mut entry, &mut out).map_err(|err| {
                OnekeyError::archive(
                    archive_path,
                    format!("failed to extract '{}': {err}", relative.display()),
                )
            })?;
            set_mode(&target, stored_mode.unwrap_or(0o644))?;
            report.files += 1;
            report.bytes += copied;
        } else {
            debug!(entry = %relative.display(), kind = ?entry_type, "skipping archive entry");
            report.skipped += 1;
        }
    }

    if report.entries() == 0 {
        return Err(OnekeyError::archive(archive_path, "archive contains no entries").into());
    }
    Ok(report)
}

/// Returns `None` for entries that would escape the destination. The
/// archive root itself (`./`) maps to an empty path.
pub fn sanitize_entry_path(path: &Path) -> Option<PathBuf> {
    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(clean)
}
