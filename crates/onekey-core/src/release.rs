use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::error::OnekeyError;

pub const GITHUB_LATEST_API: &str = "https://api.github.com/repos/fatedier/frp/releases/latest";
pub const GITEE_LATEST_API: &str =
    "https://gitee.com/api/v5/repos/mvscode/frps-onekey/releases/latest";
pub const GITHUB_DOWNLOAD_BASE: &str = "https://github.com/fatedier/frp/releases/download";
pub const GITEE_DOWNLOAD_BASE: &str = "https://gitee.com/mvscode/frps-onekey/releases/download";
pub const INIT_SCRIPT_URL: &str =
    "https://raw.githubusercontent.com/mvscode/frps-onekey/master/frps.init";
pub const PUBLIC_IP_URL: &str = "https://api.ipify.org";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseSource {
    Gitee,
    #[default]
    Github,
}

impl ReleaseSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gitee => "gitee",
            Self::Github => "github",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "1" | "gitee" => Some(Self::Gitee),
            "2" | "github" => Some(Self::Github),
            _ => None,
        }
    }

    pub fn latest_api_url(self) -> &'static str {
        match self {
            Self::Gitee => GITEE_LATEST_API,
            Self::Github => GITHUB_LATEST_API,
        }
    }

    pub fn download_base_url(self) -> &'static str {
        match self {
            Self::Gitee => GITEE_DOWNLOAD_BASE,
            Self::Github => GITHUB_DOWNLOAD_BASE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseInfo {
    pub version: String,
}

#[derive(Debug, Deserialize)]
struct ReleaseDocument {
    tag_name: String,
}

pub fn parse_release_document(raw: &[u8]) -> Result<ReleaseInfo> {
    let document: ReleaseDocument = serde_json::from_slice(raw)
        .map_err(|err| OnekeyError::decode("release metadata", err))?;
    let version = normalize_version_tag(&document.tag_name);
    if version.is_empty() {
        return Err(OnekeyError::decode(
            "release metadata",
            format!("tag_name '{}' carries no version", document.tag_name),
        )
        .into());
    }
    Ok(ReleaseInfo {
        version: version.to_string(),
    })
}

/// Strips any leading non-numeric prefix from a release tag.
pub fn normalize_version_tag(tag: &str) -> &str {
    tag.trim().trim_start_matches(|ch: char| !ch.is_ascii_digit())
}

pub fn archive_stem(version: &str, arch: &str) -> String {
    format!("frp_{version}_linux_{arch}")
}

pub fn archive_file_name(version: &str, arch: &str) -> String {
    format!("{}.tar.gz", archive_stem(version, arch))
}

pub fn archive_download_url(source: ReleaseSource, version: &str, arch: &str) -> String {
    format!(
        "{}/v{}/{}",
        source.download_base_url(),
        version,
        archive_file_name(version, arch)
    )
}
