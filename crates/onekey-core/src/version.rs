use semver::Version;

use crate::release::normalize_version_tag;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionStatus {
    UpToDate,
    UpgradeAvailable,
    AheadOfLatest,
}

pub fn parse_installed_version(version_output: &str) -> Option<Version> {
    version_output
        .split_whitespace()
        .map(normalize_version_tag)
        .map(|token| token.trim_end_matches(|ch: char| !ch.is_ascii_alphanumeric()))
        .find_map(|token| Version::parse(token).ok())
}

pub fn compare_installed_version(version_output: &str, latest: &str) -> VersionStatus {
    let installed = parse_installed_version(version_output);
    let latest_parsed = Version::parse(normalize_version_tag(latest)).ok();

    match (installed, latest_parsed) {
        (Some(installed), Some(latest)) => match installed.cmp(&latest) {
            std::cmp::Ordering::Less => VersionStatus::UpgradeAvailable,
            std::cmp::Ordering::Equal => VersionStatus::UpToDate,
            std::cmp::Ordering::Greater => VersionStatus::AheadOfLatest,
        },
        // Unparseable on either side: fall back to textual containment.
        _ if version_output.contains(latest) => VersionStatus::UpToDate,
        _ => VersionStatus::UpgradeAvailable,
    }
}
