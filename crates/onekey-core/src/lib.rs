mod config;
mod error;
mod layout;
mod platform;
mod release;
mod settings;
mod version;

pub use config::{
    random_alphanumeric, render_service_config, LogLevel, ServiceConfig, LOG_MAX_DAYS_LIMIT,
    MAX_POOL_COUNT_LIMIT,
};
pub use error::{error_kind, ErrorKind, OnekeyError};
pub use layout::{InstallTarget, CONFIG_FILE_NAME, LOG_FILE_NAME, SERVICE_NAME};
pub use platform::{host_service_arch, service_arch, OsFamily, DEPENDENCY_PACKAGES};
pub use release::{
    archive_download_url, archive_file_name, archive_stem, normalize_version_tag,
    parse_release_document, ReleaseInfo, ReleaseSource, INIT_SCRIPT_URL, PUBLIC_IP_URL,
};
pub use settings::{
    resolve_settings_location, Settings, SettingsLocation, DEFAULT_SETTINGS_PATH,
    SETTINGS_PATH_ENV,
};
pub use version::{compare_installed_version, parse_installed_version, VersionStatus};

#[cfg(test)]
mod tests;
