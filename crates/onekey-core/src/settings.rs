use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::config::ServiceConfig;
use crate::release::ReleaseSource;

pub const DEFAULT_SETTINGS_PATH: &str = "/etc/frps-onekey/settings.toml";
pub const SETTINGS_PATH_ENV: &str = "FRPS_ONEKEY_SETTINGS";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub source: Option<ReleaseSource>,
    pub arch: Option<String>,
    pub assume_yes: bool,
    pub service: ServiceConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsLocation {
    pub path: PathBuf,
    pub required: bool,
}

impl Settings {
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let settings: Self = toml::from_str(input).context("failed to parse onekey settings")?;
        settings
            .service
            .validate()
            .context("invalid [service] settings")?;
        if let Some(arch) = &settings.arch {
            if arch.trim().is_empty() {
                anyhow::bail!("arch must not be empty when set");
            }
        }
        Ok(settings)
    }

    pub fn load(location: &SettingsLocation) -> Result<Self> {
        let raw = match fs::read_to_string(&location.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound && !location.required => {
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("failed to read settings file: {}", location.path.display())
                });
            }
        };
        Self::from_toml_str(&raw)
            .with_context(|| format!("invalid settings file: {}", location.path.display()))
    }
}

/// An explicit path or the environment override must exist; the default path is optional.
pub fn resolve_settings_location(
    explicit: Option<&Path>,
    env_value: Option<OsString>,
) -> SettingsLocation {
    if let Some(path) = explicit {
        return SettingsLocation {
            path: path.to_path_buf(),
            required: true,
        };
    }
    if let Some(value) = env_value.filter(|value| !value.is_empty()) {
        return SettingsLocation {
            path: PathBuf::from(value),
            required: true,
        };
    }
    SettingsLocation {
        path: PathBuf::from(DEFAULT_SETTINGS_PATH),
        required: false,
    }
}
