use std::fs::{self, OpenOptions};
use std::io;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use onekey_core::{
    compare_installed_version, render_service_config, InstallTarget, OnekeyError, OsFamily,
    ReleaseSource, ServiceConfig, VersionStatus,
};
use tracing::{info, warn};

use crate::binary::{download_binary, install_binary, BinaryOutcome, BinaryRequest};
use crate::download::Downloader;
use crate::fetch::Fetcher;
use crate::fs_utils::{is_nonempty_file, write_atomic};
use crate::progress::{ProgressSink, REPORT_INTERVAL};
use crate::resolve::resolve_latest_release;
use crate::runner::{run_checked, CommandRunner};
use crate::service::{provision_init_script, ServiceController};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPlatform {
    pub os_family: Option<OsFamily>,
    pub arch: String,
}

impl HostPlatform {
    pub fn detect(os_release: Option<&str>, arch_override: Option<&str>) -> Self {
        Self {
            os_family: os_release.and_then(OsFamily::from_os_release),
            arch: arch_override
                .map(str::to_string)
                .unwrap_or_else(|| onekey_core::host_service_arch().to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    CheckExisting,
    ProvisionDependencies,
    ResolveRelease,
    RenderConfig,
    InstallBinary,
    WriteConfig,
    ProvisionInitScript,
    RegisterService,
    StartService,
    VerifyRunning,
    CheckVersion,
    StopService,
    BackupBinary,
    ReplaceBinary,
    RestoreBackup,
    RemoveService,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Self::CheckExisting => "checking for an existing installation",
            Self::ProvisionDependencies => "installing dependencies",
            Self::ResolveRelease => "resolving latest release",
            Self::RenderConfig => "generating configuration",
            Self::InstallBinary => "installing frps binary",
            Self::WriteConfig => "writing configuration",
            Self::ProvisionInitScript => "installing init script",
            Self::RegisterService => "registering service",
            Self::StartService => "starting service",
            Self::VerifyRunning => "verifying service",
            Self::CheckVersion => "checking installed version",
            Self::StopService => "stopping service",
            Self::BackupBinary => "backing up current binary",
            Self::ReplaceBinary => "replacing binary",
            Self::RestoreBackup => "restoring previous binary",
            Self::RemoveService => "removing service files",
        }
    }
}

/// Hooks for the caller's UI. The pipeline never prompts or prints itself.
pub trait Interaction {
    fn stage(&mut self, stage: Stage);
    fn warn(&mut self, message: &str);
    fn confirm(&mut self, question: &str) -> bool;
}

#[derive(Debug, Clone, Copy)]
pub struct InstallRequest<'a> {
    pub source: ReleaseSource,
    pub config: &'a ServiceConfig,
    pub server_ip: &'a str,
    /// Set when the caller already agreed to replace a running service.
    pub reinstall_confirmed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    Declined,
    Installed {
        version: String,
        binary: BinaryOutcome,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    UpToDate {
        installed: String,
        latest: String,
    },
    AheadOfLatest {
        installed: String,
        latest: String,
    },
    Updated {
        previous: String,
        latest: String,
        reported: Option<String>,
    },
}

/// Fails with [`OnekeyError::NotInstalled`] unless the frps binary is present.
pub fn require_installed(target: &InstallTarget) -> Result<()> {
    let binary_path = target.binary_path();
    if !is_nonempty_file(&binary_path) {
        return Err(OnekeyError::NotInstalled(binary_path.display().to_string()).into());
    }
    Ok(())
}

/// Drives install, update, and uninstall against one [`InstallTarget`].
/// Assumes it is the only process mutating that target.
pub struct Orchestrator<'a> {
    target: &'a InstallTarget,
    platform: &'a HostPlatform,
    runner: &'a dyn CommandRunner,
    fetcher: &'a dyn Fetcher,
    progress: &'a dyn ProgressSink,
    progress_interval: Duration,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        target: &'a InstallTarget,
        platform: &'a HostPlatform,
        runner: &'a dyn CommandRunner,
        fetcher: &'a dyn Fetcher,
        progress: &'a dyn ProgressSink,
    ) -> Self {
        Self {
            target,
            platform,
            runner,
            fetcher,
            progress,
            progress_interval: REPORT_INTERVAL,
        }
    }

    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn target(&self) -> &InstallTarget {
        self.target
    }

    pub fn service(&self) -> ServiceController<'a> {
        ServiceController::new(self.runner, self.target, self.platform.os_family)
    }

    pub(crate) fn downloader(&self) -> Downloader<'a> {
        Downloader::new(self.fetcher, self.progress).with_interval(self.progress_interval)
    }

    pub fn install(
        &self,
        request: InstallRequest<'_>,
        ui: &mut dyn Interaction,
    ) -> Result<InstallOutcome> {
        let service = self.service();

        ui.stage(Stage::CheckExisting);
        let was_running = service.is_running()?;
        if was_running
            && !request.reinstall_confirmed
            && !ui.confirm("frps is already installed and running. Reinstall?")
        {
            info!("reinstall declined");
            return Ok(InstallOutcome::Declined);
        }

        ui.stage(Stage::ProvisionDependencies);
        self.provision_dependencies()?;

        ui.stage(Stage::ResolveRelease);
        let release = resolve_latest_release(self.fetcher, request.source)?;

        ui.stage(Stage::RenderConfig);
        let rendered = render_service_config(request.config, self.target, request.server_ip)?;

        ui.stage(Stage::InstallBinary);
        let downloader = self.downloader();
        let binary = install_binary(
            self.target,
            &downloader,
            BinaryRequest {
                source: request.source,
                version: &release.version,
                arch: &self.platform.arch,
            },
        )?;

        ui.stage(Stage::WriteConfig);
        let config_path = self.target.config_path();
        write_atomic(&config_path, rendered.as_bytes())
            .with_context(|| format!("failed to write config {}", config_path.display()))?;

        ui.stage(Stage::ProvisionInitScript);
        provision_init_script(&downloader, self.target)?;

        ui.stage(Stage::RegisterService);
        service.register()?;

        ui.stage(Stage::StartService);
        if was_running {
            service.restart()?;
        } else {
            service.start()?;
        }

        ui.stage(Stage::VerifyRunning);
        if !service.is_running()? {
            return Err(OnekeyError::ServiceVerification(
                "frps is not running after installation".to_string(),
            )
            .into());
        }

        info!(version = %release.version, ?binary, "install complete");
        Ok(InstallOutcome::Installed {
            version: release.version,
            binary,
        })
    }

    pub fn update(&self, source: ReleaseSource, ui: &mut dyn Interaction) -> Result<UpdateOutcome> {
        let service = self.service();
        let binary_path = self.target.binary_path();
        let backup_path = self.target.backup_path();

        ui.stage(Stage::CheckVersion);
        require_installed(self.target)?;
        if backup_path.exists() {
            return Err(anyhow!(
                "backup {} already exists; another update may be in progress or a previous one was interrupted",
                backup_path.display()
            ));
        }
        let installed = service.installed_version()?;

        ui.stage(Stage::ResolveRelease);
        let latest = resolve_latest_release(self.fetcher, source)?.version;
        match compare_installed_version(&installed, &latest) {
            VersionStatus::UpToDate => {
                return Ok(UpdateOutcome::UpToDate { installed, latest });
            }
            VersionStatus::AheadOfLatest => {
                return Ok(UpdateOutcome::AheadOfLatest { installed, latest });
            }
            VersionStatus::UpgradeAvailable => {}
        }

        ui.stage(Stage::StopService);
        service.stop()?;

        ui.stage(Stage::BackupBinary);
        backup_binary(&binary_path, &backup_path)?;

        ui.stage(Stage::ReplaceBinary);
        let downloader = self.downloader();
        let replaced = download_binary(
            self.target,
            &downloader,
            BinaryRequest {
                source,
                version: &latest,
                arch: &self.platform.arch,
            },
        );
        if let Err(err) = replaced {
            ui.stage(Stage::RestoreBackup);
            if let Err(restore_err) = fs::rename(&backup_path, &binary_path) {
                return Err(anyhow!(
                    "update to {latest} failed: {err:#}; additionally failed to restore {} from {}: {restore_err}",
                    binary_path.display(),
                    backup_path.display()
                ));
            }
            return Err(err.context(format!(
                "update to {latest} failed; previous binary restored"
            )));
        }

        if let Err(err) = fs::remove_file(&backup_path) {
            warn!(path = %backup_path.display(), "failed to remove backup: {err}");
            ui.warn(&format!(
                "failed to remove backup {}: {err}",
                backup_path.display()
            ));
        }

        ui.stage(Stage::ProvisionInitScript);
        if let Err(err) = provision_init_script(&downloader, self.target) {
            ui.warn(&format!("keeping existing init script: {err:#}"));
        }

        ui.stage(Stage::RegisterService);
        if let Err(err) = service.register() {
            ui.warn(&format!("failed to refresh boot registration: {err:#}"));
        }

        ui.stage(Stage::StartService);
        service.start()?;

        let reported = match service.installed_version() {
            Ok(version) => Some(version),
            Err(err) => {
                ui.warn(&format!("could not read updated version: {err:#}"));
                None
            }
        };
        info!(previous = %installed, latest = %latest, "update complete");
        Ok(UpdateOutcome::Updated {
            previous: installed,
            latest,
            reported,
        })
    }

    fn provision_dependencies(&self) -> Result<()> {
        let family = self.platform.os_family.ok_or_else(|| {
            OnekeyError::UnsupportedPlatform(
                "only Debian and RedHat family hosts are supported".to_string(),
            )
        })?;
        for command in family.dependency_install_commands() {
            run_checked(self.runner, &command, "failed to install dependencies")?;
        }
        Ok(())
    }
}

fn backup_binary(binary_path: &std::path::Path, backup_path: &std::path::Path) -> Result<()> {
    // create_new doubles as the in-flight guard should two updates race.
    let mut backup = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(backup_path)
        .map_err(|err| OnekeyError::filesystem(backup_path, err))?;
    let copied = fs::File::open(binary_path)
        .and_then(|mut binary| io::copy(&mut binary, &mut backup))
        .and_then(|_| fs::metadata(binary_path))
        .and_then(|metadata| fs::set_permissions(backup_path, metadata.permissions()));
    if let Err(err) = copied {
        drop(backup);
        let _ = fs::remove_file(backup_path);
        return Err(OnekeyError::filesystem(backup_path, format!("backup failed: {err}")).into());
    }
    Ok(())
}
