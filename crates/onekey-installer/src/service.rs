use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use onekey_core::{InstallTarget, OnekeyError, OsFamily, INIT_SCRIPT_URL};
use tracing::{info, warn};

use crate::download::{DownloadKind, Downloader};
use crate::fs_utils::{is_nonempty_file, remove_file_if_exists, set_executable};
use crate::runner::{argv, run_checked, CommandRunner};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceAction {
    Start,
    Stop,
    Restart,
}

impl ServiceAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Restart => "restart",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceOutcome {
    Started,
    AlreadyRunning,
    Stopped,
    NotRunning,
    Restarted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceStatus {
    pub running: bool,
    pub processes: Vec<String>,
    pub config_path: Option<PathBuf>,
    pub log_path: Option<PathBuf>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UnregisterReport {
    pub boot_unregistered: bool,
    pub removed: Vec<PathBuf>,
    pub failures: Vec<String>,
}

impl UnregisterReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct ServiceController<'a> {
    runner: &'a dyn CommandRunner,
    target: &'a InstallTarget,
    os_family: Option<OsFamily>,
}

impl<'a> ServiceController<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        target: &'a InstallTarget,
        os_family: Option<OsFamily>,
    ) -> Self {
        Self {
            runner,
            target,
            os_family,
        }
    }

    /// True iff a process named exactly like the service binary exists.
    pub fn is_running(&self) -> Result<bool> {
        let output = self
            .runner
            .run(&argv(["pgrep", "-x", self.target.binary_name()]))
            .context("failed to probe service process")?;
        match output.code {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => Err(OnekeyError::Command {
                context: "pgrep failed".to_string(),
                status: format!("{:?}", output.code),
                stdout: output.stdout.trim().to_string(),
                stderr: output.stderr.trim().to_string(),
            }
            .into()),
        }
    }

    pub fn register(&self) -> Result<()> {
        let family = self.require_os_family()?;
        run_checked(
            self.runner,
            &family.boot_register_command(),
            "failed to register service for boot",
        )?;
        self.replace_symlink()
    }

    pub fn start(&self) -> Result<ServiceOutcome> {
        if self.is_running()? {
            info!("service already running");
            return Ok(ServiceOutcome::AlreadyRunning);
        }
        self.invoke(ServiceAction::Start)?;
        self.verify_running(ServiceAction::Start)?;
        Ok(ServiceOutcome::Started)
    }

    pub fn stop(&self) -> Result<ServiceOutcome> {
        if !self.is_running()? {
            info!("service not running");
            return Ok(ServiceOutcome::NotRunning);
        }
        self.invoke(ServiceAction::Stop)?;
        if self.is_running()? {
            return Err(OnekeyError::ServiceVerification(
                "service is still running after stop".to_string(),
            )
            .into());
        }
        Ok(ServiceOutcome::Stopped)
    }

    pub fn restart(&self) -> Result<ServiceOutcome> {
        self.invoke(ServiceAction::Restart)?;
        self.verify_running(ServiceAction::Restart)?;
        Ok(ServiceOutcome::Restarted)
    }

    /// Removes boot registration and every installed path. Individual
    /// failures are collected rather than aborting the remaining steps.
    pub fn unregister(&self) -> UnregisterReport {
        let mut report = UnregisterReport::default();

        match self.require_os_family() {
            Ok(family) => match run_checked(
                self.runner,
                &family.boot_unregister_command(),
                "failed to remove boot registration",
            ) {
                Ok(_) => report.boot_unregistered = true,
                Err(err) => report.failures.push(format!("{err:#}")),
            },
            Err(err) => report.failures.push(format!("{err:#}")),
        }

        for path in self.target.removal_paths() {
            match remove_path(&path) {
                Ok(true) => report.removed.push(path),
                Ok(false) => {}
                Err(err) => {
                    warn!(path = %path.display(), "removal failed: {err}");
                    report
                        .failures
                        .push(format!("failed to remove {}: {err}", path.display()));
                }
            }
        }
        report
    }

    pub fn installed_version(&self) -> Result<String> {
        let binary_path = self.target.binary_path();
        if !is_nonempty_file(&binary_path) {
            return Err(OnekeyError::NotInstalled(binary_path.display().to_string()).into());
        }
        let output = run_checked(
            self.runner,
            &[binary_path.display().to_string(), "--version".to_string()],
            "failed to query installed version",
        )?;
        Ok(output.stdout.trim().to_string())
    }

    pub fn status(&self) -> Result<ServiceStatus> {
        let running = self.is_running()?;
        let processes = if running {
            self.process_lines()?
        } else {
            Vec::new()
        };
        let config_path = Some(self.target.config_path()).filter(|path| path.is_file());
        let log_path = Some(self.target.log_path()).filter(|path| path.is_file());
        Ok(ServiceStatus {
            running,
            processes,
            config_path,
            log_path,
        })
    }

    fn process_lines(&self) -> Result<Vec<String>> {
        let output = run_checked(self.runner, &argv(["ps", "aux"]), "failed to list processes")?;
        let name = self.target.binary_name();
        Ok(output
            .stdout
            .lines()
            .filter(|line| line.contains(name) && !line.contains("grep"))
            .map(|line| line.trim_end().to_string())
            .collect())
    }

    fn invoke(&self, action: ServiceAction) -> Result<()> {
        let init_script = self.target.init_script_path();
        if !init_script.is_file() {
            return Err(OnekeyError::NotInstalled(init_script.display().to_string()).into());
        }
        info!(action = action.as_str(), "invoking init script");
        run_checked(
            self.runner,
            &[init_script.display().to_string(), action.as_str().to_string()],
            &format!("failed to {} service", action.as_str()),
        )?;
        Ok(())
    }

    fn verify_running(&self, action: ServiceAction) -> Result<()> {
        if self.is_running()? {
            return Ok(());
        }
        Err(OnekeyError::ServiceVerification(format!(
            "service is not running after {}",
            action.as_str()
        ))
        .into())
    }

    fn require_os_family(&self) -> Result<OsFamily> {
        self.os_family.ok_or_else(|| {
            OnekeyError::UnsupportedPlatform(
                "boot registration requires a Debian or RedHat family host".to_string(),
            )
            .into()
        })
    }

    fn replace_symlink(&self) -> Result<()> {
        let link = self.target.symlink_path();
        if let Some(parent) = link.parent() {
            fs::create_dir_all(parent).map_err(|err| OnekeyError::filesystem(parent, err))?;
        }
        remove_file_if_exists(link).map_err(|err| OnekeyError::filesystem(link, err))?;
        create_symlink(self.target.init_script_path(), link)
            .map_err(|err| OnekeyError::filesystem(link, err))?;
        Ok(())
    }
}

/// Fetches the init script next to a temp name, then renames it into place.
pub fn provision_init_script(downloader: &Downloader<'_>, target: &InstallTarget) -> Result<()> {
    let script_path = target.init_script_path();
    if let Some(parent) = script_path.parent() {
        fs::create_dir_all(parent).map_err(|err| OnekeyError::filesystem(parent, err))?;
    }
    let partial = script_path.with_extension("part");
    let result = downloader
        .download(
            INIT_SCRIPT_URL,
            &partial,
            "Downloading init script",
            DownloadKind::Script,
        )
        .and_then(|_| set_executable(&partial))
        .and_then(|_| {
            fs::rename(&partial, script_path)
                .map_err(|err| OnekeyError::filesystem(script_path, err).into())
        });
    if result.is_err() {
        let _ = remove_file_if_exists(&partial);
    }
    result
}

fn remove_path(path: &Path) -> io::Result<bool> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err),
    };
    if metadata.is_dir() {
        fs::remove_dir_all(path)?;
    } else {
        fs::remove_file(path)?;
    }
    Ok(true)
}

#[cfg(unix)]
fn create_symlink(original: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(original, link)
}

#[cfg(not(unix))]
fn create_symlink(_original: &Path, _link: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "symlinks are only supported on unix hosts",
    ))
}
