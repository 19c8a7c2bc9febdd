use anyhow::Result;
use onekey_core::InstallTarget;
use tracing::info;

use crate::fs_utils::is_nonempty_file;
use crate::pipeline::{Interaction, Orchestrator, Stage};
use crate::service::{ServiceController, ServiceOutcome, UnregisterReport};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UninstallOutcome {
    NotInstalled,
    Declined,
    Uninstalled {
        stopped: bool,
        report: UnregisterReport,
    },
}

impl Orchestrator<'_> {
    pub fn uninstall(&self, ui: &mut dyn Interaction) -> Result<UninstallOutcome> {
        uninstall_service(self.target(), &self.service(), ui)
    }
}

/// Stops and removes frps without touching the network.
pub fn uninstall_service(
    target: &InstallTarget,
    service: &ServiceController<'_>,
    ui: &mut dyn Interaction,
) -> Result<UninstallOutcome> {
    ui.stage(Stage::CheckExisting);
    let present = target.init_script_path().exists()
        || is_nonempty_file(&target.binary_path())
        || target.install_dir().exists();
    if !present {
        return Ok(UninstallOutcome::NotInstalled);
    }
    if !ui.confirm("Uninstall frps and remove its configuration?") {
        return Ok(UninstallOutcome::Declined);
    }

    ui.stage(Stage::StopService);
    let stopped = match service.stop() {
        Ok(ServiceOutcome::Stopped) => true,
        Ok(_) => false,
        Err(err) => {
            ui.warn(&format!("failed to stop frps, removing anyway: {err:#}"));
            false
        }
    };

    ui.stage(Stage::RemoveService);
    let report = service.unregister();
    for failure in &report.failures {
        ui.warn(failure);
    }
    info!(removed = report.removed.len(), failures = report.failures.len(), "uninstall finished");
    Ok(UninstallOutcome::Uninstalled { stopped, report })
}
