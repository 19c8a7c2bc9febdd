use std::env;
use std::fs;
use std::io::{self, BufRead, Write};
use std::process::Command;

use anyhow::{anyhow, bail, Context, Result};
use nix::unistd::Uid;
use onekey_core::{
    error_kind, resolve_settings_location, ErrorKind, InstallTarget, OnekeyError, ReleaseSource,
    Settings, SETTINGS_PATH_ENV,
};
use onekey_installer::{
    detect_public_ip, require_installed, uninstall_service, HostPlatform, HttpFetcher,
    InstallOutcome, InstallRequest, Interaction, Orchestrator, ServiceController, ServiceOutcome,
    Stage, StderrProgress, SystemRunner, UninstallOutcome, UpdateOutcome,
};
use tracing::{debug, warn};

use crate::prompt::{port_is_free, Prompter};
use crate::render::{
    format_install_review, format_install_summary, StageSpinner, TerminalRenderer,
};
use crate::{Cli, Commands};

const OS_RELEASE_PATH: &str = "/etc/os-release";
const DEFAULT_EDITOR: &str = "vi";

struct CommandContext {
    target: InstallTarget,
    platform: HostPlatform,
    settings: Settings,
    source_flag: Option<ReleaseSource>,
    assume_yes: bool,
    rooted: bool,
}

impl CommandContext {
    fn from_cli(cli: &Cli) -> Result<Self> {
        let location =
            resolve_settings_location(cli.settings.as_deref(), env::var_os(SETTINGS_PATH_ENV));
        let settings = Settings::load(&location)?;
        debug!(path = %location.path.display(), "loaded settings");

        let target = match &cli.root {
            Some(root) => InstallTarget::rooted(root),
            None => InstallTarget::system(),
        };
        let os_release = fs::read_to_string(OS_RELEASE_PATH).ok();
        let platform = HostPlatform::detect(os_release.as_deref(), settings.arch.as_deref());
        Ok(Self {
            target,
            platform,
            source_flag: cli.source.map(Into::into),
            assume_yes: cli.yes || settings.assume_yes,
            rooted: cli.root.is_some(),
            settings,
        })
    }

    fn service<'a>(&'a self, runner: &'a SystemRunner) -> ServiceController<'a> {
        ServiceController::new(runner, &self.target, self.platform.os_family)
    }

    /// Mutating commands need root unless the layout is re-anchored.
    fn require_root(&self) -> Result<()> {
        if self.rooted || Uid::effective().is_root() {
            return Ok(());
        }
        bail!("this command must be run as root (try sudo)")
    }
}

pub(crate) fn run_cli(cli: Cli, renderer: TerminalRenderer) -> Result<()> {
    let context = CommandContext::from_cli(&cli)?;
    let stdin = io::stdin();
    let mut prompter = Prompter::new(stdin.lock(), io::stdout());

    match cli.command {
        Commands::Install => {
            context.require_root()?;
            run_install(&context, renderer, &mut prompter)
        }
        Commands::Update => {
            context.require_root()?;
            run_update(&context, renderer, &mut prompter)
        }
        Commands::Uninstall => {
            context.require_root()?;
            run_uninstall(&context, renderer, &mut prompter)
        }
        Commands::Config => {
            context.require_root()?;
            run_config(&context, renderer, &mut prompter)
        }
        Commands::Start | Commands::Stop | Commands::Restart => {
            context.require_root()?;
            run_service_action(&context, renderer, cli.command)
        }
        Commands::Status => run_status(&context, renderer),
        Commands::Version => run_version(&context, renderer),
    }
}

pub(crate) fn choose_source<R: BufRead, W: Write>(
    flag: Option<ReleaseSource>,
    configured: Option<ReleaseSource>,
    assume_yes: bool,
    prompter: &mut Prompter<R, W>,
) -> Result<Option<ReleaseSource>> {
    if let Some(source) = flag.or(configured) {
        return Ok(Some(source));
    }
    if assume_yes {
        return Ok(Some(ReleaseSource::default()));
    }
    prompter.select_source()
}

struct CliInteraction<'p, R, W> {
    renderer: TerminalRenderer,
    prompter: &'p mut Prompter<R, W>,
    assume_yes: bool,
    spinner: Option<StageSpinner>,
}

impl<'p, R, W> CliInteraction<'p, R, W> {
    fn new(renderer: TerminalRenderer, prompter: &'p mut Prompter<R, W>, assume_yes: bool) -> Self {
        Self {
            renderer,
            prompter,
            assume_yes,
            spinner: None,
        }
    }

    fn finish_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish();
        }
    }
}

impl<R: BufRead, W: Write> Interaction for CliInteraction<'_, R, W> {
    fn stage(&mut self, stage: Stage) {
        self.finish_spinner();
        if stage == Stage::ProvisionDependencies {
            self.spinner = self.renderer.start_spinner(stage.label());
            if self.spinner.is_some() {
                return;
            }
        }
        self.renderer.print_status("step", stage.label());
    }

    fn warn(&mut self, message: &str) {
        self.finish_spinner();
        self.renderer.print_status("warn", message);
    }

    fn confirm(&mut self, question: &str) -> bool {
        self.finish_spinner();
        if self.assume_yes {
            return true;
        }
        match self.prompter.confirm(question, false) {
            Ok(answer) => answer,
            Err(err) => {
                warn!("treating unreadable answer as no: {err:#}");
                false
            }
        }
    }
}

impl<R, W> Drop for CliInteraction<'_, R, W> {
    fn drop(&mut self) {
        self.finish_spinner();
    }
}

/// Runs before any settings prompt or network call.
pub(crate) fn confirm_reinstall<R: BufRead, W: Write>(
    running: bool,
    assume_yes: bool,
    prompter: &mut Prompter<R, W>,
) -> Result<bool> {
    if !running || assume_yes {
        return Ok(true);
    }
    prompter.confirm("frps is already installed and running. Reinstall?", false)
}

fn run_install<R: BufRead, W: Write>(
    context: &CommandContext,
    renderer: TerminalRenderer,
    prompter: &mut Prompter<R, W>,
) -> Result<()> {
    renderer.print_section("install frps");
    let runner = SystemRunner;
    let already_running = context.service(&runner).is_running()?;
    if !confirm_reinstall(already_running, context.assume_yes, prompter)? {
        renderer.print_status("warn", "reinstall cancelled");
        return Ok(());
    }

    let Some(source) = choose_source(
        context.source_flag,
        context.settings.source,
        context.assume_yes,
        prompter,
    )?
    else {
        renderer.print_status("warn", "install aborted");
        return Ok(());
    };

    let fetcher = HttpFetcher::new()?;
    let server_ip = detect_public_ip(&fetcher);
    renderer.print_status("step", &format!("server ip: {server_ip}"));

    let is_free = |port: u16| already_running || port_is_free(port);
    let config = if context.assume_yes {
        context.settings.service.clone()
    } else {
        prompter.configure_service(context.settings.service.clone(), &server_ip, &is_free)?
    };
    if !already_running {
        for port in config.tcp_listen_ports() {
            if !port_is_free(port) {
                renderer.print_status("warn", &format!("port {port} is already in use"));
            }
        }
    }
    if !context.assume_yes {
        let review = format_install_review(&config, &context.target, &server_ip);
        if !prompter.review(&review, "Proceed with installation?")? {
            renderer.print_status("warn", "install aborted");
            return Ok(());
        }
    }

    let progress = StderrProgress;
    let orchestrator =
        Orchestrator::new(&context.target, &context.platform, &runner, &fetcher, &progress);
    let mut interaction = CliInteraction::new(renderer, prompter, context.assume_yes);
    let outcome = orchestrator.install(
        InstallRequest {
            source,
            config: &config,
            server_ip: &server_ip,
            reinstall_confirmed: true,
        },
        &mut interaction,
    )?;
    drop(interaction);

    match outcome {
        InstallOutcome::Declined => renderer.print_status("warn", "reinstall cancelled"),
        InstallOutcome::Installed { version, .. } => {
            renderer.print_status("ok", &format!("frps {version} is running"));
            renderer.print_lines(&format_install_summary(
                &version,
                &config,
                &context.target,
                &server_ip,
            ));
        }
    }
    Ok(())
}

fn run_update<R: BufRead, W: Write>(
    context: &CommandContext,
    renderer: TerminalRenderer,
    prompter: &mut Prompter<R, W>,
) -> Result<()> {
    renderer.print_section("update frps");
    require_installed(&context.target)?;
    let Some(source) = choose_source(
        context.source_flag,
        context.settings.source,
        context.assume_yes,
        prompter,
    )?
    else {
        renderer.print_status("warn", "update aborted");
        return Ok(());
    };

    let runner = SystemRunner;
    let fetcher = HttpFetcher::new()?;
    let progress = StderrProgress;
    let orchestrator =
        Orchestrator::new(&context.target, &context.platform, &runner, &fetcher, &progress);
    let mut interaction = CliInteraction::new(renderer, prompter, context.assume_yes);
    let outcome = orchestrator.update(source, &mut interaction)?;
    drop(interaction);

    for line in format_update_outcome(&outcome) {
        renderer.print_status("ok", &line);
    }
    Ok(())
}

pub(crate) fn format_update_outcome(outcome: &UpdateOutcome) -> Vec<String> {
    match outcome {
        UpdateOutcome::UpToDate { installed, latest } => {
            vec![format!("frps is up to date ({latest}; installed reports '{installed}')")]
        }
        UpdateOutcome::AheadOfLatest { installed, latest } => vec![format!(
            "installed frps '{installed}' is newer than the latest release {latest}; nothing to do"
        )],
        UpdateOutcome::Updated {
            previous,
            latest,
            reported,
        } => {
            let mut lines = vec![format!("updated frps from '{previous}' to {latest}")];
            if let Some(reported) = reported {
                lines.push(format!("frps --version: {reported}"));
            }
            lines
        }
    }
}

fn run_uninstall<R: BufRead, W: Write>(
    context: &CommandContext,
    renderer: TerminalRenderer,
    prompter: &mut Prompter<R, W>,
) -> Result<()> {
    renderer.print_section("uninstall frps");
    let runner = SystemRunner;
    let service = context.service(&runner);
    let mut interaction = CliInteraction::new(renderer, prompter, context.assume_yes);
    let outcome = uninstall_service(&context.target, &service, &mut interaction)?;
    drop(interaction);

    match outcome {
        UninstallOutcome::NotInstalled => renderer.print_status("warn", "frps is not installed"),
        UninstallOutcome::Declined => renderer.print_status("warn", "uninstall cancelled"),
        UninstallOutcome::Uninstalled { report, .. } => {
            for path in &report.removed {
                renderer.print_status("ok", &format!("removed {}", path.display()));
            }
            if !report.is_clean() {
                bail!(
                    "uninstall finished with {} error(s)",
                    report.failures.len()
                );
            }
            renderer.print_status("ok", "frps uninstalled");
        }
    }
    Ok(())
}

fn run_service_action(
    context: &CommandContext,
    renderer: TerminalRenderer,
    command: Commands,
) -> Result<()> {
    let runner = SystemRunner;
    let service = context.service(&runner);
    let outcome = match command {
        Commands::Start => service.start()?,
        Commands::Stop => service.stop()?,
        _ => service.restart()?,
    };
    let (status, message) = describe_service_outcome(outcome);
    renderer.print_status(status, message);
    Ok(())
}

pub(crate) fn describe_service_outcome(outcome: ServiceOutcome) -> (&'static str, &'static str) {
    match outcome {
        ServiceOutcome::Started => ("ok", "frps started"),
        ServiceOutcome::AlreadyRunning => ("warn", "frps is already running"),
        ServiceOutcome::Stopped => ("ok", "frps stopped"),
        ServiceOutcome::NotRunning => ("warn", "frps is not running"),
        ServiceOutcome::Restarted => ("ok", "frps restarted"),
    }
}

fn run_status(context: &CommandContext, renderer: TerminalRenderer) -> Result<()> {
    let runner = SystemRunner;
    let status = context.service(&runner).status()?;
    if status.running {
        renderer.print_status("ok", "frps is running");
        renderer.print_lines(&status.processes);
    } else {
        renderer.print_status("warn", "frps is not running");
    }
    match &status.config_path {
        Some(path) => renderer.print_status("step", &format!("config: {}", path.display())),
        None => renderer.print_status("warn", "config file not found"),
    }
    if let Some(path) = &status.log_path {
        renderer.print_status("step", &format!("log: {}", path.display()));
    }
    Ok(())
}

fn run_version(context: &CommandContext, renderer: TerminalRenderer) -> Result<()> {
    renderer.print_status(
        "step",
        &format!("frps-onekey {}", env!("CARGO_PKG_VERSION")),
    );
    let runner = SystemRunner;
    match context.service(&runner).installed_version() {
        Ok(version) => renderer.print_status("ok", &format!("frps {version}")),
        Err(err) if error_kind(&err) == Some(ErrorKind::NotInstalled) => {
            renderer.print_status("warn", "frps is not installed")
        }
        Err(err) => return Err(err),
    }
    renderer.print_status("step", &format!("arch: {}", context.platform.arch));
    let family = context
        .platform
        .os_family
        .map(|family| family.as_str())
        .unwrap_or("unsupported");
    renderer.print_status("step", &format!("os family: {family}"));
    Ok(())
}

fn run_config<R: BufRead, W: Write>(
    context: &CommandContext,
    renderer: TerminalRenderer,
    prompter: &mut Prompter<R, W>,
) -> Result<()> {
    let config_path = context.target.config_path();
    if !config_path.is_file() {
        return Err(OnekeyError::NotInstalled(config_path.display().to_string()).into());
    }

    let editor = env::var("EDITOR")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_EDITOR.to_string());
    let mut parts = editor.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| anyhow!("EDITOR is empty"))?;
    let status = Command::new(program)
        .args(parts)
        .arg(&config_path)
        .status()
        .with_context(|| format!("failed to launch editor '{editor}'"))?;
    if !status.success() {
        bail!("editor '{editor}' exited with {status}");
    }

    let restart = context.assume_yes
        || prompter.confirm("Restart frps to apply the configuration?", true)?;
    if !restart {
        renderer.print_status("step", "configuration saved; restart frps to apply it");
        return Ok(());
    }
    let runner = SystemRunner;
    let (status, message) = describe_service_outcome(context.service(&runner).restart()?);
    renderer.print_status(status, message);
    Ok(())
}
