use std::io::IsTerminal;
use std::time::Duration;

use anstyle::{AnsiColor, Effects, Style};
use indicatif::{ProgressBar, ProgressStyle};
use onekey_core::{InstallTarget, ServiceConfig};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum OutputStyle {
    Plain,
    Rich,
}

#[derive(Copy, Clone, Debug)]
pub(crate) struct TerminalRenderer {
    style: OutputStyle,
}

pub(crate) struct StageSpinner {
    progress_bar: ProgressBar,
}

impl TerminalRenderer {
    pub(crate) fn from_style(style: OutputStyle) -> Self {
        Self { style }
    }

    pub(crate) fn print_status(self, status: &str, message: &str) {
        println!("{}", render_status_line(self.style, status, message));
    }

    pub(crate) fn print_error(self, message: &str) {
        eprintln!("{}", render_status_line(self.style, "error", message));
    }

    pub(crate) fn print_section(self, title: &str) {
        if let Some(line) = render_section_header(self.style, title) {
            println!();
            println!("{}", colorize(section_style(), &line));
        }
    }

    pub(crate) fn print_lines(self, lines: &[String]) {
        for line in lines {
            println!("{line}");
        }
    }

    pub(crate) fn start_spinner(self, label: &str) -> Option<StageSpinner> {
        if self.style != OutputStyle::Rich {
            return None;
        }
        let progress_bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan.bold} {msg} {elapsed_precise}")
        {
            progress_bar.set_style(style.tick_chars("|/-\\ "));
        }
        progress_bar.set_message(label.to_string());
        progress_bar.enable_steady_tick(Duration::from_millis(80));
        Some(StageSpinner { progress_bar })
    }
}

impl StageSpinner {
    pub(crate) fn finish(self) {
        self.progress_bar.finish_and_clear();
    }
}

pub(crate) fn resolve_output_style(plain_flag: bool, no_color: bool, is_terminal: bool) -> OutputStyle {
    if plain_flag || no_color || !is_terminal {
        OutputStyle::Plain
    } else {
        OutputStyle::Rich
    }
}

pub(crate) fn current_output_style(plain_flag: bool) -> OutputStyle {
    let no_color = std::env::var_os("NO_COLOR").is_some_and(|value| !value.is_empty());
    resolve_output_style(plain_flag, no_color, std::io::stdout().is_terminal())
}

pub(crate) fn render_status_line(style: OutputStyle, status: &str, message: &str) -> String {
    match style {
        OutputStyle::Plain => message.to_string(),
        OutputStyle::Rich => format!("{} {message}", status_badge(status)),
    }
}

fn status_badge(status: &str) -> &'static str {
    match status {
        "ok" => "[OK]",
        "warn" => "[WARN]",
        "error" => "[ERR]",
        _ => "[..]",
    }
}

fn render_section_header(style: OutputStyle, title: &str) -> Option<String> {
    match style {
        OutputStyle::Plain => None,
        OutputStyle::Rich => Some(format!("== {title} ==")),
    }
}

fn section_style() -> Style {
    Style::new()
        .fg_color(Some(AnsiColor::BrightBlue.into()))
        .effects(Effects::BOLD)
}

fn colorize(style: Style, text: &str) -> String {
    format!("{}{}{}", style.render(), text, style.render_reset())
}

fn summary_row(label: &str, value: impl std::fmt::Display) -> String {
    format!("  {label:<18}: {value}")
}

fn settings_rows(config: &ServiceConfig, target: &InstallTarget, server_ip: &str) -> Vec<String> {
    let mut lines = vec![
        summary_row("Server IP", server_ip),
        summary_row("Bind port", config.bind_port),
    ];
    if let Some(port) = config.effective_kcp_bind_port() {
        lines.push(summary_row("KCP bind port", port));
    }
    if let Some(port) = config.effective_quic_bind_port() {
        lines.push(summary_row("QUIC bind port", port));
    }
    lines.extend([
        summary_row("vhost HTTP port", config.vhost_http_port),
        summary_row("vhost HTTPS port", config.vhost_https_port),
        summary_row(
            "Dashboard",
            format!("http://{server_ip}:{}/", config.dashboard_port),
        ),
        summary_row("Dashboard user", &config.dashboard_user),
        summary_row("Dashboard password", &config.dashboard_password),
        summary_row("Token", &config.token),
        summary_row("Subdomain host", config.effective_subdomain_host(server_ip)),
        summary_row("Max pool count", config.max_pool_count),
        summary_row("Log level", config.log_level.as_str()),
        summary_row("Log max days", config.log_max_days),
        summary_row(
            "Log file",
            if config.log_to_file {
                target.log_path().display().to_string()
            } else {
                "console".to_string()
            },
        ),
        summary_row("TCP mux", config.tcp_mux),
        summary_row("Config file", target.config_path().display()),
    ]);
    lines
}

pub(crate) fn format_install_review(
    config: &ServiceConfig,
    target: &InstallTarget,
    server_ip: &str,
) -> Vec<String> {
    let mut lines = vec!["frps will be installed with:".to_string()];
    lines.extend(settings_rows(config, target, server_ip));
    lines
}

pub(crate) fn format_install_summary(
    version: &str,
    config: &ServiceConfig,
    target: &InstallTarget,
    server_ip: &str,
) -> Vec<String> {
    let mut lines = vec![format!("frps {version} installed")];
    lines.extend(settings_rows(config, target, server_ip));
    lines.extend([
        String::new(),
        "Manage with: frps-onekey {start|stop|restart|status|config|update|uninstall}".to_string(),
    ]);
    lines
}
