use std::io::{BufRead, Write};
use std::net::TcpListener;
use std::ops::RangeInclusive;

use anyhow::{anyhow, Context, Result};
use onekey_core::{
    LogLevel, ReleaseSource, ServiceConfig, LOG_MAX_DAYS_LIMIT, MAX_POOL_COUNT_LIMIT,
};

pub(crate) fn port_is_free(port: u16) -> bool {
    TcpListener::bind(("0.0.0.0", port)).is_ok()
}

pub(crate) struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub(crate) fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn read_answer(&mut self, prompt: &str) -> Result<String> {
        write!(self.output, "{prompt}").context("failed to write prompt")?;
        self.output.flush().context("failed to flush prompt")?;
        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .context("failed to read answer")?;
        if read == 0 {
            return Err(anyhow!("input closed while waiting for an answer"));
        }
        Ok(line.trim().to_string())
    }

    fn say(&mut self, message: &str) -> Result<()> {
        writeln!(self.output, "{message}").context("failed to write prompt")
    }

    pub(crate) fn ask(&mut self, question: &str, default: &str) -> Result<String> {
        let answer = self.read_answer(&format!("{question} [{default}]: "))?;
        if answer.is_empty() {
            return Ok(default.to_string());
        }
        Ok(answer)
    }

    pub(crate) fn confirm(&mut self, question: &str, default: bool) -> Result<bool> {
        let hint = if default { "Y/n" } else { "y/N" };
        loop {
            let answer = self.read_answer(&format!("{question} [{hint}]: "))?;
            match answer.to_ascii_lowercase().as_str() {
                "" => return Ok(default),
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => self.say("Please answer y or n.")?,
            }
        }
    }

    pub(crate) fn review(&mut self, lines: &[String], question: &str) -> Result<bool> {
        for line in lines {
            self.say(line)?;
        }
        self.confirm(question, true)
    }

    /// `None` means the user typed `exit`.
    pub(crate) fn select_source(&mut self) -> Result<Option<ReleaseSource>> {
        self.say("Select a download source:")?;
        self.say("  1) gitee")?;
        self.say("  2) github (default)")?;
        loop {
            let answer = self.read_answer("Enter 1, 2 or exit [2]: ")?;
            if answer.eq_ignore_ascii_case("exit") {
                return Ok(None);
            }
            if answer.is_empty() {
                return Ok(Some(ReleaseSource::default()));
            }
            match ReleaseSource::parse(&answer) {
                Some(source) => return Ok(Some(source)),
                None => self.say("Invalid choice.")?,
            }
        }
    }

    pub(crate) fn ask_port(
        &mut self,
        label: &str,
        default: u16,
        is_free: &dyn Fn(u16) -> bool,
    ) -> Result<u16> {
        loop {
            let answer = self.ask(&format!("{label} (1-65535)"), &default.to_string())?;
            let port = match answer.parse::<u16>() {
                Ok(port) if port > 0 => port,
                _ => {
                    self.say("Please enter a port between 1 and 65535.")?;
                    continue;
                }
            };
            if !is_free(port) {
                self.say(&format!("Port {port} is already in use, choose another."))?;
                continue;
            }
            return Ok(port);
        }
    }

    pub(crate) fn ask_bounded(
        &mut self,
        label: &str,
        default: u32,
        range: RangeInclusive<u32>,
    ) -> Result<u32> {
        loop {
            let answer = self.ask(
                &format!("{label} ({}-{})", range.start(), range.end()),
                &default.to_string(),
            )?;
            match answer.parse::<u32>() {
                Ok(value) if range.contains(&value) => return Ok(value),
                _ => self.say(&format!(
                    "Please enter a number between {} and {}.",
                    range.start(),
                    range.end()
                ))?,
            }
        }
    }

    pub(crate) fn ask_text(&mut self, label: &str, default: &str) -> Result<String> {
        loop {
            let answer = self.ask(label, default)?;
            if !answer.trim().is_empty() {
                return Ok(answer);
            }
            self.say("A value is required.")?;
        }
    }

    pub(crate) fn ask_log_level(&mut self, default: LogLevel) -> Result<LogLevel> {
        let choices = LogLevel::ALL
            .iter()
            .enumerate()
            .map(|(index, level)| format!("{}) {}", index + 1, level.as_str()))
            .collect::<Vec<_>>()
            .join("  ");
        self.say(&format!("Log levels: {choices}"))?;
        loop {
            let answer = self.ask("Log level", default.as_str())?;
            match LogLevel::parse(&answer) {
                Some(level) => return Ok(level),
                None => self.say("Unknown log level.")?,
            }
        }
    }

    pub(crate) fn configure_service(
        &mut self,
        base: ServiceConfig,
        server_ip: &str,
        is_free: &dyn Fn(u16) -> bool,
    ) -> Result<ServiceConfig> {
        let mut config = base;
        config.bind_port = self.ask_port("Bind port", config.bind_port, is_free)?;
        config.vhost_http_port = self.ask_port("vhost HTTP port", config.vhost_http_port, is_free)?;
        config.vhost_https_port =
            self.ask_port("vhost HTTPS port", config.vhost_https_port, is_free)?;
        config.dashboard_port = self.ask_port("Dashboard port", config.dashboard_port, is_free)?;
        config.dashboard_user = self.ask_text("Dashboard user", &config.dashboard_user)?;
        config.dashboard_password =
            self.ask_text("Dashboard password", &config.dashboard_password)?;
        config.token = self.ask_text("Token", &config.token)?;
        let subdomain_default = config.effective_subdomain_host(server_ip).to_string();
        let subdomain = self.ask_text("Subdomain host", &subdomain_default)?;
        config.subdomain_host = (subdomain != server_ip).then_some(subdomain);
        config.max_pool_count =
            self.ask_bounded("Max pool count", config.max_pool_count, 1..=MAX_POOL_COUNT_LIMIT)?;
        config.log_level = self.ask_log_level(config.log_level)?;
        config.log_max_days =
            self.ask_bounded("Log max days", config.log_max_days, 1..=LOG_MAX_DAYS_LIMIT)?;
        config.log_to_file = self.confirm("Write logs to file?", config.log_to_file)?;
        config.tcp_mux = self.confirm("Enable TCP multiplexing?", config.tcp_mux)?;
        config.transport_protocols =
            self.confirm("Enable KCP and QUIC transports?", config.transport_protocols)?;
        if config.transport_protocols {
            let kcp_default = config.kcp_bind_port.unwrap_or(config.bind_port);
            config.kcp_bind_port = Some(self.ask_port("KCP bind port", kcp_default, is_free)?);
            let quic_default = config.quic_bind_port.unwrap_or(config.vhost_https_port);
            config.quic_bind_port = Some(self.ask_port("QUIC bind port", quic_default, is_free)?);
        }
        config.validate()?;
        Ok(config)
    }
}
