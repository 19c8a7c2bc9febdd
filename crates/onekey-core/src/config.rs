use anyhow::{anyhow, Context, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::layout::InstallTarget;

const SECRET_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const HEARTBEAT_TIMEOUT_SECS: i64 = 90;
pub const MAX_POOL_COUNT_LIMIT: u32 = 50;
pub const LOG_MAX_DAYS_LIMIT: u32 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    #[default]
    Info,
    Warn,
    Error,
    Debug,
    Trace,
}

impl LogLevel {
    pub const ALL: [LogLevel; 5] = [
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
        LogLevel::Debug,
        LogLevel::Trace,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim().to_ascii_lowercase();
        if let Ok(index) = trimmed.parse::<usize>() {
            return index
                .checked_sub(1)
                .and_then(|index| Self::ALL.get(index).copied());
        }
        Self::ALL
            .iter()
            .copied()
            .find(|level| level.as_str() == trimmed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    pub bind_port: u16,
    pub vhost_http_port: u16,
    pub vhost_https_port: u16,
    pub dashboard_port: u16,
    pub dashboard_user: String,
    pub dashboard_password: String,
    pub token: String,
    pub subdomain_host: Option<String>,
    pub max_pool_count: u32,
    pub log_level: LogLevel,
    pub log_max_days: u32,
    pub log_to_file: bool,
    pub tcp_mux: bool,
    pub transport_protocols: bool,
    pub kcp_bind_port: Option<u16>,
    pub quic_bind_port: Option<u16>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_port: 5443,
            vhost_http_port: 80,
            vhost_https_port: 443,
            dashboard_port: 6443,
            dashboard_user: "admin".to_string(),
            dashboard_password: random_alphanumeric(8),
            token: random_alphanumeric(16),
            subdomain_host: None,
            max_pool_count: 5,
            log_level: LogLevel::Info,
            log_max_days: 3,
            log_to_file: true,
            tcp_mux: true,
            transport_protocols: true,
            kcp_bind_port: None,
            quic_bind_port: None,
        }
    }
}

impl ServiceConfig {
    pub fn validate(&self) -> Result<()> {
        let ports = [
            ("bind_port", Some(self.bind_port)),
            ("vhost_http_port", Some(self.vhost_http_port)),
            ("vhost_https_port", Some(self.vhost_https_port)),
            ("dashboard_port", Some(self.dashboard_port)),
            ("kcp_bind_port", self.kcp_bind_port),
            ("quic_bind_port", self.quic_bind_port),
        ];
        for (name, port) in ports {
            if port == Some(0) {
                return Err(anyhow!("{name} must be within 1-65535"));
            }
        }
        if !(1..=MAX_POOL_COUNT_LIMIT).contains(&self.max_pool_count) {
            return Err(anyhow!(
                "max_pool_count must be within 1-{MAX_POOL_COUNT_LIMIT}, got {}",
                self.max_pool_count
            ));
        }
        if !(1..=LOG_MAX_DAYS_LIMIT).contains(&self.log_max_days) {
            return Err(anyhow!(
                "log_max_days must be within 1-{LOG_MAX_DAYS_LIMIT}, got {}",
                self.log_max_days
            ));
        }
        for (name, value) in [
            ("dashboard_user", &self.dashboard_user),
            ("dashboard_password", &self.dashboard_password),
            ("token", &self.token),
        ] {
            if value.trim().is_empty() {
                return Err(anyhow!("{name} must not be empty"));
            }
        }
        Ok(())
    }

    pub fn effective_subdomain_host<'a>(&'a self, server_ip: &'a str) -> &'a str {
        self.subdomain_host
            .as_deref()
            .filter(|host| !host.trim().is_empty())
            .unwrap_or(server_ip)
    }

    pub fn effective_kcp_bind_port(&self) -> Option<u16> {
        self.transport_protocols
            .then(|| self.kcp_bind_port.unwrap_or(self.bind_port))
    }

    pub fn effective_quic_bind_port(&self) -> Option<u16> {
        self.transport_protocols
            .then(|| self.quic_bind_port.unwrap_or(self.vhost_https_port))
    }

    /// TCP ports frps will listen on, deduplicated in declaration order.
    pub fn tcp_listen_ports(&self) -> Vec<u16> {
        let mut ports = Vec::new();
        for port in [
            self.bind_port,
            self.vhost_http_port,
            self.vhost_https_port,
            self.dashboard_port,
        ] {
            if !ports.contains(&port) {
                ports.push(port);
            }
        }
        ports
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FrpsDocument<'a> {
    bind_addr: &'a str,
    bind_port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    kcp_bind_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    quic_bind_port: Option<u16>,
    #[serde(rename = "vhostHTTPPort")]
    vhost_http_port: u16,
    #[serde(rename = "vhostHTTPSPort")]
    vhost_https_port: u16,
    sub_domain_host: &'a str,
    transport: TransportSection,
    web_server: WebServerSection<'a>,
    log: LogSection<'a>,
    auth: AuthSection<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TransportSection {
    heartbeat_timeout: i64,
    max_pool_count: u32,
    tcp_mux: bool,
}

#[derive(Serialize)]
struct WebServerSection<'a> {
    addr: &'a str,
    port: u16,
    user: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LogSection<'a> {
    to: String,
    level: &'a str,
    max_days: u32,
}

#[derive(Serialize)]
struct AuthSection<'a> {
    method: &'a str,
    token: &'a str,
}

pub fn render_service_config(
    config: &ServiceConfig,
    target: &InstallTarget,
    server_ip: &str,
) -> Result<String> {
    config.validate()?;

    let log_to = if config.log_to_file {
        target.log_path().display().to_string()
    } else {
        "console".to_string()
    };
    let document = FrpsDocument {
        bind_addr: "0.0.0.0",
        bind_port: config.bind_port,
        kcp_bind_port: config.effective_kcp_bind_port(),
        quic_bind_port: config.effective_quic_bind_port(),
        vhost_http_port: config.vhost_http_port,
        vhost_https_port: config.vhost_https_port,
        sub_domain_host: config.effective_subdomain_host(server_ip),
        transport: TransportSection {
            heartbeat_timeout: HEARTBEAT_TIMEOUT_SECS,
            max_pool_count: config.max_pool_count,
            tcp_mux: config.tcp_mux,
        },
        web_server: WebServerSection {
            addr: "0.0.0.0",
            port: config.dashboard_port,
            user: &config.dashboard_user,
            password: &config.dashboard_password,
        },
        log: LogSection {
            to: log_to,
            level: config.log_level.as_str(),
            max_days: config.log_max_days,
        },
        auth: AuthSection {
            method: "token",
            token: &config.token,
        },
    };

    let body = toml::to_string(&document).context("failed to render frps configuration")?;
    Ok(format!(
        "# frps configuration generated by frps-onekey\n\n{body}"
    ))
}

pub fn random_alphanumeric(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| SECRET_CHARSET[rng.random_range(0..SECRET_CHARSET.len())] as char)
        .collect()
}
