use std::io::Read;
use std::net::IpAddr;

use anyhow::{Context, Result};
use onekey_core::{
    parse_release_document, OnekeyError, ReleaseInfo, ReleaseSource, PUBLIC_IP_URL,
};
use tracing::{debug, info, warn};

use crate::fetch::Fetcher;

pub const FALLBACK_SERVER_IP: &str = "127.0.0.1";

const MAX_RELEASE_DOCUMENT_BYTES: u64 = 4 * 1024 * 1024;

pub fn resolve_latest_release(fetcher: &dyn Fetcher, source: ReleaseSource) -> Result<ReleaseInfo> {
    let url = source.latest_api_url();
    info!(source = source.as_str(), url, "resolving latest release");
    let response = fetcher.get(url)?;
    let mut raw = Vec::new();
    response
        .body
        .take(MAX_RELEASE_DOCUMENT_BYTES)
        .read_to_end(&mut raw)
        .map_err(|err| OnekeyError::network(url, err))?;
    let release = parse_release_document(&raw)
        .with_context(|| format!("failed to resolve latest release from {}", source.as_str()))?;
    debug!(version = %release.version, "resolved latest release");
    Ok(release)
}

/// Best-effort lookup of this host's public address. Any failure yields the
/// loopback fallback.
pub fn detect_public_ip(fetcher: &dyn Fetcher) -> String {
    match fetch_public_ip(fetcher) {
        Ok(ip) => ip.to_string(),
        Err(err) => {
            warn!("public ip lookup failed, using {FALLBACK_SERVER_IP}: {err:#}");
            FALLBACK_SERVER_IP.to_string()
        }
    }
}

fn fetch_public_ip(fetcher: &dyn Fetcher) -> Result<IpAddr> {
    let response = fetcher.get(PUBLIC_IP_URL)?;
    let mut body = String::new();
    response
        .body
        .take(256)
        .read_to_string(&mut body)
        .map_err(|err| OnekeyError::network(PUBLIC_IP_URL, err))?;
    let ip = body
        .trim()
        .parse::<IpAddr>()
        .map_err(|err| OnekeyError::decode("public ip response", err))?;
    Ok(ip)
}
