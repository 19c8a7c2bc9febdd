use std::io::Read;

use anyhow::Result;
use onekey_core::OnekeyError;
use reqwest::blocking::Client;
use tracing::debug;

pub struct FetchResponse {
    pub content_length: Option<u64>,
    pub body: Box<dyn Read + Send>,
}

pub trait Fetcher {
    fn get(&self, url: &str) -> Result<FetchResponse>;
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        // No request timeout: a stalled server stalls the foreground command.
        let client = Client::builder()
            .user_agent(concat!("frps-onekey/", env!("CARGO_PKG_VERSION")))
            .timeout(None)
            .build()
            .map_err(|err| OnekeyError::network("<client>", err))?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn get(&self, url: &str) -> Result<FetchResponse> {
        debug!(url, "http get");
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| OnekeyError::network(url, err))?;
        let status = response.status();
        if !status.is_success() {
            return Err(OnekeyError::network(url, format!("unexpected HTTP status {status}")).into());
        }
        Ok(FetchResponse {
            content_length: response.content_length(),
            body: Box::new(response),
        })
    }
}
