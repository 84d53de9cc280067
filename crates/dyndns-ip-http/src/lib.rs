// # HTTP IP Resolver
//
// This crate provides the IP-echo based resolver used in dynamic mode.
//
// ## Architecture
//
// Each `resolve()` performs exactly one GET against an IP-echo service
// (by default https://myexternalip.com/raw) and parses the trimmed body as
// an IP address. Nothing is cached: every cycle sees a fresh value.
//
// Every failure (transport, non-2xx status, unparsable body, wrong address
// family) is reported as `Error::IpResolution` so the engine records it in
// status and retries after one interval.

use dyndns_core::config::{IpEchoConfig, IpVersion};
use dyndns_core::traits::IpResolver;
use dyndns_core::{Error, Result};

use std::net::IpAddr;
use std::time::Duration;

/// Default request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// IP-echo resolver
#[derive(Debug, Clone)]
pub struct HttpIpResolver {
    /// URL returning the caller's address as plain text
    url: String,

    /// Accepted address family
    version: IpVersion,

    /// HTTP client (carries the request timeout)
    client: reqwest::Client,
}

impl HttpIpResolver {
    /// Create a resolver with the default timeout
    ///
    /// # Parameters
    ///
    /// - `url`: IP-echo URL (e.g., "https://myexternalip.com/raw")
    /// - `version`: Accepted address family
    pub fn new(url: impl Into<String>, version: IpVersion) -> Result<Self> {
        Self::with_timeout(url, version, DEFAULT_TIMEOUT)
    }

    /// Create a resolver with a custom request timeout
    pub fn with_timeout(url: impl Into<String>, version: IpVersion, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: url.into(),
            version,
            client,
        })
    }

    /// Create a resolver from configuration
    pub fn from_config(config: &IpEchoConfig) -> Result<Self> {
        config.validate()?;
        Self::with_timeout(config.url.clone(), config.version, config.timeout())
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Parse and filter an IP-echo response body
    fn parse_body(&self, body: &str) -> Result<IpAddr> {
        let ip_text = body.trim();

        let ip: IpAddr = ip_text
            .parse()
            .map_err(|_| Error::ip_resolution(format!("Invalid IP address: {:?}", ip_text)))?;

        match self.version {
            IpVersion::V4 if !ip.is_ipv4() => {
                Err(Error::ip_resolution(format!("Expected IPv4, got: {}", ip)))
            }
            IpVersion::V6 if !ip.is_ipv6() => {
                Err(Error::ip_resolution(format!("Expected IPv6, got: {}", ip)))
            }
            _ => Ok(ip),
        }
    }
}

#[async_trait::async_trait]
impl IpResolver for HttpIpResolver {
    async fn resolve(&self) -> Result<IpAddr> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::ip_resolution(format!("Request to {} failed: {}", self.url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::ip_resolution(format!(
                "{} answered with HTTP {}",
                self.url, status
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::ip_resolution(format!("Failed to read response: {}", e)))?;

        let ip = self.parse_body(&body)?;
        tracing::debug!(ip = %ip, url = %self.url, "resolved external ip");
        Ok(ip)
    }

    fn resolver_name(&self) -> &'static str {
        "http"
    }
}
