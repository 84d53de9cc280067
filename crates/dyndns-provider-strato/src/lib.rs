// # Strato DynDNS Updater
//
// This crate provides the dyndns2 update call against Strato's endpoint.
//
// ## Protocol
//
// One GET per update:
//
// ```http
// GET /nic/update?hostname=home.example.com&myip=1.2.3.4
// Authorization: Basic base64(home.example.com:<password>)
// ```
//
// The response body decides the outcome, independent of the HTTP status:
//
// - contains `good`: address accepted
// - contains `nochg`: address already set
// - anything else (`badauth`, `nohost`, `abuse`, ...): rejected; the raw body
//   is carried in `Error::Update`
//
// ## Constraints
//
// - Exactly one request per `update()` call: retries belong to the dispatcher
// - Finite request timeout (30 seconds by default)
// - The password never appears in logs or `Debug` output
//
// ## API Reference
//
// - dyndns2 protocol: https://help.dyn.com/remote-access-api/perform-update/

use async_trait::async_trait;
use dyndns_core::config::{DEFAULT_UPDATE_URL, ProviderConfig};
use dyndns_core::traits::{DnsUpdater, UpdateOutcome, UpdateRequest};
use dyndns_core::{Error, Result};
use std::time::Duration;

/// Default HTTP timeout for update requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Strato dyndns2 updater
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the updater logs the request it would send and
/// reports `good` without contacting the provider.
#[derive(Clone)]
pub struct StratoUpdater {
    /// dyndns2 update endpoint
    update_url: String,

    /// HTTP client (carries the request timeout)
    client: reqwest::Client,

    /// Dry-run mode: if true, skip the request
    dry_run: bool,
}

// Client internals stay out of logs
impl std::fmt::Debug for StratoUpdater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StratoUpdater")
            .field("update_url", &self.update_url)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl StratoUpdater {
    /// Create an updater for `update_url` with the default timeout
    pub fn new(update_url: impl Into<String>, dry_run: bool) -> Result<Self> {
        Self::with_timeout(update_url, dry_run, DEFAULT_HTTP_TIMEOUT)
    }

    /// Create an updater with a custom request timeout
    pub fn with_timeout(
        update_url: impl Into<String>,
        dry_run: bool,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            update_url: update_url.into(),
            client,
            dry_run,
        })
    }

    /// Create an updater against Strato's public endpoint (live mode)
    pub fn new_live() -> Result<Self> {
        Self::new(DEFAULT_UPDATE_URL, false)
    }

    /// Create an updater from configuration
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        config.validate()?;
        Self::with_timeout(config.update_url.clone(), config.dry_run, config.timeout())
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }
}

/// Interpret a dyndns2 response body
pub fn parse_response(body: &str) -> Result<UpdateOutcome> {
    if body.contains("good") {
        Ok(UpdateOutcome::Good)
    } else if body.contains("nochg") {
        Ok(UpdateOutcome::NoChange)
    } else {
        Err(Error::update(body.trim()))
    }
}

#[async_trait]
impl DnsUpdater for StratoUpdater {
    async fn update(&self, request: &UpdateRequest<'_>) -> Result<UpdateOutcome> {
        if self.dry_run {
            tracing::info!(
                hostname = request.hostname,
                ip = %request.ip,
                "[DRY-RUN] Would send dyndns update"
            );
            return Ok(UpdateOutcome::Good);
        }

        let ip = request.ip.to_string();
        let response = self
            .client
            .get(&self.update_url)
            .basic_auth(request.username, Some(request.password))
            .query(&[("hostname", request.hostname), ("myip", ip.as_str())])
            .send()
            .await
            .map_err(|e| Error::http(format!("Update request failed: {}", e.without_url())))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::http(format!("Failed to read update response: {}", e)))?;

        tracing::debug!(
            hostname = request.hostname,
            status = %status,
            body = body.trim(),
            "dyndns update response"
        );

        parse_response(&body)
    }

    fn provider_name(&self) -> &'static str {
        "strato"
    }
}
