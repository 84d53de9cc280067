// # Strato Updater Real Environment Validation Tool
//
// Exercises the IP-echo resolver and the Strato updater against the real
// services, outside the controller.
//
// ## Usage
//
// ```bash
// # Dry-run mode (default - safe)
// DYNDNS_HOSTNAME=home.example.com \
// DYNDNS_PASSWORD=your_password \
// cargo run -p dyndns-demos --bin strato_validation
//
// # Live mode (makes actual changes!)
// DYNDNS_MODE=live \
// DYNDNS_HOSTNAME=home.example.com \
// DYNDNS_PASSWORD=your_password \
// DYNDNS_TEST_IP=1.2.3.4 \
// cargo run -p dyndns-demos --bin strato_validation
// ```
//
// ## Environment Variables
//
// Required:
// - `DYNDNS_HOSTNAME`: Hostname to update (also the username)
// - `DYNDNS_PASSWORD`: dyndns password for the hostname
//
// Optional:
// - `DYNDNS_TEST_IP`: Address to push (default: resolved via IP echo)
// - `DYNDNS_MODE`: "dry-run" or "live" (default: dry-run)

use dyndns_core::config::{DEFAULT_IP_ECHO_URL, DEFAULT_UPDATE_URL, IpVersion};
use dyndns_core::model::validate_fqdn;
use dyndns_core::traits::{DnsUpdater, IpResolver, UpdateOutcome, UpdateRequest};
use dyndns_ip_http::HttpIpResolver;
use dyndns_provider_strato::StratoUpdater;
use std::env;
use std::net::IpAddr;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("✗ {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> dyndns_core::Result<()> {
    tracing::info!("=== Strato Updater Real Environment Validation ===");

    // Read environment variables
    let hostname = env::var("DYNDNS_HOSTNAME")
        .map_err(|_| dyndns_core::Error::config("DYNDNS_HOSTNAME environment variable is required"))?;
    let password = env::var("DYNDNS_PASSWORD")
        .map_err(|_| dyndns_core::Error::config("DYNDNS_PASSWORD environment variable is required"))?;
    validate_fqdn(&hostname)?;

    let mode = env::var("DYNDNS_MODE").unwrap_or_else(|_| "dry-run".to_string());
    let dry_run = mode.to_lowercase() != "live";

    if dry_run {
        tracing::warn!("Running in DRY-RUN mode - no changes will be made");
    } else {
        tracing::warn!("Running in LIVE mode - will make actual DNS changes!");
    }

    // Step 1: determine the address
    tracing::info!("--- Step 1: Determining address ---");
    let ip: IpAddr = match env::var("DYNDNS_TEST_IP") {
        Ok(text) => text
            .parse()
            .map_err(|_| dyndns_core::Error::invalid_input(format!("Invalid IP address: {}", text)))?,
        Err(_) => {
            let resolver = HttpIpResolver::new(DEFAULT_IP_ECHO_URL, IpVersion::Both)?;
            let ip = resolver.resolve().await?;
            tracing::info!("✓ Resolved external ip via {}", resolver.url());
            ip
        }
    };
    tracing::info!("  Address: {}", ip);

    // Step 2: push it
    tracing::info!("--- Step 2: Testing DNS Update ---");
    let updater = StratoUpdater::new(DEFAULT_UPDATE_URL, dry_run)?;
    tracing::info!("✓ Updater ready: {:?}", updater);

    let request = UpdateRequest::new(&hostname, &password, ip);
    match updater.update(&request).await? {
        UpdateOutcome::Good => tracing::info!("✓ Provider answered good"),
        UpdateOutcome::NoChange => tracing::info!("✓ Provider answered nochg"),
    }

    // Step 3: the second call must be a no-op on the provider side
    tracing::info!("--- Step 3: Testing Idempotency ---");
    match updater.update(&request).await? {
        UpdateOutcome::NoChange => tracing::info!("✓ Idempotency verified (nochg as expected)"),
        UpdateOutcome::Good if dry_run => tracing::info!("✓ Dry-run answers good"),
        UpdateOutcome::Good => tracing::warn!("⚠ Provider answered good twice"),
    }

    tracing::info!("=== Validation Summary ===");
    tracing::info!("✓ Address resolution: OK");
    tracing::info!("✓ DNS update: OK");
    tracing::info!("✓ Security: password not logged");

    if dry_run {
        tracing::info!("No changes were made. To make actual changes, set DYNDNS_MODE=live");
    }

    Ok(())
}
