// # dyndnsd - dyndns controller daemon
//
// Thin integration layer: all decisions live in dyndns-core.
//
// The dyndnsd daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Wiring the stores, the IP resolver and the Strato updater
// 4. Running the controller until SIGINT/SIGTERM
// 5. Reloading the records file on SIGHUP
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### Stores
// - `DYNDNS_RECORDS_PATH`: Records file (required, operator-owned)
// - `DYNDNS_STATUS_PATH`: Status file (default: /var/lib/dyndns/status.json)
// - `DYNDNS_SECRETS_PATH`: Secrets file (required)
//
// ### Network
// - `DYNDNS_IP_ECHO_URL`: IP-echo service (default: https://myexternalip.com/raw)
// - `DYNDNS_UPDATE_URL`: dyndns2 endpoint (default: https://dyndns.strato.com/nic/update)
// - `DYNDNS_HTTP_TIMEOUT_SECS`: Overrides both request timeouts (10s / 30s)
// - `DYNDNS_DRY_RUN`: Log updates instead of sending them (true/false)
//
// ### Controller
// - `DYNDNS_WORKERS`: Concurrent workers (default: 4)
// - `DYNDNS_LOG_LEVEL`: trace, debug, info, warn, error (default: info)
//
// ## Example
//
// ```bash
// export DYNDNS_RECORDS_PATH=/etc/dyndns/records.json
// export DYNDNS_SECRETS_PATH=/etc/dyndns/secrets.json
// export DYNDNS_STATUS_PATH=/var/lib/dyndns/status.json
//
// dyndnsd
// ```

use anyhow::{Context, Result};
use dyndns_core::config::{
    ControllerConfig, DEFAULT_IP_ECHO_URL, DEFAULT_UPDATE_URL, RecordStoreConfig,
    SecretStoreConfig,
};
use dyndns_core::{Controller, FileRecordStore, FileSecretStore, Reconciler, TracingEventSink};
use dyndns_ip_http::HttpIpResolver;
use dyndns_provider_strato::StratoUpdater;
use std::env;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Default location of the engine-owned status file
const DEFAULT_STATUS_PATH: &str = "/var/lib/dyndns/status.json";

/// Time allowed for in-flight cycles to finish after a shutdown signal
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DyndnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DyndnsExitCode> for ExitCode {
    fn from(code: DyndnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
#[derive(Debug, Clone)]
struct Config {
    records_path: String,
    status_path: String,
    secrets_path: String,
    ip_echo_url: String,
    update_url: String,
    dry_run: bool,
    workers: Option<usize>,
    http_timeout_secs: Option<u64>,
    log_level: String,
}

/// Read an optional variable and parse it, naming the variable on failure
fn parse_env<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{} has an invalid value '{}': {}", name, value, e)),
        Err(_) => Ok(None),
    }
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Ok(Self {
            records_path: env::var("DYNDNS_RECORDS_PATH").context(
                "DYNDNS_RECORDS_PATH is required. \
                Set it via: export DYNDNS_RECORDS_PATH=/etc/dyndns/records.json",
            )?,
            status_path: env::var("DYNDNS_STATUS_PATH")
                .unwrap_or_else(|_| DEFAULT_STATUS_PATH.to_string()),
            secrets_path: env::var("DYNDNS_SECRETS_PATH").context(
                "DYNDNS_SECRETS_PATH is required. \
                Set it via: export DYNDNS_SECRETS_PATH=/etc/dyndns/secrets.json",
            )?,
            ip_echo_url: env::var("DYNDNS_IP_ECHO_URL")
                .unwrap_or_else(|_| DEFAULT_IP_ECHO_URL.to_string()),
            update_url: env::var("DYNDNS_UPDATE_URL")
                .unwrap_or_else(|_| DEFAULT_UPDATE_URL.to_string()),
            dry_run: parse_env("DYNDNS_DRY_RUN")?.unwrap_or(false),
            workers: parse_env("DYNDNS_WORKERS")?,
            http_timeout_secs: parse_env("DYNDNS_HTTP_TIMEOUT_SECS")?,
            log_level: env::var("DYNDNS_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validate the configuration
    ///
    /// Range checks live here; structural checks are delegated to
    /// `ControllerConfig::validate`.
    fn validate(&self) -> Result<()> {
        if let Some(workers) = self.workers
            && !(1..=64).contains(&workers)
        {
            anyhow::bail!("DYNDNS_WORKERS must be between 1 and 64. Got: {}", workers);
        }

        if let Some(timeout) = self.http_timeout_secs
            && !(1..=300).contains(&timeout)
        {
            anyhow::bail!(
                "DYNDNS_HTTP_TIMEOUT_SECS must be between 1 and 300 seconds. Got: {}",
                timeout
            );
        }

        // Check parent directory of the status file exists
        if let Some(parent) = std::path::Path::new(&self.status_path).parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            anyhow::bail!(
                "DYNDNS_STATUS_PATH parent directory does not exist: {}. \
                    Create it first: sudo mkdir -p {}",
                parent.display(),
                parent.display()
            );
        }

        for (name, url) in [
            ("DYNDNS_IP_ECHO_URL", &self.ip_echo_url),
            ("DYNDNS_UPDATE_URL", &self.update_url),
        ] {
            // Warn if using HTTP (not HTTPS)
            if url.starts_with("http://") {
                eprintln!(
                    "WARNING: {} uses HTTP (not HTTPS). \
                          The update password is sent with every request.",
                    name
                );
            }
        }

        parse_log_level(&self.log_level)?;

        self.controller_config()
            .validate()
            .map_err(|e| anyhow::anyhow!("{}", e))
    }

    /// Translate into the library configuration
    fn controller_config(&self) -> ControllerConfig {
        let mut config = ControllerConfig::new();

        config.ip_echo.url = self.ip_echo_url.clone();
        config.provider.update_url = self.update_url.clone();
        config.provider.dry_run = self.dry_run;

        if let Some(timeout) = self.http_timeout_secs {
            config.ip_echo.timeout_secs = timeout;
            config.provider.timeout_secs = timeout;
        }

        if let Some(workers) = self.workers {
            config.controller.workers = workers;
        }

        config.record_store = RecordStoreConfig::File {
            records_path: self.records_path.clone(),
            status_path: self.status_path.clone(),
        };
        config.secret_store = SecretStoreConfig::File {
            path: self.secrets_path.clone(),
        };

        config
    }
}

fn parse_log_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "DYNDNS_LOG_LEVEL '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            level
        ),
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DyndnsExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return DyndnsExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = parse_log_level(&config.log_level).unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DyndnsExitCode::ConfigError.into();
    }

    info!("Starting dyndnsd daemon");
    if config.dry_run {
        warn!("Dry-run mode: updates are logged, not sent");
    }

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DyndnsExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(config).await {
            error!("Daemon error: {:#}", e);
            DyndnsExitCode::RuntimeError
        } else {
            DyndnsExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Run the daemon
async fn run_daemon(config: Config) -> Result<()> {
    let settings = config.controller_config();

    let records = Arc::new(
        FileRecordStore::new(&config.records_path, &config.status_path)
            .await
            .context("Failed to load record store")?,
    );
    let secrets = Arc::new(FileSecretStore::new(&config.secrets_path));
    let resolver = Arc::new(HttpIpResolver::from_config(&settings.ip_echo)?);
    let updater = Arc::new(StratoUpdater::from_config(&settings.provider)?);

    info!(
        records = %config.records_path,
        status = %config.status_path,
        ip_echo = %settings.ip_echo.url,
        update_url = %settings.provider.update_url,
        workers = settings.controller.workers,
        "Configuration loaded"
    );

    let reconciler = Reconciler::new(
        records.clone(),
        secrets,
        resolver,
        updater,
        Arc::new(TracingEventSink),
    )
    .with_status_retry(settings.controller.status_retry());

    let controller = Controller::new(Arc::new(reconciler), &settings.controller);
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let mut controller_handle = tokio::spawn(async move { controller.run(shutdown_rx).await });

    tokio::select! {
        signal = wait_for_signals(&records) => {
            let signal = signal?;
            info!("Received shutdown signal: {}", signal);
        }
        // The controller only returns early when the initial listing fails
        joined = &mut controller_handle => {
            return joined.context("Controller task failed")?.map_err(Into::into);
        }
    }

    info!("Shutting down daemon");
    // Ignore send errors: the controller may already have stopped
    let _ = shutdown_tx.send(());

    match tokio::time::timeout(SHUTDOWN_TIMEOUT, controller_handle).await {
        Ok(joined) => joined.context("Controller task failed")??,
        Err(_) => anyhow::bail!("Shutdown timeout after {:?}", SHUTDOWN_TIMEOUT),
    }

    Ok(())
}

/// Reload records on SIGHUP until SIGTERM or SIGINT arrives
///
/// # Returns
///
/// Returns the name of the shutdown signal received.
#[cfg(unix)]
async fn wait_for_signals(records: &FileRecordStore) -> Result<&'static str> {
    // Set up signal handlers
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;
    let mut sighup = signal(SignalKind::hangup())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGHUP handler: {}", e))?;

    loop {
        tokio::select! {
            _ = sigterm.recv() => return Ok("SIGTERM"),
            _ = sigint.recv() => return Ok("SIGINT"),
            _ = sighup.recv() => {
                info!("Received SIGHUP, reloading records");
                match records.reload().await {
                    Ok(changed) => info!(changed = changed.len(), "Records reloaded"),
                    // Keep running on the previous records
                    Err(e) => error!("Failed to reload records: {}", e),
                }
            }
        }
    }
}

/// Wait for SIGINT
///
/// Fallback implementation for non-Unix platforms (no reload signal).
#[cfg(not(unix))]
async fn wait_for_signals(_records: &FileRecordStore) -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
