//! Minimal embedding example for dyndns-core
//!
//! This example demonstrates using dyndns-core as a library in a custom
//! application: in-memory stores, a custom resolver and updater, and a
//! controller whose lifecycle is fully managed by the application.

use dyndns_core::config::WorkerConfig;
use dyndns_core::model::{CredentialRef, DesiredRecord, RecordKey};
use dyndns_core::traits::{DnsUpdater, IpResolver, RecordStore, Secret, UpdateOutcome, UpdateRequest};
use dyndns_core::{
    ChannelEventSink, Controller, MemoryRecordStore, MemorySecretStore, Reconciler, Result,
};
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::time::{Duration, sleep};

/// Resolver answering with a fixed address
struct EmbeddedResolver {
    ip: IpAddr,
}

#[async_trait::async_trait]
impl IpResolver for EmbeddedResolver {
    async fn resolve(&self) -> Result<IpAddr> {
        Ok(self.ip)
    }

    fn resolver_name(&self) -> &'static str {
        "embedded"
    }
}

/// Updater that prints instead of calling a provider
struct EmbeddedUpdater {
    update_calls: AtomicUsize,
}

impl EmbeddedUpdater {
    fn new() -> Self {
        Self {
            update_calls: AtomicUsize::new(0),
        }
    }

    fn update_count(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl DnsUpdater for EmbeddedUpdater {
    async fn update(&self, request: &UpdateRequest<'_>) -> Result<UpdateOutcome> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        println!("[Embedded] Updating {} -> {}", request.hostname, request.ip);
        Ok(UpdateOutcome::Good)
    }

    fn provider_name(&self) -> &'static str {
        "embedded"
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    println!("=== Embedded dyndns-core Example ===\n");

    // Create custom components
    let records = MemoryRecordStore::new();
    let secrets = MemorySecretStore::new();
    secrets
        .insert("default", "strato", Secret::with_password("example-password"))
        .await;

    let updater = Arc::new(EmbeddedUpdater::new());
    let (events, mut event_rx) = ChannelEventSink::new(100);

    let reconciler = Reconciler::new(
        Arc::new(records.clone()),
        Arc::new(secrets),
        Arc::new(EmbeddedResolver {
            ip: IpAddr::from([192, 0, 2, 10]),
        }),
        updater.clone(),
        Arc::new(events),
    );

    // Spawn event listener (optional)
    let event_listener = tokio::spawn(async move {
        println!("1. Event listener started");
        while let Some(event) = event_rx.recv().await {
            println!("[Event] {} {} {}: {}", event.key, event.event_type, event.reason, event.message);
        }
        println!("Event listener stopped");
    });

    // Run controller in background
    println!("2. Starting controller in background...");
    let controller = Controller::new(Arc::new(reconciler), &WorkerConfig::default());
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let controller_handle = tokio::spawn(async move { controller.run(shutdown_rx).await });

    sleep(Duration::from_millis(50)).await;

    // Declare a dynamic record
    let key = RecordKey::new("default", "home");
    println!("3. Applying dynamic record {}", key);
    records
        .apply(&key, DesiredRecord::new("home.example.com", CredentialRef::new("strato")))
        .await?;
    sleep(Duration::from_millis(100)).await;

    // Pin it to an explicit address
    println!("4. Switching {} to manual mode", key);
    records
        .apply(
            &key,
            DesiredRecord::new("home.example.com", CredentialRef::new("strato"))
                .with_static_ip([198, 51, 100, 7].into()),
        )
        .await?;
    sleep(Duration::from_millis(100)).await;

    if let Some(record) = records.get(&key).await? {
        println!("\n5. Observed state: {:?}", record.status);
    }
    println!("   Updates sent: {}", updater.update_count());

    // Stop controller
    println!("\n6. Stopping controller...");
    let _ = shutdown_tx.send(());
    if let Ok(result) = controller_handle.await {
        result?;
    }

    // Wait for event listener
    let _ = tokio::time::timeout(Duration::from_millis(100), event_listener).await;

    println!("\n=== Embedding Successful ===");
    println!("Key Points:");
    println!("- Controller lifecycle is fully controlled by application");
    println!("- No global state");
    println!("- All components are custom (not dyndnsd defaults)");

    Ok(())
}
