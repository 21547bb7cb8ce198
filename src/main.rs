//! WiFi Provisioning Service - Main Entry Point

use std::sync::Arc;

use clap::Parser;
use tokio::{sync::mpsc, time::MissedTickBehavior};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wifi_provisioning::{
    Provisioner,
    backend::WifiCtrlBackend,
    config::{CliArgs, Settings},
    storage::FileBlobStore,
    transport::ble::BleAdapter,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,wifi_provisioning=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse CLI arguments
    let args = CliArgs::parse();
    info!(?args, "Starting WiFi provisioning service");
    let settings = Settings::from(args);

    let blob = FileBlobStore::open(&settings.store_path).await?;
    info!("Credential store at {}", blob.path().display());

    let station = Arc::new(WifiCtrlBackend::new(settings.interface.clone()).await?);
    info!("Station interface initialized: {}", settings.interface);

    let (radio_tx, radio_rx) = mpsc::unbounded_channel();
    let peripheral = Arc::new(BleAdapter::new(radio_tx).await?);

    let mut provisioner = Provisioner::new(
        settings.provisioning.clone(),
        peripheral,
        station,
        blob,
        radio_rx,
    );
    provisioner.on_status_change(|state| info!(?state, "Provisioning status"));
    provisioner.on_link_state(|linked| info!(linked, "Peer link"));
    provisioner.on_network_status(|status| info!(?status, "Network status"));
    provisioner.on_passkey_display(|passkey| info!("Pairing passkey: {:06}", passkey));
    provisioner.on_numeric_comparison(|passkey| {
        info!("Confirm pairing passkey {:06} on the companion device", passkey)
    });

    provisioner.initialize().await?;

    if settings.autoconnect && !provisioner.connect_to_stored().await {
        info!("No stored network joined, waiting for provisioning");
    }

    #[cfg(feature = "systemd")]
    if let Err(e) = sd_notify::notify(false, &[sd_notify::NotifyState::Ready]) {
        warn!("Failed to notify systemd: {}", e);
    }

    info!("Service started successfully");

    let mut ticker = tokio::time::interval(settings.tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => provisioner.tick().await,
            _ = &mut shutdown => break,
        }
    }

    info!("Shutting down...");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await
        }
    };

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT (Ctrl+C), shutting down gracefully"),
        _ = terminate() => info!("Received SIGTERM, shutting down gracefully"),
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            warn!("Failed to register SIGTERM handler: {}", e);
            std::future::pending::<()>().await
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    // On non-Unix platforms, just wait forever
    std::future::pending::<()>().await
}
