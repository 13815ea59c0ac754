// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::Result;
use kube::Client;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use network_policy_installer::config::Config;
use network_policy_installer::gateway::BundleApplier;
use network_policy_installer::reconcilers::{NetworkPolicyReconciler, ProxyReconciler};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing, defaulting to info when RUST_LOG is unset
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting network policy installer");

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Configuration loaded: workers={}, reconcile_timeout={:?}, proxy_image={}",
        config.workers, config.reconcile_timeout, config.proxy_image
    );

    // Create Kubernetes client
    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    let gateway = Arc::new(BundleApplier::new(client.clone(), config.clone()));
    let network_policy_reconciler = NetworkPolicyReconciler::new(client.clone(), config.clone());
    let proxy_reconciler = ProxyReconciler::new(client, gateway, config);

    info!("Starting reconcilers...");

    tokio::select! {
        result = async {
            tokio::try_join!(network_policy_reconciler.run(), proxy_reconciler.run())
        } => {
            result?;
            // Reconcilers only return when their watch streams end
            warn!("All reconcilers stopped unexpectedly");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal, stopping");
        }
    }

    Ok(())
}
