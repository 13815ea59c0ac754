// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Proxy reconciler - deploys the forward proxy while its credentials secret exists.

use crate::config::Config;
use crate::constants::proxy::{CLEANUP_FINALIZER, CREDENTIALS_SECRET, RELEASE_NAME};
use crate::error::{InstallerError, Result};
use crate::filter::credentials_filter;
use crate::gateway::Gateway;
use crate::resources::CredentialsState;
use crate::runtime;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Secret;
use kube::{
    runtime::{controller::Action, finalizer, watcher, WatchStreamExt},
    Api, Client, ResourceExt,
};
use kube_runtime::watcher::Config as WatcherConfig;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct ProxyReconciler {
    client: Client,
    gateway: Arc<dyn Gateway>,
    config: Config,
}

impl ProxyReconciler {
    pub fn new(client: Client, gateway: Arc<dyn Gateway>, config: Config) -> Self {
        Self {
            client,
            gateway,
            config,
        }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let secrets: Api<Secret> = Api::all(self.client.clone());
        let selector = format!("metadata.name={}", CREDENTIALS_SECRET);
        let events = watcher(secrets, WatcherConfig::default().fields(&selector)).default_backoff();
        let controller = runtime::controller(events, credentials_filter(), &self.config);

        controller
            .run(reconcile, error_policy, Arc::new(self))
            .for_each(|res| async move {
                match res {
                    Ok(o) => debug!("Reconciled proxy credentials: {:?}", o),
                    Err(e) => warn!("Reconciliation error: {:?}", e),
                }
            })
            .await;

        Ok(())
    }
}

pub async fn reconcile(secret: Arc<Secret>, ctx: Arc<ProxyReconciler>) -> Result<Action> {
    let Some(namespace) = secret.namespace() else {
        return Err(InstallerError::MissingNamespace(secret.name_any()));
    };
    let name = secret.name_any();

    runtime::with_timeout(ctx.config.reconcile_timeout, converge(&namespace, &name, &ctx)).await
}

/// Refetch the credentials secret and deploy or destroy the release accordingly.
/// A live secret is held by [`CLEANUP_FINALIZER`] until its release has been destroyed.
async fn converge(namespace: &str, name: &str, ctx: &ProxyReconciler) -> Result<Action> {
    let key = format!("{}/{}", namespace, name);
    let secrets: Api<Secret> = Api::namespaced(ctx.client.clone(), namespace);

    let current = secrets
        .get_opt(name)
        .await
        .map_err(|source| InstallerError::StoreRead {
            kind: "Secret",
            key: key.clone(),
            source,
        })?;

    match current {
        Some(secret) if secret.metadata.deletion_timestamp.is_none() || holds_cleanup(&secret) => {
            finalizer(&secrets, CLEANUP_FINALIZER, Arc::new(secret), |event| async move {
                match event {
                    // Cleanup carries the deletion marker, so the observed state selects destroy
                    finalizer::Event::Apply(secret) | finalizer::Event::Cleanup(secret) => {
                        sync_release(ctx, namespace, Some(secret.as_ref())).await
                    }
                }
            })
            .await
            .map_err(|err| finalizer_error(err, &key))
        }
        other => {
            if other.is_none() {
                debug!("Proxy credentials secret {} is gone", key);
            }
            sync_release(ctx, namespace, other.as_ref()).await
        }
    }
}

async fn sync_release(ctx: &ProxyReconciler, namespace: &str, secret: Option<&Secret>) -> Result<Action> {
    match CredentialsState::observe(secret) {
        CredentialsState::Deleted(parameters) => {
            info!("Proxy credentials secret in namespace {} is being deleted, deleting proxy", namespace);
            ctx.gateway.destroy(namespace, RELEASE_NAME, &parameters).await?;
        }
        CredentialsState::Present(parameters) => {
            info!("Deploying proxy in namespace {}", namespace);
            ctx.gateway.deploy(namespace, RELEASE_NAME, &parameters).await?;
        }
    }
    Ok(Action::await_change())
}

fn holds_cleanup(secret: &Secret) -> bool {
    secret.finalizers().iter().any(|f| f == CLEANUP_FINALIZER)
}

fn finalizer_error(err: finalizer::Error<InstallerError>, key: &str) -> InstallerError {
    match err {
        finalizer::Error::ApplyFailed(err) | finalizer::Error::CleanupFailed(err) => err,
        finalizer::Error::AddFinalizer(source) | finalizer::Error::RemoveFinalizer(source) => {
            InstallerError::StoreWrite {
                kind: "Secret",
                key: key.to_string(),
                source,
            }
        }
        other => InstallerError::FinalizerError {
            key: key.to_string(),
            message: other.to_string(),
        },
    }
}

fn error_policy(secret: Arc<Secret>, error: &InstallerError, ctx: Arc<ProxyReconciler>) -> Action {
    runtime::requeue_on_error(secret.as_ref(), error, ctx.config.retry_delay)
}
