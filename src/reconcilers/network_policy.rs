// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Network policy reconciler - keeps a deny-all-egress policy in every product namespace.

use crate::config::Config;
use crate::constants::{labels, network_policy::DENY_ALL_EGRESS};
use crate::error::{InstallerError, Result};
use crate::filter::namespace_filter;
use crate::kubernetes::{create_or_patch, OperationResult};
use crate::resources::deny_all_egress;
use crate::runtime;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::api::networking::v1::NetworkPolicy;
use kube::{
    runtime::{controller::Action, watcher, WatchStreamExt},
    Api, Client, ResourceExt,
};
use kube_runtime::watcher::Config as WatcherConfig;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct NetworkPolicyReconciler {
    client: Client,
    config: Config,
}

impl NetworkPolicyReconciler {
    pub fn new(client: Client, config: Config) -> Self {
        Self { client, config }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        let selector = format!("{}={}", labels::PRODUCT, labels::PRODUCT_VALUE);
        let events = watcher(namespaces, WatcherConfig::default().labels(&selector)).default_backoff();
        let controller = runtime::controller(events, namespace_filter(), &self.config);

        controller
            .run(reconcile, error_policy, Arc::new(self))
            .for_each(|res| async move {
                match res {
                    Ok(o) => debug!("Reconciled namespace: {:?}", o),
                    Err(e) => warn!("Reconciliation error: {:?}", e),
                }
            })
            .await;

        Ok(())
    }
}

pub async fn reconcile(ns: Arc<Namespace>, ctx: Arc<NetworkPolicyReconciler>) -> Result<Action> {
    let name = ns.name_any();
    runtime::with_timeout(ctx.config.reconcile_timeout, converge(name, &ctx)).await
}

async fn converge(name: String, ctx: &NetworkPolicyReconciler) -> Result<Action> {
    let namespaces: Api<Namespace> = Api::all(ctx.client.clone());

    let ns = namespaces
        .get_opt(&name)
        .await
        .map_err(|source| InstallerError::StoreRead {
            kind: "Namespace",
            key: name.clone(),
            source,
        })?;

    let Some(ns) = ns else {
        debug!("Namespace {} is gone, stop reconciling network policies", name);
        return Ok(Action::await_change());
    };

    if ns.metadata.deletion_timestamp.is_some() {
        info!("Namespace {} is being deleted, stop reconciling network policies", name);
        return Ok(Action::await_change());
    }

    let desired = deny_all_egress(&name);
    let policies: Api<NetworkPolicy> = Api::namespaced(ctx.client.clone(), &name);

    let (_, result) = create_or_patch(&policies, Some(&name), DENY_ALL_EGRESS, |np| {
        np.metadata.labels = desired.metadata.labels;
        np.spec = desired.spec;
    })
    .await?;

    match result {
        OperationResult::Created => info!("Created {} network policy in namespace {}", DENY_ALL_EGRESS, name),
        OperationResult::Updated => info!("Restored drifted {} network policy in namespace {}", DENY_ALL_EGRESS, name),
        OperationResult::Unchanged => debug!("{} network policy in namespace {} is up to date", DENY_ALL_EGRESS, name),
    }

    Ok(Action::await_change())
}

fn error_policy(ns: Arc<Namespace>, error: &InstallerError, ctx: Arc<NetworkPolicyReconciler>) -> Action {
    runtime::requeue_on_error(ns.as_ref(), error, ctx.config.retry_delay)
}
