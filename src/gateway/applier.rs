// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Server-side apply of rendered release bundles

use super::bundle::{render, BundleNames};
use super::Gateway;
use crate::config::Config;
use crate::constants::OPERATOR_NAME;
use crate::error::{InstallerError, Result};
use crate::resources::ProxyParameters;
use futures::future::{BoxFuture, FutureExt};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Secret, Service};
use k8s_openapi::api::networking::v1::NetworkPolicy;
use k8s_openapi::NamespaceResourceScope;
use kube::{
    api::{DeleteParams, Patch, PatchParams},
    Api, Client, Resource, ResourceExt,
};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;
use tracing::{debug, info, instrument};

/// Gateway applying the proxy bundle directly to the cluster
pub struct BundleApplier {
    client: Client,
    config: Config,
}

impl BundleApplier {
    pub fn new(client: Client, config: Config) -> Self {
        Self { client, config }
    }

    async fn apply<K>(&self, namespace: &str, obj: &K) -> Result<()>
    where
        K: k8s_openapi::Resource
            + Resource<Scope = NamespaceResourceScope>
            + Clone
            + Serialize
            + DeserializeOwned
            + Debug,
        <K as Resource>::DynamicType: Default,
    {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        let name = obj.name_any();
        let pp = PatchParams::apply(OPERATOR_NAME).force();

        api.patch(&name, &pp, &Patch::Apply(obj)).await.map_err(|e| {
            InstallerError::GatewayError(format!(
                "Failed to apply {} {}/{}: {}",
                K::KIND,
                namespace,
                name,
                e
            ))
        })?;
        debug!("Applied {} {}/{}", K::KIND, namespace, name);
        Ok(())
    }

    async fn delete<K>(&self, namespace: &str, name: &str) -> Result<()>
    where
        K: k8s_openapi::Resource
            + Resource<Scope = NamespaceResourceScope>
            + Clone
            + DeserializeOwned
            + Debug,
        <K as Resource>::DynamicType: Default,
    {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);

        match api.delete(name, &DeleteParams::background()).await {
            Ok(_) => {
                debug!("Deleted {} {}/{}", K::KIND, namespace, name);
                Ok(())
            }
            Err(kube::Error::Api(err)) if err.code == 404 => {
                debug!("{} {}/{} already gone", K::KIND, namespace, name);
                Ok(())
            }
            Err(e) => Err(InstallerError::GatewayError(format!(
                "Failed to delete {} {}/{}: {}",
                K::KIND,
                namespace,
                name,
                e
            ))),
        }
    }

    #[instrument(skip(self, parameters))]
    async fn deploy_release(
        &self,
        namespace: &str,
        release: &str,
        parameters: &ProxyParameters,
    ) -> Result<()> {
        let bundle = render(namespace, release, parameters, &self.config);

        self.apply(namespace, &bundle.config_map).await?;
        match &bundle.auth_secret {
            Some(secret) => self.apply(namespace, secret).await?,
            None => {
                let names = BundleNames::for_release(release);
                self.delete::<Secret>(namespace, &names.auth_secret).await?
            }
        }
        self.apply(namespace, &bundle.egress_policy).await?;
        self.apply(namespace, &bundle.deployment).await?;
        self.apply(namespace, &bundle.service).await?;

        info!("Deployed release {} in namespace {}", release, namespace);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn destroy_release(&self, namespace: &str, release: &str) -> Result<()> {
        let names = BundleNames::for_release(release);

        self.delete::<Service>(namespace, &names.service).await?;
        self.delete::<Deployment>(namespace, &names.deployment).await?;
        self.delete::<NetworkPolicy>(namespace, &names.egress_policy).await?;
        self.delete::<Secret>(namespace, &names.auth_secret).await?;
        self.delete::<ConfigMap>(namespace, &names.config_map).await?;

        info!("Destroyed release {} in namespace {}", release, namespace);
        Ok(())
    }
}

impl Gateway for BundleApplier {
    fn deploy<'a>(
        &'a self,
        namespace: &'a str,
        release: &'a str,
        parameters: &'a ProxyParameters,
    ) -> BoxFuture<'a, Result<()>> {
        self.deploy_release(namespace, release, parameters).boxed()
    }

    fn destroy<'a>(
        &'a self,
        namespace: &'a str,
        release: &'a str,
        _parameters: &'a ProxyParameters,
    ) -> BoxFuture<'a, Result<()>> {
        self.destroy_release(namespace, release).boxed()
    }
}
