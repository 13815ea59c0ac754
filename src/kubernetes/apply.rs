// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Idempotent create-or-patch against the API store

use crate::constants::OPERATOR_NAME;
use crate::error::{InstallerError, Result};
use kube::{api::PostParams, Api, Resource, ResourceExt};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationResult {
    Unchanged,
    Created,
    Updated,
}

fn post_params() -> PostParams {
    PostParams {
        field_manager: Some(OPERATOR_NAME.to_string()),
        ..Default::default()
    }
}

/// Create the named object if it is absent, otherwise apply `mutate` to the stored copy and
/// replace it. The replace carries the fetched resourceVersion, so a concurrent writer makes
/// the API server reject it with a conflict, which is returned for the caller to retry.
/// No write is issued when `mutate` leaves the stored object unchanged.
#[instrument(skip(api, mutate), fields(kind = K::KIND))]
pub async fn create_or_patch<K, F>(
    api: &Api<K>,
    namespace: Option<&str>,
    name: &str,
    mutate: F,
) -> Result<(K, OperationResult)>
where
    K: k8s_openapi::Resource + Resource + Clone + Default + PartialEq + Serialize + DeserializeOwned + Debug,
    F: FnOnce(&mut K),
{
    let key = match namespace {
        Some(ns) => format!("{}/{}", ns, name),
        None => name.to_string(),
    };

    let existing = api.get_opt(name).await.map_err(|source| InstallerError::StoreRead {
        kind: K::KIND,
        key: key.clone(),
        source,
    })?;

    match existing {
        None => {
            let mut obj = K::default();
            obj.meta_mut().name = Some(name.to_string());
            obj.meta_mut().namespace = namespace.map(str::to_string);
            mutate(&mut obj);

            let created = api
                .create(&post_params(), &obj)
                .await
                .map_err(|source| InstallerError::StoreWrite {
                    kind: K::KIND,
                    key: key.clone(),
                    source,
                })?;
            info!("Created {} {}", K::KIND, key);
            Ok((created, OperationResult::Created))
        }
        Some(current) => {
            let mut desired = current.clone();
            mutate(&mut desired);
            desired.meta_mut().name = current.meta().name.clone();
            desired.meta_mut().namespace = current.meta().namespace.clone();

            if desired == current {
                debug!("{} {} is up to date", K::KIND, key);
                return Ok((current, OperationResult::Unchanged));
            }

            let updated = api
                .replace(&current.name_any(), &post_params(), &desired)
                .await
                .map_err(|source| InstallerError::StoreWrite {
                    kind: K::KIND,
                    key: key.clone(),
                    source,
                })?;
            info!("Updated {} {}", K::KIND, key);
            Ok((updated, OperationResult::Updated))
        }
    }
}
