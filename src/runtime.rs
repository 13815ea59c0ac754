// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Wiring of watch streams into kube-runtime controllers.
//!
//! Watch events are classified against the controller's reflector store before the store
//! is updated, then run through an [`EventFilter`]. Only accepted objects trigger a
//! reconciliation; deduplication, per-object exclusion and requeueing are left to the
//! kube-runtime [`Controller`].

use crate::config::Config;
use crate::error::{InstallerError, Result};
use crate::filter::{ChangeEvent, EventFilter, EventType};
use futures::{future, Stream, TryStreamExt};
use kube::runtime::{
    controller::{self, Action},
    reflector::{self, store::Writer, ObjectRef, Store},
    watcher, Controller,
};
use kube::{Resource, ResourceExt};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Classify a watch event against the objects known before it is applied.
/// An object carrying a deletion marker counts as deleted.
pub fn classify<K>(known: &Store<K>, event: &watcher::Event<K>) -> Option<ChangeEvent<K>>
where
    K: Resource + Clone + 'static,
    K::DynamicType: Eq + Hash + Clone + Default,
{
    match event {
        watcher::Event::Apply(obj) | watcher::Event::InitApply(obj) => {
            let event_type = if obj.meta().deletion_timestamp.is_some() {
                EventType::Delete
            } else if known.get(&ObjectRef::from_obj(obj)).is_some() {
                EventType::Update
            } else {
                EventType::Create
            };
            Some(ChangeEvent::new(event_type, obj.clone()))
        }
        watcher::Event::Delete(obj) => Some(ChangeEvent::new(EventType::Delete, obj.clone())),
        watcher::Event::Init | watcher::Event::InitDone => None,
    }
}

/// Feed every watch event into the reflector store and yield the objects the filter accepts
pub fn triggers<K, S>(
    events: S,
    writer: Writer<K>,
    filter: EventFilter<K>,
) -> impl Stream<Item = std::result::Result<K, watcher::Error>> + Send
where
    K: Resource + Clone + Send + Sync + 'static,
    K::DynamicType: Eq + Hash + Clone + Default + Send + Sync,
    S: Stream<Item = std::result::Result<watcher::Event<K>, watcher::Error>> + Send,
{
    let known = writer.as_reader();
    let mut writer = writer;

    events
        .map_ok(move |event| {
            let change = classify(&known, &event);
            writer.apply_watcher_event(&event);

            change
                .filter(|change| filter.accepts(change))
                .map(|change| {
                    debug!("Accepted {:?} of {}", change.event_type, change.object.name_any());
                    change.object
                })
        })
        .try_filter_map(future::ok)
}

/// Build a controller driven by `events`, reconciling only objects the filter accepts
pub fn controller<K, S>(events: S, filter: EventFilter<K>, config: &Config) -> Controller<K>
where
    K: Resource + Clone + DeserializeOwned + Debug + Send + Sync + 'static,
    K::DynamicType: Eq + Hash + Clone + Default + Debug + Unpin + Send + Sync,
    S: Stream<Item = std::result::Result<watcher::Event<K>, watcher::Error>> + Send + 'static,
{
    let (reader, writer) = reflector::store();

    Controller::for_stream(triggers(events, writer, filter), reader).with_config(settings(config))
}

pub fn settings(config: &Config) -> controller::Config {
    let concurrency = u16::try_from(config.workers).unwrap_or(u16::MAX);
    controller::Config::default().concurrency(concurrency)
}

/// Cancel `reconciliation` once `limit` has passed
pub async fn with_timeout<F>(limit: Duration, reconciliation: F) -> Result<Action>
where
    F: Future<Output = Result<Action>>,
{
    tokio::time::timeout(limit, reconciliation)
        .await
        .unwrap_or(Err(InstallerError::Timeout(limit)))
}

/// Log a failed reconciliation and schedule a retry. Conflicts are expected under
/// concurrent writers and only warned about.
pub fn requeue_on_error<K: Resource>(obj: &K, error: &InstallerError, delay: Duration) -> Action {
    let key = match obj.namespace() {
        Some(ns) => format!("{}/{}", ns, obj.name_any()),
        None => obj.name_any(),
    };

    if error.is_conflict() {
        warn!("Conflict reconciling {}, retrying in {:?}: {}", key, delay, error);
    } else {
        error!("Reconciliation of {} failed, retrying in {:?}: {}", key, delay, error);
    }
    Action::requeue(delay)
}
