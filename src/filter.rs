// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Event filters deciding which notifications reach a reconciler.
//!
//! A filter is an ordered list of independent predicates. An event is enqueued only if
//! every predicate accepts it; evaluation stops at the first rejection.

use crate::constants::{labels, proxy};
use k8s_openapi::api::core::v1::{Namespace, Secret};
use kube::ResourceExt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Create,
    Update,
    Delete,
}

/// A change notification with the snapshot observed by the watcher.
/// The snapshot may be stale by the time it is reconciled.
#[derive(Debug, Clone)]
pub struct ChangeEvent<K> {
    pub event_type: EventType,
    pub object: K,
}

impl<K> ChangeEvent<K> {
    pub fn new(event_type: EventType, object: K) -> Self {
        Self { event_type, object }
    }
}

pub type Predicate<K> = Box<dyn Fn(&ChangeEvent<K>) -> bool + Send + Sync>;

pub struct EventFilter<K> {
    predicates: Vec<Predicate<K>>,
}

impl<K> Default for EventFilter<K> {
    fn default() -> Self {
        Self {
            predicates: Vec::new(),
        }
    }
}

impl<K> EventFilter<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&ChangeEvent<K>) -> bool + Send + Sync + 'static,
    {
        self.predicates.push(Box::new(predicate));
        self
    }

    pub fn accepts(&self, event: &ChangeEvent<K>) -> bool {
        self.predicates.iter().all(|predicate| predicate(event))
    }
}

/// Accept only the listed event types
pub fn for_event_types<K>(types: &[EventType]) -> impl Fn(&ChangeEvent<K>) -> bool + Send + Sync {
    let types = types.to_vec();
    move |event: &ChangeEvent<K>| types.contains(&event.event_type)
}

/// True when the namespace carries the product marker label with the required value
pub fn has_product_label(ns: &Namespace) -> bool {
    ns.metadata
        .labels
        .as_ref()
        .filter(|l| !l.is_empty())
        .and_then(|l| l.get(labels::PRODUCT))
        .is_some_and(|v| v == labels::PRODUCT_VALUE)
}

/// Creates and updates of product namespaces. Deletes are dropped: a vanished
/// namespace is noticed as not-found on the next reconciliation.
pub fn namespace_filter() -> EventFilter<Namespace> {
    EventFilter::new()
        .with(for_event_types(&[EventType::Create, EventType::Update]))
        .with(|event: &ChangeEvent<Namespace>| has_product_label(&event.object))
}

/// Every change of a credentials secret, in any namespace
pub fn credentials_filter() -> EventFilter<Secret> {
    EventFilter::new()
        .with(for_event_types(&[
            EventType::Create,
            EventType::Update,
            EventType::Delete,
        ]))
        .with(|event: &ChangeEvent<Secret>| event.object.name_any() == proxy::CREDENTIALS_SECRET)
}
