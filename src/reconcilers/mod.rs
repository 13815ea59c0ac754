// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Reconcilers converging derived resources to their owners.

pub mod network_policy;
pub mod proxy;

pub use network_policy::NetworkPolicyReconciler;
pub use proxy::ProxyReconciler;
