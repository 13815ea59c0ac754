// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Pure builders for derived state.

pub mod network_policy;
pub mod proxy;

pub use network_policy::deny_all_egress;
pub use proxy::{CredentialsState, ProxyParameters};
