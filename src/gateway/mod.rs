// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Apply/destroy gateway for rendered release bundles.

pub mod applier;
pub mod bundle;

pub use applier::BundleApplier;
pub use bundle::{render, RenderedBundle};

use crate::error::Result;
use crate::resources::ProxyParameters;
use futures::future::BoxFuture;

/// Renders a named release with the given parameters and applies or removes it.
/// Both operations must be safe to repeat with the same arguments.
pub trait Gateway: Send + Sync {
    fn deploy<'a>(
        &'a self,
        namespace: &'a str,
        release: &'a str,
        parameters: &'a ProxyParameters,
    ) -> BoxFuture<'a, Result<()>>;

    /// Remove a release. Only addressing is required; `parameters` may be empty.
    fn destroy<'a>(
        &'a self,
        namespace: &'a str,
        release: &'a str,
        parameters: &'a ProxyParameters,
    ) -> BoxFuture<'a, Result<()>>;
}
