// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes store helpers.

pub mod apply;

pub use apply::{create_or_patch, OperationResult};
