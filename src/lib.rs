// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
pub mod config;
pub mod constants;
pub mod error;
pub mod filter;
pub mod gateway;
pub mod kubernetes;
pub mod reconcilers;
pub mod resources;
pub mod runtime;

#[cfg(test)]
pub mod test_utils;
