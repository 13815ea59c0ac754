// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::defaults;
use anyhow::{ensure, Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Operator configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Number of concurrent reconciliations per controller
    pub workers: usize,
    /// Deadline after which a reconciliation is cancelled and retried
    pub reconcile_timeout: Duration,
    /// Delay before a failed reconciliation is retried
    pub retry_delay: Duration,
    /// Image of the forward proxy container
    pub proxy_image: String,
    /// Image used to generate the proxy htpasswd file
    pub htpasswd_image: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            workers: defaults::WORKER_COUNT,
            reconcile_timeout: Duration::from_secs(defaults::RECONCILE_TIMEOUT_SECS),
            retry_delay: Duration::from_secs(defaults::RETRY_DELAY_SECS),
            proxy_image: defaults::PROXY_IMAGE.to_string(),
            htpasswd_image: defaults::HTPASSWD_IMAGE.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| env::var(name).ok())
    }

    fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let workers: usize = parse_or("WORKER_COUNT", var("WORKER_COUNT"), defaults::WORKER_COUNT)?;
        let timeout_secs: u64 = parse_or(
            "RECONCILE_TIMEOUT_SECS",
            var("RECONCILE_TIMEOUT_SECS"),
            defaults::RECONCILE_TIMEOUT_SECS,
        )?;
        ensure!(timeout_secs > 0, "RECONCILE_TIMEOUT_SECS must be greater than zero");
        let retry_secs = parse_or("RETRY_DELAY_SECS", var("RETRY_DELAY_SECS"), defaults::RETRY_DELAY_SECS)?;

        Ok(Config {
            workers: workers.max(1),
            reconcile_timeout: Duration::from_secs(timeout_secs),
            retry_delay: Duration::from_secs(retry_secs),
            proxy_image: var("PROXY_IMAGE").unwrap_or_else(|| defaults::PROXY_IMAGE.to_string()),
            htpasswd_image: var("HTPASSWD_IMAGE").unwrap_or_else(|| defaults::HTPASSWD_IMAGE.to_string()),
        })
    }
}

fn parse_or<T>(name: &str, value: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(v) if !v.trim().is_empty() => v
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {}", name, v)),
        _ => Ok(default),
    }
}
