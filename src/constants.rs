// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Product marker label carried by managed namespaces and by the policies we create
pub mod labels {
    /// Namespaces with this label set to [`PRODUCT_VALUE`] get a deny-all-egress policy
    pub const PRODUCT: &str = "edgelm.sap.com/product";
    pub const PRODUCT_VALUE: &str = "edgelm";

    pub const APP_NAME: &str = "app.kubernetes.io/name";
    pub const APP_INSTANCE: &str = "app.kubernetes.io/instance";
    pub const MANAGED_BY: &str = "app.kubernetes.io/managed-by";
}

/// The operator name used as field manager for all writes
pub const OPERATOR_NAME: &str = "network-policy-installer";

/// Network policy naming and allow-list
pub mod network_policy {
    /// Fixed name of the policy installed in every product namespace
    pub const DENY_ALL_EGRESS: &str = "deny-all-egress";
    /// DNS ports; 8053 is used by node-local resolver sidecars
    pub const DNS_PORTS: [i32; 2] = [53, 8053];
    pub const PROTOCOLS: [&str; 2] = ["TCP", "UDP"];
}

/// Forward proxy release naming
pub mod proxy {
    /// Name of the credentials secret that triggers a proxy in its namespace
    pub const CREDENTIALS_SECRET: &str = "squid";
    /// Release name of the rendered proxy bundle
    pub const RELEASE_NAME: &str = "squid";
    /// Recognized credential keys
    pub const USERNAME_KEY: &str = "username";
    pub const PASSWORD_KEY: &str = "password";
    pub const PORT: i32 = 3128;
    /// Holds a deleted credentials secret until its proxy release is destroyed
    pub const CLEANUP_FINALIZER: &str = "edgelm.sap.com/proxy-cleanup";
}

/// Defaults for values loaded by [`crate::config::Config`]
pub mod defaults {
    pub const WORKER_COUNT: usize = 2;
    pub const RECONCILE_TIMEOUT_SECS: u64 = 30;
    pub const RETRY_DELAY_SECS: u64 = 10;
    pub const PROXY_IMAGE: &str = "ubuntu/squid:latest";
    pub const HTPASSWD_IMAGE: &str = "httpd:2.4-alpine";
}
