// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Proxy release parameters derived from the credentials secret.

use crate::constants::proxy::{PASSWORD_KEY, USERNAME_KEY};
use k8s_openapi::api::core::v1::Secret;
use serde::Serialize;
use std::collections::BTreeMap;

/// Values passed to the proxy release. Only `username` and `password` are recognized;
/// each is present only if the secret carries the corresponding key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProxyParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl ProxyParameters {
    /// Extract the parameters from a secret, or none if it is gone. Unknown keys are ignored.
    pub fn from_secret(secret: Option<&Secret>) -> Self {
        let Some(data) = secret.and_then(|s| s.data.as_ref()) else {
            return Self::default();
        };
        let value = |key: &str| {
            data.get(key)
                .map(|bytes| String::from_utf8_lossy(&bytes.0).into_owned())
        };

        Self {
            username: value(USERNAME_KEY),
            password: value(PASSWORD_KEY),
        }
    }

    /// Basic auth is configured only when both credentials are present
    pub fn credentials(&self) -> Option<(&str, &str)> {
        Some((self.username.as_deref()?, self.password.as_deref()?))
    }

    pub fn as_map(&self) -> BTreeMap<&'static str, String> {
        let mut values = BTreeMap::new();
        if let Some(username) = &self.username {
            values.insert(USERNAME_KEY, username.clone());
        }
        if let Some(password) = &self.password {
            values.insert(PASSWORD_KEY, password.clone());
        }
        values
    }
}

/// Observed state of a credentials secret
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialsState {
    /// The secret exists and is not being deleted: the proxy should be deployed
    Present(ProxyParameters),
    /// The secret is gone or marked for deletion: the proxy should be removed.
    /// Parameters are best effort and may be empty.
    Deleted(ProxyParameters),
}

impl CredentialsState {
    /// A missing secret is treated like one carrying a deletion marker
    pub fn observe(secret: Option<&Secret>) -> Self {
        let parameters = ProxyParameters::from_secret(secret);
        match secret {
            Some(s) if s.metadata.deletion_timestamp.is_none() => Self::Present(parameters),
            _ => Self::Deleted(parameters),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
    use k8s_openapi::ByteString;
    use kube::api::ObjectMeta;

    fn make_secret(data: &[(&str, &str)]) -> Secret {
        Secret {
            metadata: ObjectMeta {
                name: Some("squid".to_string()),
                namespace: Some("ns1".to_string()),
                ..Default::default()
            },
            data: Some(
                data.iter()
                    .map(|(k, v)| (k.to_string(), ByteString(v.as_bytes().to_vec())))
                    .collect(),
            ),
            ..Default::default()
        }
    }

    #[test]
    fn test_password_only() {
        let secret = make_secret(&[("password", "hunter2")]);
        let params = ProxyParameters::from_secret(Some(&secret));

        assert_eq!(params.as_map(), BTreeMap::from([("password", "hunter2".to_string())]));
        assert_eq!(params.username, None);
        assert_eq!(params.credentials(), None);
    }

    #[test]
    fn test_both_credentials() {
        let secret = make_secret(&[("username", "proxy"), ("password", "hunter2")]);
        let params = ProxyParameters::from_secret(Some(&secret));

        assert_eq!(params.credentials(), Some(("proxy", "hunter2")));
        assert_eq!(params.as_map().len(), 2);
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let secret = make_secret(&[("username", "proxy"), ("cache_size", "100")]);
        let params = ProxyParameters::from_secret(Some(&secret));

        assert_eq!(params.as_map(), BTreeMap::from([("username", "proxy".to_string())]));
    }

    #[test]
    fn test_absent_secret_or_data_yields_empty_parameters() {
        assert_eq!(ProxyParameters::from_secret(None), ProxyParameters::default());

        let mut secret = make_secret(&[]);
        secret.data = None;
        assert!(ProxyParameters::from_secret(Some(&secret)).as_map().is_empty());
    }

    #[test]
    fn test_serializes_only_present_keys() {
        let secret = make_secret(&[("password", "hunter2")]);
        let value = serde_json::to_value(ProxyParameters::from_secret(Some(&secret))).unwrap();

        assert_eq!(value, serde_json::json!({ "password": "hunter2" }));
    }

    #[test]
    fn test_state_present() {
        let secret = make_secret(&[("username", "proxy")]);
        let state = CredentialsState::observe(Some(&secret));

        assert_eq!(
            state,
            CredentialsState::Present(ProxyParameters {
                username: Some("proxy".to_string()),
                password: None,
            })
        );
    }

    #[test]
    fn test_state_missing_is_deleted() {
        assert_eq!(
            CredentialsState::observe(None),
            CredentialsState::Deleted(ProxyParameters::default())
        );
    }

    #[test]
    fn test_state_marked_for_deletion_keeps_parameters() {
        let mut secret = make_secret(&[("username", "proxy")]);
        secret.metadata.deletion_timestamp = Some(Time(Default::default()));

        match CredentialsState::observe(Some(&secret)) {
            CredentialsState::Deleted(params) => {
                assert_eq!(params.username.as_deref(), Some("proxy"))
            }
            other => panic!("unexpected state {:?}", other),
        }
    }
}
