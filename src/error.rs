// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InstallerError {
    #[error("Failed to retrieve {kind} {key} from store: {source}")]
    StoreRead {
        kind: &'static str,
        key: String,
        #[source]
        source: kube::Error,
    },

    #[error("Failed to write {kind} {key} to store: {source}")]
    StoreWrite {
        kind: &'static str,
        key: String,
        #[source]
        source: kube::Error,
    },

    #[error("Gateway operation failed: {0}")]
    GatewayError(String),

    #[error("Finalizer handling failed for {key}: {message}")]
    FinalizerError { key: String, message: String },

    #[error("Object reference has no namespace: {0}")]
    MissingNamespace(String),

    #[error("Reconciliation timed out after {0:?}")]
    Timeout(Duration),
}

impl InstallerError {
    /// True when the store rejected a write made against a stale resource version
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            InstallerError::StoreWrite {
                source: kube::Error::Api(err),
                ..
            } if err.code == 409
        )
    }
}

pub type Result<T> = std::result::Result<T, InstallerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::ErrorResponse;

    fn api_error(code: u16, reason: &str) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: "test".to_string(),
            reason: reason.to_string(),
            code,
        })
    }

    #[test]
    fn test_is_conflict_on_stale_write() {
        let err = InstallerError::StoreWrite {
            kind: "NetworkPolicy",
            key: "ns1/deny-all-egress".to_string(),
            source: api_error(409, "Conflict"),
        };
        assert!(err.is_conflict());
    }

    #[test]
    fn test_is_conflict_false_for_other_errors() {
        let read = InstallerError::StoreRead {
            kind: "Namespace",
            key: "ns1".to_string(),
            source: api_error(409, "Conflict"),
        };
        let write = InstallerError::StoreWrite {
            kind: "NetworkPolicy",
            key: "ns1/deny-all-egress".to_string(),
            source: api_error(500, "InternalError"),
        };
        assert!(!read.is_conflict());
        assert!(!write.is_conflict());
        assert!(!InstallerError::GatewayError("boom".to_string()).is_conflict());
    }
}
