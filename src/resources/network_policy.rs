// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Desired state of the deny-all-egress policy.

use crate::constants::{labels, network_policy::*};
use k8s_openapi::api::networking::v1::{
    NetworkPolicy, NetworkPolicyEgressRule, NetworkPolicyPeer, NetworkPolicyPort, NetworkPolicySpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::api::ObjectMeta;
use std::collections::BTreeMap;

/// Labels put on every policy we own
pub fn product_labels() -> BTreeMap<String, String> {
    BTreeMap::from([(labels::PRODUCT.to_string(), labels::PRODUCT_VALUE.to_string())])
}

/// Build the policy for a namespace. Only DNS and traffic to pods of the same namespace
/// may leave its pods; everything else is denied by the egress-only policy type.
///
/// Called on every reconciliation so that changes here heal policies created earlier.
pub fn deny_all_egress(namespace: &str) -> NetworkPolicy {
    NetworkPolicy {
        metadata: ObjectMeta {
            name: Some(DENY_ALL_EGRESS.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(product_labels()),
            ..Default::default()
        },
        spec: Some(NetworkPolicySpec {
            policy_types: Some(vec!["Egress".to_string()]),
            // Empty selector: all pods. The field is optional in newer API versions.
            pod_selector: LabelSelector::default().into(),
            egress: Some(vec![dns_rule(), same_namespace_rule()]),
            ..Default::default()
        }),
    }
}

fn dns_rule() -> NetworkPolicyEgressRule {
    let ports = DNS_PORTS
        .iter()
        .flat_map(|port| {
            PROTOCOLS.iter().map(move |protocol| NetworkPolicyPort {
                port: Some(IntOrString::Int(*port)),
                protocol: Some(protocol.to_string()),
                ..Default::default()
            })
        })
        .collect();

    NetworkPolicyEgressRule {
        ports: Some(ports),
        ..Default::default()
    }
}

fn same_namespace_rule() -> NetworkPolicyEgressRule {
    NetworkPolicyEgressRule {
        to: Some(vec![NetworkPolicyPeer {
            pod_selector: Some(LabelSelector::default()),
            ..Default::default()
        }]),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_metadata() {
        let np = deny_all_egress("ns1");

        assert_eq!(np.metadata.name.as_deref(), Some("deny-all-egress"));
        assert_eq!(np.metadata.namespace.as_deref(), Some("ns1"));
        assert_eq!(
            np.metadata.labels.unwrap().get("edgelm.sap.com/product"),
            Some(&"edgelm".to_string())
        );
    }

    #[test]
    fn test_egress_only_and_selects_all_pods() {
        let value = serde_json::to_value(deny_all_egress("ns1")).unwrap();

        assert_eq!(value["spec"]["policyTypes"], json!(["Egress"]));
        assert_eq!(value["spec"]["podSelector"], json!({}));
        assert!(value["spec"].get("ingress").is_none());
    }

    #[test]
    fn test_egress_rules() {
        let value = serde_json::to_value(deny_all_egress("ns1")).unwrap();

        assert_eq!(
            value["spec"]["egress"],
            json!([
                {
                    "ports": [
                        { "port": 53, "protocol": "TCP" },
                        { "port": 53, "protocol": "UDP" },
                        { "port": 8053, "protocol": "TCP" },
                        { "port": 8053, "protocol": "UDP" }
                    ]
                },
                { "to": [ { "podSelector": {} } ] }
            ])
        );
    }

    #[test]
    fn test_same_namespace_peer_has_no_namespace_selector() {
        let np = deny_all_egress("ns1");
        let egress = np.spec.unwrap().egress.unwrap();
        let peer = &egress[1].to.as_ref().unwrap()[0];

        assert!(peer.namespace_selector.is_none());
        assert!(peer.ip_block.is_none());
    }

    #[test]
    fn test_pure_and_namespace_scoped() {
        assert_eq!(deny_all_egress("ns1"), deny_all_egress("ns1"));

        let a = deny_all_egress("ns1");
        let b = deny_all_egress("ns2");
        assert_eq!(a.spec, b.spec);
        assert_ne!(a.metadata.namespace, b.metadata.namespace);
    }
}
