// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Rendering of the forward proxy release

use crate::config::Config;
use crate::constants::{labels, proxy::PORT, OPERATOR_NAME};
use crate::resources::ProxyParameters;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    ConfigMap, ConfigMapVolumeSource, Container, ContainerPort, EmptyDirVolumeSource, EnvVar,
    EnvVarSource, PodSpec, PodTemplateSpec, Secret, SecretKeySelector, Service, ServicePort,
    ServiceSpec, Volume, VolumeMount,
};
use k8s_openapi::api::networking::v1::{NetworkPolicy, NetworkPolicyEgressRule, NetworkPolicySpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::api::ObjectMeta;
use std::collections::BTreeMap;

const CONFIG_FILE: &str = "squid.conf";
const HTPASSWD_DIR: &str = "/etc/squid/auth";

/// Objects making up one proxy release
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedBundle {
    pub config_map: ConfigMap,
    /// Only rendered when basic auth is configured
    pub auth_secret: Option<Secret>,
    pub deployment: Deployment,
    pub service: Service,
    pub egress_policy: NetworkPolicy,
}

/// Names of the objects of a release, independent of its parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleNames {
    pub config_map: String,
    pub auth_secret: String,
    pub deployment: String,
    pub service: String,
    pub egress_policy: String,
}

impl BundleNames {
    pub fn for_release(release: &str) -> Self {
        Self {
            config_map: format!("{}-config", release),
            auth_secret: format!("{}-auth", release),
            deployment: release.to_string(),
            service: release.to_string(),
            egress_policy: format!("{}-egress", release),
        }
    }
}

fn release_labels(release: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (labels::APP_NAME.to_string(), release.to_string()),
        (labels::APP_INSTANCE.to_string(), release.to_string()),
        (labels::MANAGED_BY.to_string(), OPERATOR_NAME.to_string()),
    ])
}

fn selector_labels(release: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (labels::APP_NAME.to_string(), release.to_string()),
        (labels::APP_INSTANCE.to_string(), release.to_string()),
    ])
}

fn metadata(name: &str, namespace: &str, release: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(namespace.to_string()),
        labels: Some(release_labels(release)),
        ..Default::default()
    }
}

/// Proxy configuration. Access requires basic auth when credentials are configured,
/// otherwise any client in a private range may use the proxy.
pub fn squid_conf(auth: bool) -> String {
    let mut lines = vec![
        format!("http_port {}", PORT),
        "acl localnet src 10.0.0.0/8 172.16.0.0/12 192.168.0.0/16 fc00::/7 fe80::/10".to_string(),
        "acl SSL_ports port 443".to_string(),
        "acl CONNECT method CONNECT".to_string(),
        "http_access deny CONNECT !SSL_ports".to_string(),
    ];
    if auth {
        lines.extend([
            format!(
                "auth_param basic program /usr/lib/squid/basic_ncsa_auth {}/passwd",
                HTPASSWD_DIR
            ),
            "auth_param basic realm proxy".to_string(),
            "acl authenticated proxy_auth REQUIRED".to_string(),
            "http_access allow localnet authenticated".to_string(),
        ]);
    } else {
        lines.push("http_access allow localnet".to_string());
    }
    lines.extend([
        "http_access deny all".to_string(),
        "cache deny all".to_string(),
        "access_log stdio:/dev/stdout".to_string(),
        "cache_log stdio:/dev/stderr".to_string(),
    ]);
    lines.join("\n") + "\n"
}

fn secret_env(name: &str, secret: &str, key: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value_from: Some(EnvVarSource {
            secret_key_ref: Some(SecretKeySelector {
                name: secret.to_string(),
                key: key.to_string(),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Render the release for `namespace`
pub fn render(
    namespace: &str,
    release: &str,
    parameters: &ProxyParameters,
    config: &Config,
) -> RenderedBundle {
    let names = BundleNames::for_release(release);
    let credentials = parameters.credentials();

    let config_map = ConfigMap {
        metadata: metadata(&names.config_map, namespace, release),
        data: Some(BTreeMap::from([(
            CONFIG_FILE.to_string(),
            squid_conf(credentials.is_some()),
        )])),
        ..Default::default()
    };

    let auth_secret = credentials.map(|(username, password)| Secret {
        metadata: metadata(&names.auth_secret, namespace, release),
        string_data: Some(BTreeMap::from([
            ("username".to_string(), username.to_string()),
            ("password".to_string(), password.to_string()),
        ])),
        type_: Some("Opaque".to_string()),
        ..Default::default()
    });

    let mut volumes = vec![Volume {
        name: "config".to_string(),
        config_map: Some(ConfigMapVolumeSource {
            name: names.config_map.clone(),
            ..Default::default()
        }),
        ..Default::default()
    }];
    let mut mounts = vec![VolumeMount {
        name: "config".to_string(),
        mount_path: format!("/etc/squid/{}", CONFIG_FILE),
        sub_path: Some(CONFIG_FILE.to_string()),
        read_only: Some(true),
        ..Default::default()
    }];
    let mut init_containers = Vec::new();

    if credentials.is_some() {
        volumes.push(Volume {
            name: "auth".to_string(),
            empty_dir: Some(EmptyDirVolumeSource::default()),
            ..Default::default()
        });
        let auth_mount = VolumeMount {
            name: "auth".to_string(),
            mount_path: HTPASSWD_DIR.to_string(),
            ..Default::default()
        };
        init_containers.push(Container {
            name: "htpasswd".to_string(),
            image: Some(config.htpasswd_image.clone()),
            command: Some(vec!["sh".to_string(), "-c".to_string()]),
            args: Some(vec![format!(
                "htpasswd -bBc {}/passwd \"$PROXY_USERNAME\" \"$PROXY_PASSWORD\"",
                HTPASSWD_DIR
            )]),
            env: Some(vec![
                secret_env("PROXY_USERNAME", &names.auth_secret, "username"),
                secret_env("PROXY_PASSWORD", &names.auth_secret, "password"),
            ]),
            volume_mounts: Some(vec![auth_mount.clone()]),
            ..Default::default()
        });
        mounts.push(VolumeMount {
            read_only: Some(true),
            ..auth_mount
        });
    }

    let deployment = Deployment {
        metadata: metadata(&names.deployment, namespace, release),
        spec: Some(DeploymentSpec {
            replicas: Some(1),
            selector: LabelSelector {
                match_labels: Some(selector_labels(release)),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(release_labels(release)),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    init_containers: (!init_containers.is_empty()).then_some(init_containers),
                    containers: vec![Container {
                        name: "squid".to_string(),
                        image: Some(config.proxy_image.clone()),
                        ports: Some(vec![ContainerPort {
                            name: Some("proxy".to_string()),
                            container_port: PORT,
                            protocol: Some("TCP".to_string()),
                            ..Default::default()
                        }]),
                        volume_mounts: Some(mounts),
                        ..Default::default()
                    }],
                    volumes: Some(volumes),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    };

    let service = Service {
        metadata: metadata(&names.service, namespace, release),
        spec: Some(ServiceSpec {
            selector: Some(selector_labels(release)),
            ports: Some(vec![ServicePort {
                name: Some("proxy".to_string()),
                port: PORT,
                target_port: Some(IntOrString::String("proxy".to_string())),
                protocol: Some("TCP".to_string()),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    };

    // Policies are additive: this lets the proxy pods out despite deny-all-egress.
    let egress_policy = NetworkPolicy {
        metadata: metadata(&names.egress_policy, namespace, release),
        spec: Some(NetworkPolicySpec {
            policy_types: Some(vec!["Egress".to_string()]),
            pod_selector: LabelSelector {
                match_labels: Some(selector_labels(release)),
                ..Default::default()
            }
            .into(),
            egress: Some(vec![NetworkPolicyEgressRule::default()]),
            ..Default::default()
        }),
    };

    RenderedBundle {
        config_map,
        auth_secret,
        deployment,
        service,
        egress_policy,
    }
}
