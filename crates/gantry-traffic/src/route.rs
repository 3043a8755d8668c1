//! The Route traffic kind: an edge-terminating HTTP route with a single
//! host, an optional path rewrite, and optional TLS material.
//!
//! Per-cluster routers publish the hostnames/addresses actually serving the
//! route in `status.ingress`; sync agents mirror that status back to the
//! central object as sync annotations, which is what DNS derivation reads.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};

use gantry_common::{
    ResourceLike, Result, TRANSFORM_HOST_ANNOTATION, TRANSFORM_PATH_ANNOTATION,
    TRANSFORM_TLS_ANNOTATION,
};

use crate::dns::{targets_from_sync_annotations, Target};
use crate::transform::record_or_keep;
use crate::Traffic;

/// An externally-routable HTTP route
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Standard object metadata
    #[serde(default)]
    pub metadata: ObjectMeta,
    /// Desired routing configuration
    #[serde(default)]
    pub spec: RouteSpec,
    /// Observed per-router state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<RouteStatus>,
}

/// Desired state of a Route
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSpec {
    /// Hostname the route serves
    #[serde(default)]
    pub host: String,

    /// Path prefix to match (defaults to the whole host)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Backend the route forwards to
    #[serde(default)]
    pub to: RouteTargetReference,

    /// TLS termination configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<RouteTls>,
}

/// Backend reference of a Route
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteTargetReference {
    /// Backend kind (normally "Service")
    #[serde(default)]
    pub kind: String,
    /// Backend name
    #[serde(default)]
    pub name: String,
}

/// TLS configuration of a Route
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteTls {
    /// Where TLS terminates
    #[serde(default)]
    pub termination: TlsTermination,

    /// Secret holding the serving certificate (edge termination)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_name: Option<String>,

    /// Inline PEM certificate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate: Option<String>,

    /// Inline PEM private key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// Inline PEM CA certificate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_certificate: Option<String>,
}

/// TLS termination mode
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TlsTermination {
    /// Terminate at the router, plain HTTP to the backend
    #[default]
    Edge,
    /// Pass TLS through to the backend
    Passthrough,
    /// Terminate at the router, re-encrypt to the backend
    Reencrypt,
}

/// Observed state of a Route
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteStatus {
    /// One entry per router serving the route
    #[serde(default)]
    pub ingress: Vec<RouteIngress>,
}

/// A router endpoint serving the route
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteIngress {
    /// Router hostname, if it is reachable by name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Router address, if it is reachable by IP
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
}

impl ResourceLike for Route {
    fn kind() -> &'static str {
        "Route"
    }

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

impl Traffic for Route {
    fn transform(&mut self, original: &Self) -> Result<()> {
        let staged_host = self.spec.host.clone();
        let staged_path = self.spec.path.clone();
        let staged_tls = self.spec.tls.clone();

        let annotations = self.annotations_mut();
        record_or_keep(
            annotations,
            TRANSFORM_HOST_ANNOTATION,
            &staged_host,
            &original.spec.host,
        )?;
        record_or_keep(
            annotations,
            TRANSFORM_PATH_ANNOTATION,
            &staged_path,
            &original.spec.path,
        )?;
        record_or_keep(
            annotations,
            TRANSFORM_TLS_ANNOTATION,
            &staged_tls,
            &original.spec.tls,
        )?;

        self.spec = original.spec.clone();
        Ok(())
    }

    fn dns_targets(&self) -> Result<Vec<Target>> {
        Ok(targets_from_sync_annotations(self, |snapshot: &Route| {
            let mut endpoints = Vec::new();
            for ingress in snapshot.status.iter().flat_map(|s| &s.ingress) {
                if let Some(host) = &ingress.host {
                    endpoints.push(host.clone());
                }
                if let Some(ip) = &ingress.ip {
                    endpoints.push(ip.clone());
                }
            }
            endpoints
        }))
    }

    fn set_managed_host(&mut self, host: &str) {
        self.spec.host = host.to_string();
    }

    fn apply_tls(&mut self, _host: &str, secret: &str) {
        self.spec.tls = Some(RouteTls {
            termination: TlsTermination::Edge,
            secret_name: Some(secret.to_string()),
            ..Default::default()
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_route() -> Route {
        Route {
            metadata: ObjectMeta {
                name: Some("test".to_string()),
                ..Default::default()
            },
            spec: RouteSpec {
                host: "test.com".to_string(),
                path: Some("/".to_string()),
                to: RouteTargetReference {
                    kind: "Service".to_string(),
                    name: "test".to_string(),
                },
                tls: Some(RouteTls {
                    termination: TlsTermination::Edge,
                    certificate: Some("xyz".to_string()),
                    key: Some("xyz".to_string()),
                    ca_certificate: Some("xyz".to_string()),
                    ..Default::default()
                }),
            },
            status: None,
        }
    }

    fn with_sync_annotation(route: &mut Route, cluster: &str, snapshot: &Route) {
        route.annotations_mut().insert(
            format!("{}{}", gantry_common::SYNC_STATUS_ANNOTATION_PREFIX, cluster),
            serde_json::to_string(snapshot).unwrap(),
        );
    }

    fn snapshot_with_host(host: &str) -> Route {
        Route {
            status: Some(RouteStatus {
                ingress: vec![RouteIngress {
                    host: Some(host.to_string()),
                    ip: None,
                }],
            }),
            ..Default::default()
        }
    }

    /// Story: the user's spec survives reconciliation untouched
    #[test]
    fn story_transform_preserves_original_spec() {
        let original = user_route();

        // The controller staged its own host and TLS material
        let mut reconciled = user_route();
        reconciled.set_managed_host("managed.gantry.example.com");
        reconciled.apply_tls("managed.gantry.example.com", "managed-tls");

        reconciled.transform(&original).unwrap();

        assert_eq!(reconciled.spec, original.spec);

        // The controller-authored values moved into annotations
        let annotations = reconciled.annotations().unwrap();
        assert_eq!(
            annotations.get(TRANSFORM_HOST_ANNOTATION).unwrap(),
            "\"managed.gantry.example.com\""
        );
        assert!(annotations.contains_key(TRANSFORM_TLS_ANNOTATION));
    }

    /// Story: transform is a projection - applying it twice equals once
    #[test]
    fn story_transform_is_idempotent() {
        let original = user_route();
        let mut reconciled = user_route();
        reconciled.set_managed_host("managed.gantry.example.com");
        reconciled.apply_tls("managed.gantry.example.com", "managed-tls");

        reconciled.transform(&original).unwrap();
        let after_first = reconciled.clone();

        reconciled.transform(&original).unwrap();
        assert_eq!(reconciled, after_first);
    }

    #[test]
    fn test_malformed_transform_annotation_is_reported() {
        let original = user_route();
        let mut reconciled = user_route();
        reconciled.annotations_mut().insert(
            TRANSFORM_HOST_ANNOTATION.to_string(),
            "{broken".to_string(),
        );

        let err = reconciled.transform(&original).unwrap_err();
        assert!(err.is_retryable());
        assert!(err.to_string().contains(TRANSFORM_HOST_ANNOTATION));
    }

    /// Story: one DNS target per cluster annotation, in canonical order
    #[test]
    fn story_dns_targets_per_cluster() {
        let mut route = user_route();
        with_sync_annotation(&mut route, "c1", &snapshot_with_host("lb1.example.com"));
        with_sync_annotation(&mut route, "c0", &snapshot_with_host("lb0.example.com"));

        let targets = route.dns_targets().unwrap();
        assert_eq!(
            targets,
            vec![
                Target::new("c0", "lb0.example.com"),
                Target::new("c1", "lb1.example.com"),
            ]
        );
        assert!(targets
            .iter()
            .all(|t| t.target_type == crate::TargetType::Host));
    }

    /// Story: a malformed snapshot hides one cluster, never the others
    #[test]
    fn story_partial_failure_isolation() {
        let mut route = user_route();
        with_sync_annotation(&mut route, "c1", &snapshot_with_host("lb1.example.com"));
        route.annotations_mut().insert(
            format!("{}c2", gantry_common::SYNC_STATUS_ANNOTATION_PREFIX),
            "{definitely not json".to_string(),
        );
        with_sync_annotation(&mut route, "c3", &snapshot_with_host("lb3.example.com"));

        let targets = route.dns_targets().unwrap();
        assert_eq!(
            targets,
            vec![
                Target::new("c1", "lb1.example.com"),
                Target::new("c3", "lb3.example.com"),
            ]
        );
    }

    #[test]
    fn test_no_sync_annotations_yields_empty_list() {
        let route = user_route();
        assert!(route.dns_targets().unwrap().is_empty());
    }

    #[test]
    fn test_ip_endpoints_are_classified() {
        let mut route = user_route();
        let snapshot = Route {
            status: Some(RouteStatus {
                ingress: vec![RouteIngress {
                    host: None,
                    ip: Some("53.23.2.8".to_string()),
                }],
            }),
            ..Default::default()
        };
        with_sync_annotation(&mut route, "c0", &snapshot);

        let targets = route.dns_targets().unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].target_type, crate::TargetType::Ip);
        assert_eq!(targets[0].value, "53.23.2.8");
    }

    #[test]
    fn test_snapshot_wire_format_round_trip() {
        // The wire format mirrors the resource's own schema
        let raw = r#"{"status":{"ingress":[{"host":"lb0.example.com"}]}}"#;
        let snapshot: Route = serde_json::from_str(raw).unwrap();
        assert_eq!(
            snapshot.status.unwrap().ingress[0].host.as_deref(),
            Some("lb0.example.com")
        );
    }
}
