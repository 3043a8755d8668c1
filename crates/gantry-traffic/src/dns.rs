//! DNS target model and derivation from per-cluster sync annotations.

use std::net::IpAddr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use gantry_common::{ResourceLike, SYNC_STATUS_ANNOTATION_PREFIX};

/// Whether a target points at a hostname or a literal address
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TargetType {
    /// A DNS hostname (CNAME-style target)
    Host,
    /// A literal IP address (A/AAAA-style target)
    Ip,
}

/// A derived, cluster-qualified routable endpoint for a traffic object.
///
/// The derived set is deduplicated and canonically ordered lexicographically
/// by `(cluster, value)` so downstream consumers and tests see a
/// reproducible order regardless of annotation iteration order.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Target {
    /// Execution cluster that published the endpoint
    pub cluster: String,
    /// Hostname or address classification
    pub target_type: TargetType,
    /// The endpoint literal, copied verbatim from the cluster's status
    pub value: String,
}

impl Target {
    /// Build a target, classifying the value as host or IP literal.
    pub fn new(cluster: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        let target_type = if value.parse::<IpAddr>().is_ok() {
            TargetType::Ip
        } else {
            TargetType::Host
        };
        Self {
            cluster: cluster.into(),
            target_type,
            value,
        }
    }
}

/// Fix the canonical order: sort by `(cluster, value)` and drop duplicates.
pub(crate) fn canonicalize(mut targets: Vec<Target>) -> Vec<Target> {
    targets.sort();
    targets.dedup();
    targets
}

/// Derive targets from every sync annotation on `object`.
///
/// Each annotation value is parsed as a snapshot of the object's own kind;
/// `endpoints` extracts the routable values from that snapshot's status. A
/// snapshot that fails to parse is reported with its cluster id and skipped
/// so one bad cluster never hides the others.
pub(crate) fn targets_from_sync_annotations<R, F>(object: &R, endpoints: F) -> Vec<Target>
where
    R: ResourceLike + DeserializeOwned,
    F: Fn(&R) -> Vec<String>,
{
    let mut targets = Vec::new();
    for (key, value) in object.annotations().into_iter().flatten() {
        let Some(cluster) = key.strip_prefix(SYNC_STATUS_ANNOTATION_PREFIX) else {
            continue;
        };
        match serde_json::from_str::<R>(value) {
            Ok(snapshot) => {
                for endpoint in endpoints(&snapshot) {
                    targets.push(Target::new(cluster, endpoint));
                }
            }
            Err(err) => {
                warn!(
                    cluster = %cluster,
                    annotation = %key,
                    error = %err,
                    "skipping malformed sync annotation"
                );
            }
        }
    }
    canonicalize(targets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_classification() {
        assert_eq!(
            Target::new("c0", "lb0.example.com").target_type,
            TargetType::Host
        );
        assert_eq!(Target::new("c0", "53.23.2.8").target_type, TargetType::Ip);
        assert_eq!(Target::new("c0", "2001:db8::1").target_type, TargetType::Ip);
    }

    #[test]
    fn test_canonical_order_and_dedup() {
        let targets = canonicalize(vec![
            Target::new("c1", "lb1.example.com"),
            Target::new("c0", "lb0.example.com"),
            Target::new("c0", "lb0.example.com"),
            Target::new("c0", "10.0.0.1"),
        ]);
        assert_eq!(
            targets,
            vec![
                Target::new("c0", "10.0.0.1"),
                Target::new("c0", "lb0.example.com"),
                Target::new("c1", "lb1.example.com"),
            ]
        );
    }
}
