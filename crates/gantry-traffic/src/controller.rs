//! Traffic controllers: the per-kind reconcile function and its wiring.
//!
//! The reconcile pass stages the controller-owned mutations (managed host,
//! TLS secret reference), folds them into transform annotations while
//! restoring the user's spec, derives the DNS target set from per-cluster
//! sync annotations, and hands the targets to an injected sink. Persistence
//! of DNS records is a collaborator's job; this controller only computes
//! and exposes derived state.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::api::networking::v1::Ingress;
use rustc_hash::FxHasher;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use gantry_common::{metrics, ResourceKey, ResourceLike, Result};
use gantry_reconciler::{Controller, ObjectWriter, Reconcile};

use crate::dns::Target;
use crate::route::Route;
use crate::Traffic;

/// Controller name for the Ingress traffic controller
pub const INGRESS_CONTROLLER: &str = "gantry-ingress";

/// Controller name for the Route traffic controller
pub const ROUTE_CONTROLLER: &str = "gantry-route";

/// Configuration for traffic reconciliation
#[derive(Clone, Debug)]
pub struct TrafficConfig {
    /// Domain under which managed hosts are allocated
    /// (e.g. "gantry.example.com")
    pub managed_domain: String,
}

impl TrafficConfig {
    /// Create a config for the given managed domain
    pub fn new(managed_domain: impl Into<String>) -> Self {
        Self {
            managed_domain: managed_domain.into(),
        }
    }
}

/// Receiver of derived DNS target sets.
///
/// Implementations persist or publish the targets elsewhere (a DNS record
/// store, a message bus); the reconciler only guarantees the set it hands
/// over is canonical and complete for the clusters that reported status.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DnsTargetSink: Send + Sync {
    /// Accept the derived target set for one traffic object.
    async fn publish(&self, key: &ResourceKey, targets: &[Target]) -> Result<()>;
}

/// Stable short token identifying a workspace, used to keep managed hosts
/// unique across workspaces without leaking workspace names into DNS.
pub fn workspace_token(workspace: &str) -> String {
    let mut hasher = FxHasher::default();
    workspace.hash(&mut hasher);
    format!("{:08x}", hasher.finish() as u32)
}

/// Reconcile function shared by the traffic controllers.
pub struct TrafficReconciler {
    config: TrafficConfig,
    sink: Arc<dyn DnsTargetSink>,
}

impl TrafficReconciler {
    /// Create a reconciler publishing to the given sink
    pub fn new(config: TrafficConfig, sink: Arc<dyn DnsTargetSink>) -> Self {
        Self { config, sink }
    }

    /// The managed host allocated to an object:
    /// `<name>-<namespace>-<workspace token>.<managed domain>`
    fn managed_host<R: ResourceLike>(&self, object: &R) -> String {
        format!(
            "{}-{}-{}.{}",
            object.name(),
            object.namespace(),
            workspace_token(object.workspace()),
            self.config.managed_domain
        )
    }
}

#[async_trait]
impl<R: Traffic> Reconcile<R> for TrafficReconciler {
    async fn reconcile(&self, target: &mut R) -> Result<()> {
        // The cached copy is the user's object: controller-authored values
        // live in annotations, never in the stored spec.
        let original = target.clone();

        let host = self.managed_host(&original);
        target.set_managed_host(&host);
        target.apply_tls(&host, &format!("{host}-tls"));
        target.transform(&original)?;

        let targets = target.dns_targets()?;
        debug!(
            key = %target.key(),
            host = %host,
            targets = targets.len(),
            "derived dns targets"
        );
        metrics::record_dns_targets(targets.len() as u64);
        self.sink.publish(&target.key(), &targets).await?;

        Ok(())
    }
}

/// Wire the Ingress traffic controller.
pub fn new_ingress_controller(
    config: TrafficConfig,
    writer: Arc<dyn ObjectWriter<Ingress>>,
    sink: Arc<dyn DnsTargetSink>,
) -> Controller<Ingress> {
    Controller::new(
        INGRESS_CONTROLLER,
        writer,
        Arc::new(TrafficReconciler::new(config, sink)),
    )
}

/// Wire the Route traffic controller.
pub fn new_route_controller(
    config: TrafficConfig,
    writer: Arc<dyn ObjectWriter<Route>>,
    sink: Arc<dyn DnsTargetSink>,
) -> Controller<Route> {
    Controller::new(
        ROUTE_CONTROLLER,
        writer,
        Arc::new(TrafficReconciler::new(config, sink)),
    )
}
