//! Workload migration between execution clusters.
//!
//! The migration dispatcher inspects an object's placement annotation and
//! sync-state labels to decide whether it must move to a different
//! execution cluster, and stages the label/annotation side effects that
//! trigger relocation. It never persists the object itself - persistence
//! stays with the reconciliation engine's compare-then-write pass.
//!
//! One controller per kind (Deployment, Secret, Service) drives the
//! dispatcher; the Secret controller only watches Gantry-managed Secrets.

pub mod deployment;
pub mod secret;
pub mod service;
pub mod workload;

use async_trait::async_trait;

use gantry_common::{ResourceLike, Result};
use gantry_reconciler::{Enqueue, Reconcile};

/// Reconcile function shared by the migration controllers: delegate to the
/// migration dispatcher with the controller's own enqueue capability.
pub struct MigrationReconciler {
    enqueue: Enqueue,
}

impl MigrationReconciler {
    /// Create a reconciler that re-enqueues via `enqueue`
    pub fn new(enqueue: Enqueue) -> Self {
        Self { enqueue }
    }
}

#[async_trait]
impl<R> Reconcile<R> for MigrationReconciler
where
    R: ResourceLike + Clone + PartialEq + Send + Sync + 'static,
{
    async fn reconcile(&self, target: &mut R) -> Result<()> {
        workload::migrate(target, &self.enqueue)
    }
}
