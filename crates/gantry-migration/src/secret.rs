//! Secret migration controller.
//!
//! Unlike the Deployment and Service controllers, this one only watches
//! Secrets carrying the `gantry.dev/managed=true` label: user Secrets are
//! none of our business and most of them never leave their home cluster.

use std::sync::Arc;

use k8s_openapi::api::core::v1::Secret;

use gantry_common::{ResourceLike, MANAGED_LABEL, MANAGED_LABEL_VALUE};
use gantry_reconciler::{Controller, ObjectWriter, WorkQueue};

use crate::MigrationReconciler;

/// Controller name, used for the queue, logs, and metrics
pub const CONTROLLER_NAME: &str = "gantry-secret";

/// Whether a Secret is managed by Gantry
pub fn is_managed(secret: &Secret) -> bool {
    secret.labels().map_or(false, |labels| {
        labels.get(MANAGED_LABEL).map(String::as_str) == Some(MANAGED_LABEL_VALUE)
    })
}

/// Wire a controller that reconciles managed Secrets through the migration
/// dispatcher.
pub fn new_controller(writer: Arc<dyn ObjectWriter<Secret>>) -> Controller<Secret> {
    let queue = Arc::new(WorkQueue::new(CONTROLLER_NAME));
    let reconciler = Arc::new(MigrationReconciler::new(
        Arc::clone(&queue).enqueue_capability(),
    ));
    Controller::with_queue(CONTROLLER_NAME, queue, writer, reconciler).with_watch_filter(is_managed)
}
