//! Deployment migration controller.

use std::sync::Arc;

use k8s_openapi::api::apps::v1::Deployment;

use gantry_reconciler::{Controller, ObjectWriter, WorkQueue};

use crate::MigrationReconciler;

/// Controller name, used for the queue, logs, and metrics
pub const CONTROLLER_NAME: &str = "gantry-deployment";

/// Wire a controller that reconciles Deployments through the migration
/// dispatcher.
pub fn new_controller(writer: Arc<dyn ObjectWriter<Deployment>>) -> Controller<Deployment> {
    let queue = Arc::new(WorkQueue::new(CONTROLLER_NAME));
    let reconciler = Arc::new(MigrationReconciler::new(
        Arc::clone(&queue).enqueue_capability(),
    ));
    Controller::with_queue(CONTROLLER_NAME, queue, writer, reconciler)
}
