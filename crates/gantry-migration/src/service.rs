//! Service migration controller.

use std::sync::Arc;

use k8s_openapi::api::core::v1::Service;

use gantry_reconciler::{Controller, ObjectWriter, WorkQueue};

use crate::MigrationReconciler;

/// Controller name, used for the queue, logs, and metrics
pub const CONTROLLER_NAME: &str = "gantry-service";

/// Wire a controller that reconciles Services through the migration
/// dispatcher.
pub fn new_controller(writer: Arc<dyn ObjectWriter<Service>>) -> Controller<Service> {
    let queue = Arc::new(WorkQueue::new(CONTROLLER_NAME));
    let reconciler = Arc::new(MigrationReconciler::new(
        Arc::clone(&queue).enqueue_capability(),
    ));
    Controller::with_queue(CONTROLLER_NAME, queue, writer, reconciler)
}
