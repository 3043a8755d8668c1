//! Controller builders.
//!
//! Each `build_*` function wires a set of controllers from injected
//! dependencies and returns them to the caller, which feeds them watch
//! events and composes their run futures. Construction stays pure and
//! testable; nothing here talks to a network.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Secret, Service};
use k8s_openapi::api::networking::v1::Ingress;
use tracing::info;

use gantry_migration::{deployment, secret, service};
use gantry_reconciler::{Controller, ObjectWriter};
use gantry_traffic::controller::{new_ingress_controller, new_route_controller};
use gantry_traffic::{DnsTargetSink, Route, TrafficConfig};

/// A controller run future, ready to be composed by the caller
pub type ControllerFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Backing-store writers for the migration controllers
pub struct MigrationWriters {
    /// Deployment writer
    pub deployments: Arc<dyn ObjectWriter<Deployment>>,
    /// Secret writer
    pub secrets: Arc<dyn ObjectWriter<Secret>>,
    /// Service writer
    pub services: Arc<dyn ObjectWriter<Service>>,
}

/// The wired migration controllers
pub struct MigrationControllers {
    /// Deployment migration controller
    pub deployments: Arc<Controller<Deployment>>,
    /// Secret migration controller (managed Secrets only)
    pub secrets: Arc<Controller<Secret>>,
    /// Service migration controller
    pub services: Arc<Controller<Service>>,
}

impl MigrationControllers {
    /// Run futures for all migration controllers
    pub fn futures(&self, workers: usize) -> Vec<ControllerFuture> {
        vec![
            run_future(Arc::clone(&self.deployments), workers),
            run_future(Arc::clone(&self.secrets), workers),
            run_future(Arc::clone(&self.services), workers),
        ]
    }

    /// Drain all migration controllers
    pub fn shutdown(&self) {
        self.deployments.shutdown();
        self.secrets.shutdown();
        self.services.shutdown();
    }
}

/// Build the migration controllers (Deployment, Secret, Service)
pub fn build_migration_controllers(writers: MigrationWriters) -> MigrationControllers {
    info!("- Deployment migration controller");
    info!("- Secret migration controller");
    info!("- Service migration controller");

    MigrationControllers {
        deployments: Arc::new(deployment::new_controller(writers.deployments)),
        secrets: Arc::new(secret::new_controller(writers.secrets)),
        services: Arc::new(service::new_controller(writers.services)),
    }
}

/// Dependencies of the traffic controllers
pub struct TrafficDeps {
    /// Traffic reconciliation configuration
    pub config: TrafficConfig,
    /// Ingress writer
    pub ingresses: Arc<dyn ObjectWriter<Ingress>>,
    /// Route writer
    pub routes: Arc<dyn ObjectWriter<Route>>,
    /// Receiver of derived DNS target sets
    pub sink: Arc<dyn DnsTargetSink>,
}

/// The wired traffic controllers
pub struct TrafficControllers {
    /// Ingress traffic controller
    pub ingresses: Arc<Controller<Ingress>>,
    /// Route traffic controller
    pub routes: Arc<Controller<Route>>,
}

impl TrafficControllers {
    /// Run futures for both traffic controllers
    pub fn futures(&self, workers: usize) -> Vec<ControllerFuture> {
        vec![
            run_future(Arc::clone(&self.ingresses), workers),
            run_future(Arc::clone(&self.routes), workers),
        ]
    }

    /// Drain both traffic controllers
    pub fn shutdown(&self) {
        self.ingresses.shutdown();
        self.routes.shutdown();
    }
}

/// Build the traffic controllers (Ingress, Route)
pub fn build_traffic_controllers(deps: TrafficDeps) -> TrafficControllers {
    info!("- Ingress traffic controller");
    info!("- Route traffic controller");

    TrafficControllers {
        ingresses: Arc::new(new_ingress_controller(
            deps.config.clone(),
            deps.ingresses,
            Arc::clone(&deps.sink),
        )),
        routes: Arc::new(new_route_controller(deps.config, deps.routes, deps.sink)),
    }
}

fn run_future<R>(controller: Arc<Controller<R>>, workers: usize) -> ControllerFuture
where
    R: gantry_common::ResourceLike + Clone + PartialEq + Send + Sync + 'static,
{
    Box::pin(async move { controller.run(workers).await })
}
