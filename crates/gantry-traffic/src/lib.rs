//! Traffic object abstraction.
//!
//! A uniform view over heterogeneous traffic-serving kinds (the Kubernetes
//! Ingress and the Route kind) exposing two operations:
//!
//! - [`Traffic::transform`] — idempotent spec reconciliation: controller-
//!   authored fields (host, TLS material, path rewrites) are recorded as
//!   transform annotations and the spec is restored field-for-field to what
//!   the user last submitted.
//! - [`Traffic::dns_targets`] — derivation of routable endpoints from the
//!   per-cluster status snapshots that sync agents attach as annotations.
//!
//! Dispatch over kinds is a capability trait with per-kind adapters, not a
//! reflection-style type switch.

pub mod controller;
pub mod dns;
pub mod ingress;
pub mod route;
mod transform;

pub use controller::{DnsTargetSink, TrafficConfig, TrafficReconciler};
pub use dns::{Target, TargetType};
pub use route::{
    Route, RouteIngress, RouteSpec, RouteStatus, RouteTargetReference, RouteTls, TlsTermination,
};

use gantry_common::{ResourceLike, Result};

/// Capability interface over traffic-serving resource kinds.
pub trait Traffic: ResourceLike + Clone + PartialEq + Send + Sync + 'static {
    /// Restore the user-authored spec, recording controller-authored fields
    /// as transform annotations.
    ///
    /// `original` is the object as it existed before any controller
    /// mutation. Postcondition: `self`'s spec equals `original`'s spec
    /// field for field; calling twice with the same `original` yields the
    /// same result as calling once. Fails if a previously recorded
    /// transform annotation cannot be parsed.
    fn transform(&mut self, original: &Self) -> Result<()>;

    /// Derive DNS targets from the per-cluster sync annotations.
    ///
    /// One target per endpoint per cluster, canonically ordered. A
    /// malformed snapshot affects only that cluster; an object with no sync
    /// annotations yields an empty list.
    fn dns_targets(&self) -> Result<Vec<Target>>;

    /// Apply the controller-owned managed host to the spec.
    fn set_managed_host(&mut self, host: &str);

    /// Apply controller-owned TLS material referencing `secret`.
    fn apply_tls(&mut self, host: &str, secret: &str);
}
