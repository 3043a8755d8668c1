//! Composition root for the Gantry control plane.
//!
//! The operator does not own a transport: backing-store writers, the DNS
//! target sink, and the watch feed are injected by the embedding binary.
//! This crate assembles them into controllers ([`runner`]) and carries the
//! typed operator configuration ([`config`]).

pub mod config;
pub mod runner;

pub use config::OperatorConfig;
pub use runner::{
    build_migration_controllers, build_traffic_controllers, MigrationControllers,
    MigrationWriters, TrafficControllers, TrafficDeps,
};
