//! Generic level-triggered reconciliation engine.
//!
//! The engine follows the classic controller pattern: watch events feed an
//! indexed read model and enqueue keys on a rate-limited, de-duplicating
//! work queue; a fixed pool of workers pops keys, reads the current object
//! from the index, runs a kind-specific reconcile function against a private
//! deep copy, and issues a single conditional update only when the copy
//! differs from the cached object.
//!
//! There is no hidden shared state: an [`Engine`] is an explicit value
//! constructed from injected dependencies (queue, store, writer, reconcile
//! function), and the only structures shared between workers are the queue
//! and the read-only index.

pub mod controller;
pub mod engine;
pub mod queue;
pub mod store;

pub use controller::Controller;
pub use engine::{Engine, ObjectWriter, Reconcile, DEFAULT_MAX_RETRIES};
pub use queue::{Enqueue, WorkQueue};
pub use store::{SharedIndex, Store, WatchBridge, WatchEvent};
