//! A fully wired controller for one resource kind: shared index, watch
//! bridge, work queue, and engine, assembled from injected dependencies.
//!
//! Per-kind constructors (migration, traffic) are thin wrappers around
//! [`Controller::with_queue`] that pick the reconcile function and, where
//! needed, a watch filter.

use std::sync::Arc;

use gantry_common::{ResourceKey, ResourceLike};

use crate::engine::{Engine, ObjectWriter, Reconcile};
use crate::queue::WorkQueue;
use crate::store::{SharedIndex, Store, WatchBridge, WatchEvent};

/// A controller for one resource kind.
pub struct Controller<R> {
    index: Arc<SharedIndex<R>>,
    bridge: WatchBridge<R>,
    engine: Arc<Engine<R>>,
}

impl<R> Controller<R>
where
    R: ResourceLike + Clone + PartialEq + Send + Sync + 'static,
{
    /// Wire a controller around an externally created queue.
    ///
    /// The queue is passed in (rather than created here) so reconcile
    /// functions that need to re-enqueue keys can hold its enqueue
    /// capability.
    pub fn with_queue(
        name: &str,
        queue: Arc<WorkQueue>,
        writer: Arc<dyn ObjectWriter<R>>,
        reconciler: Arc<dyn Reconcile<R>>,
    ) -> Self {
        let index = Arc::new(SharedIndex::new());
        let bridge = WatchBridge::new(
            Arc::clone(&index),
            Arc::clone(&queue).enqueue_capability(),
        );
        let engine = Arc::new(Engine::new(
            name,
            queue,
            Arc::clone(&index) as Arc<dyn Store<R>>,
            writer,
            reconciler,
        ));
        Self {
            index,
            bridge,
            engine,
        }
    }

    /// Wire a controller that creates its own queue.
    pub fn new(
        name: &str,
        writer: Arc<dyn ObjectWriter<R>>,
        reconciler: Arc<dyn Reconcile<R>>,
    ) -> Self {
        Self::with_queue(name, Arc::new(WorkQueue::new(name)), writer, reconciler)
    }

    /// Install a watch filter: events whose object fails the predicate are
    /// dropped before touching the index.
    pub fn with_watch_filter(
        mut self,
        filter: impl Fn(&R) -> bool + Send + Sync + 'static,
    ) -> Self {
        let enqueue = Arc::clone(self.engine.queue()).enqueue_capability();
        self.bridge = WatchBridge::new(Arc::clone(&self.index), enqueue).with_filter(filter);
        self
    }

    /// Feed one watch event into the controller.
    pub fn handle(&self, event: WatchEvent<R>) {
        self.bridge.handle(event);
    }

    /// Enqueue a key directly (e.g., for a periodic resync).
    pub fn enqueue(&self, key: ResourceKey) {
        self.engine.queue().add(key);
    }

    /// The controller's read model, for sharing with collaborators.
    pub fn index(&self) -> Arc<SharedIndex<R>> {
        Arc::clone(&self.index)
    }

    /// Run worker loops until shutdown.
    pub async fn run(&self, workers: usize) {
        Arc::clone(&self.engine).run(workers).await;
    }

    /// Drain workers after their current item.
    pub fn shutdown(&self) {
        self.engine.shutdown();
    }
}
