//! The reconciliation engine: worker loops over the work queue.
//!
//! Each worker repeatedly dequeues a key, resolves the object through the
//! indexed read model, runs the injected reconcile function against a
//! private deep copy, and persists the copy only if it differs from the
//! cached object. Deletion is terminal (not found ⇒ success, no requeue);
//! failures are retried with rate-limited backoff up to a cap, then dropped
//! and logged as unresolved. A reconcile error never terminates the worker.
//!
//! Optimistic concurrency: updates are a single conditional write; the
//! backing store surfaces conflicts as retryable errors and retry is driven
//! by re-enqueue, never by in-process compare-and-swap loops.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, error, info, warn};

use gantry_common::{metrics, Error, ResourceKey, ResourceLike, Result};

use crate::queue::WorkQueue;
use crate::store::Store;

/// Rate-limited requeues before a failing key is dropped as unresolved
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Kind-specific reconcile function.
///
/// Receives a private deep copy of the cached object and may mutate its
/// spec, status, labels, and annotations. It must never touch the read
/// model; persistence is the engine's job.
#[async_trait]
pub trait Reconcile<R>: Send + Sync {
    /// Compute the desired state of one object in place.
    async fn reconcile(&self, target: &mut R) -> Result<()>;
}

/// Write interface to the backing store.
///
/// `update` issues one conditional full-object write. Implementations must
/// surface optimistic-concurrency conflicts as [`Error::Conflict`] so the
/// engine can distinguish them from permanent failures.
#[async_trait]
pub trait ObjectWriter<R>: Send + Sync {
    /// Replace the stored object, returning the stored result.
    async fn update(&self, workspace: &str, namespace: &str, object: &R) -> Result<R>;
}

/// A reconciliation engine for one resource kind.
///
/// Constructed from injected dependencies; holds no global state. Workers
/// share only the queue and the read-only store.
pub struct Engine<R> {
    name: String,
    queue: Arc<WorkQueue>,
    store: Arc<dyn Store<R>>,
    writer: Arc<dyn ObjectWriter<R>>,
    reconciler: Arc<dyn Reconcile<R>>,
    max_retries: u32,
}

impl<R> Engine<R>
where
    R: ResourceLike + Clone + PartialEq + Send + Sync + 'static,
{
    /// Create an engine with the default retry cap.
    pub fn new(
        name: impl Into<String>,
        queue: Arc<WorkQueue>,
        store: Arc<dyn Store<R>>,
        writer: Arc<dyn ObjectWriter<R>>,
        reconciler: Arc<dyn Reconcile<R>>,
    ) -> Self {
        Self {
            name: name.into(),
            queue,
            store,
            writer,
            reconciler,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Override the retry cap.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Engine name (appears in logs and metrics)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The engine's work queue, for enqueueing keys directly.
    pub fn queue(&self) -> &Arc<WorkQueue> {
        &self.queue
    }

    /// Run `workers` independent processing loops until the queue shuts
    /// down. In-flight items are finished, not aborted.
    pub async fn run(self: Arc<Self>, workers: usize) {
        info!(controller = %self.name, workers, "starting workers");
        let handles: Vec<_> = (0..workers)
            .map(|worker| {
                let engine = Arc::clone(&self);
                tokio::spawn(async move { engine.worker(worker).await })
            })
            .collect();
        for result in join_all(handles).await {
            // A panicking reconcile function takes down its own worker task
            // only; report it and keep the remaining workers' results.
            if let Err(err) = result {
                error!(controller = %self.name, error = %err, "worker terminated abnormally");
            }
        }
        info!(controller = %self.name, "workers drained");
    }

    /// Signal workers to drain after their current item.
    pub fn shutdown(&self) {
        self.queue.shut_down();
    }

    async fn worker(&self, worker: usize) {
        while let Some(key) = self.queue.get().await {
            let start = Instant::now();
            let result = self.process(&key).await;
            let outcome = if result.is_ok() { "success" } else { "error" };
            metrics::record_reconcile(&self.name, outcome, start.elapsed().as_secs_f64());

            match result {
                Ok(()) => self.queue.forget(&key),
                Err(err) => self.handle_failure(&key, err),
            }
            self.queue.done(&key);
        }
        debug!(controller = %self.name, worker, "worker stopped");
    }

    /// Retry policy: transient errors are requeued with backoff up to the
    /// cap; everything else (and exhausted retries) is dropped, logged, and
    /// the worker moves on.
    fn handle_failure(&self, key: &ResourceKey, err: Error) {
        if !err.is_retryable() {
            metrics::record_reconcile_error(&self.name, "permanent");
            error!(controller = %self.name, key = %key, error = %err, "permanent reconcile error, dropping key");
            self.queue.forget(key);
            return;
        }

        metrics::record_reconcile_error(&self.name, "transient");
        let retries = self.queue.num_requeues(key);
        if retries < self.max_retries {
            warn!(
                controller = %self.name,
                key = %key,
                retries,
                error = %err,
                "reconcile failed, requeueing with backoff"
            );
            Arc::clone(&self.queue).add_rate_limited(key.clone());
        } else {
            error!(
                controller = %self.name,
                key = %key,
                retries,
                error = %err,
                "retry budget exhausted, dropping key unresolved"
            );
            self.queue.forget(key);
        }
    }

    async fn process(&self, key: &ResourceKey) -> Result<()> {
        let current = match self.store.get_by_key(key)? {
            Some(current) => current,
            None => {
                // Deletion is terminal: nothing to reconcile, no requeue
                info!(controller = %self.name, key = %key, "object was deleted");
                return Ok(());
            }
        };

        let mut target = (*current).clone();
        self.reconciler.reconcile(&mut target).await?;

        // Compare-then-write: unchanged objects cost no round trip
        if target != *current {
            debug!(controller = %self.name, key = %key, "object changed, issuing update");
            self.writer
                .update(target.workspace(), target.namespace(), &target)
                .await?;
            metrics::record_object_update(R::kind());
        }

        Ok(())
    }
}
