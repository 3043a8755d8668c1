//! Rate-limited, de-duplicating work queue.
//!
//! Semantics:
//! - [`WorkQueue::add`] enqueues a key unless it is already pending. Keys
//!   currently being processed are marked dirty and re-surface once
//!   [`WorkQueue::done`] is called, so an update arriving mid-reconcile is
//!   never lost.
//! - [`WorkQueue::get`] hands a key to at most one worker at a time. This is
//!   the system's core concurrency invariant: no two workers ever reconcile
//!   the same key simultaneously.
//! - [`WorkQueue::add_rate_limited`] schedules a retry with per-key
//!   exponential backoff; [`WorkQueue::forget`] resets the backoff counter.
//!
//! The queue itself never fails; callers decide retry versus drop.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::trace;

use gantry_common::{metrics, ResourceKey};

/// Base delay of the per-key exponential backoff
const BASE_DELAY: Duration = Duration::from_millis(5);

/// Upper bound on the per-key backoff delay
const MAX_DELAY: Duration = Duration::from_secs(1000);

/// Capability handed to watch-feed adapters: enqueue a key for
/// reconciliation. The engine never depends on a feed's delivery mechanism,
/// only on keys being eventually enqueued.
pub type Enqueue = Arc<dyn Fn(ResourceKey) + Send + Sync>;

#[derive(Default)]
struct QueueState {
    queue: VecDeque<ResourceKey>,
    /// Keys that need processing (pending or re-added while in flight)
    dirty: HashSet<ResourceKey>,
    /// Keys currently held by a worker
    processing: HashSet<ResourceKey>,
    shutting_down: bool,
}

/// Per-key exponential backoff: 5ms, 10ms, 20ms, ... capped at 1000s.
struct RateLimiter {
    retries: Mutex<HashMap<ResourceKey, u32>>,
}

impl RateLimiter {
    fn new() -> Self {
        Self {
            retries: Mutex::new(HashMap::new()),
        }
    }

    /// Next delay for `key`, incrementing its retry counter
    fn next_delay(&self, key: &ResourceKey) -> Duration {
        let mut retries = self.retries.lock().expect("rate limiter lock poisoned");
        let attempt = retries.entry(key.clone()).or_insert(0);
        let delay = BASE_DELAY
            .saturating_mul(1u32 << (*attempt).min(31))
            .min(MAX_DELAY);
        *attempt += 1;
        delay
    }

    fn forget(&self, key: &ResourceKey) {
        self.retries
            .lock()
            .expect("rate limiter lock poisoned")
            .remove(key);
    }

    fn retries(&self, key: &ResourceKey) -> u32 {
        self.retries
            .lock()
            .expect("rate limiter lock poisoned")
            .get(key)
            .copied()
            .unwrap_or(0)
    }
}

/// Work queue of opaque resource keys with de-duplication, rate-limited
/// retry, and an at-most-one-in-flight-per-key guarantee.
pub struct WorkQueue {
    name: String,
    state: Mutex<QueueState>,
    /// One permit per entry in `state.queue`; closed on shutdown
    items: Semaphore,
    limiter: RateLimiter,
}

impl WorkQueue {
    /// Create a named queue. The name appears in logs and metrics.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(QueueState::default()),
            items: Semaphore::new(0),
            limiter: RateLimiter::new(),
        }
    }

    /// Queue name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Enqueue a key unless it is already pending.
    ///
    /// If the key is currently being processed it is marked dirty and will
    /// be re-queued by [`WorkQueue::done`]. No-op after shutdown.
    pub fn add(&self, key: ResourceKey) {
        let mut state = self.state.lock().expect("queue lock poisoned");
        if state.shutting_down || state.dirty.contains(&key) {
            return;
        }
        state.dirty.insert(key.clone());
        if state.processing.contains(&key) {
            trace!(queue = %self.name, key = %key, "key in flight, marked dirty");
            return;
        }
        state.queue.push_back(key);
        metrics::record_queue_depth(&self.name, state.queue.len() as i64);
        drop(state);
        self.items.add_permits(1);
    }

    /// Block until a key is available and mark it in flight.
    ///
    /// Returns `None` once the queue is shut down; keys still pending at
    /// shutdown are abandoned.
    pub async fn get(&self) -> Option<ResourceKey> {
        loop {
            match self.items.acquire().await {
                Ok(permit) => {
                    permit.forget();
                    let mut state = self.state.lock().expect("queue lock poisoned");
                    if let Some(key) = state.queue.pop_front() {
                        state.dirty.remove(&key);
                        state.processing.insert(key.clone());
                        metrics::record_queue_depth(&self.name, state.queue.len() as i64);
                        return Some(key);
                    }
                }
                Err(_) => return None,
            }
        }
    }

    /// Mark processing of a key finished.
    ///
    /// If the key was re-added while in flight it is queued again, keeping
    /// the at-most-one-in-flight guarantee without losing the newer state.
    pub fn done(&self, key: &ResourceKey) {
        let mut state = self.state.lock().expect("queue lock poisoned");
        state.processing.remove(key);
        if state.dirty.contains(key) && !state.shutting_down {
            state.queue.push_back(key.clone());
            metrics::record_queue_depth(&self.name, state.queue.len() as i64);
            drop(state);
            self.items.add_permits(1);
        }
    }

    /// Re-enqueue a key after its per-key backoff delay.
    pub fn add_rate_limited(self: Arc<Self>, key: ResourceKey) {
        let delay = self.limiter.next_delay(&key);
        trace!(queue = %self.name, key = %key, ?delay, "scheduling rate-limited retry");
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            self.add(key);
        });
    }

    /// Reset the backoff counter for a key (it reconciled cleanly or was
    /// dropped as unresolved).
    pub fn forget(&self, key: &ResourceKey) {
        self.limiter.forget(key);
    }

    /// Number of rate-limited requeues recorded for a key
    pub fn num_requeues(&self, key: &ResourceKey) -> u32 {
        self.limiter.retries(key)
    }

    /// Number of keys waiting (excludes in-flight keys)
    pub fn len(&self) -> usize {
        self.state.lock().expect("queue lock poisoned").queue.len()
    }

    /// Whether no keys are waiting
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stop accepting work and wake all blocked workers.
    ///
    /// Workers finish their current item; `get` returns `None` afterwards.
    pub fn shut_down(&self) {
        let mut state = self.state.lock().expect("queue lock poisoned");
        state.shutting_down = true;
        drop(state);
        self.items.close();
    }

    /// Enqueue capability for watch-feed adapters.
    pub fn enqueue_capability(self: Arc<Self>) -> Enqueue {
        Arc::new(move |key| self.add(key))
    }
}
