//! Indexed read model and watch-feed adapter.
//!
//! [`Store`] is the read interface consumed by the engine: get by
//! workspace-aware key, list by label selector, with workspace- and
//! namespace-scoped variants. [`SharedIndex`] is the in-memory
//! implementation, kept current by a [`WatchBridge`] that applies
//! add/update/delete events and enqueues the affected key.
//!
//! Objects returned here must be treated as read-only: consumers receive
//! shared `Arc` copies and the engine deep-copies before mutating.

use std::sync::Arc;

use dashmap::DashMap;

use gantry_common::{ResourceKey, ResourceLike, Result, Selector};

use crate::queue::Enqueue;

/// Read interface over the local object cache.
pub trait Store<R>: Send + Sync {
    /// Look up one object by key. `Ok(None)` means deleted (or never seen).
    fn get_by_key(&self, key: &ResourceKey) -> Result<Option<Arc<R>>>;

    /// List objects across all workspaces matching the selector.
    fn list(&self, selector: &Selector) -> Result<Vec<Arc<R>>>;

    /// List objects in one workspace matching the selector.
    fn list_workspace(&self, workspace: &str, selector: &Selector) -> Result<Vec<Arc<R>>>;

    /// List objects in one workspace and namespace matching the selector.
    fn list_namespace(
        &self,
        workspace: &str,
        namespace: &str,
        selector: &Selector,
    ) -> Result<Vec<Arc<R>>>;
}

/// Concurrent in-memory index keyed by (workspace, namespace, name).
///
/// Safe for concurrent reads from all workers; mutated only by the watch
/// bridge. Listing returns objects in key order so results are reproducible.
pub struct SharedIndex<R> {
    objects: DashMap<ResourceKey, Arc<R>>,
}

impl<R: ResourceLike> SharedIndex<R> {
    /// Create an empty index
    pub fn new() -> Self {
        Self {
            objects: DashMap::new(),
        }
    }

    /// Insert or replace an object, returning its key
    pub fn insert(&self, object: R) -> ResourceKey {
        let key = object.key();
        self.objects.insert(key.clone(), Arc::new(object));
        key
    }

    /// Remove an object by key
    pub fn remove(&self, key: &ResourceKey) {
        self.objects.remove(key);
    }

    /// Number of cached objects
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the index is empty
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    fn list_filtered(&self, selector: &Selector, scope: impl Fn(&ResourceKey) -> bool) -> Vec<Arc<R>> {
        let mut entries: Vec<(ResourceKey, Arc<R>)> = self
            .objects
            .iter()
            .filter(|entry| scope(entry.key()) && selector.matches(entry.value().labels()))
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries.into_iter().map(|(_, object)| object).collect()
    }
}

impl<R: ResourceLike> Default for SharedIndex<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: ResourceLike + Send + Sync> Store<R> for SharedIndex<R> {
    fn get_by_key(&self, key: &ResourceKey) -> Result<Option<Arc<R>>> {
        Ok(self.objects.get(key).map(|entry| Arc::clone(entry.value())))
    }

    fn list(&self, selector: &Selector) -> Result<Vec<Arc<R>>> {
        Ok(self.list_filtered(selector, |_| true))
    }

    fn list_workspace(&self, workspace: &str, selector: &Selector) -> Result<Vec<Arc<R>>> {
        Ok(self.list_filtered(selector, |key| key.workspace == workspace))
    }

    fn list_namespace(
        &self,
        workspace: &str,
        namespace: &str,
        selector: &Selector,
    ) -> Result<Vec<Arc<R>>> {
        Ok(self.list_filtered(selector, |key| {
            key.workspace == workspace && key.namespace == namespace
        }))
    }
}

/// A single event from the watch feed.
///
/// Adds and updates are not distinguished: the engine is level-triggered and
/// only cares about the latest state. A delete carries the last-seen object
/// so its key can be derived; the engine observes deletion as "not found" on
/// the next read.
pub enum WatchEvent<R> {
    /// Object created or updated
    Applied(R),
    /// Object deleted
    Deleted(R),
}

/// Adapter between a watch feed and a controller: applies events to the
/// index and enqueues the affected key.
///
/// The optional filter drops events before they touch the index, for
/// controllers that only manage a labeled subset of a kind.
pub struct WatchBridge<R> {
    index: Arc<SharedIndex<R>>,
    enqueue: Enqueue,
    filter: Option<Box<dyn Fn(&R) -> bool + Send + Sync>>,
}

impl<R: ResourceLike + Send + Sync> WatchBridge<R> {
    /// Create a bridge feeding the given index and enqueue capability
    pub fn new(index: Arc<SharedIndex<R>>, enqueue: Enqueue) -> Self {
        Self {
            index,
            enqueue,
            filter: None,
        }
    }

    /// Only admit events whose object passes the predicate
    pub fn with_filter(mut self, filter: impl Fn(&R) -> bool + Send + Sync + 'static) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    /// Apply one watch event: update the index, then enqueue the key once.
    pub fn handle(&self, event: WatchEvent<R>) {
        match event {
            WatchEvent::Applied(object) => {
                if self.admits(&object) {
                    let key = self.index.insert(object);
                    (self.enqueue)(key);
                }
            }
            WatchEvent::Deleted(object) => {
                if self.admits(&object) {
                    let key = object.key();
                    self.index.remove(&key);
                    (self.enqueue)(key);
                }
            }
        }
    }

    fn admits(&self, object: &R) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(object))
    }
}
