//! Resource model shared by every controller: workspace-aware keys, the
//! `ResourceLike` capability trait over Kubernetes metadata, and label
//! selectors for the indexed read model.
//!
//! `ResourceLike` is the seam that lets the reconciliation engine stay
//! generic over heterogeneous kinds (Deployment, Secret, Service, traffic
//! objects) without reflection-style type switches: each kind implements a
//! small metadata capability and everything else is derived.

use std::collections::BTreeMap;
use std::fmt;

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Secret, Service};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use crate::{DEFAULT_WORKSPACE, WORKSPACE_ANNOTATION};

/// Identity of an object within one kind's index: logical workspace,
/// namespace, and name. Immutable once enqueued.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
    /// Logical workspace the object belongs to
    pub workspace: String,
    /// Namespace within the workspace
    pub namespace: String,
    /// Object name
    pub name: String,
}

impl ResourceKey {
    /// Create a key from its parts
    pub fn new(
        workspace: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            workspace: workspace.into(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Derive the key of an object from its metadata.
    ///
    /// The workspace is read from the `gantry.dev/workspace` annotation;
    /// objects without it belong to the root workspace.
    pub fn from_meta(meta: &ObjectMeta) -> Self {
        let workspace = meta
            .annotations
            .as_ref()
            .and_then(|a| a.get(WORKSPACE_ANNOTATION))
            .map(String::as_str)
            .unwrap_or(DEFAULT_WORKSPACE);
        Self {
            workspace: workspace.to_string(),
            namespace: meta.namespace.clone().unwrap_or_default(),
            name: meta.name.clone().unwrap_or_default(),
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}/{}", self.workspace, self.namespace, self.name)
    }
}

/// Capability trait over any kind under reconciliation.
///
/// Implementations expose their Kubernetes metadata; everything the
/// controllers need (keys, workspace, annotations, labels) is derived from
/// it via the provided methods.
pub trait ResourceLike {
    /// Kind name used in logs and error context
    fn kind() -> &'static str
    where
        Self: Sized;

    /// The object's metadata
    fn meta(&self) -> &ObjectMeta;

    /// The object's metadata, mutably
    fn meta_mut(&mut self) -> &mut ObjectMeta;

    /// Object name ("" if unset)
    fn name(&self) -> &str {
        self.meta().name.as_deref().unwrap_or_default()
    }

    /// Object namespace ("" if unset)
    fn namespace(&self) -> &str {
        self.meta().namespace.as_deref().unwrap_or_default()
    }

    /// Logical workspace the object belongs to
    fn workspace(&self) -> &str {
        self.annotations()
            .and_then(|a| a.get(WORKSPACE_ANNOTATION))
            .map(String::as_str)
            .unwrap_or(DEFAULT_WORKSPACE)
    }

    /// Workspace-aware key of this object
    fn key(&self) -> ResourceKey {
        ResourceKey::from_meta(self.meta())
    }

    /// The object's annotations, if any
    fn annotations(&self) -> Option<&BTreeMap<String, String>> {
        self.meta().annotations.as_ref()
    }

    /// The object's annotations, created on first use
    fn annotations_mut(&mut self) -> &mut BTreeMap<String, String> {
        self.meta_mut().annotations.get_or_insert_with(BTreeMap::new)
    }

    /// The object's labels, if any
    fn labels(&self) -> Option<&BTreeMap<String, String>> {
        self.meta().labels.as_ref()
    }

    /// The object's labels, created on first use
    fn labels_mut(&mut self) -> &mut BTreeMap<String, String> {
        self.meta_mut().labels.get_or_insert_with(BTreeMap::new)
    }
}

impl ResourceLike for Deployment {
    fn kind() -> &'static str {
        "Deployment"
    }

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

impl ResourceLike for Secret {
    fn kind() -> &'static str {
        "Secret"
    }

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

impl ResourceLike for Service {
    fn kind() -> &'static str {
        "Service"
    }

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

impl ResourceLike for Ingress {
    fn kind() -> &'static str {
        "Ingress"
    }

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

/// Label-equality selector for listing from the indexed read model.
///
/// An empty selector matches everything.
#[derive(Clone, Debug, Default)]
pub struct Selector {
    labels: BTreeMap<String, String>,
}

impl Selector {
    /// A selector matching every object
    pub fn everything() -> Self {
        Self::default()
    }

    /// Require `key=value` on matched objects
    pub fn with_eq(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Whether an object with the given labels matches this selector
    pub fn matches(&self, labels: Option<&BTreeMap<String, String>>) -> bool {
        if self.labels.is_empty() {
            return true;
        }
        let Some(labels) = labels else {
            return false;
        };
        self.labels
            .iter()
            .all(|(k, v)| labels.get(k).map(String::as_str) == Some(v.as_str()))
    }
}
