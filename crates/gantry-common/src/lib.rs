//! Common types for Gantry: errors, resource model, and the annotation/label
//! wire contract shared with per-cluster sync agents.

#![deny(missing_docs)]

pub mod error;
pub mod metrics;
pub mod resource;
pub mod telemetry;

pub use error::Error;
pub use resource::{ResourceKey, ResourceLike, Selector};

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Annotation carrying the logical workspace an object belongs to
pub const WORKSPACE_ANNOTATION: &str = "gantry.dev/workspace";

/// Workspace assigned to objects that carry no workspace annotation
pub const DEFAULT_WORKSPACE: &str = "root";

/// Label marking objects (notably Secrets) owned by Gantry
pub const MANAGED_LABEL: &str = "gantry.dev/managed";

/// Value of [`MANAGED_LABEL`] on managed objects
pub const MANAGED_LABEL_VALUE: &str = "true";

/// Prefix of per-cluster status snapshot annotations written by sync agents.
///
/// Key = `status.sync.gantry.dev/<cluster-id>`, value = JSON snapshot of that
/// cluster's view of the object (the resource's own schema, at minimum its
/// status subtree). This is a compatibility-sensitive wire format: renaming
/// fields breaks DNS derivation for every downstream consumer.
pub const SYNC_STATUS_ANNOTATION_PREFIX: &str = "status.sync.gantry.dev/";

/// Prefix of per-cluster sync-state labels
pub const SYNC_STATE_LABEL_PREFIX: &str = "state.sync.gantry.dev/";

/// Sync-state label value marking an active placement
pub const SYNC_STATE_VALUE: &str = "Sync";

/// Prefix of per-cluster deletion markers stamped during migration
pub const DELETING_ANNOTATION_PREFIX: &str = "deleting.sync.gantry.dev/";

/// Annotation naming the execution cluster an object should be placed on
pub const PLACEMENT_ANNOTATION: &str = "scheduling.gantry.dev/placement";

/// Annotation recording the controller-authored host of a traffic object
pub const TRANSFORM_HOST_ANNOTATION: &str = "transform.gantry.dev/host";

/// Annotation recording controller-authored TLS material of a traffic object
pub const TRANSFORM_TLS_ANNOTATION: &str = "transform.gantry.dev/tls";

/// Annotation recording a controller-authored path rewrite of a traffic object
pub const TRANSFORM_PATH_ANNOTATION: &str = "transform.gantry.dev/path";
