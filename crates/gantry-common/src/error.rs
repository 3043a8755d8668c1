//! Error types for the Gantry controllers
//!
//! Errors are structured with fields so controllers can log precisely which
//! cluster, annotation, or object a failure belongs to, and so the
//! reconciliation engine can decide between rate-limited retry and drop.

use thiserror::Error;

/// Default context value when no specific context is available
pub const UNKNOWN_CONTEXT: &str = "unknown";

/// Main error type for Gantry operations
#[derive(Debug, Error)]
pub enum Error {
    /// Indexed read model lookup failure
    #[error("store error [{context}]: {message}")]
    Store {
        /// Description of what failed
        message: String,
        /// Context where the error occurred (e.g., "index", "watch-bridge")
        context: String,
    },

    /// Backing-store update failure
    #[error("update error for {kind} {key}: {message}")]
    Update {
        /// Kind of the object being written
        kind: String,
        /// Workspace-aware key of the object being written
        key: String,
        /// Description of what failed
        message: String,
        /// Whether the write can be retried
        retryable: bool,
    },

    /// Optimistic-concurrency conflict: the object changed between the read
    /// and the write. Always retryable; the next pass re-reads the cache.
    #[error("conflict updating {kind} {key}: object changed concurrently")]
    Conflict {
        /// Kind of the object being written
        kind: String,
        /// Workspace-aware key of the object being written
        key: String,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
        /// The resource kind being serialized (if known)
        kind: Option<String>,
    },

    /// A recorded annotation failed to parse
    #[error("malformed annotation {annotation}: {message}")]
    MalformedAnnotation {
        /// The annotation key that failed to parse
        annotation: String,
        /// Execution cluster the annotation belongs to (if per-cluster)
        cluster: Option<String>,
        /// Description of what's wrong with the value
        message: String,
    },

    /// Internal/operational error
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Description of what failed
        message: String,
        /// Context where the error occurred (e.g., "engine", "worker")
        context: String,
    },
}

impl Error {
    /// Create a store error with the given message
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store {
            message: msg.into(),
            context: UNKNOWN_CONTEXT.to_string(),
        }
    }

    /// Create a store error with context
    pub fn store_with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Store {
            message: msg.into(),
            context: context.into(),
        }
    }

    /// Create a retryable update error
    pub fn update_for(
        kind: impl Into<String>,
        key: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        Self::Update {
            kind: kind.into(),
            key: key.into(),
            message: msg.into(),
            retryable: true,
        }
    }

    /// Create a non-retryable update error (e.g., the object is invalid)
    pub fn update_permanent(
        kind: impl Into<String>,
        key: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        Self::Update {
            kind: kind.into(),
            key: key.into(),
            message: msg.into(),
            retryable: false,
        }
    }

    /// Create an optimistic-concurrency conflict error
    pub fn conflict(kind: impl Into<String>, key: impl Into<String>) -> Self {
        Self::Conflict {
            kind: kind.into(),
            key: key.into(),
        }
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: None,
        }
    }

    /// Create a serialization error with resource kind context
    pub fn serialization_for_kind(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: Some(kind.into()),
        }
    }

    /// Create a malformed-annotation error
    pub fn malformed_annotation(annotation: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::MalformedAnnotation {
            annotation: annotation.into(),
            cluster: None,
            message: msg.into(),
        }
    }

    /// Create a malformed-annotation error attributed to one execution cluster
    pub fn malformed_annotation_for_cluster(
        annotation: impl Into<String>,
        cluster: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        Self::MalformedAnnotation {
            annotation: annotation.into(),
            cluster: Some(cluster.into()),
            message: msg.into(),
        }
    }

    /// Create an internal error with the given message
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: UNKNOWN_CONTEXT.to_string(),
        }
    }

    /// Create an internal error with context
    pub fn internal_with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: context.into(),
        }
    }

    /// Check if this error is retryable
    ///
    /// Conflicts and store/update failures are transient and retried with
    /// backoff. Malformed annotations are retried: the annotation is written
    /// by an external sync agent and may be corrected by its next pass.
    /// Serialization errors require a code or data fix and are not retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Store { .. } => true,
            Error::Update { retryable, .. } => *retryable,
            Error::Conflict { .. } => true,
            Error::Serialization { .. } => false,
            Error::MalformedAnnotation { .. } => true,
            Error::Internal { .. } => true,
        }
    }

    /// Get the execution cluster if this error is associated with one
    pub fn cluster(&self) -> Option<&str> {
        match self {
            Error::MalformedAnnotation { cluster, .. } => cluster.as_deref(),
            _ => None,
        }
    }

    /// Get the context if this error has one
    pub fn context(&self) -> Option<&str> {
        match self {
            Error::Store { context, .. } => Some(context),
            Error::Internal { context, .. } => Some(context),
            _ => None,
        }
    }
}
