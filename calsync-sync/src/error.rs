//! Error types for the reconciliation layer.

use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Result type for entity repository calls.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Errors that abort a whole cleanup sweep.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Relation store could not be read or written.
    #[error("storage error: {0}")]
    Storage(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The relation store breaks the one-to-one pairing of local and
    /// remote identities.
    #[error("relation store invariant violated: {0}")]
    InvariantViolation(String),

    /// Deletions were carried out but the updated relations could not be
    /// persisted. The next pass has to redo the cleanup.
    #[error("cleanup results lost, relations not saved: {0}")]
    RelationsNotSaved(String),

    /// A background task (the sweep or a relation store query) panicked
    /// or was aborted.
    #[error("background task failed: {0}")]
    TaskJoin(String),
}

/// Errors reported by an entity repository adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    /// The entity no longer exists.
    #[error("entity not found: {0}")]
    NotFound(String),

    /// Any other failure (I/O, protocol, permission, timeout).
    #[error("repository fault: {0}")]
    Fault(String),
}

impl RepositoryError {
    /// Returns true for the well-known "already gone" condition.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
