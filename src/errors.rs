//! Repository error taxonomy
//!
//! Operations return `anyhow::Result`; the failures a caller is expected to react to
//! are raised as [`RepositoryError`] so they can be recovered with
//! `err.downcast_ref::<RepositoryError>()`. Content conflicts are not errors and never
//! appear here: they are reported through the outcome types of merge-like operations.

use crate::artifacts::objects::object_id::ObjectId;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    /// An object, ref or path does not exist
    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    #[error("ref {name} already exists")]
    RefExists { name: String },

    /// A compare-and-swap ref update observed a different value than expected
    #[error("ref {name} was updated concurrently: expected {expected}, found {actual}")]
    RefConflict {
        name: String,
        expected: String,
        actual: String,
    },

    /// Hash mismatch or malformed object content
    #[error("object {oid} is corrupt: {reason}")]
    Corrupt { oid: ObjectId, reason: String },

    #[error("repository is locked by {holder} ({path})")]
    LockHeld { path: PathBuf, holder: String },

    /// The operation is not allowed in the repository's current state
    #[error("{0}")]
    InvalidState(String),

    #[error("{hook} hook rejected the operation: {reason}")]
    HookRejected { hook: String, reason: String },
}

impl RepositoryError {
    pub fn not_found(kind: &'static str, name: impl ToString) -> anyhow::Error {
        RepositoryError::NotFound {
            kind,
            name: name.to_string(),
        }
        .into()
    }

    pub fn invalid_state(message: impl Into<String>) -> anyhow::Error {
        RepositoryError::InvalidState(message.into()).into()
    }

    pub fn corrupt(oid: &ObjectId, reason: impl Into<String>) -> anyhow::Error {
        RepositoryError::Corrupt {
            oid: oid.clone(),
            reason: reason.into(),
        }
        .into()
    }

    /// Render an optional ref value for conflict messages
    pub fn describe_oid(oid: Option<&ObjectId>) -> String {
        oid.map(|oid| oid.to_string())
            .unwrap_or_else(|| "<none>".to_string())
    }
}

/// Extract the taxonomy error carried by an `anyhow::Error`, if any
pub fn classify(error: &anyhow::Error) -> Option<&RepositoryError> {
    error.downcast_ref::<RepositoryError>()
}
