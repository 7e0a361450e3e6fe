// src/error.rs

//! Central error taxonomy for the package engine
//!
//! Errors are split along the propagation boundaries described in the
//! component contracts: archive failures are local to one package,
//! store failures abort the single action in progress, and access
//! failures abort an action before any mutation.

use crate::config::UserRef;
use crate::package::Namespace;
use thiserror::Error;

/// Convenience result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// All errors produced by the package engine
#[derive(Debug, Error)]
pub enum Error {
    /// A package archive is malformed or unreadable.
    ///
    /// Fatal to that package's contribution, never retried. Bulk
    /// operations (diff building, propagation) log and skip it.
    #[error("Archive error: {0}")]
    Archive(String),

    /// Read/write/delete failure against the content store.
    ///
    /// Aborts the single action in progress; sibling actions and
    /// cleanup of other namespaces continue.
    #[error("Content store error: {0}")]
    Store(String),

    /// The rights check refused the mutation.
    #[error("User {user} does not have {right} right on {namespace}")]
    AccessDenied {
        user: UserRef,
        right: String,
        namespace: Namespace,
    },

    /// An interactive conflict could not be answered: no answer
    /// channel is attached, or the answer chose CUSTOM without
    /// supplying the custom content.
    #[error("Conflict on {0} requires an answer that was not provided")]
    AnswerRequired(String),

    /// The owning job was cancelled while waiting for a conflict
    /// answer.
    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    /// A namespace value this engine does not support (neither root
    /// nor a wiki scope).
    #[error("Unsupported namespace: {0}")]
    UnsupportedNamespace(String),

    /// Plan-level I/O failure, fatal to diff construction.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}
