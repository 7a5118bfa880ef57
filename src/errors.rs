//! Error types for the Linage crate.
//!
//! This module defines a unified error enumeration used across hashing, blob
//! storage, metadata persistence, diffing, merging, and graph operations. It
//! integrates with `thiserror` to provide rich `Display` implementations and
//! error source chaining where applicable.
//!
//! Notes:
//! - Each variant carries contextual details via its message payload.
//! - Variants cover the taxonomy of kinds rather than one type per failure
//!   site: InvalidInput, NotFound, Conflict, Unresolved, Cancelled, IoError,
//!   Corruption.

use thiserror::Error;

#[derive(Error, Debug)]
/// Unified error enumeration for the Linage library.
///
/// - Used across the blob store, metadata store, graph service, diff
///   strategies, and merge engine.
/// - Implements `std::error::Error` via `thiserror`.
pub enum LinageError {
    /// Caller-supplied arguments violate a pre-condition (empty branch name,
    /// malformed digest, unknown hash/diff strategy, unknown commit id).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Target entity is absent (branch, commit, blob, snapshot, remote).
    #[error("not found: {0}")]
    NotFound(String),

    /// Domain-level precondition collision: duplicate branch name, duplicate
    /// commit digest, active-branch deletion, branching with history but no
    /// active branch.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A merge produced conflicts; the merge result is still returned but the
    /// caller must resolve them before committing.
    #[error("unresolved merge conflicts in {0} file(s)")]
    Unresolved(usize),

    /// The operation was aborted cooperatively at a checkpoint; partial work
    /// may be left visible (e.g. in the change detector's dirty map).
    #[error("operation cancelled: {0}")]
    Cancelled(String),

    /// I/O error from the filesystem or an underlying transport.
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    /// Digest mismatch on retrieval, orphan object references, or a cycle
    /// detected while traversing the commit DAG.
    #[error("corruption detected: {0}")]
    Corruption(String),
}

impl From<sea_orm::DbErr> for LinageError {
    fn from(err: sea_orm::DbErr) -> Self {
        match &err {
            sea_orm::DbErr::RecordNotFound(msg) => LinageError::NotFound(msg.clone()),
            sea_orm::DbErr::Conn(_) | sea_orm::DbErr::ConnectionAcquire(_) => {
                LinageError::IoError(std::io::Error::other(err.to_string()))
            }
            _ => LinageError::Conflict(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, LinageError>;
