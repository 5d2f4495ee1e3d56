//! Sync error taxonomy.

use std::path::PathBuf;

use thiserror::Error;

use crate::error::{Effect, Transience};

/// Errors that can occur while provisioning or syncing a repository.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SyncError {
    #[error("directory does not exist: {0}")]
    MissingDirectory(PathBuf),

    #[error("directory is not a git working copy: {0}")]
    NotARepository(PathBuf),

    #[error("clone target is not empty: {0}")]
    DirectoryNotEmpty(PathBuf),

    #[error("failed to clone {url}: {source}")]
    CloneFailed {
        url: String,
        #[source]
        source: git2::Error,
    },

    #[error("failed to fetch from remote: {0}")]
    Fetch(#[source] git2::Error),

    #[error("failed to push to remote: {0}")]
    Push(#[source] git2::Error),

    #[error("push rejected (non-fast-forward)")]
    NonFastForward,

    #[error("push rejected: {message}")]
    PushRejected { message: String },

    #[error("merge conflict: {paths:?}")]
    MergeConflict { paths: Vec<String> },

    #[error("not a known revision: {0}")]
    BadRevision(String),

    #[error("file not found in repository history: {0}")]
    FileNotFound(String),

    #[error("invalid book path: {0}")]
    InvalidPath(String),

    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("git operation failed: {0}")]
    Git(#[from] git2::Error),
}

impl SyncError {
    /// Whether retrying this operation may succeed.
    pub fn transience(&self) -> Transience {
        match self {
            // Transport-class failures: the directory/repo state is intact
            // (a failed clone resets its target), so a retry is meaningful.
            SyncError::CloneFailed { .. }
            | SyncError::Fetch(_)
            | SyncError::Push(_)
            | SyncError::NonFastForward
            | SyncError::PushRejected { .. } => Transience::Retryable,

            SyncError::MissingDirectory(_)
            | SyncError::NotARepository(_)
            | SyncError::DirectoryNotEmpty(_)
            | SyncError::MergeConflict { .. }
            | SyncError::BadRevision(_)
            | SyncError::FileNotFound(_)
            | SyncError::InvalidPath(_)
            | SyncError::Unsupported(_)
            | SyncError::Io { .. }
            | SyncError::Git(_) => Transience::Permanent,
        }
    }

    /// What we know about side effects when this error is returned.
    pub fn effect(&self) -> Effect {
        match self {
            // Push-phase errors occur after local commits were created.
            SyncError::Push(_) | SyncError::NonFastForward | SyncError::PushRejected { .. } => {
                Effect::Some
            }

            // Low-level errors can happen at any phase.
            SyncError::Git(_) | SyncError::Io { .. } => Effect::Unknown,

            // Everything else fails before mutating anything.
            _ => Effect::None,
        }
    }
}
