#![forbid(unsafe_code)]

//! Two-way synchronization engine between a local working directory of
//! notebook files and a remote git repository.
//!
//! The git object model (commits, trees, blobs, refs) is the transport and
//! conflict-resolution substrate: every sync reconciles three points in
//! history (the last-synced commit, the caller's current file content, and
//! the current remote head) and decides per file whether a push, a pull, a
//! merge, or a write-back to the caller is required.
//!
//! Entry point is [`GitRepo`], provisioned once per repository location via
//! [`GitRepo::provision`]. The underlying engine is `git2`; this crate never
//! reimplements object storage, diffing, or three-way content merging.

pub mod book;
pub mod config;
pub mod error;
pub mod git;
pub mod repo;

pub use error::{Effect, Error, Transience};
pub type Result<T> = std::result::Result<T, Error>;

// Re-export the main types at the crate root for convenience
pub use config::{ConfigError, GitSettings, RepoLocation};
pub use git::{FileSynchronizer, IgnoreSet, ProgressSink, SyncError, TransportConfig};
pub use repo::{GitRepo, ProvisionOptions, SyncOutcome, VersionedRook};
