//! Repository facade - the public entry point consumed by the application.
//!
//! One [`GitRepo`] per configured remote. Application-level requests
//! (store/retrieve/list/sync a book) are translated into provisioner and
//! synchronizer operations and wrapped as [`VersionedRook`] /
//! [`SyncOutcome`] results.
//!
//! The working copy is not safe for concurrent mutation, so a process-wide
//! registry of per-location locks serializes every operation against the
//! same repository location, including provisioning. Operations against
//! different locations may run on separate threads.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use git2::{ObjectType, Repository, TreeWalkMode, TreeWalkResult};
use serde::{Deserialize, Serialize};

use crate::book;
use crate::config::{GitSettings, RepoLocation};
use crate::git::ignore::IgnoreSet;
use crate::git::sync::FileSynchronizer;
use crate::git::transport::{ProgressSink, TransportConfig};
use crate::git::{SyncError, provision};

/// "This book, as of this point in history."
///
/// Created after every mutating or listing operation; immutable, superseded
/// by later syncs. The application persists it and hands it back as the
/// baseline for the next sync. An empty `path` marks a book that has no
/// remote location yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedRook {
    /// Remote repository URL.
    pub repo_url: String,
    /// Relative, URI-encoded book path.
    pub path: String,
    /// Hex commit id the book was last seen at.
    pub revision: String,
    /// Commit time, milliseconds.
    pub commit_time_ms: i64,
}

impl VersionedRook {
    pub fn is_unsynced(&self) -> bool {
        self.path.is_empty()
    }

    /// Parse the recorded revision back into an engine id.
    pub fn revision_oid(&self) -> Result<git2::Oid, SyncError> {
        git2::Oid::from_str(&self.revision).map_err(|_| SyncError::BadRevision(self.revision.clone()))
    }
}

/// Result of a two-way book sync.
#[derive(Debug)]
pub struct SyncOutcome {
    /// Fresh pointer for the book at the new head.
    pub rook: VersionedRook,
    /// Repository-local file the caller must copy back into its own
    /// storage, present only when the recorded content diverged from what
    /// the caller believed was current.
    pub write_back: Option<PathBuf>,
}

/// Document-format classifier supplied by the application.
pub type FormatClassifier = fn(&str) -> bool;

/// Everything needed to provision a repository, in one place.
#[derive(Debug, Clone)]
pub struct ProvisionOptions {
    pub location: RepoLocation,
    pub transport: TransportConfig,
    /// Clone from the remote instead of verifying an existing working copy.
    pub clone: bool,
    pub classifier: FormatClassifier,
    pub author_name: Option<String>,
    pub author_email: Option<String>,
}

impl ProvisionOptions {
    pub fn new(location: RepoLocation, transport: TransportConfig) -> Self {
        ProvisionOptions {
            location,
            transport,
            clone: false,
            classifier: book::is_org_file_name,
            author_name: None,
            author_email: None,
        }
    }

    pub fn from_settings(settings: &GitSettings) -> Self {
        let mut options = Self::new(settings.location(), settings.transport());
        options.author_name = settings.author_name.clone();
        options.author_email = settings.author_email.clone();
        options
    }

    pub fn with_clone(mut self, clone: bool) -> Self {
        self.clone = clone;
        self
    }

    pub fn with_classifier(mut self, classifier: FormatClassifier) -> Self {
        self.classifier = classifier;
        self
    }
}

/// A provisioned, synced repository.
pub struct GitRepo {
    repo: Repository,
    location: RepoLocation,
    transport: TransportConfig,
    classifier: FormatClassifier,
    op_lock: Arc<Mutex<()>>,
}

impl GitRepo {
    /// Provision the repository described by `options` (verify an existing
    /// working copy, or clone when `options.clone` is set) and return the
    /// facade for it.
    pub fn provision(
        options: ProvisionOptions,
        progress: Option<&mut dyn ProgressSink>,
    ) -> Result<GitRepo, SyncError> {
        let op_lock = location_lock(&options.location.local_dir);
        let repo = {
            let _guard = lock(&op_lock);
            let repo = provision::ensure_repository_exists(
                &options.location,
                &options.transport,
                options.clone,
                progress,
            )?;
            if options.author_name.is_some() || options.author_email.is_some() {
                let mut config = repo.config()?;
                if let Some(name) = &options.author_name {
                    config.set_str("user.name", name)?;
                }
                if let Some(email) = &options.author_email {
                    config.set_str("user.email", email)?;
                }
            }
            repo
        };
        tracing::info!(dir = %options.location.local_dir.display(), "repository provisioned");
        Ok(GitRepo {
            repo,
            location: options.location,
            transport: options.transport,
            classifier: options.classifier,
            op_lock,
        })
    }

    pub fn remote_url(&self) -> &str {
        &self.location.remote_url
    }

    /// Store a brand-new book.
    ///
    /// Only called for names that do not yet exist in the repository (the
    /// caller enforces this), so the file is committed and pushed without
    /// any merge step.
    pub fn store_book(&self, file: &Path, name: &str) -> Result<VersionedRook, SyncError> {
        let _op = lock(&self.op_lock);
        let rel_path = book::decode_path(name)?;
        let sync = self.synchronizer();
        sync.add_and_commit_new_file(file, &rel_path)?;
        sync.try_push()?;
        self.current_versioned_rook(&rel_path)
    }

    /// Merge with the remote, push anything new, and materialize the book
    /// into `destination`.
    pub fn retrieve_book(&self, name: &str, destination: &Path) -> Result<VersionedRook, SyncError> {
        let _op = lock(&self.op_lock);
        let rel_path = book::decode_path(name)?;
        let sync = self.synchronizer();
        sync.merge_with_remote()?;
        // No baseline is available at this call site; push unconditionally.
        sync.try_push_if_updated(None)?;
        sync.safely_retrieve_latest_version_of_file(&rel_path, destination, None)?;
        self.current_versioned_rook(&rel_path)
    }

    /// List every non-ignored, supported-format book reachable from the
    /// current head. Recomputed from the commit tree on every call; the
    /// ignore file is re-read each time.
    pub fn list_books(&self) -> Result<Vec<VersionedRook>, SyncError> {
        let _op = lock(&self.op_lock);
        let sync = self.synchronizer();
        sync.set_branch_and_get_latest()?;
        let Some(head) = sync.current_head()? else {
            return Ok(Vec::new());
        };

        let ignores = IgnoreSet::load(&self.location.local_dir)?;
        let classifier = self.classifier;
        let mut paths = Vec::new();
        let tree = head.tree()?;
        tree.walk(TreeWalkMode::PreOrder, |root, entry| {
            let Some(name) = entry.name() else {
                return TreeWalkResult::Skip;
            };
            let path = format!("{root}{name}");
            let is_dir = entry.kind() == Some(ObjectType::Tree);
            if ignores.is_ignored(&path, is_dir) {
                // Pruning an ignored directory hides everything under it.
                return if is_dir {
                    TreeWalkResult::Skip
                } else {
                    TreeWalkResult::Ok
                };
            }
            if !is_dir && classifier(&path) {
                paths.push(path);
            }
            TreeWalkResult::Ok
        })?;

        paths
            .iter()
            .map(|path| self.current_versioned_rook(path))
            .collect()
    }

    /// Two-way sync of one book: reconcile the caller's content against the
    /// baseline and the current head, push what advanced, and report
    /// whether the caller must pull new bytes back.
    pub fn sync_book(
        &self,
        uri: &str,
        baseline: Option<&VersionedRook>,
        from_db: &Path,
    ) -> Result<SyncOutcome, SyncError> {
        let _op = lock(&self.op_lock);
        let rel_path = book::decode_path(uri)?;
        let sync = self.synchronizer();

        let write_back_needed = match baseline {
            Some(rook) => {
                let baseline_oid = rook.revision_oid()?;
                let baseline_commit = self
                    .repo
                    .find_commit(baseline_oid)
                    .map_err(|_| SyncError::BadRevision(rook.revision.clone()))?;
                let baseline_blob = sync.file_revision(&rel_path, &baseline_commit)?;
                sync.update_and_commit_file_from_revision_and_merge(
                    from_db,
                    &rel_path,
                    baseline_blob,
                    &baseline_commit,
                )?;
                sync.try_push_if_updated(Some(baseline_oid))?;

                let head = sync
                    .current_head()?
                    .ok_or_else(|| SyncError::FileNotFound(rel_path.clone()))?;
                !sync.file_matches_in_revisions(&rel_path, baseline_oid, head.id())?
            }
            None => {
                // Degraded-confidence path: with no common ancestor there is
                // nothing safe to merge against, so the repository copy wins
                // and the caller is told to reload it.
                tracing::warn!(book = %rel_path, "no baseline revision known, loading book back from repository");
                true
            }
        };

        let write_back = write_back_needed.then(|| sync.repo_directory_file(&rel_path));
        tracing::debug!(book = %rel_path, write_back = write_back_needed, "book sync finished");
        Ok(SyncOutcome {
            rook: self.current_versioned_rook(&rel_path)?,
            write_back,
        })
    }

    /// Renaming is not supported by this repository type.
    pub fn rename_book(&self, _from: &str, _to: &str) -> Result<VersionedRook, SyncError> {
        Err(SyncError::Unsupported("rename"))
    }

    /// Deletion is not supported by this repository type.
    pub fn delete_book(&self, _uri: &str) -> Result<(), SyncError> {
        Err(SyncError::Unsupported("delete"))
    }

    fn synchronizer(&self) -> FileSynchronizer<'_> {
        FileSynchronizer::new(&self.repo, &self.location, &self.transport)
    }

    fn current_versioned_rook(&self, rel_path: &str) -> Result<VersionedRook, SyncError> {
        let sync = self.synchronizer();
        let commit = sync.latest_commit_of_file(rel_path)?;
        Ok(VersionedRook {
            repo_url: self.location.remote_url.clone(),
            path: book::encode_path(rel_path),
            revision: commit.id().to_string(),
            commit_time_ms: commit.time().seconds() * 1000,
        })
    }
}

// =============================================================================
// Per-location serialization
// =============================================================================

fn location_lock(dir: &Path) -> Arc<Mutex<()>> {
    static LOCKS: OnceLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceLock::new();
    let registry = LOCKS.get_or_init(|| Mutex::new(HashMap::new()));
    let mut map = registry.lock().unwrap_or_else(PoisonError::into_inner);
    map.entry(dir.to_path_buf()).or_default().clone()
}

fn lock(mutex: &Mutex<()>) -> MutexGuard<'_, ()> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_locks_are_shared_per_directory() {
        let a = location_lock(Path::new("/tmp/rooksync-test-same"));
        let b = location_lock(Path::new("/tmp/rooksync-test-same"));
        let c = location_lock(Path::new("/tmp/rooksync-test-other"));
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn rook_revision_round_trip() {
        let rook = VersionedRook {
            repo_url: "remote".into(),
            path: "notes.org".into(),
            revision: "0123456789abcdef0123456789abcdef01234567".into(),
            commit_time_ms: 0,
        };
        assert_eq!(
            rook.revision_oid().unwrap().to_string(),
            "0123456789abcdef0123456789abcdef01234567"
        );
        assert!(!rook.is_unsynced());
    }

    #[test]
    fn bad_revision_is_rejected() {
        let rook = VersionedRook {
            repo_url: "remote".into(),
            path: "notes.org".into(),
            revision: "not-a-revision".into(),
            commit_time_ms: 0,
        };
        assert!(matches!(
            rook.revision_oid(),
            Err(SyncError::BadRevision(_))
        ));
    }

    #[test]
    fn unsynced_sentinel() {
        let rook = VersionedRook {
            repo_url: "remote".into(),
            path: String::new(),
            revision: String::new(),
            commit_time_ms: 0,
        };
        assert!(rook.is_unsynced());
    }
}
