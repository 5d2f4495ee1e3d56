//! File synchronizer - the sync engine proper.
//!
//! Implements the git sync protocol for notebook files:
//! - fetch + fast-forward-or-merge against the configured remote
//! - push with one merge-then-retry on rejection, skipped when the head
//!   already matches the caller's baseline
//! - per-file three-point reconciliation (baseline commit, submitted
//!   content, current head) through the engine's three-way merge
//! - safe retrieval that never discards uncommitted local divergence
//!
//! All operations are synchronous and block for the duration of network and
//! disk I/O. Callers serialize access per repository location; see the
//! facade.

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use git2::build::CheckoutBuilder;
use git2::{Commit, ErrorCode, MergeOptions, ObjectType, Oid, Repository, Signature, Sort};

use super::error::SyncError;
use super::transport::{self, TransportConfig};
use crate::config::RepoLocation;

#[derive(Clone, Copy)]
enum FetchPolicy {
    /// Transport failures surface as errors.
    Strict,
    /// Transport failures are logged; local state is served.
    BestEffort,
}

/// The synchronizer for one repository.
///
/// Borrows the repository handle owned by the facade; constructed per
/// operation.
pub struct FileSynchronizer<'a> {
    repo: &'a Repository,
    location: &'a RepoLocation,
    transport: &'a TransportConfig,
}

impl<'a> FileSynchronizer<'a> {
    pub fn new(
        repo: &'a Repository,
        location: &'a RepoLocation,
        transport: &'a TransportConfig,
    ) -> Self {
        FileSynchronizer {
            repo,
            location,
            transport,
        }
    }

    // =========================================================================
    // Head and ref inspection
    // =========================================================================

    /// The tip of the active branch, or `None` on a repository with no
    /// commits yet.
    pub fn current_head(&self) -> Result<Option<Commit<'a>>, SyncError> {
        match self.repo.head() {
            Ok(head) => Ok(Some(head.peel_to_commit()?)),
            Err(err)
                if err.code() == ErrorCode::UnbornBranch || err.code() == ErrorCode::NotFound =>
            {
                Ok(None)
            }
            Err(err) => Err(SyncError::Git(err)),
        }
    }

    fn local_oid(&self) -> Result<Option<Oid>, SyncError> {
        refname_to_id_optional(self.repo, &self.location.branch_ref())
    }

    fn remote_tracking_oid(&self) -> Result<Option<Oid>, SyncError> {
        refname_to_id_optional(self.repo, &self.location.remote_tracking_ref())
    }

    // =========================================================================
    // Fetch / merge / push
    // =========================================================================

    /// Ensure the configured branch is checked out and refreshed from the
    /// remote, then report its tip. Idempotent.
    ///
    /// The fetch is best-effort so listings keep working offline; failures
    /// are logged and the local state is served.
    pub fn set_branch_and_get_latest(&self) -> Result<Option<Oid>, SyncError> {
        self.ensure_branch_checked_out()?;
        self.fetch(FetchPolicy::BestEffort)?;
        self.reconcile_with_remote()?;
        self.local_oid()
    }

    /// Fetch the remote branch and fast-forward or merge it into the local
    /// branch.
    ///
    /// Fails with [`SyncError::Fetch`] on transport/auth errors and
    /// [`SyncError::MergeConflict`] when the histories cannot be merged
    /// automatically; neither moves the branch.
    pub fn merge_with_remote(&self) -> Result<(), SyncError> {
        self.fetch(FetchPolicy::Strict)?;
        self.reconcile_with_remote()
    }

    fn fetch(&self, policy: FetchPolicy) -> Result<(), SyncError> {
        let mut remote = match self.repo.find_remote(&self.location.remote_name) {
            Ok(remote) => remote,
            // No remote configured: local-only repository.
            Err(_) => return Ok(()),
        };
        let callbacks = transport::remote_callbacks(self.repo.config().ok(), self.transport, None);
        let mut options = git2::FetchOptions::new();
        options.remote_callbacks(callbacks);
        let refspec = self.location.fetch_refspec();
        let started = Instant::now();
        if let Err(err) = remote.fetch(&[refspec.as_str()], Some(&mut options), None) {
            match policy {
                FetchPolicy::Strict => return Err(SyncError::Fetch(err)),
                FetchPolicy::BestEffort => {
                    tracing::warn!(error = %err, "fetch failed (best-effort), serving local state");
                }
            }
        } else {
            let elapsed_ms = started.elapsed().as_millis() as u64;
            tracing::debug!(elapsed_ms, "fetched remote");
        }
        Ok(())
    }

    /// Bring the local branch up to date with the remote tracking ref:
    /// fast-forward when possible, merge when diverged, no-op when already
    /// current or strictly ahead.
    fn reconcile_with_remote(&self) -> Result<(), SyncError> {
        let Some(remote_oid) = self.remote_tracking_oid()? else {
            return Ok(());
        };
        let branch_ref = self.location.branch_ref();
        match self.local_oid()? {
            None => {
                self.repo.reference(
                    &branch_ref,
                    remote_oid,
                    true,
                    "sync: init local branch from remote",
                )?;
                self.checkout_branch()?;
            }
            Some(local_oid) if local_oid == remote_oid => {}
            Some(local_oid) => {
                if self.repo.graph_descendant_of(remote_oid, local_oid)? {
                    update_ref(self.repo, &branch_ref, remote_oid, "sync: fast-forward to remote")?;
                    self.checkout_branch()?;
                    tracing::debug!(from = %local_oid, to = %remote_oid, "fast-forwarded to remote");
                } else if self.repo.graph_descendant_of(local_oid, remote_oid)? {
                    // Ahead of the remote; the next push reconciles.
                } else {
                    self.merge_into_branch(local_oid, remote_oid)?;
                }
            }
        }
        Ok(())
    }

    fn merge_into_branch(&self, local_oid: Oid, remote_oid: Oid) -> Result<(), SyncError> {
        let local = self.repo.find_commit(local_oid)?;
        let remote = self.repo.find_commit(remote_oid)?;
        let mut index = self
            .repo
            .merge_commits(&local, &remote, Some(&MergeOptions::new()))?;
        if index.has_conflicts() {
            return Err(SyncError::MergeConflict {
                paths: conflicted_paths(&index)?,
            });
        }
        let tree_oid = index.write_tree_to(self.repo)?;
        let tree = self.repo.find_tree(tree_oid)?;
        let sig = self.signature()?;
        let message = format!(
            "Merge remote branch '{}/{}'",
            self.location.remote_name, self.location.branch
        );
        let commit_oid = self
            .repo
            .commit(None, &sig, &sig, &message, &tree, &[&local, &remote])?;
        update_ref(self.repo, &self.location.branch_ref(), commit_oid, "sync: merge remote")?;
        self.checkout_branch()?;
        tracing::info!(local = %local_oid, remote = %remote_oid, merged = %commit_oid, "merged remote branch");
        Ok(())
    }

    /// Push the branch, merging and retrying once when the remote rejects
    /// the update. Persistent rejection surfaces as
    /// [`SyncError::PushRejected`].
    pub fn try_push(&self) -> Result<(), SyncError> {
        match self.push_branch() {
            Ok(()) => Ok(()),
            Err(SyncError::NonFastForward) => {
                tracing::info!("push rejected, merging with remote and retrying once");
                self.merge_with_remote()?;
                match self.push_branch() {
                    Ok(()) => Ok(()),
                    Err(SyncError::NonFastForward) => Err(SyncError::PushRejected {
                        message: "remote rejected push after merge retry".to_string(),
                    }),
                    Err(err) => Err(err),
                }
            }
            Err(err) => Err(err),
        }
    }

    /// Push only when the local head differs from `baseline`; equal heads
    /// perform zero network calls. Returns whether a push happened.
    pub fn try_push_if_updated(&self, baseline: Option<Oid>) -> Result<bool, SyncError> {
        let head = self.current_head()?.map(|commit| commit.id());
        match (head, baseline) {
            (None, _) => Ok(false),
            (Some(head), Some(baseline)) if head == baseline => {
                tracing::debug!(head = %head, "head matches baseline, skipping push");
                Ok(false)
            }
            (Some(_), _) => {
                self.try_push()?;
                Ok(true)
            }
        }
    }

    fn push_branch(&self) -> Result<(), SyncError> {
        let mut remote = self
            .repo
            .find_remote(&self.location.remote_name)
            .map_err(SyncError::Push)?;
        let refspec = self.location.push_refspec();

        let push_error: RefCell<Option<String>> = RefCell::new(None);
        {
            let mut callbacks =
                transport::remote_callbacks(self.repo.config().ok(), self.transport, None);
            callbacks.push_update_reference(|_refname, status| {
                if let Some(message) = status {
                    *push_error.borrow_mut() = Some(message.to_string());
                }
                Ok(())
            });
            let mut options = git2::PushOptions::new();
            options.remote_callbacks(callbacks);

            if let Err(err) = remote.push(&[refspec.as_str()], Some(&mut options)) {
                if is_retryable_rejection(&err.to_string()) {
                    return Err(SyncError::NonFastForward);
                }
                return Err(SyncError::Push(err));
            }
        }
        if let Some(message) = push_error.into_inner() {
            if is_retryable_rejection(&message) {
                return Err(SyncError::NonFastForward);
            }
            return Err(SyncError::PushRejected { message });
        }
        Ok(())
    }

    // =========================================================================
    // File-level operations
    // =========================================================================

    /// Stage `file`'s content at `rel_path` and commit it.
    ///
    /// Used for brand-new books only; there is no merge ambiguity.
    pub fn add_and_commit_new_file(&self, file: &Path, rel_path: &str) -> Result<Oid, SyncError> {
        let bytes = fs::read(file).map_err(|source| SyncError::Io {
            path: file.to_path_buf(),
            source,
        })?;
        self.write_work_file(rel_path, &bytes)?;
        self.commit_work_file(rel_path, &format!("Add {rel_path}"))
    }

    /// Three-point reconciliation of one book.
    ///
    /// Records `from_db`'s content at `rel_path` using `baseline_commit` as
    /// the merge ancestor: a synthetic commit parented at the baseline
    /// carries the submitted content, and merging it with the current head
    /// lets the engine's three-way merge resolve remote edits that arrived
    /// since the baseline. Conflicting edits surface as
    /// [`SyncError::MergeConflict`] without moving the branch.
    ///
    /// Returns the resulting head, which is unchanged when the submitted
    /// content adds nothing new.
    pub fn update_and_commit_file_from_revision_and_merge(
        &self,
        from_db: &Path,
        rel_path: &str,
        baseline_blob: Option<Oid>,
        baseline_commit: &Commit<'_>,
    ) -> Result<Oid, SyncError> {
        let bytes = fs::read(from_db).map_err(|source| SyncError::Io {
            path: from_db.to_path_buf(),
            source,
        })?;
        let head = self
            .current_head()?
            .ok_or_else(|| SyncError::FileNotFound(rel_path.to_string()))?;
        let blob_oid = self.repo.blob(&bytes)?;

        // Unedited since the baseline: any difference between baseline and
        // head came from the remote and is already in the working tree.
        if baseline_blob == Some(blob_oid) {
            return Ok(head.id());
        }

        let base_tree = baseline_commit.tree()?;
        let new_tree_oid = tree_with_blob(self.repo, Some(&base_tree), rel_path, blob_oid)?;
        let sig = self.signature()?;

        if head.id() == baseline_commit.id() {
            // Local history has not moved since the baseline: the submitted
            // content applies directly on top.
            if new_tree_oid == head.tree_id() {
                return Ok(head.id());
            }
            let tree = self.repo.find_tree(new_tree_oid)?;
            let commit_oid = self.repo.commit(
                None,
                &sig,
                &sig,
                &format!("Update {rel_path}"),
                &tree,
                &[baseline_commit],
            )?;
            update_ref(self.repo, &self.location.branch_ref(), commit_oid, "sync: record book update")?;
            self.checkout_branch()?;
            return Ok(commit_oid);
        }

        let synthetic_tree = self.repo.find_tree(new_tree_oid)?;
        let synthetic_oid = self.repo.commit(
            None,
            &sig,
            &sig,
            &format!("Update {rel_path}"),
            &synthetic_tree,
            &[baseline_commit],
        )?;
        let synthetic = self.repo.find_commit(synthetic_oid)?;

        let mut index = self
            .repo
            .merge_commits(&head, &synthetic, Some(&MergeOptions::new()))?;
        if index.has_conflicts() {
            return Err(SyncError::MergeConflict {
                paths: conflicted_paths(&index)?,
            });
        }
        let merged_tree_oid = index.write_tree_to(self.repo)?;
        if merged_tree_oid == head.tree_id() {
            // The head already contains the submitted content.
            return Ok(head.id());
        }
        let merged_tree = self.repo.find_tree(merged_tree_oid)?;
        let merge_oid = self.repo.commit(
            None,
            &sig,
            &sig,
            &format!("Merge {rel_path}"),
            &merged_tree,
            &[&head, &synthetic],
        )?;
        update_ref(self.repo, &self.location.branch_ref(), merge_oid, "sync: merge book update")?;
        self.checkout_branch()?;
        tracing::info!(book = rel_path, merged = %merge_oid, "merged book update");
        Ok(merge_oid)
    }

    /// Byte-for-byte content equality of `rel_path` as it existed at two
    /// commits. Absence is a comparable value: absent/absent is equal,
    /// absent/present is not.
    pub fn file_matches_in_revisions(
        &self,
        rel_path: &str,
        a: Oid,
        b: Oid,
    ) -> Result<bool, SyncError> {
        let commit_a = self.find_commit(a)?;
        let commit_b = self.find_commit(b)?;
        Ok(self.file_revision(rel_path, &commit_a)? == self.file_revision(rel_path, &commit_b)?)
    }

    /// The blob of `rel_path` as of `commit`, or `None` when the path is
    /// absent there.
    pub fn file_revision(
        &self,
        rel_path: &str,
        commit: &Commit<'_>,
    ) -> Result<Option<Oid>, SyncError> {
        let tree = commit.tree()?;
        match tree.get_path(Path::new(rel_path)) {
            Ok(entry) if entry.kind() == Some(ObjectType::Blob) => Ok(Some(entry.id())),
            Ok(_) => Ok(None),
            Err(err) if err.code() == ErrorCode::NotFound => Ok(None),
            Err(err) => Err(SyncError::Git(err)),
        }
    }

    /// The most recent commit reachable from the head that touched
    /// `rel_path`, judged against each commit's first parent.
    ///
    /// A book that arrived through a merge commit reports the merge, which
    /// is sufficient for a freshness pointer. Fails with
    /// [`SyncError::FileNotFound`] when the path never existed.
    pub fn latest_commit_of_file(&self, rel_path: &str) -> Result<Commit<'a>, SyncError> {
        let Some(head) = self.current_head()? else {
            return Err(SyncError::FileNotFound(rel_path.to_string()));
        };
        let mut walk = self.repo.revwalk()?;
        walk.push(head.id())?;
        walk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
        for oid in walk {
            let commit = self.repo.find_commit(oid?)?;
            let current = self.file_revision(rel_path, &commit)?;
            let parent = match commit.parent(0) {
                Ok(parent) => self.file_revision(rel_path, &parent)?,
                Err(_) => None,
            };
            if current != parent {
                return Ok(commit);
            }
        }
        Err(SyncError::FileNotFound(rel_path.to_string()))
    }

    /// Write the head content of `rel_path` into `destination`, committing
    /// any uncommitted working-tree divergence relative to `baseline` first
    /// so no content is lost.
    pub fn safely_retrieve_latest_version_of_file(
        &self,
        rel_path: &str,
        destination: &Path,
        baseline: Option<Oid>,
    ) -> Result<(), SyncError> {
        if let Some(baseline_oid) = baseline {
            let baseline_commit = self.find_commit(baseline_oid)?;
            let work_path = self.repo_directory_file(rel_path);
            if work_path.exists() {
                let work_bytes = fs::read(&work_path).map_err(|source| SyncError::Io {
                    path: work_path.clone(),
                    source,
                })?;
                let baseline_bytes = self.blob_bytes(rel_path, &baseline_commit)?;
                let head_bytes = match self.current_head()? {
                    Some(head) => self.blob_bytes(rel_path, &head)?,
                    None => None,
                };
                let diverged_from_baseline =
                    baseline_bytes.as_deref() != Some(work_bytes.as_slice());
                let uncommitted = head_bytes.as_deref() != Some(work_bytes.as_slice());
                if diverged_from_baseline && uncommitted {
                    tracing::info!(book = rel_path, "committing local changes before retrieval");
                    self.commit_work_file(rel_path, &format!("Update {rel_path} (local changes)"))?;
                }
            }
        }

        let head = self
            .current_head()?
            .ok_or_else(|| SyncError::FileNotFound(rel_path.to_string()))?;
        let bytes = self
            .blob_bytes(rel_path, &head)?
            .ok_or_else(|| SyncError::FileNotFound(rel_path.to_string()))?;
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|source| SyncError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(destination, bytes).map_err(|source| SyncError::Io {
            path: destination.to_path_buf(),
            source,
        })
    }

    /// Pure path join against the working-copy root. Used for the ignore
    /// file location and for write-back targets.
    pub fn repo_directory_file(&self, rel_path: &str) -> PathBuf {
        self.location.local_dir.join(rel_path)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn find_commit(&self, oid: Oid) -> Result<Commit<'a>, SyncError> {
        self.repo
            .find_commit(oid)
            .map_err(|_| SyncError::BadRevision(oid.to_string()))
    }

    fn blob_bytes(&self, rel_path: &str, commit: &Commit<'_>) -> Result<Option<Vec<u8>>, SyncError> {
        match self.file_revision(rel_path, commit)? {
            Some(oid) => Ok(Some(self.repo.find_blob(oid)?.content().to_vec())),
            None => Ok(None),
        }
    }

    fn write_work_file(&self, rel_path: &str, bytes: &[u8]) -> Result<PathBuf, SyncError> {
        let path = self.repo_directory_file(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| SyncError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&path, bytes).map_err(|source| SyncError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    /// Stage the working-tree file at `rel_path` and commit it on the
    /// current branch.
    fn commit_work_file(&self, rel_path: &str, message: &str) -> Result<Oid, SyncError> {
        let mut index = self.repo.index()?;
        index.add_path(Path::new(rel_path))?;
        index.write()?;
        let tree_oid = index.write_tree()?;
        let tree = self.repo.find_tree(tree_oid)?;
        let sig = self.signature()?;
        let head = self.current_head()?;
        let parents: Vec<&Commit<'_>> = head.iter().collect();
        let oid = self
            .repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)?;
        Ok(oid)
    }

    fn signature(&self) -> Result<Signature<'static>, SyncError> {
        match self.repo.signature() {
            Ok(sig) => Ok(sig),
            Err(_) => Ok(Signature::now("rooksync", "rooksync@localhost")?),
        }
    }

    /// Make HEAD point at the configured branch and force the working tree
    /// to match it.
    fn checkout_branch(&self) -> Result<(), SyncError> {
        self.repo.set_head(&self.location.branch_ref())?;
        let mut checkout = CheckoutBuilder::new();
        checkout.force();
        self.repo.checkout_head(Some(&mut checkout))?;
        Ok(())
    }

    fn ensure_branch_checked_out(&self) -> Result<(), SyncError> {
        let target = self.location.branch_ref();
        if let Ok(head) = self.repo.find_reference("HEAD")
            && head.symbolic_target() == Some(target.as_str())
        {
            return Ok(());
        }
        if self.repo.find_reference(&target).is_err() {
            match self.remote_tracking_oid()? {
                Some(remote_oid) => {
                    self.repo
                        .reference(&target, remote_oid, true, "sync: create branch from remote")?;
                }
                None => {
                    // Branch has no commits anywhere yet; aim HEAD at it so
                    // the first commit lands there.
                    self.repo.set_head(&target)?;
                    return Ok(());
                }
            }
        }
        self.checkout_branch()
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn refname_to_id_optional(repo: &Repository, name: &str) -> Result<Option<Oid>, SyncError> {
    match repo.refname_to_id(name) {
        Ok(oid) => Ok(Some(oid)),
        Err(err) if err.code() == ErrorCode::NotFound => Ok(None),
        Err(err) => Err(SyncError::Git(err)),
    }
}

fn update_ref(repo: &Repository, name: &str, oid: Oid, log_message: &str) -> Result<(), SyncError> {
    repo.reference(name, oid, true, log_message)?;
    Ok(())
}

/// Message classes the remote uses for rejections that a fetch-and-merge
/// retry can resolve.
fn is_retryable_rejection(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("non-fast-forward")
        || message.contains("fetch first")
        || message.contains("cannot lock ref")
        || message.contains("failed to update ref")
        || message.contains("failed to lock file")
}

fn conflicted_paths(index: &git2::Index) -> Result<Vec<String>, SyncError> {
    let mut paths = Vec::new();
    for conflict in index.conflicts()? {
        let conflict = conflict?;
        if let Some(entry) = conflict.our.or(conflict.their).or(conflict.ancestor) {
            paths.push(String::from_utf8_lossy(&entry.path).into_owned());
        }
    }
    Ok(paths)
}

/// A copy of `base` with `rel_path` replaced by `blob_oid`, handling nested
/// directories.
fn tree_with_blob(
    repo: &Repository,
    base: Option<&git2::Tree<'_>>,
    rel_path: &str,
    blob_oid: Oid,
) -> Result<Oid, SyncError> {
    let (first, rest) = match rel_path.split_once('/') {
        Some((first, rest)) => (first, Some(rest)),
        None => (rel_path, None),
    };
    let mut builder = repo.treebuilder(base)?;
    match rest {
        None => {
            builder.insert(first, blob_oid, 0o100644)?;
        }
        Some(rest) => {
            let sub_base = match base.and_then(|tree| tree.get_name(first)) {
                Some(entry) if entry.kind() == Some(ObjectType::Tree) => {
                    Some(repo.find_tree(entry.id())?)
                }
                _ => None,
            };
            let sub_oid = tree_with_blob(repo, sub_base.as_ref(), rest, blob_oid)?;
            builder.insert(first, sub_oid, 0o040000)?;
        }
    }
    Ok(builder.write()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_repo(dir: &Path) -> Repository {
        let mut opts = git2::RepositoryInitOptions::new();
        opts.initial_head("main");
        let repo = Repository::init_opts(dir, &opts).unwrap();
        let mut config = repo.config().unwrap();
        config.set_str("user.name", "Test").unwrap();
        config.set_str("user.email", "test@test.com").unwrap();
        repo
    }

    #[test]
    fn rejection_message_classes() {
        assert!(is_retryable_rejection("failed: Non-fast-forward"));
        assert!(is_retryable_rejection("please fetch first"));
        assert!(is_retryable_rejection("cannot lock ref 'refs/heads/main'"));
        assert!(!is_retryable_rejection("permission denied"));
    }

    #[test]
    fn tree_with_blob_at_root() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_repo(dir.path());
        let blob = repo.blob(b"content").unwrap();
        let tree_oid = tree_with_blob(&repo, None, "notes.org", blob).unwrap();
        let tree = repo.find_tree(tree_oid).unwrap();
        assert_eq!(tree.get_name("notes.org").unwrap().id(), blob);
    }

    #[test]
    fn tree_with_blob_nested() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_repo(dir.path());
        let blob = repo.blob(b"content").unwrap();
        let tree_oid = tree_with_blob(&repo, None, "daily/2024/01.org", blob).unwrap();
        let tree = repo.find_tree(tree_oid).unwrap();
        let entry = tree.get_path(Path::new("daily/2024/01.org")).unwrap();
        assert_eq!(entry.id(), blob);
    }

    #[test]
    fn tree_with_blob_preserves_siblings() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_repo(dir.path());
        let first = repo.blob(b"first").unwrap();
        let base_oid = tree_with_blob(&repo, None, "keep.org", first).unwrap();
        let base = repo.find_tree(base_oid).unwrap();

        let second = repo.blob(b"second").unwrap();
        let updated_oid = tree_with_blob(&repo, Some(&base), "new.org", second).unwrap();
        let updated = repo.find_tree(updated_oid).unwrap();
        assert_eq!(updated.get_name("keep.org").unwrap().id(), first);
        assert_eq!(updated.get_name("new.org").unwrap().id(), second);
    }
}
