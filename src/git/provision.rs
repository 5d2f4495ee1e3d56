//! Repository provisioning - verify an existing working copy or clone a
//! fresh one, leaving the target directory pristine on failure.

use std::fs;
use std::path::Path;

use git2::Repository;
use git2::build::RepoBuilder;

use super::error::SyncError;
use super::transport::{self, ProgressSink, TransportConfig};
use crate::config::RepoLocation;

/// Ensure a repository exists at the configured location.
///
/// With `clone == false` the directory must already hold a valid working
/// copy; with `clone == true` it must be an existing empty directory, which
/// is then cloned from the remote (reporting progress through `progress`).
/// Either way the remote URL is written into the repository config under the
/// configured remote name, so later fetch/push operations do not repeat it.
pub fn ensure_repository_exists(
    location: &RepoLocation,
    transport: &TransportConfig,
    clone: bool,
    progress: Option<&mut dyn ProgressSink>,
) -> Result<Repository, SyncError> {
    let repo = if clone {
        clone_repo(location, transport, progress)?
    } else {
        verify_existing_repo(location)?
    };
    configure_remote(&repo, location)?;
    normalize_head(&repo, location)?;
    Ok(repo)
}

/// Whether `path` holds a git repository openable as a working copy.
pub fn is_repository(path: &Path) -> bool {
    Repository::open(path).is_ok()
}

fn verify_existing_repo(location: &RepoLocation) -> Result<Repository, SyncError> {
    let dir = &location.local_dir;
    if !dir.exists() {
        return Err(SyncError::MissingDirectory(dir.clone()));
    }
    Repository::open(dir).map_err(|_| SyncError::NotARepository(dir.clone()))
}

fn clone_repo(
    location: &RepoLocation,
    transport: &TransportConfig,
    progress: Option<&mut dyn ProgressSink>,
) -> Result<Repository, SyncError> {
    let dir = &location.local_dir;
    if !dir.exists() {
        return Err(SyncError::MissingDirectory(dir.clone()));
    }
    let mut entries = fs::read_dir(dir).map_err(|source| SyncError::Io {
        path: dir.clone(),
        source,
    })?;
    if entries.next().is_some() {
        return Err(SyncError::DirectoryNotEmpty(dir.clone()));
    }

    let callbacks = transport::remote_callbacks(None, transport, progress);
    let mut fetch = git2::FetchOptions::new();
    fetch.remote_callbacks(callbacks);
    let mut builder = RepoBuilder::new();
    builder.fetch_options(fetch);

    match builder.clone(&location.remote_url, dir) {
        Ok(repo) => Ok(repo),
        Err(source) => {
            // A failed clone must leave the target empty, never
            // half-populated, so retries start from a known state. The
            // original failure is what matters; cleanup errors are logged
            // and swallowed.
            if let Err(err) = fs::remove_dir_all(dir) {
                tracing::warn!(dir = %dir.display(), error = %err, "failed to clear partial clone");
            }
            if let Err(err) = fs::create_dir_all(dir) {
                tracing::warn!(dir = %dir.display(), error = %err, "failed to recreate clone target");
            }
            Err(SyncError::CloneFailed {
                url: location.remote_url.clone(),
                source,
            })
        }
    }
}

fn configure_remote(repo: &Repository, location: &RepoLocation) -> Result<(), SyncError> {
    if repo.find_remote(&location.remote_name).is_ok() {
        repo.remote_set_url(&location.remote_name, &location.remote_url)?;
    } else {
        repo.remote(&location.remote_name, &location.remote_url)?;
    }
    Ok(())
}

/// Point an unborn HEAD at the configured branch so the first commit lands
/// there deterministically (a clone of an empty remote leaves HEAD on the
/// engine's default branch).
fn normalize_head(repo: &Repository, location: &RepoLocation) -> Result<(), SyncError> {
    if repo.head().is_err() {
        repo.set_head(&location.branch_ref())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn location(remote: &Path, local: &Path) -> RepoLocation {
        RepoLocation {
            remote_url: remote.to_str().unwrap().to_string(),
            remote_name: "origin".to_string(),
            branch: "main".to_string(),
            local_dir: local.to_path_buf(),
        }
    }

    fn init_bare(path: &Path) {
        let mut opts = git2::RepositoryInitOptions::new();
        opts.bare(true).initial_head("main");
        Repository::init_opts(path, &opts).unwrap();
    }

    #[test]
    fn verify_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let loc = location(Path::new("/nowhere"), &dir.path().join("absent"));
        let err =
            ensure_repository_exists(&loc, &TransportConfig::default(), false, None).err().unwrap();
        assert!(matches!(err, SyncError::MissingDirectory(_)));
    }

    #[test]
    fn verify_rejects_plain_directory() {
        let dir = tempfile::tempdir().unwrap();
        let loc = location(Path::new("/nowhere"), dir.path());
        let err =
            ensure_repository_exists(&loc, &TransportConfig::default(), false, None).err().unwrap();
        assert!(matches!(err, SyncError::NotARepository(_)));
    }

    #[test]
    fn verify_opens_existing_repo() {
        let dir = tempfile::tempdir().unwrap();
        Repository::init(dir.path()).unwrap();
        let loc = location(Path::new("/nowhere"), dir.path());
        let repo = ensure_repository_exists(&loc, &TransportConfig::default(), false, None).unwrap();
        assert!(!repo.is_bare());
        // Remote URL was recorded under the configured name.
        let remote = repo.find_remote("origin").unwrap();
        assert_eq!(remote.url(), Some("/nowhere"));
    }

    #[test]
    fn clone_rejects_occupied_directory() {
        let remote = tempfile::tempdir().unwrap();
        init_bare(remote.path());
        let target = tempfile::tempdir().unwrap();
        std::fs::write(target.path().join("stray.txt"), "stray").unwrap();

        let loc = location(remote.path(), target.path());
        let err =
            ensure_repository_exists(&loc, &TransportConfig::default(), true, None).err().unwrap();
        match err {
            SyncError::DirectoryNotEmpty(dir) => assert_eq!(dir, target.path()),
            other => panic!("unexpected error: {other}"),
        }
        // Contents untouched.
        let stray = std::fs::read_to_string(target.path().join("stray.txt")).unwrap();
        assert_eq!(stray, "stray");
    }

    #[test]
    fn clone_failure_resets_target() {
        let target = tempfile::tempdir().unwrap();
        let loc = location(Path::new("/nonexistent/remote/repo"), target.path());
        let err =
            ensure_repository_exists(&loc, &TransportConfig::default(), true, None).err().unwrap();
        assert!(matches!(err, SyncError::CloneFailed { .. }));
        assert!(target.path().exists());
        let leftover: Vec<PathBuf> = std::fs::read_dir(target.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert!(leftover.is_empty(), "expected empty dir, found {leftover:?}");
    }

    #[test]
    fn clone_from_local_bare_remote() {
        let remote = tempfile::tempdir().unwrap();
        init_bare(remote.path());
        let target = tempfile::tempdir().unwrap();

        let loc = location(remote.path(), target.path());
        let repo = ensure_repository_exists(&loc, &TransportConfig::default(), true, None).unwrap();
        assert!(!repo.is_bare());
        assert!(is_repository(target.path()));
        // Empty remote: HEAD is unborn but aimed at the configured branch.
        let head = repo.find_reference("HEAD").unwrap();
        assert_eq!(head.symbolic_target(), Some("refs/heads/main"));
    }
}
