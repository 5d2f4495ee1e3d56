#![allow(dead_code)]

//! Test fixtures: local bare repositories standing in for remotes, plus a
//! scratch clone that simulates edits made on another device.

use std::fs;
use std::path::{Path, PathBuf};

use git2::{Commit, Repository, Signature};
use tempfile::TempDir;

use rooksync::{GitRepo, GitSettings, ProvisionOptions};

/// A bare "remote" plus an empty local directory, ready to provision.
pub struct TestRepo {
    pub remote_dir: TempDir,
    pub local_dir: TempDir,
}

impl TestRepo {
    pub fn new() -> Self {
        let remote_dir = TempDir::new().expect("create remote dir");
        init_bare_remote(remote_dir.path());
        let local_dir = TempDir::new().expect("create local dir");
        TestRepo {
            remote_dir,
            local_dir,
        }
    }

    pub fn settings(&self) -> GitSettings {
        GitSettings {
            remote_url: self.remote_dir.path().to_str().expect("utf8 path").to_string(),
            local_dir: self.local_dir.path().to_path_buf(),
            author_name: Some("Test".to_string()),
            author_email: Some("test@test.com".to_string()),
            ..GitSettings::default()
        }
    }

    /// Clone the remote into the local directory and return the facade.
    pub fn provision(&self) -> GitRepo {
        let options = ProvisionOptions::from_settings(&self.settings()).with_clone(true);
        GitRepo::provision(options, None).expect("provision repository")
    }

    /// Head commit id of the remote's main branch, if any.
    pub fn remote_head(&self) -> Option<git2::Oid> {
        let repo = Repository::open(self.remote_dir.path()).expect("open bare remote");
        repo.refname_to_id("refs/heads/main").ok()
    }

    /// Content of `rel_path` at the remote head.
    pub fn remote_file(&self, rel_path: &str) -> Option<String> {
        let repo = Repository::open(self.remote_dir.path()).expect("open bare remote");
        let oid = repo.refname_to_id("refs/heads/main").ok()?;
        let commit = repo.find_commit(oid).expect("find remote head");
        let tree = commit.tree().expect("remote head tree");
        let entry = tree.get_path(Path::new(rel_path)).ok()?;
        let blob = repo.find_blob(entry.id()).expect("find blob");
        Some(String::from_utf8_lossy(blob.content()).into_owned())
    }

    /// Commit `content` at `rel_path` on the remote through a scratch
    /// clone, as if edited on another device. Returns the new remote head.
    pub fn edit_on_other_device(&self, rel_path: &str, content: &str, message: &str) -> git2::Oid {
        let scratch = TempDir::new().expect("create scratch dir");
        let repo = git2::build::RepoBuilder::new()
            .clone(
                self.remote_dir.path().to_str().expect("utf8 path"),
                scratch.path(),
            )
            .expect("clone scratch copy");
        configure_user(&repo);
        if repo.head().is_err() {
            repo.set_head("refs/heads/main").expect("aim unborn HEAD");
        }

        let file = scratch.path().join(rel_path);
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(&file, content).expect("write file");

        let mut index = repo.index().expect("open index");
        index.add_path(Path::new(rel_path)).expect("stage file");
        index.write().expect("write index");
        let tree_oid = index.write_tree().expect("write tree");
        let tree = repo.find_tree(tree_oid).expect("find tree");
        let sig = Signature::now("Other Device", "other@test.com").expect("signature");
        let head = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&Commit<'_>> = head.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .expect("commit");

        let mut remote = repo.find_remote("origin").expect("find origin");
        remote
            .push(&["refs/heads/main:refs/heads/main"], None)
            .expect("push to remote");

        self.remote_head().expect("remote head after push")
    }
}

pub fn init_bare_remote(path: &Path) {
    let mut opts = git2::RepositoryInitOptions::new();
    opts.bare(true).initial_head("main");
    Repository::init_opts(path, &opts).expect("init bare remote");
}

pub fn configure_user(repo: &Repository) {
    let mut config = repo.config().expect("open repo config");
    config.set_str("user.name", "Test").expect("set user.name");
    config
        .set_str("user.email", "test@test.com")
        .expect("set user.email");
}

/// Write `content` to a scratch file outside any repository, as the
/// application would hand it to the sync.
pub fn scratch_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).expect("write scratch file");
    path
}
