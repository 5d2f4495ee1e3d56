//! Sync settings schema and loading.
//!
//! The application supplies one [`GitSettings`] per configured repository,
//! either built directly or loaded from a TOML file with environment
//! overrides applied on top. Invalid override values are logged and ignored,
//! never fatal.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::git::TransportConfig;

/// Settings for one synced repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitSettings {
    /// Remote repository URL (ssh, https, or a local path).
    pub remote_url: String,
    /// Name the remote is stored under in the repository config.
    pub remote_name: String,
    /// Branch the sync operates on.
    pub branch: String,
    /// Local working-copy directory.
    pub local_dir: PathBuf,
    /// SSH private key used for outbound transport. Accepts a plain path,
    /// a `file://` URI, or a `~/`-relative path.
    pub ssh_key_path: Option<String>,
    /// Commit author, falling back to the repository's own config when unset.
    pub author_name: Option<String>,
    pub author_email: Option<String>,
}

impl Default for GitSettings {
    fn default() -> Self {
        Self {
            remote_url: String::new(),
            remote_name: "origin".to_string(),
            branch: "main".to_string(),
            local_dir: PathBuf::new(),
            ssh_key_path: None,
            author_name: None,
            author_email: None,
        }
    }
}

impl GitSettings {
    /// Load settings from a TOML file, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut settings: GitSettings =
            toml::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        settings.apply_env();
        Ok(settings)
    }

    /// Apply `ROOKSYNC_SSH_KEY` / `ROOKSYNC_BRANCH` overrides.
    pub fn apply_env(&mut self) {
        if let Ok(raw) = std::env::var("ROOKSYNC_SSH_KEY") {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                self.ssh_key_path = Some(trimmed.to_string());
            }
        }
        if let Ok(raw) = std::env::var("ROOKSYNC_BRANCH") {
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.contains(char::is_whitespace) {
                tracing::warn!(raw = %raw, "invalid ROOKSYNC_BRANCH; ignoring");
            } else {
                self.branch = trimmed.to_string();
            }
        }
    }

    /// The repository location these settings describe.
    pub fn location(&self) -> RepoLocation {
        RepoLocation {
            remote_url: self.remote_url.clone(),
            remote_name: self.remote_name.clone(),
            branch: self.branch.clone(),
            local_dir: self.local_dir.clone(),
        }
    }

    /// Transport configuration with the SSH key path resolved.
    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            ssh_key: self.ssh_key_path.as_deref().map(resolve_key_path),
        }
    }
}

/// Where a synced repository lives: remote URL plus local working copy.
///
/// Once provisioned, `local_dir` is a valid non-bare working copy rooted at
/// that path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoLocation {
    pub remote_url: String,
    pub remote_name: String,
    pub branch: String,
    pub local_dir: PathBuf,
}

impl RepoLocation {
    pub fn branch_ref(&self) -> String {
        format!("refs/heads/{}", self.branch)
    }

    pub fn remote_tracking_ref(&self) -> String {
        format!("refs/remotes/{}/{}", self.remote_name, self.branch)
    }

    pub fn fetch_refspec(&self) -> String {
        format!("{}:{}", self.branch_ref(), self.remote_tracking_ref())
    }

    pub fn push_refspec(&self) -> String {
        format!("{0}:{0}", self.branch_ref())
    }
}

/// Resolve an SSH key path from its configured URI-style form.
pub fn resolve_key_path(raw: &str) -> PathBuf {
    let raw = raw.strip_prefix("file://").unwrap_or(raw);
    if let Some(rest) = raw.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(raw)
}

/// Errors loading or parsing a settings file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
