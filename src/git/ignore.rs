//! `.orgzlyignore` handling.
//!
//! The ignore file lives at the repository root, one glob-style pattern per
//! line, and is re-read on every listing. Matching follows the conventional
//! ignore-file rules: `#` comments and blank lines are skipped, a trailing
//! `/` restricts a pattern to directories, a pattern containing `/` is
//! anchored at the repository root, and anything else matches by file name
//! anywhere in the tree. Negation is not supported; such lines are skipped.

use std::fs;
use std::path::Path;

use glob::{MatchOptions, Pattern};

use super::error::SyncError;

/// Name of the ignore file at the repository root.
pub const IGNORE_FILE: &str = ".orgzlyignore";

/// An ordered set of ignore patterns.
#[derive(Debug, Default)]
pub struct IgnoreSet {
    rules: Vec<Rule>,
}

#[derive(Debug)]
struct Rule {
    pattern: Pattern,
    dir_only: bool,
    anchored: bool,
}

impl IgnoreSet {
    /// Load the ignore file from the repository root. A missing file yields
    /// an empty set.
    pub fn load(repo_root: &Path) -> Result<IgnoreSet, SyncError> {
        let path = repo_root.join(IGNORE_FILE);
        match fs::read_to_string(&path) {
            Ok(text) => Ok(IgnoreSet::parse(&text)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(IgnoreSet::default()),
            Err(source) => Err(SyncError::Io { path, source }),
        }
    }

    pub fn parse(text: &str) -> IgnoreSet {
        let mut rules = Vec::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if line.starts_with('!') {
                tracing::debug!(pattern = line, "negation patterns are not supported; skipping");
                continue;
            }
            let dir_only = line.ends_with('/');
            let body = line.trim_end_matches('/');
            let anchored = body.starts_with('/') || body.contains('/');
            let body = body.trim_start_matches('/');
            match Pattern::new(body) {
                Ok(pattern) => rules.push(Rule {
                    pattern,
                    dir_only,
                    anchored,
                }),
                Err(err) => {
                    tracing::debug!(pattern = line, error = %err, "invalid ignore pattern; skipping");
                }
            }
        }
        IgnoreSet { rules }
    }

    /// Pure predicate used by the listing tree walk.
    pub fn is_ignored(&self, path: &str, is_dir: bool) -> bool {
        self.rules.iter().any(|rule| rule.matches(path, is_dir))
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Rule {
    fn matches(&self, path: &str, is_dir: bool) -> bool {
        if self.dir_only && !is_dir {
            return false;
        }
        if self.anchored {
            let options = MatchOptions {
                require_literal_separator: true,
                ..MatchOptions::default()
            };
            self.pattern.matches_with(path, options)
        } else {
            let name = path.rsplit('/').next().unwrap_or(path);
            self.pattern.matches(name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_comment_lines() {
        let set = IgnoreSet::parse("\n# comment\n\n");
        assert!(set.is_empty());
        assert!(!set.is_ignored("notes.org", false));
    }

    #[test]
    fn basename_patterns_match_anywhere() {
        let set = IgnoreSet::parse("*.tmp\nscratch.org\n");
        assert!(set.is_ignored("a.tmp", false));
        assert!(set.is_ignored("deep/nested/b.tmp", false));
        assert!(set.is_ignored("deep/scratch.org", false));
        assert!(!set.is_ignored("notes.org", false));
    }

    #[test]
    fn anchored_patterns_match_from_root() {
        let set = IgnoreSet::parse("/drafts/*.org\narchive/old.org\n");
        assert!(set.is_ignored("drafts/a.org", false));
        assert!(!set.is_ignored("x/drafts/a.org", false));
        assert!(set.is_ignored("archive/old.org", false));
    }

    #[test]
    fn directory_only_patterns() {
        let set = IgnoreSet::parse("attic/\n");
        assert!(set.is_ignored("attic", true));
        assert!(!set.is_ignored("attic", false));
    }

    #[test]
    fn negation_is_skipped() {
        let set = IgnoreSet::parse("*.org\n!keep.org\n");
        // The negation line contributes nothing.
        assert!(set.is_ignored("keep.org", false));
    }

    #[test]
    fn load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let set = IgnoreSet::load(dir.path()).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn load_reads_repo_root_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(IGNORE_FILE), "secret*.org\n").unwrap();
        let set = IgnoreSet::load(dir.path()).unwrap();
        assert!(set.is_ignored("secret-notes.org", false));
        assert!(!set.is_ignored("notes.org", false));
    }
}
