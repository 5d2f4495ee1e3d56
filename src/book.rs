//! Book path addressing and format detection.
//!
//! Books are addressed by relative, URI-encoded paths rooted at the
//! repository. The empty path is the sentinel for "no remote location yet"
//! (a book the application has never synced).

use std::borrow::Cow;

use crate::git::SyncError;

/// Encode a repository-relative path into its URI form.
///
/// Each segment is percent-encoded; separators are preserved.
pub fn encode_path(rel_path: &str) -> String {
    rel_path
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Decode a URI-form book path into the repository-relative path.
///
/// A leading `/` is stripped so both `notes.org` and `/notes.org` address
/// the same book.
pub fn decode_path(uri: &str) -> Result<String, SyncError> {
    let trimmed = uri.strip_prefix('/').unwrap_or(uri);
    let decoded: Cow<'_, str> = urlencoding::decode(trimmed)
        .map_err(|_| SyncError::InvalidPath(uri.to_string()))?;
    Ok(decoded.into_owned())
}

/// Default document-format classifier: org notebook files.
///
/// Hidden files never qualify, regardless of extension.
pub fn is_org_file_name(path: &str) -> bool {
    let name = path.rsplit('/').next().unwrap_or(path);
    if name.starts_with('.') {
        return false;
    }
    match name.rsplit_once('.') {
        Some((stem, ext)) => !stem.is_empty() && ext.eq_ignore_ascii_case("org"),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_preserves_separators() {
        assert_eq!(encode_path("daily/my notes.org"), "daily/my%20notes.org");
        assert_eq!(encode_path("notes.org"), "notes.org");
    }

    #[test]
    fn decode_round_trips() {
        let original = "daily/my notes.org";
        assert_eq!(decode_path(&encode_path(original)).unwrap(), original);
    }

    #[test]
    fn decode_strips_leading_slash() {
        assert_eq!(decode_path("/notes.org").unwrap(), "notes.org");
    }

    #[test]
    fn org_classifier() {
        assert!(is_org_file_name("notes.org"));
        assert!(is_org_file_name("sub/dir/Notes.ORG"));
        assert!(!is_org_file_name("notes.txt"));
        assert!(!is_org_file_name(".hidden.org"));
        assert!(!is_org_file_name("org"));
        assert!(!is_org_file_name(".org"));
    }
}
