//! Path utilities: split, join, normalize, basename/dirname, sanitize.

use crate::error::{Result, VfsError};

/// Splits an absolute path into its ordered components.
///
/// `/` yields an empty sequence. Fails with [`VfsError::BadPath`] when
/// `p` is empty or does not begin with `/`.
pub fn split_path(p: &str) -> Result<Vec<String>> {
    if p.is_empty() || !p.starts_with('/') {
        return Err(VfsError::bad_path(p));
    }
    Ok(p.split('/').filter(|c| !c.is_empty()).map(str::to_string).collect())
}

/// Joins a directory path and a single component, collapsing duplicate separators.
pub fn join_path(dir: &str, name: &str) -> String {
    let dir = dir.trim_end_matches('/');
    let name = name.trim_start_matches('/');
    if dir.is_empty() {
        format!("/{name}")
    } else {
        format!("{dir}/{name}")
    }
}

/// Returns the final path component, or `/` for the root itself.
pub fn basename(p: &str) -> String {
    let trimmed = p.trim_end_matches('/');
    match trimmed.rsplit_once('/') {
        Some((_, last)) if !last.is_empty() => last.to_string(),
        _ => "/".to_string(),
    }
}

/// Returns the parent directory path, POSIX-style.
pub fn dirname(p: &str) -> String {
    let trimmed = p.trim_end_matches('/');
    match trimmed.rsplit_once('/') {
        Some(("", _)) => "/".to_string(),
        Some((dir, _)) => dir.to_string(),
        None => "/".to_string(),
    }
}

/// Maps every byte outside `[A-Za-z0-9_-]` to `_`; guarantees non-empty output.
pub fn sanitize_component(s: &str) -> String {
    let mapped: String = s
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect();
    if mapped.is_empty() {
        "_".to_string()
    } else {
        mapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_path_root() {
        assert_eq!(split_path("/").unwrap(), Vec::<String>::new());
    }

    #[test]
    fn split_path_rejects_relative() {
        assert!(split_path("a/b").is_err());
        assert!(split_path("").is_err());
    }

    #[test]
    fn split_path_components() {
        assert_eq!(split_path("/a/b/c").unwrap(), vec!["a", "b", "c"]);
        assert_eq!(split_path("/a//b/").unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn join_path_collapses_separators() {
        assert_eq!(join_path("/a/b/", "/c"), "/a/b/c");
        assert_eq!(join_path("/", "c"), "/c");
    }

    #[test]
    fn basename_dirname() {
        assert_eq!(basename("/a/b/c.txt"), "c.txt");
        assert_eq!(dirname("/a/b/c.txt"), "/a/b");
        assert_eq!(basename("/"), "/");
        assert_eq!(dirname("/a"), "/");
    }

    #[test]
    fn sanitize_component_replaces_and_guarantees_nonempty() {
        assert_eq!(sanitize_component("hello world!"), "hello_world_");
        assert_eq!(sanitize_component(""), "_");
        assert_eq!(sanitize_component("a.b"), "a_b");
    }
}
