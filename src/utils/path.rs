//! Path helpers shared by every path-keyed store.
//!
//! Stores normalize addresses on write so that `//api/v1/`, `/api//v1` and
//! `/api/v1` all land on the same trie node.

/// Normalize a route path: collapse repeated slashes, strip a trailing slash
/// and enforce a leading one. The root path normalizes to `/`.
pub fn normalize_path(path: &str) -> String {
    let mut normalized = String::with_capacity(path.len() + 1);
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        normalized.push('/');
        normalized.push_str(segment);
    }
    if normalized.is_empty() {
        normalized.push('/');
    }
    normalized
}

/// Split a path into trie segments after stripping one leading slash.
///
/// `""` and `"/"` yield no segments and therefore address the trie root.
/// No other cleanup happens here, so `/api/` yields a trailing empty segment;
/// callers pass normalized paths.
pub fn segments(path: &str) -> Vec<&str> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    if trimmed.is_empty() {
        return Vec::new();
    }
    trimmed.split('/').collect()
}

/// Segments of the normalized form of `path`, owned.
pub fn normalized_segments(path: &str) -> Vec<String> {
    segments(&normalize_path(path))
        .into_iter()
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_and_trims() {
        assert_eq!(normalize_path("//api///v1/"), "/api/v1");
        assert_eq!(normalize_path("api/v1"), "/api/v1");
        assert_eq!(normalize_path("/api/v1"), "/api/v1");
    }

    #[test]
    fn test_normalize_root() {
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path("///"), "/");
    }

    #[test]
    fn test_segments() {
        assert!(segments("").is_empty());
        assert!(segments("/").is_empty());
        assert_eq!(segments("/api/v1"), vec!["api", "v1"]);
        assert_eq!(segments("api/v1"), vec!["api", "v1"]);
        assert_eq!(segments("/api/"), vec!["api", ""]);
    }

    #[test]
    fn test_normalized_segments() {
        assert_eq!(normalized_segments("//a//b/"), vec!["a", "b"]);
        assert!(normalized_segments("/").is_empty());
    }
}
