//! Dot-delimited configuration paths.

use std::fmt;

/// An ordered, dot-delimited sequence of lookup segments.
///
/// Paths are immutable values used both as lookup keys and as prefixes to be
/// concatenated when descending into subtrees. The root path is empty and
/// addresses the whole tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ConfigPath(String);

impl ConfigPath {
    /// Create a path from a dot-delimited string.
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// The empty path addressing the root of a tree.
    pub fn root() -> Self {
        Self(String::new())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Concatenate this path with a subpath.
    ///
    /// Inserts exactly one `.` between a non-empty prefix and a non-empty
    /// subpath, so segment boundaries are never merged.
    pub fn join(&self, other: &ConfigPath) -> ConfigPath {
        if self.0.is_empty() {
            other.clone()
        } else if other.0.is_empty() {
            self.clone()
        } else {
            ConfigPath(format!("{}.{}", self.0, other.0))
        }
    }

    /// Iterate the individual segments of this path.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.').filter(|s| !s.is_empty())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ConfigPath {
    fn from(path: &str) -> Self {
        Self(path.to_string())
    }
}

impl fmt::Display for ConfigPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_preserves_segment_boundaries() {
        let prefix = ConfigPath::new("listener");
        let sub = ConfigPath::new("bind_address");
        assert_eq!(prefix.join(&sub).as_str(), "listener.bind_address");
    }

    #[test]
    fn join_with_root_is_identity() {
        let path = ConfigPath::new("a.b");
        assert_eq!(ConfigPath::root().join(&path), path);
        assert_eq!(path.join(&ConfigPath::root()), path);
    }

    #[test]
    fn segments_split_on_dots() {
        let path = ConfigPath::new("a.b.c");
        let segments: Vec<_> = path.segments().collect();
        assert_eq!(segments, vec!["a", "b", "c"]);
    }
}
