//! Generic `/`-segmented trie with longest-available-match lookup.
//!
//! Every path-keyed store in the crate (routes, permission subpaths, mock
//! routes) sits on top of [`PathTrie`]. The trie itself is not synchronized;
//! the owning store wraps it in its own lock.
//!
//! Nodes own their children directly (`HashMap<String, Node<V>>`), so there
//! are no parent pointers. Pruning on delete is done while unwinding the
//! recursive descent instead of walking back up a linked structure.
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct Node<V> {
    value: Option<V>,
    children: HashMap<String, Node<V>>,
}

impl<V> Default for Node<V> {
    fn default() -> Self {
        Self {
            value: None,
            children: HashMap::new(),
        }
    }
}

impl<V> Node<V> {
    fn is_prunable(&self) -> bool {
        self.value.is_none() && self.children.is_empty()
    }

    fn count(&self) -> usize {
        self.children.values().map(|c| 1 + c.count()).sum()
    }
}

/// A trie keyed by path segments.
#[derive(Debug, Clone)]
pub struct PathTrie<V> {
    root: Node<V>,
}

impl<V> Default for PathTrie<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> PathTrie<V> {
    /// Create an empty trie.
    pub fn new() -> Self {
        Self {
            root: Node::default(),
        }
    }

    /// Insert `value` at the node addressed by `segments`, creating missing
    /// nodes on the way. Returns the value previously stored there.
    pub fn insert<S: AsRef<str>>(&mut self, segments: &[S], value: V) -> Option<V> {
        let mut node = &mut self.root;
        for segment in segments {
            node = node
                .children
                .entry(segment.as_ref().to_string())
                .or_default();
        }
        node.value.replace(value)
    }

    /// Resolve `path` to the value of the deepest visited node that carries
    /// one.
    ///
    /// The walk stops at the first missing child or after the last segment.
    /// Empty segments are skipped, so `/api//v1/` walks like `/api/v1`.
    /// `""` and `"/"` resolve to the root's own value.
    pub fn lookup(&self, path: &str) -> Option<&V> {
        let mut node = &self.root;
        let mut found = node.value.as_ref();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            match node.children.get(segment) {
                Some(child) => {
                    node = child;
                    if child.value.is_some() {
                        found = child.value.as_ref();
                    }
                }
                None => break,
            }
        }
        found
    }

    /// Exact-node access: the value stored at `segments`, if any.
    pub fn get<S: AsRef<str>>(&self, segments: &[S]) -> Option<&V> {
        let mut node = &self.root;
        for segment in segments {
            node = node.children.get(segment.as_ref())?;
        }
        node.value.as_ref()
    }

    /// Mutable exact-node access.
    pub fn get_mut<S: AsRef<str>>(&mut self, segments: &[S]) -> Option<&mut V> {
        let mut node = &mut self.root;
        for segment in segments {
            node = node.children.get_mut(segment.as_ref())?;
        }
        node.value.as_mut()
    }

    /// Clear the value at `segments` and prune every ancestor left without a
    /// value and without children. The root itself is never removed.
    pub fn delete<S: AsRef<str>>(&mut self, segments: &[S]) -> Option<V> {
        Self::delete_in(&mut self.root, segments)
    }

    fn delete_in<S: AsRef<str>>(node: &mut Node<V>, segments: &[S]) -> Option<V> {
        let Some((head, rest)) = segments.split_first() else {
            return node.value.take();
        };
        let child = node.children.get_mut(head.as_ref())?;
        let removed = Self::delete_in(child, rest);
        if child.is_prunable() {
            node.children.remove(head.as_ref());
        }
        removed
    }

    /// Number of nodes below the root.
    pub fn node_count(&self) -> usize {
        self.root.count()
    }

    /// True when neither the root nor any descendant exists.
    pub fn is_empty(&self) -> bool {
        self.root.is_prunable()
    }
}
