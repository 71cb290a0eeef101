//! Canned responses for routes that designate a mock backend.
//!
//! Each (namespace, target) gets its own [`PathTrie`]. A trie node may hold
//! several mock routes sharing a path but serving different methods.
use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;

use crate::{
    config::{MockRoute, MockTarget},
    core::{
        error::{StoreError, StoreResult},
        path_trie::PathTrie,
    },
    utils::path::normalized_segments,
};

type MockTrie = PathTrie<Vec<Arc<MockRoute>>>;

/// Concurrent mock route store keyed by namespace, then target name.
#[derive(Debug, Default)]
pub struct MockRouteStore {
    namespaces: RwLock<HashMap<String, HashMap<String, MockTrie>>>,
}

impl MockRouteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build and store the trie of `target`, replacing any previous one.
    pub fn set(&self, target: &MockTarget) -> StoreResult<()> {
        if target.routes.is_empty() {
            return Err(StoreError::EmptyMockTarget {
                namespace: target.namespace.clone(),
                name: target.name.clone(),
            });
        }

        let mut trie = MockTrie::new();
        for route in &target.routes {
            let segments = normalized_segments(&route.path);
            let route = Arc::new(route.clone());
            match trie.get_mut(&segments) {
                Some(routes) => routes.push(route),
                None => {
                    trie.insert(&segments, vec![route]);
                }
            }
        }

        tracing::debug!(
            namespace = %target.namespace,
            target = %target.name,
            routes = target.routes.len(),
            "setting mock target"
        );
        self.namespaces
            .write()
            .entry(target.namespace.clone())
            .or_default()
            .insert(target.name.clone(), trie);
        Ok(())
    }

    /// Resolve a canned response for `path` and `method`.
    ///
    /// The deepest valued node along `path` is selected first; its routes are
    /// then filtered by method, case-insensitively. There is no fallback to a
    /// shallower node when the method does not match.
    pub fn get(
        &self,
        namespace: &str,
        target: &str,
        path: &str,
        method: &str,
    ) -> Option<Arc<MockRoute>> {
        let namespaces = self.namespaces.read();
        let trie = namespaces.get(namespace)?.get(target)?;
        trie.lookup(path)?
            .iter()
            .find(|route| route.serves(method))
            .cloned()
    }

    /// Drop the whole trie of `target`. Returns false when it was not present.
    pub fn delete(&self, target: &MockTarget) -> bool {
        let mut namespaces = self.namespaces.write();
        let Some(targets) = namespaces.get_mut(&target.namespace) else {
            return false;
        };
        let removed = targets.remove(&target.name).is_some();
        if targets.is_empty() {
            namespaces.remove(&target.namespace);
        }
        if removed {
            tracing::debug!(namespace = %target.namespace, target = %target.name, "deleted mock target");
        }
        removed
    }

    pub fn is_empty(&self) -> bool {
        self.namespaces.read().is_empty()
    }
}
