//! Route resolution by (path, virtual host).
//!
//! Every trie node that carries a value holds a [`RouteSlot`]: one route per
//! virtual host, with the empty host standing for the global slot. A lookup
//! picks the deepest valued node along the request path and then reads the
//! slot for exactly the requested host, so a request for one host never
//! falls back onto another host's route.
use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;

use crate::{
    config::Route,
    core::{
        error::{StoreError, StoreResult},
        path_trie::PathTrie,
    },
    utils::path::{normalize_path, normalized_segments},
};

#[derive(Debug, Default, Clone)]
struct RouteSlot {
    by_host: HashMap<String, Arc<Route>>,
}

#[derive(Debug, Default)]
struct RouteTable {
    trie: PathTrie<RouteSlot>,
    len: usize,
}

impl RouteTable {
    fn occupant(&self, segments: &[String], virtual_host: &str) -> Option<&Arc<Route>> {
        self.trie.get(segments)?.by_host.get(virtual_host)
    }

    fn insert(&mut self, segments: &[String], route: Route) -> Option<Arc<Route>> {
        let host = route.virtual_host().to_string();
        let route = Arc::new(route);
        let previous = match self.trie.get_mut(segments) {
            Some(slot) => slot.by_host.insert(host, route),
            None => {
                let mut slot = RouteSlot::default();
                slot.by_host.insert(host, route);
                self.trie.insert(segments, slot);
                None
            }
        };
        if previous.is_none() {
            self.len += 1;
        }
        previous
    }

    fn remove(&mut self, segments: &[String], virtual_host: &str) -> Option<Arc<Route>> {
        let slot = self.trie.get_mut(segments)?;
        let removed = slot.by_host.remove(virtual_host)?;
        if slot.by_host.is_empty() {
            self.trie.delete(segments);
        }
        self.len -= 1;
        Some(removed)
    }
}

/// Concurrent route store. Readers share the lock; writers are exclusive.
#[derive(Debug, Default)]
pub struct RouteStore {
    table: RwLock<RouteTable>,
}

impl RouteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the route at its (source path, virtual host) slot.
    ///
    /// Last write wins; owner collisions are an admission-time concern.
    pub fn set(&self, route: Route) {
        let segments = normalized_segments(&route.source_path);
        tracing::debug!(
            namespace = %route.namespace,
            name = %route.name,
            path = %normalize_path(&route.source_path),
            host = route.virtual_host(),
            "setting route"
        );
        self.table.write().insert(&segments, route);
    }

    /// Move a route from `old`'s slot to `new`'s slot.
    ///
    /// The move is refused with [`StoreError::Conflict`] when the target slot
    /// is held by a route with a different (name, namespace, virtual host)
    /// identity; the old entry then stays in place.
    pub fn update(&self, old: &Route, new: Route) -> StoreResult<()> {
        let old_segments = normalized_segments(&old.source_path);
        let new_segments = normalized_segments(&new.source_path);

        let mut table = self.table.write();
        if let Some(owner) = table.occupant(&new_segments, new.virtual_host()) {
            if !owner.same_owner(&new) {
                let err = StoreError::Conflict {
                    path: normalize_path(&new.source_path),
                    virtual_host: new.virtual_host().to_string(),
                    owner_namespace: owner.namespace.clone(),
                    owner_name: owner.name.clone(),
                };
                tracing::warn!(namespace = %new.namespace, name = %new.name, "route update refused: {err}");
                return Err(err);
            }
        }

        let owns_old_slot = table
            .occupant(&old_segments, old.virtual_host())
            .is_some_and(|owner| owner.same_owner(old));
        if owns_old_slot {
            table.remove(&old_segments, old.virtual_host());
        }
        table.insert(&new_segments, new);
        Ok(())
    }

    /// Resolve a request path and virtual host (`""` for the global slot).
    pub fn get(&self, path: &str, virtual_host: &str) -> Option<Arc<Route>> {
        let table = self.table.read();
        table.trie.lookup(path)?.by_host.get(virtual_host).cloned()
    }

    /// Remove the route's slot entry and prune empty trie nodes.
    pub fn delete(&self, route: &Route) -> Option<Arc<Route>> {
        let segments = normalized_segments(&route.source_path);
        let removed = self
            .table
            .write()
            .remove(&segments, route.virtual_host());
        if removed.is_some() {
            tracing::debug!(namespace = %route.namespace, name = %route.name, "deleted route");
        }
        removed
    }

    /// Number of stored routes across every path and host.
    pub fn len(&self) -> usize {
        self.table.read().len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(test)]
    fn node_count(&self) -> usize {
        self.table.read().trie.node_count()
    }
}
