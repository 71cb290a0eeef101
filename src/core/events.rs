//! Whole-resource configuration events.
//!
//! Watchers never send field-level patches: every event carries complete
//! resource snapshots. [`diff_manifests`] derives the events that turn one
//! manifest snapshot into the next.
use std::collections::{HashMap, HashSet};

use crate::config::{Binding, CredentialRecord, MockTarget, ResourceManifest, Route};

/// Any resource the stores know how to hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    Route(Route),
    Binding(Binding),
    Credential(CredentialRecord),
    MockTarget(MockTarget),
}

impl Resource {
    pub fn kind(&self) -> &'static str {
        match self {
            Resource::Route(_) => "route",
            Resource::Binding(_) => "binding",
            Resource::Credential(_) => "credential",
            Resource::MockTarget(_) => "mock_target",
        }
    }

    pub fn namespace(&self) -> &str {
        match self {
            Resource::Route(r) => &r.namespace,
            Resource::Binding(b) => &b.namespace,
            Resource::Credential(c) => &c.namespace,
            Resource::MockTarget(m) => &m.namespace,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Resource::Route(r) => &r.name,
            Resource::Binding(b) => &b.name,
            Resource::Credential(c) => &c.name,
            Resource::MockTarget(m) => &m.name,
        }
    }

    fn key(&self) -> (&'static str, &str, &str) {
        (self.kind(), self.namespace(), self.name())
    }
}

/// A configuration change delivered by a watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceEvent {
    Added(Resource),
    Updated { old: Resource, new: Resource },
    Deleted(Resource),
}

impl ResourceEvent {
    /// The resource the event leaves behind (or removes, for deletes).
    pub fn resource(&self) -> &Resource {
        match self {
            ResourceEvent::Added(r) | ResourceEvent::Deleted(r) => r,
            ResourceEvent::Updated { new, .. } => new,
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            ResourceEvent::Added(_) => "added",
            ResourceEvent::Updated { .. } => "updated",
            ResourceEvent::Deleted(_) => "deleted",
        }
    }
}

impl ResourceManifest {
    /// Events that transform `self` into `next`; see [`diff_manifests`].
    pub fn diff(&self, next: &ResourceManifest) -> Vec<ResourceEvent> {
        diff_manifests(self, next)
    }
}

/// Every resource of a manifest, in manifest order.
pub fn resources(manifest: &ResourceManifest) -> Vec<Resource> {
    let routes = manifest.routes.iter().cloned().map(Resource::Route);
    let bindings = manifest.bindings.iter().cloned().map(Resource::Binding);
    let credentials = manifest.credentials.iter().cloned().map(Resource::Credential);
    let mocks = manifest.mock_targets.iter().cloned().map(Resource::MockTarget);
    routes.chain(bindings).chain(credentials).chain(mocks).collect()
}

/// Events that transform `previous` into `next`.
///
/// Resources are matched by (kind, namespace, name). Deletes come first so
/// that a route freed by one resource can be claimed by another in the same
/// batch; unchanged resources produce no event.
pub fn diff_manifests(previous: &ResourceManifest, next: &ResourceManifest) -> Vec<ResourceEvent> {
    let before = resources(previous);
    let after = resources(next);

    let after_keys: HashSet<_> = after.iter().map(Resource::key).collect();
    let before_by_key: HashMap<_, _> = before.iter().map(|r| (r.key(), r)).collect();

    let mut events: Vec<ResourceEvent> = before
        .iter()
        .filter(|r| !after_keys.contains(&r.key()))
        .cloned()
        .map(ResourceEvent::Deleted)
        .collect();

    for resource in &after {
        match before_by_key.get(&resource.key()) {
            Some(old) if *old == resource => {}
            Some(old) => events.push(ResourceEvent::Updated {
                old: (*old).clone(),
                new: resource.clone(),
            }),
            None => events.push(ResourceEvent::Added(resource.clone())),
        }
    }
    events
}
