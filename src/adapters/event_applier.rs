//! Applies whole-resource configuration events to the stores.
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::{
    config::ResourceManifest,
    core::{
        error::{StoreError, StoreResult},
        events::{Resource, ResourceEvent, resources},
        gateway::GatewayStores,
    },
    tracing_setup::create_resource_span,
};

/// Maps [`ResourceEvent`]s onto store operations.
#[derive(Clone)]
pub struct ResourceEventApplier {
    stores: Arc<GatewayStores>,
}

impl ResourceEventApplier {
    pub fn new(stores: Arc<GatewayStores>) -> Self {
        Self { stores }
    }

    /// Apply a single event.
    ///
    /// Store errors leave the affected store unchanged. An update pairing two
    /// different kinds is rejected before any store is touched.
    pub fn apply(&self, event: ResourceEvent) -> StoreResult<()> {
        let resource = event.resource();
        let span = create_resource_span(
            event.action(),
            resource.kind(),
            resource.namespace(),
            resource.name(),
        );
        let _entered = span.enter();

        match event {
            ResourceEvent::Added(resource) => self.add(resource),
            ResourceEvent::Updated { old, new } => self.update(old, new),
            ResourceEvent::Deleted(resource) => self.delete(resource),
        }
    }

    /// Apply a batch, logging and counting failures instead of stopping.
    pub fn apply_all(&self, events: impl IntoIterator<Item = ResourceEvent>) -> usize {
        let mut failures = 0;
        for event in events {
            if let Err(e) = self.apply(event) {
                tracing::error!("failed to apply resource event: {e}");
                failures += 1;
            }
        }
        failures
    }

    /// Add every resource of a snapshot. Returns the number of failures.
    pub fn load_snapshot(&self, manifest: &ResourceManifest) -> usize {
        let failures = self.apply_all(resources(manifest).into_iter().map(ResourceEvent::Added));
        tracing::info!(
            resources = manifest.len(),
            failures,
            "loaded resource snapshot"
        );
        failures
    }

    /// Apply events from `rx` until the channel closes.
    pub async fn run(self, mut rx: mpsc::Receiver<ResourceEvent>) {
        tracing::info!("resource event applier started");
        while let Some(event) = rx.recv().await {
            if let Err(e) = self.apply(event) {
                tracing::error!("failed to apply resource event: {e}");
            }
        }
        tracing::info!("resource event applier is shutting down");
    }

    fn add(&self, resource: Resource) -> StoreResult<()> {
        match resource {
            Resource::Route(route) => self.stores.routes.set(route),
            Resource::Binding(binding) => self.stores.permissions.set(&binding),
            Resource::Credential(record) => self.stores.credentials.set(record),
            Resource::MockTarget(target) => self.stores.mocks.set(&target)?,
        }
        Ok(())
    }

    fn update(&self, old: Resource, new: Resource) -> StoreResult<()> {
        match (old, new) {
            (Resource::Route(old), Resource::Route(new)) => self.stores.routes.update(&old, new),
            (Resource::Binding(old), Resource::Binding(new)) => {
                if old.namespace != new.namespace || old.name != new.name {
                    self.stores.permissions.delete(&old);
                }
                self.stores.permissions.set(&new);
                Ok(())
            }
            (Resource::Credential(old), Resource::Credential(new)) => {
                self.stores.credentials.update(&old, new);
                Ok(())
            }
            (Resource::MockTarget(old), Resource::MockTarget(new)) => {
                self.stores.mocks.set(&new)?;
                if old.namespace != new.namespace || old.name != new.name {
                    self.stores.mocks.delete(&old);
                }
                Ok(())
            }
            (old, new) => Err(StoreError::KindMismatch {
                old: old.kind(),
                new: new.kind(),
            }),
        }
    }

    fn delete(&self, resource: Resource) -> StoreResult<()> {
        let found = match resource {
            Resource::Route(route) => self.stores.routes.delete(&route).is_some(),
            Resource::Binding(binding) => self.stores.permissions.delete(&binding),
            Resource::Credential(record) => self.stores.credentials.delete(&record)?.is_some(),
            Resource::MockTarget(target) => self.stores.mocks.delete(&target),
        };
        if !found {
            tracing::debug!("deleted resource was not present");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::config::{Binding, CredentialRecord, MockRoute, MockTarget, Route};

    fn route(name: &str, path: &str) -> Route {
        Route {
            name: name.to_string(),
            namespace: "default".to_string(),
            source_path: path.to_string(),
            source_virtual_host: None,
            target_path: "/".to_string(),
            target_backend: "svc:80".to_string(),
            target_ssl: false,
            plugins: vec![],
            binding: None,
            mock: false,
        }
    }

    fn credential(revisions: &[&str]) -> CredentialRecord {
        CredentialRecord {
            name: "alice".to_string(),
            namespace: "default".to_string(),
            revisions: revisions.iter().map(|r| r.to_string()).collect(),
        }
    }

    fn applier() -> (ResourceEventApplier, Arc<GatewayStores>) {
        let stores = Arc::new(GatewayStores::new());
        (ResourceEventApplier::new(stores.clone()), stores)
    }

    #[test]
    fn test_add_update_delete_route() {
        let (applier, stores) = applier();
        applier
            .apply(ResourceEvent::Added(Resource::Route(route("a", "/a"))))
            .unwrap();
        applier
            .apply(ResourceEvent::Updated {
                old: Resource::Route(route("a", "/a")),
                new: Resource::Route(route("a", "/b")),
            })
            .unwrap();
        assert!(stores.routes.get("/a", "").is_none());
        assert!(stores.routes.get("/b", "").is_some());

        applier
            .apply(ResourceEvent::Deleted(Resource::Route(route("a", "/b"))))
            .unwrap();
        assert!(stores.routes.is_empty());
    }

    #[test]
    fn test_route_conflict_surfaces() {
        let (applier, stores) = applier();
        applier
            .apply(ResourceEvent::Added(Resource::Route(route("a", "/a"))))
            .unwrap();
        applier
            .apply(ResourceEvent::Added(Resource::Route(route("b", "/b"))))
            .unwrap();

        let err = applier
            .apply(ResourceEvent::Updated {
                old: Resource::Route(route("a", "/a")),
                new: Resource::Route(route("a", "/b")),
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
        assert_eq!(stores.routes.get("/a", "").unwrap().name, "a");
    }

    #[test]
    fn test_kind_mismatch_mutates_nothing() {
        let (applier, stores) = applier();
        let err = applier
            .apply(ResourceEvent::Updated {
                old: Resource::Route(route("a", "/a")),
                new: Resource::Credential(credential(&["k"])),
            })
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::KindMismatch {
                old: "route",
                new: "credential"
            }
        );
        assert!(stores.routes.is_empty());
        assert!(stores.credentials.is_empty());
    }

    #[test]
    fn test_credential_rotation() {
        let (applier, stores) = applier();
        applier
            .apply(ResourceEvent::Added(Resource::Credential(credential(&["r1", "r2"]))))
            .unwrap();
        applier
            .apply(ResourceEvent::Updated {
                old: Resource::Credential(credential(&["r1", "r2"])),
                new: Resource::Credential(credential(&["r2", "r3"])),
            })
            .unwrap();

        assert!(stores.credentials.get("r1").is_none());
        assert!(stores.credentials.get("r2").is_some());
        assert!(stores.credentials.get("r3").is_some());

        let err = applier
            .apply(ResourceEvent::Deleted(Resource::Credential(credential(&[]))))
            .unwrap_err();
        assert!(matches!(err, StoreError::NoRevisions { .. }));
    }

    #[test]
    fn test_binding_rename_drops_old() {
        let (applier, stores) = applier();
        let old = Binding {
            name: "old".to_string(),
            namespace: "default".to_string(),
            credentials: vec![],
        };
        let new = Binding {
            name: "new".to_string(),
            ..old.clone()
        };
        applier
            .apply(ResourceEvent::Added(Resource::Binding(old.clone())))
            .unwrap();
        applier
            .apply(ResourceEvent::Updated {
                old: Resource::Binding(old),
                new: Resource::Binding(new),
            })
            .unwrap();
        assert!(!stores.permissions.contains("default", "old"));
        assert!(stores.permissions.contains("default", "new"));
    }

    #[test]
    fn test_empty_mock_update_keeps_old_target() {
        let (applier, stores) = applier();
        let target = MockTarget {
            name: "m".to_string(),
            namespace: "default".to_string(),
            routes: vec![MockRoute {
                path: "/ping".to_string(),
                status_code: 200,
                methods: vec!["GET".to_string()],
                headers: BTreeMap::new(),
                body: "pong".to_string(),
            }],
        };
        applier
            .apply(ResourceEvent::Added(Resource::MockTarget(target.clone())))
            .unwrap();

        let emptied = MockTarget {
            routes: vec![],
            ..target.clone()
        };
        let err = applier
            .apply(ResourceEvent::Updated {
                old: Resource::MockTarget(target),
                new: Resource::MockTarget(emptied),
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::EmptyMockTarget { .. }));
        assert!(stores.mocks.get("default", "m", "/ping", "GET").is_some());
    }

    #[test]
    fn test_load_snapshot_counts_failures() {
        let (applier, stores) = applier();
        let manifest = ResourceManifest {
            routes: vec![route("a", "/a")],
            mock_targets: vec![MockTarget {
                name: "empty".to_string(),
                namespace: "default".to_string(),
                routes: vec![],
            }],
            ..Default::default()
        };
        assert_eq!(applier.load_snapshot(&manifest), 1);
        assert_eq!(stores.routes.len(), 1);
    }

    #[tokio::test]
    async fn test_run_drains_channel() {
        let (applier, stores) = applier();
        let (tx, rx) = mpsc::channel(8);
        let task = tokio::spawn(applier.run(rx));

        tx.send(ResourceEvent::Added(Resource::Route(route("a", "/a"))))
            .await
            .unwrap();
        tx.send(ResourceEvent::Added(Resource::Credential(credential(&["k"]))))
            .await
            .unwrap();
        drop(tx);
        task.await.unwrap();

        assert_eq!(stores.routes.len(), 1);
        assert_eq!(stores.credentials.len(), 1);
    }
}
