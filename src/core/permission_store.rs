//! Binding / subpath permission resolution.
//!
//! Bindings are stored as `[namespace][binding][credential]`. Each credential
//! entry keeps its subpath rules pre-compiled into a [`PathTrie`] so a lookup
//! is a single walk along the target path.
use std::collections::HashMap;

use parking_lot::RwLock;

use crate::{
    config::{Binding, PermissionEntry, RateConfig, Rule},
    core::path_trie::PathTrie,
    utils::path::normalized_segments,
};

#[derive(Debug, Clone)]
struct CompiledEntry {
    default_rule: Rule,
    subpaths: PathTrie<Rule>,
    rate: Option<RateConfig>,
}

impl From<&PermissionEntry> for CompiledEntry {
    fn from(entry: &PermissionEntry) -> Self {
        let mut subpaths = PathTrie::new();
        for subpath in &entry.subpaths {
            subpaths.insert(&normalized_segments(&subpath.path), subpath.rule.clone());
        }
        Self {
            default_rule: entry.default_rule.clone(),
            subpaths,
            rate: entry.rate,
        }
    }
}

/// Outcome of a permission lookup: the rule in force for the target path and
/// the credential's rate configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionMatch {
    pub rule: Rule,
    pub rate: Option<RateConfig>,
}

type CredentialEntries = HashMap<String, CompiledEntry>;

/// Concurrent permission store.
#[derive(Debug, Default)]
pub struct PermissionStore {
    namespaces: RwLock<HashMap<String, HashMap<String, CredentialEntries>>>,
}

impl PermissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile and store every credential entry of `binding`, replacing any
    /// previous binding with the same namespace and name.
    pub fn set(&self, binding: &Binding) {
        let entries: CredentialEntries = binding
            .credentials
            .iter()
            .map(|entry| (entry.credential_name.clone(), CompiledEntry::from(entry)))
            .collect();

        tracing::debug!(
            namespace = %binding.namespace,
            binding = %binding.name,
            credentials = entries.len(),
            "setting binding"
        );

        self.namespaces
            .write()
            .entry(binding.namespace.clone())
            .or_default()
            .insert(binding.name.clone(), entries);
    }

    /// Resolve the rule for `target_path` and the credential's rate config.
    ///
    /// A subpath rule resolved along the path wins over the default rule.
    /// `None` means the binding has no entry for the credential, which is
    /// not the same as a rule that denies everything.
    pub fn get(
        &self,
        namespace: &str,
        binding: &str,
        credential: &str,
        target_path: &str,
    ) -> Option<PermissionMatch> {
        let namespaces = self.namespaces.read();
        let entry = namespaces.get(namespace)?.get(binding)?.get(credential)?;
        let rule = entry
            .subpaths
            .lookup(target_path)
            .unwrap_or(&entry.default_rule)
            .clone();
        Some(PermissionMatch {
            rule,
            rate: entry.rate,
        })
    }

    /// Whether a binding is present at all.
    pub fn contains(&self, namespace: &str, binding: &str) -> bool {
        self.namespaces
            .read()
            .get(namespace)
            .is_some_and(|bindings| bindings.contains_key(binding))
    }

    /// Remove the whole binding. Returns false when it was not present.
    pub fn delete(&self, binding: &Binding) -> bool {
        let mut namespaces = self.namespaces.write();
        let Some(bindings) = namespaces.get_mut(&binding.namespace) else {
            return false;
        };
        let removed = bindings.remove(&binding.name).is_some();
        if bindings.is_empty() {
            namespaces.remove(&binding.namespace);
        }
        if removed {
            tracing::debug!(namespace = %binding.namespace, binding = %binding.name, "deleted binding");
        }
        removed
    }

    pub fn is_empty(&self) -> bool {
        self.namespaces.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RateUnit, SubpathRule};

    fn binding(entries: Vec<PermissionEntry>) -> Binding {
        Binding {
            name: "consumers".to_string(),
            namespace: "default".to_string(),
            credentials: entries,
        }
    }

    fn entry(credential: &str, default_rule: Rule, subpaths: Vec<(&str, Rule)>) -> PermissionEntry {
        PermissionEntry {
            credential_name: credential.to_string(),
            default_rule,
            subpaths: subpaths
                .into_iter()
                .map(|(path, rule)| SubpathRule {
                    path: path.to_string(),
                    rule,
                })
                .collect(),
            rate: None,
        }
    }

    #[test]
    fn test_subpath_override() {
        let store = PermissionStore::new();
        store.set(&binding(vec![entry(
            "alice",
            Rule::deny_all(),
            vec![("/foo", Rule::Global)],
        )]));

        let hit = store.get("default", "consumers", "alice", "/foo/bar").unwrap();
        assert_eq!(hit.rule, Rule::Global);

        let fallback = store.get("default", "consumers", "alice", "/bar").unwrap();
        assert_eq!(fallback.rule, Rule::deny_all());
        assert!(!fallback.rule.authorizes("GET"));
    }

    #[test]
    fn test_deepest_subpath_wins() {
        let store = PermissionStore::new();
        let read_only = Rule::Granular {
            verbs: vec!["GET".to_string()],
        };
        store.set(&binding(vec![entry(
            "alice",
            Rule::deny_all(),
            vec![("/admin", read_only.clone()), ("/admin/users/", Rule::Global)],
        )]));

        let rule = |path: &str| store.get("default", "consumers", "alice", path).unwrap().rule;
        assert_eq!(rule("/admin/settings"), read_only);
        assert_eq!(rule("/admin/users/42"), Rule::Global);
        assert_eq!(rule("/"), Rule::deny_all());
    }

    #[test]
    fn test_root_subpath_overrides_everything() {
        let store = PermissionStore::new();
        store.set(&binding(vec![entry("alice", Rule::deny_all(), vec![("/", Rule::Global)])]));
        let hit = store.get("default", "consumers", "alice", "/anything").unwrap();
        assert_eq!(hit.rule, Rule::Global);
    }

    #[test]
    fn test_absent_is_not_deny() {
        let store = PermissionStore::new();
        store.set(&binding(vec![entry("alice", Rule::Global, vec![])]));

        assert!(store.get("default", "consumers", "bob", "/").is_none());
        assert!(store.get("default", "other", "alice", "/").is_none());
        assert!(store.get("other", "consumers", "alice", "/").is_none());
    }

    #[test]
    fn test_rate_returned_with_rule() {
        let store = PermissionStore::new();
        let mut e = entry("alice", Rule::Global, vec![("/x", Rule::deny_all())]);
        e.rate = Some(RateConfig {
            amount: 5,
            unit: Some(RateUnit::Second),
        });
        store.set(&binding(vec![e]));

        let hit = store.get("default", "consumers", "alice", "/x/y").unwrap();
        assert_eq!(hit.rule, Rule::deny_all());
        assert_eq!(hit.rate.map(|r| r.amount), Some(5));
    }

    #[test]
    fn test_set_replaces_binding() {
        let store = PermissionStore::new();
        store.set(&binding(vec![entry("alice", Rule::Global, vec![])]));
        store.set(&binding(vec![entry("bob", Rule::Global, vec![])]));

        assert!(store.get("default", "consumers", "alice", "/").is_none());
        assert!(store.get("default", "consumers", "bob", "/").is_some());
    }

    #[test]
    fn test_contains_and_delete() {
        let store = PermissionStore::new();
        let b = binding(vec![entry("alice", Rule::Global, vec![])]);
        assert!(!store.contains("default", "consumers"));

        store.set(&b);
        store.set(&b);
        assert!(store.contains("default", "consumers"));
        assert!(!store.contains("default", "other"));

        assert!(store.delete(&b));
        assert!(!store.contains("default", "consumers"));
        assert!(store.is_empty());
        assert!(!store.delete(&b));
    }

    #[test]
    fn test_binding_without_credentials_is_present() {
        let store = PermissionStore::new();
        store.set(&binding(vec![]));
        assert!(store.contains("default", "consumers"));
        assert!(store.get("default", "consumers", "alice", "/").is_none());
    }
}
